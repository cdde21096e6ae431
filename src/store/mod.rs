pub mod csv_sink;
pub mod dedup;

use std::path::PathBuf;

use chrono::NaiveDate;

use crate::app::Result;
use crate::domain::ProductRecord;

pub use csv_sink::{latest_snapshot, read_snapshot, CsvSink, CSV_HEADERS};
pub use dedup::DedupStore;

/// What a sink did with a run's records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistOutcome {
    Written { path: PathBuf, rows: usize },
    /// Nothing was written; any existing snapshot at `path` is untouched.
    SkippedEmpty { path: PathBuf },
}

pub trait RecordSink: Send + Sync {
    /// Persist a run's records under `stem` and `date`.
    ///
    /// An empty slice must leave existing output unchanged.
    fn persist(
        &self,
        stem: &str,
        date: NaiveDate,
        records: &[ProductRecord],
    ) -> Result<PersistOutcome>;
}
