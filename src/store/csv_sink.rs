use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::Deserialize;

use crate::app::Result;
use crate::domain::{ProductRecord, ABSENT};
use crate::store::{PersistOutcome, RecordSink};

/// Fixed column order of every snapshot file.
pub const CSV_HEADERS: [&str; 7] = [
    "name",
    "current_price",
    "original_price",
    "discount",
    "sizes_or_unit",
    "image_url",
    "product_url",
];

/// Writes one CSV snapshot per retailer and run date.
pub struct CsvSink {
    dir: PathBuf,
}

impl CsvSink {
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// `<dir>/<stem>_<YYYY-MM-DD>.csv`
    pub fn snapshot_path(&self, stem: &str, date: NaiveDate) -> PathBuf {
        self.dir
            .join(format!("{}_{}.csv", stem, date.format("%Y-%m-%d")))
    }

    fn write_rows(path: &Path, records: &[ProductRecord]) -> Result<()> {
        let mut writer = csv::Writer::from_path(path)?;
        writer.write_record(CSV_HEADERS)?;
        for record in records {
            writer.write_record([
                record.name.as_str(),
                or_absent(&record.current_price),
                or_absent(&record.original_price),
                or_absent(&record.discount),
                or_absent(&record.size_or_unit),
                or_absent(&record.image_url),
                or_absent(&record.product_url),
            ])?;
        }
        writer.flush()?;
        Ok(())
    }
}

impl RecordSink for CsvSink {
    fn persist(
        &self,
        stem: &str,
        date: NaiveDate,
        records: &[ProductRecord],
    ) -> Result<PersistOutcome> {
        let path = self.snapshot_path(stem, date);

        if records.is_empty() {
            tracing::warn!(
                "No records for {}; leaving {} untouched",
                stem,
                path.display()
            );
            return Ok(PersistOutcome::SkippedEmpty { path });
        }

        fs::create_dir_all(&self.dir)?;

        // Previous snapshot stays intact until the rename.
        let tmp = path.with_extension("csv.tmp");
        if let Err(e) = Self::write_rows(&tmp, records) {
            let _ = fs::remove_file(&tmp);
            return Err(e);
        }
        fs::rename(&tmp, &path)?;

        tracing::info!("Saved {} records to {}", records.len(), path.display());
        Ok(PersistOutcome::Written {
            path,
            rows: records.len(),
        })
    }
}

fn or_absent(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or(ABSENT)
}

#[derive(Debug, Deserialize)]
struct SnapshotRow {
    name: String,
    #[serde(default)]
    current_price: String,
    #[serde(default)]
    original_price: String,
    #[serde(default)]
    discount: String,
    #[serde(default, alias = "unit", alias = "sizes")]
    sizes_or_unit: String,
    #[serde(default)]
    image_url: String,
    #[serde(default)]
    product_url: String,
}

fn from_cell(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed == ABSENT {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Read a snapshot back into records. Rows with an empty name are skipped.
pub fn read_snapshot(path: &Path) -> Result<Vec<ProductRecord>> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut records = Vec::new();

    for row in reader.deserialize::<SnapshotRow>() {
        let row = row?;
        let Some(mut record) = ProductRecord::new(&row.name) else {
            continue;
        };
        record.current_price = from_cell(row.current_price);
        record.original_price = from_cell(row.original_price);
        record.discount = from_cell(row.discount);
        record.size_or_unit = from_cell(row.sizes_or_unit);
        record.image_url = from_cell(row.image_url);
        record.product_url = from_cell(row.product_url);
        records.push(record);
    }

    Ok(records)
}

/// Most recently modified `<stem>_*.csv` in `dir`, if any.
pub fn latest_snapshot(dir: &Path, stem: &str) -> Result<Option<PathBuf>> {
    if !dir.exists() {
        return Ok(None);
    }

    let prefix = format!("{}_", stem);
    let mut latest: Option<(std::time::SystemTime, PathBuf)> = None;

    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let file_name = entry.file_name();
        let Some(name) = file_name.to_str() else {
            continue;
        };
        let dated = name
            .strip_prefix(&prefix)
            .and_then(|rest| rest.strip_suffix(".csv"))
            .is_some_and(|date| NaiveDate::parse_from_str(date, "%Y-%m-%d").is_ok());
        if !dated {
            continue;
        }

        let modified = entry.metadata()?.modified()?;
        if latest.as_ref().is_none_or(|(t, _)| modified > *t) {
            latest = Some((modified, entry.path()));
        }
    }

    Ok(latest.map(|(_, path)| path))
}
