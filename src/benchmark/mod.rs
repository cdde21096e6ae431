//! Price benchmarks and the comparison report.
//!
//! Benchmarks live in a JSON object keyed by product name, as maintained by
//! the dashboard:
//!
//! ```json
//! { "Pepe Jeans Men's Brief": 499, "Pepe Jeans Vest": "549.50" }
//! ```
//!
//! Values that don't parse as numbers are kept and echoed back, but the
//! product's status is left unknown.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, warn};

use crate::app::Result;
use crate::domain::ProductRecord;

/// Column order of the export file.
pub const EXPORT_HEADERS: [&str; 8] = [
    "name",
    "current_price",
    "original_price",
    "discount",
    "sizes",
    "benchmark_price",
    "status",
    "diff",
];

#[derive(Debug, Clone, Default)]
pub struct BenchmarkBook {
    entries: HashMap<String, Value>,
}

impl BenchmarkBook {
    /// Load benchmarks from `path`.
    ///
    /// A missing or unreadable file yields an empty book so a report can
    /// still be produced.
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            debug!("No benchmark file at {}", path.display());
            return Self::default();
        }

        match fs::read_to_string(path)
            .map_err(crate::app::ShelfError::from)
            .and_then(|content| Self::from_json(&content))
        {
            Ok(book) => book,
            Err(e) => {
                warn!("Ignoring benchmark file {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let entries: HashMap<String, Value> = serde_json::from_str(content)?;
        Ok(Self { entries })
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries.get(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceStatus {
    Above,
    Below,
    Equal,
    Unknown,
}

impl PriceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PriceStatus::Above => "above",
            PriceStatus::Below => "below",
            PriceStatus::Equal => "equal",
            PriceStatus::Unknown => "",
        }
    }
}

impl fmt::Display for PriceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A product next to its benchmark.
#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    pub record: ProductRecord,
    /// Benchmark as written in the JSON file
    pub benchmark: Option<String>,
    pub status: PriceStatus,
    /// Current price minus benchmark
    pub diff: Option<f64>,
}

impl Comparison {
    pub fn new(record: ProductRecord, benchmark: Option<&Value>) -> Self {
        let benchmark = benchmark.filter(|v| !v.is_null());
        let current = record
            .current_price
            .as_deref()
            .and_then(|p| p.trim().parse::<f64>().ok());
        let target = benchmark.and_then(numeric);

        let diff = match (current, target) {
            (Some(c), Some(b)) => Some(c - b),
            _ => None,
        };
        let status = match diff {
            Some(d) if d > 0.0 => PriceStatus::Above,
            Some(d) if d < 0.0 => PriceStatus::Below,
            Some(_) => PriceStatus::Equal,
            None => PriceStatus::Unknown,
        };

        Self {
            record,
            benchmark: benchmark.map(display_value),
            status,
            diff,
        }
    }

    /// `diff` with two decimals, or empty.
    pub fn diff_display(&self) -> String {
        self.diff.map(|d| format!("{:.2}", d)).unwrap_or_default()
    }
}

fn numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Join records with benchmarks on the exact product name.
pub fn compare(records: Vec<ProductRecord>, book: &BenchmarkBook) -> Vec<Comparison> {
    records
        .into_iter()
        .map(|record| {
            let benchmark = book.get(&record.name);
            Comparison::new(record, benchmark)
        })
        .collect()
}

/// `<dir>/export_with_benchmarks_<retailer>.csv`
pub fn export_path(dir: &Path, retailer: &str) -> PathBuf {
    dir.join(format!("export_with_benchmarks_{}.csv", retailer))
}

/// Write the comparison table. Absent cells are left empty.
pub fn write_export(path: &Path, rows: &[Comparison]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(EXPORT_HEADERS)?;
    for row in rows {
        let r = &row.record;
        writer.write_record([
            r.name.as_str(),
            r.current_price.as_deref().unwrap_or_default(),
            r.original_price.as_deref().unwrap_or_default(),
            r.discount.as_deref().unwrap_or_default(),
            r.size_or_unit.as_deref().unwrap_or_default(),
            row.benchmark.as_deref().unwrap_or_default(),
            row.status.as_str(),
            row.diff_display().as_str(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}
