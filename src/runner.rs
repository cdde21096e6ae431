//! Runs every selected retailer in sequence.
//!
//! Each retailer gets its own browser and its own failure domain: an error
//! or a panic in one run is recorded and the next retailer still runs.

use std::panic::AssertUnwindSafe;

use async_trait::async_trait;
use chrono::NaiveDate;
use futures::FutureExt;
use tracing::{error, info, warn};

use crate::app::{Result, ShelfError};
use crate::scraper::{RetailerPipeline, RetailerProfile, RunReport, SessionConfig};
use crate::store::RecordSink;

/// A single retailer run, as seen by the orchestrator.
#[async_trait]
pub trait RetailerJob: Send + Sync {
    async fn run(&self, profile: &RetailerProfile, date: NaiveDate) -> Result<RunReport>;
}

/// Runs the full browser pipeline.
pub struct ChromeJob<'a> {
    session: &'a SessionConfig,
    sink: &'a dyn RecordSink,
}

impl<'a> ChromeJob<'a> {
    pub fn new(session: &'a SessionConfig, sink: &'a dyn RecordSink) -> Self {
        Self { session, sink }
    }
}

#[async_trait]
impl RetailerJob for ChromeJob<'_> {
    async fn run(&self, profile: &RetailerProfile, date: NaiveDate) -> Result<RunReport> {
        RetailerPipeline::new(profile, self.session)
            .run(self.sink, date)
            .await
    }
}

#[derive(Debug)]
pub struct RetailerRun {
    pub retailer: String,
    pub result: Result<RunReport>,
}

#[derive(Debug, Default)]
pub struct RunSummary {
    pub runs: Vec<RetailerRun>,
}

impl RunSummary {
    pub fn failures(&self) -> usize {
        self.runs.iter().filter(|r| r.result.is_err()).count()
    }

    pub fn successes(&self) -> usize {
        self.runs.len() - self.failures()
    }

    pub fn is_success(&self) -> bool {
        self.failures() == 0
    }
}

pub async fn run_retailers(
    job: &dyn RetailerJob,
    profiles: &[&RetailerProfile],
    date: NaiveDate,
) -> RunSummary {
    let mut summary = RunSummary::default();

    if profiles.is_empty() {
        warn!("No retailers configured");
        return summary;
    }

    for profile in profiles {
        info!("Running {}", profile.display_title());

        let result = match AssertUnwindSafe(job.run(profile, date)).catch_unwind().await {
            Ok(result) => result,
            Err(_) => Err(ShelfError::Other(format!(
                "{} run panicked",
                profile.display_title()
            ))),
        };

        match &result {
            Ok(report) => info!(
                "{} completed: {} rows",
                profile.display_title(),
                report.rows()
            ),
            Err(e) => error!("{} failed: {}", profile.display_title(), e),
        }

        summary.runs.push(RetailerRun {
            retailer: profile.name.clone(),
            result,
        });
    }

    info!(
        "All runs finished: {} succeeded, {} failed",
        summary.successes(),
        summary.failures()
    );
    summary
}
