//! Repeated runs on a fixed interval.
//!
//! Runs every configured retailer, sleeps, and repeats until Ctrl-C or
//! SIGTERM. A run that is in progress when the signal arrives is allowed to
//! finish so its browser is closed and its snapshot written.

use std::time::Duration;

use chrono::{Local, Utc};
use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{info, warn};

use crate::runner::{run_retailers, RetailerJob};
use crate::scraper::RetailerProfile;

/// Schedule configuration
#[derive(Debug, Clone)]
pub struct ScheduleConfig {
    /// Seconds between runs (default: 21600 = 6 hours)
    pub interval_secs: u64,
    /// Whether to run immediately on start
    pub run_on_start: bool,
}

/// Longest accepted interval, one year.
const MAX_INTERVAL_SECS: u64 = 365 * 86400;

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            interval_secs: 6 * 3600,
            run_on_start: true,
        }
    }
}

impl ScheduleConfig {
    /// Parse interval string like "1h", "30m", "6h", "1d"
    pub fn parse_interval(s: &str) -> Result<u64, String> {
        let s = s.trim().to_lowercase();

        let (value, unit, label) = if let Some(hours) = s.strip_suffix('h') {
            (hours, 3600, "hours")
        } else if let Some(minutes) = s.strip_suffix('m') {
            (minutes, 60, "minutes")
        } else if let Some(days) = s.strip_suffix('d') {
            (days, 86400, "days")
        } else if let Some(secs) = s.strip_suffix('s') {
            (secs, 1, "seconds")
        } else {
            (s.as_str(), 1, "interval")
        };

        let count = value.parse::<u64>().map_err(|_| {
            if label == "interval" {
                format!("Invalid interval: {}. Use format like '1h', '30m', '1d'", value)
            } else {
                format!("Invalid {}: {}", label, value)
            }
        })?;
        let secs = count
            .checked_mul(unit)
            .filter(|secs| *secs <= MAX_INTERVAL_SECS)
            .ok_or_else(|| format!("Interval too long: {} (max 365d)", s))?;

        if secs == 0 {
            return Err("Interval must be greater than zero".to_string());
        }
        Ok(secs)
    }

    /// Format interval for display
    pub fn format_interval(secs: u64) -> String {
        if secs >= 86400 && secs.is_multiple_of(86400) {
            format!("{}d", secs / 86400)
        } else if secs >= 3600 && secs.is_multiple_of(3600) {
            format!("{}h", secs / 3600)
        } else if secs >= 60 && secs.is_multiple_of(60) {
            format!("{}m", secs / 60)
        } else {
            format!("{}s", secs)
        }
    }
}

pub struct Scheduler<'a> {
    job: &'a dyn RetailerJob,
    profiles: Vec<&'a RetailerProfile>,
    config: ScheduleConfig,
}

impl<'a> Scheduler<'a> {
    pub fn new(
        job: &'a dyn RetailerJob,
        profiles: Vec<&'a RetailerProfile>,
        config: ScheduleConfig,
    ) -> Self {
        Self {
            job,
            profiles,
            config,
        }
    }

    /// Run until the process receives Ctrl-C or SIGTERM. Returns the number
    /// of completed cycles.
    pub async fn run(&self) -> usize {
        let (tx, rx) = watch::channel(false);
        let signals = tokio::spawn(async move {
            wait_for_shutdown_signal().await;
            let _ = tx.send(true);
        });

        let cycles = self.run_until(rx).await;
        signals.abort();
        cycles
    }

    /// Run until `shutdown` turns true.
    pub async fn run_until(&self, mut shutdown: watch::Receiver<bool>) -> usize {
        info!(
            "Scheduler started (interval: {}, retailers: {}, PID: {})",
            ScheduleConfig::format_interval(self.config.interval_secs),
            self.profiles.len(),
            std::process::id()
        );

        let mut cycles = 0;

        if self.config.run_on_start && !*shutdown.borrow() {
            info!("Running initial cycle...");
            self.run_cycle().await;
            cycles += 1;
        }

        let mut timer = interval(Duration::from_secs(self.config.interval_secs));
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        timer.tick().await; // Skip the first immediate tick

        loop {
            if *shutdown.borrow() {
                break;
            }

            tokio::select! {
                _ = timer.tick() => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                    continue;
                }
            }

            info!("Running scheduled cycle...");
            self.run_cycle().await;
            cycles += 1;
        }

        info!("Scheduler shutting down after {} cycles", cycles);
        cycles
    }

    async fn run_cycle(&self) {
        let start = Utc::now();
        let summary = run_retailers(self.job, &self.profiles, Local::now().date_naive()).await;
        let elapsed = Utc::now().signed_duration_since(start);

        if summary.is_success() {
            info!(
                "Cycle complete: {} retailers ({:.1}s)",
                summary.successes(),
                elapsed.num_milliseconds() as f64 / 1000.0
            );
        } else {
            warn!(
                "Cycle complete with errors: {} succeeded, {} failed ({:.1}s)",
                summary.successes(),
                summary.failures(),
                elapsed.num_milliseconds() as f64 / 1000.0
            );
        }
    }
}

#[cfg(unix)]
async fn wait_for_shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    match (
        signal(SignalKind::terminate()),
        signal(SignalKind::interrupt()),
    ) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {},
                _ = sigint.recv() => {},
            }
        }
        _ => {
            warn!("Could not install signal handlers; falling back to Ctrl-C");
            let _ = tokio::signal::ctrl_c().await;
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
