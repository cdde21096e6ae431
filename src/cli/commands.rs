use std::path::PathBuf;

use chrono::Local;

use crate::app::{AppContext, Result, ShelfError};
use crate::benchmark::{compare, export_path, write_export, BenchmarkBook, Comparison};
use crate::domain::ABSENT;
use crate::runner::{run_retailers, ChromeJob, RunSummary};
use crate::schedule::{ScheduleConfig, Scheduler};
use crate::store::{latest_snapshot, read_snapshot, PersistOutcome};

pub async fn run_scrapers(ctx: &AppContext, retailer: Option<&str>) -> Result<RunSummary> {
    let profiles = ctx.select_retailers(retailer)?;
    let job = ChromeJob::new(&ctx.config.session, ctx.sink.as_ref());

    println!("Running {} retailer(s)...", profiles.len());
    let summary = run_retailers(&job, &profiles, Local::now().date_naive()).await;

    for run in &summary.runs {
        match &run.result {
            Ok(report) => match &report.outcome {
                PersistOutcome::Written { path, rows } => {
                    println!("  + {} ({} products) -> {}", run.retailer, rows, path.display())
                }
                PersistOutcome::SkippedEmpty { .. } => {
                    println!("  - {} (no products, nothing written)", run.retailer)
                }
            },
            Err(e) => eprintln!("  ! {} - {}", run.retailer, e),
        }
    }

    println!(
        "Done: {} succeeded, {} failed",
        summary.successes(),
        summary.failures()
    );
    Ok(summary)
}

pub fn list_retailers(ctx: &AppContext) -> Result<()> {
    if ctx.config.retailers.is_empty() {
        println!("No retailers configured");
        return Ok(());
    }

    for profile in &ctx.config.retailers {
        let latest = latest_snapshot(ctx.sink.dir(), &profile.output_stem)?
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "no snapshots yet".to_string());
        println!(
            "{} ({})\n  {}\n  {}",
            profile.display_title(),
            profile.name,
            profile.home_url,
            latest
        );
    }

    Ok(())
}

/// Path of the newest snapshot for `retailer`, if any.
pub fn latest(ctx: &AppContext, retailer: &str) -> Result<Option<PathBuf>> {
    let profile = ctx.retailer(retailer)?;
    latest_snapshot(ctx.sink.dir(), &profile.output_stem)
}

pub fn print_latest(ctx: &AppContext, retailer: &str) -> Result<()> {
    match latest(ctx, retailer)? {
        Some(path) => println!("{}", path.display()),
        None => println!("No snapshots for {}", retailer),
    }
    Ok(())
}

/// The latest snapshot joined with the benchmark file.
pub fn comparisons(ctx: &AppContext, retailer: &str) -> Result<Option<(PathBuf, Vec<Comparison>)>> {
    let Some(path) = latest(ctx, retailer)? else {
        return Ok(None);
    };
    let records = read_snapshot(&path)?;
    let book = BenchmarkBook::load(&ctx.config.output.benchmarks);
    Ok(Some((path, compare(records, &book))))
}

pub fn report(ctx: &AppContext, retailer: &str) -> Result<()> {
    let Some((path, rows)) = comparisons(ctx, retailer)? else {
        println!("No snapshots for {}", retailer);
        return Ok(());
    };

    println!("{} ({} products)", path.display(), rows.len());
    for row in &rows {
        let r = &row.record;
        println!(
            "{:<50} {:>8} {:>8} {:>6} {:>9}",
            truncate(&r.name, 50),
            r.current_price.as_deref().unwrap_or(ABSENT),
            row.benchmark.as_deref().unwrap_or("-"),
            row.status.as_str(),
            row.diff_display()
        );
    }

    Ok(())
}

pub fn export(ctx: &AppContext, retailer: &str, out: Option<PathBuf>) -> Result<Option<PathBuf>> {
    let Some((_, rows)) = comparisons(ctx, retailer)? else {
        println!("No snapshots for {}", retailer);
        return Ok(None);
    };

    let path = match out {
        Some(path) => path,
        None => export_path(ctx.sink.dir(), &ctx.retailer(retailer)?.name),
    };
    write_export(&path, &rows)?;
    println!("Exported {} rows to {}", rows.len(), path.display());
    Ok(Some(path))
}

pub async fn schedule(ctx: &AppContext, interval: &str, no_initial_run: bool) -> Result<()> {
    let interval_secs = ScheduleConfig::parse_interval(interval).map_err(ShelfError::Config)?;
    let config = ScheduleConfig {
        interval_secs,
        run_on_start: !no_initial_run,
    };

    let profiles = ctx.select_retailers(None)?;
    let job = ChromeJob::new(&ctx.config.session, ctx.sink.as_ref());

    println!(
        "Scheduling {} retailer(s) every {}. Press Ctrl-C to stop.",
        profiles.len(),
        ScheduleConfig::format_interval(interval_secs)
    );
    let cycles = Scheduler::new(&job, profiles, config).run().await;
    println!("Stopped after {} cycles", cycles);
    Ok(())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
        out.push('…');
        out
    }
}
