//! # shelfscan
//!
//! Collects branded product listings (name, price, discount, size) from
//! grocery-delivery storefronts and stores them as dated CSV snapshots for
//! price-benchmark comparison.
//!
//! ## Architecture
//!
//! Each retailer run is a fixed pipeline over one headless browser:
//!
//! ```text
//! Session → Location → Navigation → Scroll/Extract/Dedup → CSV snapshot
//! ```
//!
//! - [`scraper`]: browser session, location, navigation, scroll convergence
//!   and extraction
//! - [`store`]: deduplication and CSV persistence
//! - [`runner`]: sequential run over all retailers with failure isolation
//! - [`benchmark`]: comparison of snapshots against benchmark prices
//!
//! ## Quick Start
//!
//! ```bash
//! # Scrape every configured retailer
//! shelfscan run
//!
//! # Scrape one retailer
//! shelfscan run blinkit
//!
//! # Compare the latest snapshot with benchmarks
//! shelfscan report blinkit
//!
//! # Re-run every six hours
//! shelfscan schedule --interval 6h
//! ```

/// Application context and error handling.
///
/// The [`AppContext`](app::AppContext) struct wires together configuration
/// and the snapshot sink.
pub mod app;

/// Benchmark prices and the comparison report.
pub mod benchmark;

/// Command-line interface using clap.
///
/// - `run [RETAILER]` - Scrape one or all retailers
/// - `list` - Show retailers and their latest snapshots
/// - `latest <RETAILER>` - Print the newest snapshot path
/// - `report <RETAILER>` - Compare against benchmarks
/// - `export <RETAILER>` - Write the comparison CSV
/// - `schedule` - Repeat runs on an interval
pub mod cli;

/// Configuration loaded from `~/.config/shelfscan/config.toml`.
pub mod config;

/// Core domain models.
///
/// - [`ProductRecord`](domain::ProductRecord): One scraped product
/// - [`IdentityKey`](domain::IdentityKey): Deduplication key (URL or name)
pub mod domain;

/// Sequential orchestration of retailer runs.
pub mod runner;

/// Repeated runs until interrupted.
pub mod schedule;

/// Browser-driven catalogue scraping.
///
/// Uses headless Chrome via chromiumoxide to render virtualized product
/// grids.
///
/// - [`RetailerPipeline`](scraper::RetailerPipeline): One retailer run
/// - [`RetailerProfile`](scraper::RetailerProfile): Per-retailer selectors and policy
/// - [`PageDriver`](scraper::PageDriver): Async browser seam
pub mod scraper;

/// Deduplication and persistence.
///
/// - [`DedupStore`](store::DedupStore): First-write-wins record set
/// - [`CsvSink`](store::CsvSink): Dated CSV snapshots
pub mod store;
