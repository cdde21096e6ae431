//! Browser-driven catalogue scraping.
//!
//! Storefronts render their catalogues as virtualized single-page grids, so
//! a plain HTTP fetch sees nothing. Each retailer run drives one headless
//! Chrome tab through a fixed sequence of stages:
//!
//! # Architecture
//!
//! ```text
//! BrowserSession → LocationResolver → CatalogueNavigator
//!     → ScrollEngine ⇄ RecordExtractor ⇄ DedupStore → RecordSink
//! ```
//!
//! Every stage talks to the page through [`PageDriver`] and
//! [`ElementHandle`], so the whole pipeline runs against scripted fakes in
//! tests.
//!
//! # Usage
//!
//! ```rust,ignore
//! use shelfscan::scraper::{RetailerPipeline, RetailerProfile, SessionConfig};
//! use shelfscan::store::CsvSink;
//!
//! let profile = RetailerProfile::blinkit();
//! let session = SessionConfig::default();
//! let sink = CsvSink::new("output");
//!
//! let report = RetailerPipeline::new(&profile, &session)
//!     .run(&sink, chrono::Local::now().date_naive())
//!     .await?;
//! println!("{} rows", report.rows());
//! ```

pub mod chrome;
pub mod config;
pub mod convergence;
pub mod driver;
pub mod extractor;
pub mod location;
pub mod locator;
pub mod navigator;
pub mod pipeline;
pub mod profile;

#[cfg(test)]
pub(crate) mod fake;

pub use chrome::{BrowserSession, ChromePage};
pub use config::SessionConfig;
pub use convergence::{ConvergencePolicy, ConvergenceReport, ScrollEngine, ScrollState, StopReason};
pub use driver::{ElementHandle, PageDriver, ScrollMetrics};
pub use extractor::{DiscardReason, Extraction, RecordExtractor};
pub use location::{LocationOutcome, LocationResolver};
pub use locator::{FieldChain, Locator, LocatorStrategy, TextMatch};
pub use navigator::{CatalogueNavigator, NavigationRoute};
pub use pipeline::{RetailerPipeline, RunReport};
pub use profile::RetailerProfile;
