//! One retailer run, end to end.
//!
//! ```text
//! BrowserSession → LocationResolver → CatalogueNavigator
//!     → ScrollEngine (⇄ RecordExtractor ⇄ DedupStore) → RecordSink
//! ```

use chrono::NaiveDate;
use tracing::{debug, info, warn};
use url::Url;

use crate::app::{Result, ShelfError};
use crate::scraper::chrome::BrowserSession;
use crate::scraper::config::SessionConfig;
use crate::scraper::convergence::{ConvergenceReport, ScrollEngine};
use crate::scraper::driver::PageDriver;
use crate::scraper::extractor::RecordExtractor;
use crate::scraper::location::{LocationOutcome, LocationResolver};
use crate::scraper::navigator::{CatalogueNavigator, NavigationRoute};
use crate::scraper::profile::RetailerProfile;
use crate::store::{DedupStore, PersistOutcome, RecordSink};

/// What happened during one retailer run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub retailer: String,
    pub location: LocationOutcome,
    pub route: NavigationRoute,
    pub convergence: ConvergenceReport,
    pub outcome: PersistOutcome,
}

impl RunReport {
    /// Number of rows written (zero when persistence was skipped).
    pub fn rows(&self) -> usize {
        match self.outcome {
            PersistOutcome::Written { rows, .. } => rows,
            PersistOutcome::SkippedEmpty { .. } => 0,
        }
    }
}

pub struct RetailerPipeline<'a> {
    profile: &'a RetailerProfile,
    session: &'a SessionConfig,
}

impl<'a> RetailerPipeline<'a> {
    pub fn new(profile: &'a RetailerProfile, session: &'a SessionConfig) -> Self {
        Self { profile, session }
    }

    /// Launch a fresh browser, run the retailer and release the browser.
    pub async fn run(&self, sink: &dyn RecordSink, date: NaiveDate) -> Result<RunReport> {
        self.profile.validate().map_err(ShelfError::Config)?;

        let browser = BrowserSession::launch(self.session).await?;
        let result = self.run_on_page(browser.page(), sink, date).await;
        browser.close().await;
        result
    }

    /// Run every stage against an already prepared page.
    pub async fn run_on_page(
        &self,
        page: &dyn PageDriver,
        sink: &dyn RecordSink,
        date: NaiveDate,
    ) -> Result<RunReport> {
        let profile = self.profile;
        info!("Starting run for {}", profile.display_title());

        if !profile.home_url.is_empty() {
            match page.goto(&profile.home_url).await {
                Ok(()) => {
                    if let Err(e) = page.wait_for_idle(self.session.navigation_timeout()).await {
                        debug!("Home page did not settle: {}", e);
                    }
                }
                Err(e) => warn!("Could not open {}: {}", profile.home_url, e),
            }
        }

        let location = LocationResolver::new(
            &profile.location,
            self.session.location_timeout(),
            self.session.step_delay(),
        )
        .resolve(page)
        .await;
        debug!("Location outcome: {:?}", location);

        let route = CatalogueNavigator::new(
            &profile.navigation,
            profile.deep_link.as_deref(),
            &profile.cards,
            self.session.navigation_timeout(),
            self.session.step_delay(),
        )
        .navigate(page)
        .await?;

        let extractor = RecordExtractor::new(
            &profile.fields,
            profile.brand_prefix.as_deref(),
            self.base_url(),
        );
        let mut store = DedupStore::new();
        let convergence = ScrollEngine::new(&profile.scroll, &profile.cards)
            .run(page, &extractor, &mut store)
            .await;

        info!(
            "{}: {} unique products after {} rounds ({:?})",
            profile.display_title(),
            store.len(),
            convergence.state.total_rounds,
            convergence.reason
        );

        let records = store.into_records();
        let outcome = sink.persist(&profile.output_stem, date, &records)?;
        match &outcome {
            PersistOutcome::Written { path, rows } => {
                info!("Saved {} products to {}", rows, path.display())
            }
            PersistOutcome::SkippedEmpty { path } => {
                warn!("No products extracted; left {} untouched", path.display())
            }
        }

        Ok(RunReport {
            retailer: profile.name.clone(),
            location,
            route,
            convergence,
            outcome,
        })
    }

    fn base_url(&self) -> Option<Url> {
        [Some(self.profile.home_url.as_str()), self.profile.deep_link.as_deref()]
            .into_iter()
            .flatten()
            .find_map(|u| Url::parse(u).ok())
    }
}
