//! Reaching the brand's product grid.
//!
//! The interactive route (search, then click through to the brand page) is
//! tried first. If any step misses, the retailer's deep link is loaded
//! instead. The navigator only returns `Ok` once product cards are visible.

use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::app::{Result, ShelfError};
use crate::scraper::driver::PageDriver;
use crate::scraper::locator::{find_first, TextMatch};
use crate::scraper::profile::NavigationProfile;

const GRID_POLL: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationRoute {
    Interactive,
    DeepLink,
}

pub struct CatalogueNavigator<'a> {
    profile: &'a NavigationProfile,
    deep_link: Option<&'a str>,
    card_selectors: &'a [String],
    idle_timeout: Duration,
    step_delay: Duration,
}

impl<'a> CatalogueNavigator<'a> {
    pub fn new(
        profile: &'a NavigationProfile,
        deep_link: Option<&'a str>,
        card_selectors: &'a [String],
        idle_timeout: Duration,
        step_delay: Duration,
    ) -> Self {
        Self {
            profile,
            deep_link,
            card_selectors,
            idle_timeout,
            step_delay,
        }
    }

    pub async fn navigate(&self, page: &dyn PageDriver) -> Result<NavigationRoute> {
        match self.interactive(page).await {
            Ok(()) => {
                if self.wait_for_grid(page).await {
                    info!("Reached catalogue via search");
                    return Ok(NavigationRoute::Interactive);
                }
                warn!("Interactive navigation finished but no product grid appeared");
            }
            Err(e) => warn!("Interactive navigation failed: {}", e),
        }

        let Some(url) = self.deep_link else {
            return Err(ShelfError::Navigation(
                "interactive navigation failed and no deep link is configured".into(),
            ));
        };

        info!("Falling back to deep link {}", url);
        page.goto(url).await?;
        if let Err(e) = page.wait_for_idle(self.idle_timeout).await {
            debug!("Deep link did not settle: {}", e);
        }

        if self.wait_for_grid(page).await {
            Ok(NavigationRoute::DeepLink)
        } else {
            Err(ShelfError::Navigation(format!(
                "no product grid on deep link {}",
                url
            )))
        }
    }

    async fn interactive(&self, page: &dyn PageDriver) -> Result<()> {
        if self.profile.search_inputs.is_empty() {
            return Err(ShelfError::Navigation("no search inputs configured".into()));
        }

        if let Some((_, trigger)) = find_first(page, &self.profile.search_triggers).await {
            if let Err(e) = trigger.click().await {
                debug!("Search trigger click failed: {}", e);
            }
            tokio::time::sleep(self.step_delay).await;
        }

        let inputs: Vec<TextMatch> = self
            .profile
            .search_inputs
            .iter()
            .map(|s| TextMatch::any(s))
            .collect();
        let (i, input) = find_first(page, &inputs)
            .await
            .ok_or_else(|| ShelfError::Navigation("search input not found".into()))?;

        input.click().await?;
        input.fill(&self.profile.search_term).await?;
        if self.profile.submit_search {
            input.press_enter().await?;
        }
        info!(
            "Searched for '{}' using {}",
            self.profile.search_term, inputs[i].selector
        );
        self.settle(page).await;

        for (n, alternatives) in self.profile.browse_steps.iter().enumerate() {
            let (_, target) = find_first(page, alternatives).await.ok_or_else(|| {
                ShelfError::Navigation(format!("browse step {} found nothing", n + 1))
            })?;
            target.click().await?;
            debug!("Browse step {} done", n + 1);
            self.settle(page).await;
        }

        Ok(())
    }

    async fn settle(&self, page: &dyn PageDriver) {
        if let Err(e) = page.wait_for_idle(self.idle_timeout).await {
            debug!("Page did not settle: {}", e);
        }
        tokio::time::sleep(self.step_delay).await;
    }

    /// Poll for any card selector until the grid timeout.
    async fn wait_for_grid(&self, page: &dyn PageDriver) -> bool {
        let deadline = Instant::now() + self.profile.grid_timeout();
        loop {
            for selector in self.card_selectors {
                if let Ok(cards) = page.query_all(selector).await {
                    if !cards.is_empty() {
                        debug!("Grid visible via {} ({} cards)", selector, cards.len());
                        return true;
                    }
                }
            }
            if Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(GRID_POLL).await;
        }
    }
}
