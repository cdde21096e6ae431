//! Best-effort delivery location targeting.
//!
//! Storefronts usually fall back to a serviceable default region, so nothing
//! here is allowed to fail the run: each step is tried until a shared
//! deadline and the outcome is only logged.

use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::scraper::driver::{ElementHandle, PageDriver};
use crate::scraper::locator::{find_first, TextMatch};
use crate::scraper::profile::LocationProfile;

const POLL_INTERVAL: Duration = Duration::from_millis(300);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocationOutcome {
    /// A matching suggestion was clicked.
    Confirmed,
    /// The pincode was typed but no suggestion matched.
    Submitted,
    /// No address input was found.
    Skipped,
}

pub struct LocationResolver<'a> {
    profile: &'a LocationProfile,
    timeout: Duration,
    step_delay: Duration,
}

impl<'a> LocationResolver<'a> {
    pub fn new(profile: &'a LocationProfile, timeout: Duration, step_delay: Duration) -> Self {
        Self {
            profile,
            timeout,
            step_delay,
        }
    }

    pub async fn resolve(&self, page: &dyn PageDriver) -> LocationOutcome {
        if !self.profile.is_configured() {
            debug!("No location flow configured");
            return LocationOutcome::Skipped;
        }

        let deadline = Instant::now() + self.timeout;

        if let Some((_, trigger)) = find_first(page, &self.profile.triggers).await {
            if let Err(e) = trigger.click().await {
                debug!("Location trigger click failed: {}", e);
            }
            tokio::time::sleep(self.step_delay).await;
        }

        let Some((selector, input)) = self.wait_for_input(page, deadline).await else {
            warn!("Could not find a location input; continuing with the default region");
            return LocationOutcome::Skipped;
        };

        if let Err(e) = self.type_pincode(input.as_ref()).await {
            warn!("Could not type pincode into {}: {}", selector, e);
            return LocationOutcome::Skipped;
        }
        info!("Typed pincode {} into {}", self.profile.pincode, selector);
        tokio::time::sleep(self.step_delay).await;

        if !self.pick_suggestion(page, deadline).await {
            warn!("Location suggestion not confirmed; continuing");
            return LocationOutcome::Submitted;
        }
        tokio::time::sleep(self.step_delay).await;

        // Confirmation dialogs differ between sessions; click whatever shows up.
        for confirm in &self.profile.confirm {
            if let Ok(Some(button)) = confirm.find(page).await {
                match button.click().await {
                    Ok(()) => debug!("Clicked {}", confirm.selector),
                    Err(e) => debug!("Confirm click on {} failed: {}", confirm.selector, e),
                }
                tokio::time::sleep(self.step_delay).await;
            }
        }

        info!("Location set to {}", self.profile.pincode);
        LocationOutcome::Confirmed
    }

    async fn type_pincode(&self, input: &dyn ElementHandle) -> crate::app::Result<()> {
        input.click().await?;
        input.fill(&self.profile.pincode).await?;
        if self.profile.submit {
            input.press_enter().await?;
        }
        Ok(())
    }

    async fn wait_for_input(
        &self,
        page: &dyn PageDriver,
        deadline: Instant,
    ) -> Option<(String, Box<dyn ElementHandle>)> {
        let inputs: Vec<TextMatch> = self
            .profile
            .inputs
            .iter()
            .map(|s| TextMatch::any(s))
            .collect();

        loop {
            if let Some((i, el)) = find_first(page, &inputs).await {
                return Some((inputs[i].selector.clone(), el));
            }
            if Instant::now() >= deadline {
                return None;
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn pick_suggestion(&self, page: &dyn PageDriver, deadline: Instant) -> bool {
        let needles = self.profile.suggestion_needles();
        let needles: Vec<&str> = needles.iter().map(String::as_str).collect();
        let suggestions: Vec<TextMatch> = self
            .profile
            .suggestions
            .iter()
            .map(|s| TextMatch::containing(s, &needles))
            .chain(self.profile.fallback_suggestions.iter().cloned())
            .collect();

        loop {
            if let Some((_, suggestion)) = find_first(page, &suggestions).await {
                match suggestion.click().await {
                    Ok(()) => return true,
                    Err(e) => debug!("Suggestion click failed: {}", e),
                }
            }
            if Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }
}
