//! Scroll convergence over a virtualized product grid.
//!
//! Each round scrolls, waits for rendering, recounts the visible cards and
//! extracts every one of them straight away: a virtualized list unmounts
//! cards that leave the viewport, so waiting until the end would lose them.
//! The round's card count then drives a small state machine that decides
//! when the grid has stopped growing.

use tracing::{debug, info, warn};

use crate::scraper::driver::{ElementHandle, PageDriver};
use crate::scraper::extractor::{Extraction, RecordExtractor};
use crate::scraper::profile::ScrollProfile;
use crate::store::DedupStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// The last round found more cards than any before it.
    Scrolling,
    /// The last round found no growth.
    Stable,
    /// Terminal: stable for long enough, or out of rounds.
    Exhausted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConvergencePolicy {
    pub stable_threshold: u32,
    pub max_total_rounds: u32,
}

impl ConvergencePolicy {
    pub fn validate(&self) -> Result<(), String> {
        if self.stable_threshold == 0 {
            return Err("stable_threshold must be at least 1".into());
        }
        if self.max_total_rounds == 0 {
            return Err("max_total_rounds must be at least 1".into());
        }
        Ok(())
    }
}

/// Counters owned by one run of the engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScrollState {
    pub best_card_count: usize,
    pub stable_rounds: u32,
    pub total_rounds: u32,
}

impl ScrollState {
    /// Fold one round's card count into the state.
    ///
    /// `stable_rounds` resets to 0 exactly when `card_count` is a new best,
    /// otherwise it grows by one.
    pub fn advance(self, card_count: usize, policy: &ConvergencePolicy) -> (ScrollState, Phase) {
        let total_rounds = self.total_rounds + 1;
        let (best_card_count, stable_rounds, mut phase) = if card_count > self.best_card_count {
            (card_count, 0, Phase::Scrolling)
        } else {
            (self.best_card_count, self.stable_rounds + 1, Phase::Stable)
        };

        if stable_rounds >= policy.stable_threshold || total_rounds >= policy.max_total_rounds {
            phase = Phase::Exhausted;
        }

        (
            ScrollState {
                best_card_count,
                stable_rounds,
                total_rounds,
            },
            phase,
        )
    }
}

/// Why the engine stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Converged,
    RoundLimit,
}

/// Summary of a finished convergence run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConvergenceReport {
    pub state: ScrollState,
    pub reason: StopReason,
    /// Cards handed to the extractor across all rounds
    pub cards_seen: usize,
    /// Cards dropped for a missing name or a failed brand check
    pub cards_discarded: usize,
}

/// Drives scroll rounds until the grid is exhausted.
pub struct ScrollEngine<'a> {
    scroll: &'a ScrollProfile,
    card_selectors: &'a [String],
}

impl<'a> ScrollEngine<'a> {
    pub fn new(scroll: &'a ScrollProfile, card_selectors: &'a [String]) -> Self {
        Self {
            scroll,
            card_selectors,
        }
    }

    /// Scroll `page` until the card count converges, extracting every
    /// visible card into `store` on every round.
    pub async fn run(
        &self,
        page: &dyn PageDriver,
        extractor: &RecordExtractor,
        store: &mut DedupStore,
    ) -> ConvergenceReport {
        let policy = self.scroll.policy();
        let mut state = ScrollState::default();
        let mut cards_seen = 0;
        let mut cards_discarded = 0;

        loop {
            match page
                .scroll_container(&self.scroll.containers, self.scroll.scroll_fraction)
                .await
            {
                Ok(m) => debug!(
                    "Scrolled to {:.0}/{:.0} (viewport {:.0})",
                    m.scroll_top, m.scroll_height, m.client_height
                ),
                Err(e) => warn!("Scroll step failed: {}", e),
            }

            self.click_load_more(page).await;
            tokio::time::sleep(self.scroll.settle()).await;

            let cards = self.visible_cards(page).await;
            let mut added = 0;
            for card in &cards {
                cards_seen += 1;
                match extractor.extract(card.as_ref()).await {
                    Extraction::Record(record) => {
                        if store.insert(record) {
                            added += 1;
                        }
                    }
                    Extraction::Discarded(reason) => {
                        cards_discarded += 1;
                        debug!("Card discarded: {:?}", reason);
                    }
                }
            }

            if self.scroll.scroll_last_card {
                if let Some(last) = cards.last() {
                    if let Err(e) = last.scroll_into_view().await {
                        debug!("Could not scroll last card into view: {}", e);
                    }
                }
            }

            let (next, phase) = state.advance(cards.len(), &policy);
            state = next;
            info!(
                "Scroll round {}: cards visible = {}, new = {}, unique = {}",
                state.total_rounds,
                cards.len(),
                added,
                store.len()
            );

            if phase == Phase::Exhausted {
                let reason = if state.stable_rounds >= policy.stable_threshold {
                    info!("No new products after {} stable rounds", state.stable_rounds);
                    StopReason::Converged
                } else {
                    warn!("Reached max scroll rounds ({})", policy.max_total_rounds);
                    StopReason::RoundLimit
                };
                return ConvergenceReport {
                    state,
                    reason,
                    cards_seen,
                    cards_discarded,
                };
            }
        }
    }

    /// Cards from the first selector that matches anything.
    async fn visible_cards(&self, page: &dyn PageDriver) -> Vec<Box<dyn ElementHandle>> {
        for selector in self.card_selectors {
            match page.query_all(selector).await {
                Ok(cards) if !cards.is_empty() => return cards,
                Ok(_) => {}
                Err(e) => debug!("Card query {} failed: {}", selector, e),
            }
        }
        Vec::new()
    }

    /// Every load-more locator gets its own click each round.
    async fn click_load_more(&self, page: &dyn PageDriver) {
        for affordance in &self.scroll.load_more {
            match affordance.find(page).await {
                Ok(Some(button)) => match button.click().await {
                    Ok(()) => debug!("Clicked load-more {}", affordance.selector),
                    Err(e) => debug!("Load-more click failed: {}", e),
                },
                Ok(None) => {}
                Err(e) => debug!("Load-more lookup {} failed: {}", affordance.selector, e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scraper::fake::{product_card, FakeElement, FakePage};
    use crate::scraper::locator::Locator;
    use crate::scraper::profile::FieldLocators;

    fn policy(stable: u32, max: u32) -> ConvergencePolicy {
        ConvergencePolicy {
            stable_threshold: stable,
            max_total_rounds: max,
        }
    }

    #[test]
    fn test_growth_resets_stable_rounds() {
        let p = policy(5, 100);
        let state = ScrollState {
            best_card_count: 3,
            stable_rounds: 2,
            total_rounds: 4,
        };
        let (next, phase) = state.advance(4, &p);
        assert_eq!(next.best_card_count, 4);
        assert_eq!(next.stable_rounds, 0);
        assert_eq!(next.total_rounds, 5);
        assert_eq!(phase, Phase::Scrolling);
    }

    #[test]
    fn test_equal_or_lower_count_increments_stable_rounds() {
        let p = policy(5, 100);
        let state = ScrollState {
            best_card_count: 5,
            stable_rounds: 1,
            total_rounds: 3,
        };
        let (same, phase) = state.advance(5, &p);
        assert_eq!(same.stable_rounds, 2);
        assert_eq!(same.best_card_count, 5);
        assert_eq!(phase, Phase::Stable);

        // A virtualized grid may shrink; that is not growth either.
        let (fewer, _) = same.advance(2, &p);
        assert_eq!(fewer.stable_rounds, 3);
        assert_eq!(fewer.best_card_count, 5);
    }

    #[test]
    fn test_exhausted_at_stable_threshold() {
        let p = policy(2, 100);
        let (s1, _) = ScrollState::default().advance(4, &p);
        let (s2, phase2) = s1.advance(4, &p);
        assert_eq!(phase2, Phase::Stable);
        let (_, phase3) = s2.advance(4, &p);
        assert_eq!(phase3, Phase::Exhausted);
    }

    #[test]
    fn test_exhausted_at_round_cap_even_while_growing() {
        let p = policy(5, 3);
        let mut state = ScrollState::default();
        let mut phase = Phase::Scrolling;
        for count in 1..=3 {
            (state, phase) = state.advance(count, &p);
        }
        assert_eq!(state.total_rounds, 3);
        assert_eq!(phase, Phase::Exhausted);
    }

    #[test]
    fn test_transition_always_halts_within_cap() {
        // Alternating growth never stabilises; the cap must still hold.
        let p = policy(4, 50);
        let mut state = ScrollState::default();
        let mut count = 0;
        loop {
            count += if state.total_rounds % 2 == 0 { 3 } else { 0 };
            let (next, phase) = state.advance(count, &p);
            state = next;
            assert!(state.total_rounds <= p.max_total_rounds);
            if phase == Phase::Exhausted {
                break;
            }
        }
        assert!(state.total_rounds <= 50);
    }

    #[test]
    fn test_policy_validation() {
        assert!(policy(0, 10).validate().is_err());
        assert!(policy(3, 0).validate().is_err());
        assert!(policy(3, 10).validate().is_ok());
    }

    fn fields() -> FieldLocators {
        FieldLocators {
            name: vec![Locator::text("div.name")],
            current_price: vec![Locator::text("div.price")],
            product_url: vec![Locator::attr("a", "href")],
            ..Default::default()
        }
    }

    fn scroll(stable: u32, max: u32) -> ScrollProfile {
        ScrollProfile {
            stable_threshold: stable,
            max_total_rounds: max,
            settle_ms: 0,
            ..Default::default()
        }
    }

    fn cards(n: usize) -> Vec<FakeElement> {
        (1..=n)
            .map(|i| product_card(&format!("Pepe Jeans Item {}", i), "₹299", None))
            .collect()
    }

    #[tokio::test]
    async fn test_synthetic_grid_halts_at_round_seven() {
        // 3 cards, then 5, then 5 for five more rounds.
        let mut first = cards(3);
        first[0] = product_card("Pepe Jeans Item 1", "₹199", None);
        let mut later = cards(5);
        later[0] = product_card("Pepe Jeans Item 1", "₹149", None);

        let frames = vec![first, later.clone(), later];
        let selectors = vec!["div.card".to_string()];
        let page = FakePage::new().with_grid("div.card", frames);
        let profile = scroll(5, 100);
        let extractor = RecordExtractor::new(&fields(), None, None);
        let mut store = DedupStore::new();

        let report = ScrollEngine::new(&profile, &selectors)
            .run(&page, &extractor, &mut store)
            .await;

        assert_eq!(report.state.total_rounds, 7);
        assert_eq!(report.state.best_card_count, 5);
        assert_eq!(report.reason, StopReason::Converged);
        assert_eq!(store.len(), 5);
        // First-write-wins: the price seen in round 1 is kept.
        assert_eq!(store.records()[0].current_price.as_deref(), Some("199"));
        assert_eq!(page.scrolls(), 7);
    }

    #[tokio::test]
    async fn test_cards_extracted_before_they_unmount() {
        // Each frame shows a different window of the list.
        let window = |range: std::ops::RangeInclusive<usize>| -> Vec<FakeElement> {
            range
                .map(|i| product_card(&format!("Pepe Jeans Item {}", i), "₹99", None))
                .collect()
        };
        let frames = vec![window(1..=4), window(3..=6), window(5..=8), window(5..=8)];
        let selectors = vec!["div.card".to_string()];
        let page = FakePage::new().with_grid("div.card", frames);
        let profile = scroll(2, 100);
        let extractor = RecordExtractor::new(&fields(), None, None);
        let mut store = DedupStore::new();

        ScrollEngine::new(&profile, &selectors)
            .run(&page, &extractor, &mut store)
            .await;

        assert_eq!(store.len(), 8);
        assert_eq!(store.records()[7].name, "Pepe Jeans Item 8");
    }

    #[tokio::test]
    async fn test_round_cap_bounds_run() {
        let frames: Vec<_> = (1..=50).map(cards).collect();
        let selectors = vec!["div.card".to_string()];
        let page = FakePage::new().with_grid("div.card", frames);
        let profile = scroll(5, 10);
        let extractor = RecordExtractor::new(&fields(), None, None);
        let mut store = DedupStore::new();

        let report = ScrollEngine::new(&profile, &selectors)
            .run(&page, &extractor, &mut store)
            .await;

        assert_eq!(report.state.total_rounds, 10);
        assert_eq!(report.reason, StopReason::RoundLimit);
        assert_eq!(store.len(), 10);
    }

    #[tokio::test]
    async fn test_card_selector_fallback() {
        let selectors = vec!["div.missing".to_string(), "div.card".to_string()];
        let page = FakePage::new().with_grid("div.card", vec![cards(2)]);
        let profile = scroll(1, 10);
        let extractor = RecordExtractor::new(&fields(), None, None);
        let mut store = DedupStore::new();

        let report = ScrollEngine::new(&profile, &selectors)
            .run(&page, &extractor, &mut store)
            .await;

        assert_eq!(report.state.best_card_count, 2);
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn test_bad_cards_skipped_round_continues() {
        let frame = vec![
            product_card("Pepe Jeans Item 1", "₹99", None),
            FakeElement::failing(),
            product_card("", "₹10", None),
            product_card("Jockey Brief", "₹10", None),
            product_card("Pepe Jeans Item 2", "₹99", None),
        ];
        let selectors = vec!["div.card".to_string()];
        let page = FakePage::new().with_grid("div.card", vec![frame]);
        let profile = scroll(1, 10);
        let extractor = RecordExtractor::new(&fields(), Some("pepe"), None);
        let mut store = DedupStore::new();

        let report = ScrollEngine::new(&profile, &selectors)
            .run(&page, &extractor, &mut store)
            .await;

        assert_eq!(store.len(), 2);
        assert_eq!(report.cards_discarded, 6);
        assert_eq!(report.cards_seen, 10);
    }

    #[tokio::test]
    async fn test_load_more_clicked_each_round() {
        let button = FakeElement::new("Load more");
        let page = FakePage::new()
            .with_grid("div.card", vec![cards(1)])
            .with_elements("button", vec![FakeElement::new("Add"), button.clone()]);
        let selectors = vec!["div.card".to_string()];
        let profile = scroll(2, 10);
        let extractor = RecordExtractor::new(&fields(), None, None);
        let mut store = DedupStore::new();

        let report = ScrollEngine::new(&profile, &selectors)
            .run(&page, &extractor, &mut store)
            .await;

        assert_eq!(report.state.total_rounds, 3);
        assert_eq!(button.clicks(), 3);
    }

    #[tokio::test]
    async fn test_every_load_more_affordance_is_tried() {
        let show = FakeElement::new("Show more");
        let see = FakeElement::new("See more");
        let tagged = FakeElement::new("");
        let page = FakePage::new()
            .with_grid("div.card", vec![cards(1)])
            .with_elements("button", vec![show.clone(), see.clone()])
            .with_elements("[data-test-id='load-more']", vec![tagged.clone()]);
        let selectors = vec!["div.card".to_string()];
        let profile = scroll(1, 10);
        let extractor = RecordExtractor::new(&fields(), None, None);
        let mut store = DedupStore::new();

        let report = ScrollEngine::new(&profile, &selectors)
            .run(&page, &extractor, &mut store)
            .await;

        assert_eq!(report.state.total_rounds, 2);
        assert_eq!(show.clicks(), 2);
        assert_eq!(see.clicks(), 2);
        assert_eq!(tagged.clicks(), 2);
    }

    #[tokio::test]
    async fn test_empty_grid_converges_without_records() {
        let selectors = vec!["div.card".to_string()];
        let page = FakePage::new();
        let profile = scroll(3, 10);
        let extractor = RecordExtractor::new(&fields(), None, None);
        let mut store = DedupStore::new();

        let report = ScrollEngine::new(&profile, &selectors)
            .run(&page, &extractor, &mut store)
            .await;

        assert_eq!(report.state.total_rounds, 3);
        assert!(store.is_empty());
    }
}
