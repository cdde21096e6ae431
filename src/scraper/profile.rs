//! Per-retailer configuration.
//!
//! One [`RetailerProfile`] carries everything that differs between
//! storefronts: URLs, the location and navigation flows, the scroll policy
//! and the locator chains for every field. The pipeline itself is shared.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::scraper::convergence::ConvergencePolicy;
use crate::scraper::locator::{Locator, TextMatch};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RetailerProfile {
    /// Short identifier used on the command line, e.g. "blinkit"
    pub name: String,
    pub display_name: String,
    pub home_url: String,
    /// Catalogue URL used when interactive navigation fails
    pub deep_link: Option<String>,
    /// Snapshot files are named `<output_stem>_<date>.csv`
    pub output_stem: String,
    /// Keep only products whose name starts with this (case-insensitive)
    pub brand_prefix: Option<String>,
    pub location: LocationProfile,
    pub navigation: NavigationProfile,
    pub scroll: ScrollProfile,
    /// Candidate product-card selectors, most specific first
    pub cards: Vec<String>,
    pub fields: FieldLocators,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LocationProfile {
    /// Value typed into the address field
    pub pincode: String,
    /// A suggestion is accepted if its text contains the pincode or any of these
    pub region_keywords: Vec<String>,
    /// Elements that open the location dialog
    pub triggers: Vec<TextMatch>,
    /// Candidate address inputs
    pub inputs: Vec<String>,
    /// Whether to press Enter after typing the pincode
    pub submit: bool,
    /// Candidate suggestion rows
    pub suggestions: Vec<String>,
    /// Tried after `suggestions` when no row matched the needles
    pub fallback_suggestions: Vec<TextMatch>,
    /// Buttons clicked after a suggestion, when present
    pub confirm: Vec<TextMatch>,
}

impl LocationProfile {
    pub fn is_configured(&self) -> bool {
        !self.pincode.is_empty() && !self.inputs.is_empty()
    }

    /// Text a suggestion must contain one of.
    pub fn suggestion_needles(&self) -> Vec<String> {
        let mut needles = vec![self.pincode.clone()];
        needles.extend(self.region_keywords.iter().cloned());
        needles.retain(|n| !n.is_empty());
        needles
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NavigationProfile {
    pub search_term: String,
    /// Elements that focus or reveal the search box
    pub search_triggers: Vec<TextMatch>,
    pub search_inputs: Vec<String>,
    /// Whether to press Enter after typing the search term
    pub submit_search: bool,
    /// Clicks from search results to the brand catalogue. Each step lists
    /// alternatives; every step must succeed.
    pub browse_steps: Vec<Vec<TextMatch>>,
    /// How long to wait for the grid to appear, in milliseconds
    pub grid_timeout_ms: u64,
}

impl Default for NavigationProfile {
    fn default() -> Self {
        Self {
            search_term: String::new(),
            search_triggers: Vec::new(),
            search_inputs: Vec::new(),
            submit_search: true,
            browse_steps: Vec::new(),
            grid_timeout_ms: 15_000,
        }
    }
}

impl NavigationProfile {
    pub fn grid_timeout(&self) -> Duration {
        Duration::from_millis(self.grid_timeout_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrollProfile {
    /// Scrollable grid containers, most specific first
    pub containers: Vec<String>,
    /// "Load more" affordances clicked when present
    pub load_more: Vec<TextMatch>,
    /// Rounds without growth before the grid counts as exhausted
    pub stable_threshold: u32,
    /// Hard cap on scroll rounds
    pub max_total_rounds: u32,
    /// Wait after each scroll for rendering, in milliseconds
    pub settle_ms: u64,
    /// Fraction of the container's visible height advanced per round
    pub scroll_fraction: f64,
    /// Also scroll the last visible card into view every round
    pub scroll_last_card: bool,
}

impl Default for ScrollProfile {
    fn default() -> Self {
        Self {
            containers: Vec::new(),
            load_more: default_load_more(),
            stable_threshold: 5,
            max_total_rounds: 120,
            settle_ms: 900,
            scroll_fraction: 0.9,
            scroll_last_card: false,
        }
    }
}

impl ScrollProfile {
    pub fn policy(&self) -> ConvergencePolicy {
        ConvergencePolicy {
            stable_threshold: self.stable_threshold,
            max_total_rounds: self.max_total_rounds,
        }
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }
}

fn default_load_more() -> Vec<TextMatch> {
    vec![
        TextMatch::containing("button", &["Show more"]),
        TextMatch::containing("button", &["Load more"]),
        TextMatch::containing("button", &["See more"]),
        TextMatch::any("[data-test-id='load-more']"),
    ]
}

/// Ordered locator chains for every record field.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldLocators {
    pub name: Vec<Locator>,
    pub current_price: Vec<Locator>,
    pub original_price: Vec<Locator>,
    pub discount: Vec<Locator>,
    pub size_or_unit: Vec<Locator>,
    pub product_url: Vec<Locator>,
    pub image_url: Vec<Locator>,
    /// Used when no size locator matches
    pub default_size: Option<String>,
}

impl RetailerProfile {
    /// Check the profile can drive a run.
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("retailer name is empty".into());
        }
        if self.output_stem.trim().is_empty() {
            return Err(format!("{}: output_stem is empty", self.name));
        }
        if self.home_url.trim().is_empty() && self.deep_link.is_none() {
            return Err(format!("{}: neither home_url nor deep_link is set", self.name));
        }
        if self.cards.is_empty() {
            return Err(format!("{}: no card selectors", self.name));
        }
        if self.fields.name.is_empty() {
            return Err(format!("{}: no name locators", self.name));
        }
        self.scroll
            .policy()
            .validate()
            .map_err(|e| format!("{}: {}", self.name, e))?;
        if !(self.scroll.scroll_fraction > 0.0 && self.scroll.scroll_fraction <= 1.0) {
            return Err(format!(
                "{}: scroll_fraction must be in (0, 1], got {}",
                self.name, self.scroll.scroll_fraction
            ));
        }
        Ok(())
    }

    pub fn display_title(&self) -> &str {
        if self.display_name.is_empty() {
            &self.name
        } else {
            &self.display_name
        }
    }

    /// Built-in profiles for the supported storefronts.
    pub fn builtin() -> Vec<Self> {
        vec![Self::blinkit(), Self::zepto(), Self::instamart()]
    }

    pub fn blinkit() -> Self {
        Self {
            name: "blinkit".into(),
            display_name: "Blinkit".into(),
            home_url: "https://blinkit.com/".into(),
            deep_link: Some(
                "https://blinkit.com/dc/?collection_filters=W3siYnJhbmRfaWQiOlsxNjIyOF19XQ%3D%3D\
                 &collection_name=Pepe+Jeans+Innerfashion"
                    .into(),
            ),
            output_stem: "blinkit_pepe".into(),
            brand_prefix: Some("pepe".into()),
            location: LocationProfile {
                pincode: "560012".into(),
                region_keywords: vec!["Bengaluru".into(), "Karnataka".into()],
                triggers: Vec::new(),
                inputs: vec![
                    r#"input[name="select-locality"]"#.into(),
                    "input[placeholder*='search delivery location' i]".into(),
                    "input.LocationSearchBox__InputSelect-sc-1k8u6a6-0".into(),
                    "input[type='text']".into(),
                ],
                submit: true,
                suggestions: vec![
                    "div.LocationSearchList__LocationDetailContainer-sc-93rfr7-1".into(),
                ],
                fallback_suggestions: vec![TextMatch::containing_all("div", &["560012", "India"])],
                confirm: Vec::new(),
            },
            navigation: NavigationProfile {
                search_term: "pepe".into(),
                search_triggers: vec![
                    TextMatch::any("div.SearchBar__AnimationWrapper-sc-16lps2d-1"),
                    TextMatch::any("div[role='search']"),
                ],
                search_inputs: vec![
                    "input[placeholder*='Search for' i]".into(),
                    "input.SearchBarContainer__Input-sc-hl8pft-3".into(),
                    "input[aria-label*='Search' i]".into(),
                    "input[type='search']".into(),
                ],
                submit_search: true,
                browse_steps: vec![vec![
                    TextMatch::containing("span", &["jeans innerfashion", "jeans inner fashion"]),
                    TextMatch::containing("div", &["Pepe"]),
                ]],
                grid_timeout_ms: 15_000,
            },
            scroll: ScrollProfile {
                containers: vec![
                    "#plpContainer".into(),
                    "div.BffPlpFeedContainer__ItemsContainer-sc-12wcdtn-2".into(),
                    "main".into(),
                ],
                stable_threshold: 5,
                max_total_rounds: 300,
                settle_ms: 900,
                ..Default::default()
            },
            cards: vec![
                "div[data-test-id='product-card']".into(),
                "a[href*='/product/']".into(),
                "div.tw-relative.tw-flex.tw-h-full.tw-flex-col.tw-items-start".into(),
                "div.c5SZXs.ccdFPa".into(),
            ],
            fields: FieldLocators {
                name: vec![
                    Locator::text("div.tw-text-300.tw-font-semibold"),
                    Locator::text("[data-test-id='product-name']"),
                    Locator::text("h3"),
                    Locator::text("h4"),
                    Locator::text("span.tw-text-400.tw-font-semibold"),
                    Locator::attr("img", "alt"),
                ],
                current_price: vec![
                    Locator::text("[data-test-id='current-price']"),
                    Locator::text("div.tw-text-200.tw-font-semibold"),
                    Locator::text("div[class*='price']"),
                    Locator::text("p[class*='price']"),
                ],
                original_price: vec![
                    Locator::text("[data-test-id='original-price']"),
                    Locator::text("div.tw-text-200.tw-font-regular"),
                    Locator::text("div[class*='mrp']"),
                    Locator::text("p[class*='mrp']"),
                ],
                discount: vec![
                    Locator::text("[data-test-id='discount']"),
                    Locator::text("div.tw-text-050"),
                    Locator::text("div[class*='discount']"),
                    Locator::text("span[class*='discount']"),
                ],
                size_or_unit: vec![
                    Locator::text("div.tw-text-200.tw-font-medium"),
                    Locator::text("[data-test-id='product-variant']"),
                ],
                product_url: vec![
                    Locator::own_attr("href"),
                    Locator::attr("a[href*='/product/']", "href"),
                ],
                image_url: vec![
                    Locator::attr("img", "src"),
                    Locator::attr("img", "data-src"),
                    Locator::attr("img", "data-lazy-src"),
                ],
                default_size: None,
            },
        }
    }

    pub fn zepto() -> Self {
        Self {
            name: "zepto".into(),
            display_name: "Zepto".into(),
            home_url: "https://www.zeptonow.com/".into(),
            deep_link: None,
            output_stem: "zepto_pepe".into(),
            brand_prefix: Some("pepe".into()),
            location: LocationProfile {
                pincode: "560012".into(),
                region_keywords: vec!["Bengaluru".into(), "Bangalore".into()],
                triggers: vec![TextMatch::any("button[aria-label='Select Location']")],
                inputs: vec!["input[placeholder='Search a new address']".into()],
                submit: false,
                suggestions: vec!["div.ck03O3 div.c4ZmYS".into()],
                fallback_suggestions: Vec::new(),
                confirm: vec![TextMatch::any("button[data-testid='location-confirm-btn']")],
            },
            navigation: NavigationProfile {
                search_term: "pepe".into(),
                search_triggers: vec![TextMatch::any("span [data-testid='searchBar']")],
                search_inputs: vec!["input[placeholder='Search for over 5000 products']".into()],
                submit_search: false,
                browse_steps: vec![
                    vec![TextMatch::any("li[id^='pepe jeans']")],
                    vec![TextMatch::any("img[alt^='Pepe Jeans']")],
                    vec![TextMatch::containing("p.font-medium", &["Pepe Jeans"])],
                ],
                grid_timeout_ms: 15_000,
            },
            scroll: ScrollProfile {
                containers: vec![
                    "div:has(> div.c5SZXs.ccdFPa)".into(),
                    "div[aria-label='product-grid']".into(),
                    "div[data-test-id='product-grid']".into(),
                    "main".into(),
                ],
                stable_threshold: 6,
                max_total_rounds: 120,
                settle_ms: 800,
                scroll_last_card: true,
                ..Default::default()
            },
            cards: vec!["div.c5SZXs.ccdFPa".into()],
            fields: FieldLocators {
                name: vec![
                    Locator::text("div[data-slot-id='ProductName'] span"),
                    Locator::attr("img", "alt"),
                ],
                current_price: vec![Locator::text("div[data-slot-id='Price'] p:first-child")],
                original_price: vec![Locator::text("div[data-slot-id='Price'] p:last-child")],
                discount: vec![Locator::text("div.c5aJJW span:last-child")],
                size_or_unit: vec![Locator::text("div[data-slot-id='PackSize'] span")],
                product_url: vec![
                    Locator::own_attr("href"),
                    Locator::attr("a[href*='/pn/']", "href"),
                ],
                image_url: vec![Locator::attr("img", "src")],
                default_size: Some("1 unit".into()),
            },
        }
    }

    pub fn instamart() -> Self {
        Self {
            name: "instamart".into(),
            display_name: "Instamart".into(),
            home_url: "https://www.swiggy.com/instamart".into(),
            deep_link: None,
            output_stem: "instamart_pepe".into(),
            brand_prefix: None,
            location: LocationProfile {
                pincode: "560012".into(),
                region_keywords: vec!["Bengaluru".into(), "Bangalore".into()],
                triggers: vec![TextMatch::any("div.sc-aXZVg.jubfzr.tDEYY")],
                inputs: vec!["input._1wkJd".into()],
                submit: true,
                suggestions: vec!["div._11n32 div.sc-aXZVg.gPfbij".into()],
                fallback_suggestions: Vec::new(),
                confirm: vec![
                    TextMatch::containing("button", &["Confirm Location"]),
                    TextMatch::any("div.sc-aXZVg.dsXDwT"),
                ],
            },
            navigation: NavigationProfile {
                search_term: "pepe".into(),
                search_triggers: vec![TextMatch::any("div._1AaZg")],
                search_inputs: vec![
                    "input[data-testid='search-page-header-search-bar-input']".into(),
                ],
                submit_search: false,
                browse_steps: vec![
                    vec![TextMatch::any("div.sc-aXZVg.gctPCj._5MSn4")],
                    vec![TextMatch::any("img._16I1D")],
                    vec![TextMatch::any("span[data-testid='brand-cta-text']")],
                ],
                grid_timeout_ms: 15_000,
            },
            scroll: ScrollProfile {
                containers: Vec::new(),
                stable_threshold: 5,
                max_total_rounds: 150,
                settle_ms: 1000,
                scroll_last_card: true,
                ..Default::default()
            },
            cards: vec!["div[data-testid='default_container_ux4']".into()],
            fields: FieldLocators {
                name: vec![
                    Locator::text("div.byAowK._1sPB0"),
                    Locator::text("div.novMV"),
                    Locator::attr("img", "alt"),
                ],
                current_price: vec![Locator::text("div[data-testid='item-offer-price']")],
                original_price: vec![Locator::text("div[data-testid='item-mrp-price']")],
                discount: vec![Locator::text("div[data-testid='offer-text']")],
                size_or_unit: vec![
                    Locator::text("div[aria-label*='Small']"),
                    Locator::text("div[aria-label*='Medium']"),
                    Locator::text("div[aria-label*='Large']"),
                ],
                product_url: vec![Locator::attr("a", "href")],
                image_url: vec![Locator::attr("img", "src")],
                default_size: None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_profiles_validate() {
        for profile in RetailerProfile::builtin() {
            profile.validate().unwrap();
        }
    }

    #[test]
    fn test_builtin_names_unique() {
        let profiles = RetailerProfile::builtin();
        let mut names: Vec<_> = profiles.iter().map(|p| p.name.as_str()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), profiles.len());
    }

    #[test]
    fn test_validate_rejects_missing_cards() {
        let mut profile = RetailerProfile::zepto();
        profile.cards.clear();
        assert!(profile.validate().unwrap_err().contains("card"));
    }

    #[test]
    fn test_validate_rejects_zero_threshold() {
        let mut profile = RetailerProfile::blinkit();
        profile.scroll.stable_threshold = 0;
        assert!(profile.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_fraction() {
        let mut profile = RetailerProfile::blinkit();
        profile.scroll.scroll_fraction = 1.5;
        assert!(profile.validate().is_err());
    }

    #[test]
    fn test_suggestion_needles_include_pincode() {
        let profile = RetailerProfile::blinkit();
        let needles = profile.location.suggestion_needles();
        assert_eq!(needles[0], "560012");
        assert!(needles.contains(&"Bengaluru".to_string()));
    }

    #[test]
    fn test_display_title_falls_back_to_name() {
        let profile = RetailerProfile {
            name: "bigbasket".into(),
            ..Default::default()
        };
        assert_eq!(profile.display_title(), "bigbasket");
        assert_eq!(RetailerProfile::zepto().display_title(), "Zepto");
    }

    #[test]
    fn test_partial_profile_uses_defaults() {
        let profile: RetailerProfile = toml::from_str(
            r#"
name = "bigbasket"
home_url = "https://www.bigbasket.com/"
output_stem = "bigbasket_pepe"
cards = ["div.product"]

[fields]
name = ["h3"]
"#,
        )
        .unwrap();
        assert_eq!(profile.scroll.stable_threshold, 5);
        assert_eq!(profile.scroll.load_more.len(), 4);
        assert!(profile.navigation.submit_search);
        profile.validate().unwrap();
    }
}
