//! Ordered locator fallbacks.
//!
//! Storefront markup changes between retailers and A/B buckets, so every
//! field is described by several candidate locators tried in order.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::app::Result;
use crate::scraper::driver::{ElementHandle, PageDriver};

/// Something that can pull one value out of a card.
#[async_trait]
pub trait LocatorStrategy: Send + Sync {
    /// The trimmed, non-empty value, or `None`. Never fails.
    async fn try_extract(&self, card: &dyn ElementHandle) -> Option<String>;
}

/// Declarative locator as written in the configuration file.
///
/// A bare string reads the text of the first matching descendant. A table
/// reads an attribute, either of a descendant (`selector` set) or of the card
/// itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Locator {
    Text(String),
    Attr {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        selector: Option<String>,
        attr: String,
    },
}

impl Locator {
    pub fn text(selector: &str) -> Self {
        Locator::Text(selector.to_string())
    }

    pub fn attr(selector: &str, attr: &str) -> Self {
        Locator::Attr {
            selector: Some(selector.to_string()),
            attr: attr.to_string(),
        }
    }

    pub fn own_attr(attr: &str) -> Self {
        Locator::Attr {
            selector: None,
            attr: attr.to_string(),
        }
    }

    async fn read(&self, card: &dyn ElementHandle) -> Result<Option<String>> {
        match self {
            Locator::Text(selector) => match card.find(selector).await? {
                Some(el) => el.inner_text().await,
                None => Ok(None),
            },
            Locator::Attr {
                selector: Some(selector),
                attr,
            } => match card.find(selector).await? {
                Some(el) => el.attribute(attr).await,
                None => Ok(None),
            },
            Locator::Attr {
                selector: None,
                attr,
            } => card.attribute(attr).await,
        }
    }
}

#[async_trait]
impl LocatorStrategy for Locator {
    async fn try_extract(&self, card: &dyn ElementHandle) -> Option<String> {
        match self.read(card).await {
            Ok(value) => non_blank(value),
            Err(e) => {
                debug!("Locator {:?} failed: {}", self, e);
                None
            }
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Ordered strategies for one field; the first value accepted wins.
#[derive(Default)]
pub struct FieldChain {
    strategies: Vec<Box<dyn LocatorStrategy>>,
}

impl FieldChain {
    pub fn new(locators: &[Locator]) -> Self {
        Self {
            strategies: locators
                .iter()
                .cloned()
                .map(|l| Box::new(l) as Box<dyn LocatorStrategy>)
                .collect(),
        }
    }

    pub fn push<S: LocatorStrategy + 'static>(&mut self, strategy: S) {
        self.strategies.push(Box::new(strategy));
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }

    pub async fn resolve(&self, card: &dyn ElementHandle) -> Option<String> {
        self.resolve_with(card, |v| Some(v.to_string())).await
    }

    /// Like [`resolve`](Self::resolve), but a candidate only wins if `accept`
    /// maps it to `Some`; otherwise the next strategy is tried.
    pub async fn resolve_with<F>(&self, card: &dyn ElementHandle, accept: F) -> Option<String>
    where
        F: Fn(&str) -> Option<String> + Send + Sync,
    {
        for strategy in &self.strategies {
            if let Some(value) = strategy.try_extract(card).await {
                if let Some(accepted) = accept(&value) {
                    return Some(accepted);
                }
            }
        }
        None
    }
}

/// A clickable element identified by selector and, optionally, its text.
///
/// With an empty `contains` list any element matching `selector` qualifies;
/// otherwise its text must contain one of the needles (case-insensitive).
/// Every entry of `requires` must appear as well.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextMatch {
    pub selector: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub contains: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub requires: Vec<String>,
}

impl TextMatch {
    pub fn any(selector: &str) -> Self {
        Self {
            selector: selector.to_string(),
            contains: Vec::new(),
            requires: Vec::new(),
        }
    }

    pub fn containing(selector: &str, needles: &[&str]) -> Self {
        Self {
            selector: selector.to_string(),
            contains: needles.iter().map(|n| n.to_string()).collect(),
            requires: Vec::new(),
        }
    }

    pub fn containing_all(selector: &str, needles: &[&str]) -> Self {
        Self {
            selector: selector.to_string(),
            contains: Vec::new(),
            requires: needles.iter().map(|n| n.to_string()).collect(),
        }
    }

    fn is_unfiltered(&self) -> bool {
        self.contains.is_empty() && self.requires.is_empty()
    }

    /// Whether `text` satisfies the needle list.
    pub fn accepts(&self, text: &str) -> bool {
        if self.is_unfiltered() {
            return true;
        }
        let text = text.to_lowercase();
        let found = |needle: &String| text.contains(&needle.to_lowercase());
        (self.contains.is_empty() || self.contains.iter().any(found))
            && self.requires.iter().all(found)
    }

    /// First element on the page matching selector and text.
    pub async fn find(&self, page: &dyn PageDriver) -> Result<Option<Box<dyn ElementHandle>>> {
        let candidates = page.query_all(&self.selector).await?;
        if self.is_unfiltered() {
            return Ok(candidates.into_iter().next());
        }

        for el in candidates {
            let text = el.inner_text().await.unwrap_or_default().unwrap_or_default();
            if self.accepts(&text) {
                return Ok(Some(el));
            }
        }
        Ok(None)
    }
}

/// First element found by any of `matches`, in order.
pub async fn find_first(
    page: &dyn PageDriver,
    matches: &[TextMatch],
) -> Option<(usize, Box<dyn ElementHandle>)> {
    for (i, m) in matches.iter().enumerate() {
        match m.find(page).await {
            Ok(Some(el)) => return Some((i, el)),
            Ok(None) => {}
            Err(e) => debug!("Lookup of {} failed: {}", m.selector, e),
        }
    }
    None
}
