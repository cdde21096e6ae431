//! Browser seam used by every pipeline stage.
//!
//! The pipeline only talks to these traits. [`ChromePage`](super::ChromePage)
//! implements them over chromiumoxide; tests use scripted fakes.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::app::Result;

/// A DOM element: a product card or anything found inside one.
#[async_trait]
pub trait ElementHandle: Send + Sync {
    /// Rendered text of the element.
    async fn inner_text(&self) -> Result<Option<String>>;

    async fn attribute(&self, name: &str) -> Result<Option<String>>;

    /// First descendant matching a CSS selector.
    async fn find(&self, selector: &str) -> Result<Option<Box<dyn ElementHandle>>>;

    async fn click(&self) -> Result<()>;

    /// Clear the element's value and type `text` into it.
    async fn fill(&self, text: &str) -> Result<()>;

    async fn press_enter(&self) -> Result<()>;

    async fn scroll_into_view(&self) -> Result<()>;
}

/// Scroll position of a container after a scroll step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScrollMetrics {
    #[serde(rename = "sh")]
    pub scroll_height: f64,
    #[serde(rename = "st")]
    pub scroll_top: f64,
    #[serde(rename = "ch")]
    pub client_height: f64,
}

/// One browser tab.
#[async_trait]
pub trait PageDriver: Send + Sync {
    async fn goto(&self, url: &str) -> Result<()>;

    /// Wait until in-flight navigation settles, at most `timeout`.
    async fn wait_for_idle(&self, timeout: Duration) -> Result<()>;

    /// All elements matching a CSS selector, in document order.
    async fn query_all(&self, selector: &str) -> Result<Vec<Box<dyn ElementHandle>>>;

    /// Advance the first existing container in `containers` (falling back to
    /// the document's scrolling element) by `fraction` of its visible height.
    async fn scroll_container(&self, containers: &[String], fraction: f64)
        -> Result<ScrollMetrics>;
}
