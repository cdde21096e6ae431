//! Scripted in-memory browser for tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::app::{Result, ShelfError};
use crate::scraper::driver::{ElementHandle, PageDriver, ScrollMetrics};

#[derive(Clone, Default)]
pub struct FakeElement {
    text: Option<String>,
    attrs: HashMap<String, String>,
    children: Vec<(String, FakeElement)>,
    failing: bool,
    clicks: Arc<AtomicUsize>,
    filled: Arc<Mutex<Vec<String>>>,
    entered: Arc<AtomicUsize>,
    reveals: Option<Arc<AtomicBool>>,
}

impl FakeElement {
    pub fn new(text: &str) -> Self {
        Self {
            text: Some(text.to_string()),
            ..Default::default()
        }
    }

    /// An element whose every operation errors, like a detached node.
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Default::default()
        }
    }

    pub fn with_attr(mut self, name: &str, value: &str) -> Self {
        self.attrs.insert(name.to_string(), value.to_string());
        self
    }

    pub fn with_child(mut self, selector: &str, child: FakeElement) -> Self {
        self.children.push((selector.to_string(), child));
        self
    }

    /// Clicking this element makes the page's product grid visible.
    pub fn revealing(mut self, flag: Arc<AtomicBool>) -> Self {
        self.reveals = Some(flag);
        self
    }

    pub fn clicks(&self) -> usize {
        self.clicks.load(Ordering::SeqCst)
    }

    pub fn filled(&self) -> Vec<String> {
        self.filled.lock().unwrap().clone()
    }

    pub fn enters(&self) -> usize {
        self.entered.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<()> {
        if self.failing {
            Err(ShelfError::Browser("node is detached".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl ElementHandle for FakeElement {
    async fn inner_text(&self) -> Result<Option<String>> {
        self.check()?;
        Ok(self.text.clone())
    }

    async fn attribute(&self, name: &str) -> Result<Option<String>> {
        self.check()?;
        Ok(self.attrs.get(name).cloned())
    }

    async fn find(&self, selector: &str) -> Result<Option<Box<dyn ElementHandle>>> {
        self.check()?;
        Ok(self
            .children
            .iter()
            .find(|(s, _)| s == selector)
            .map(|(_, c)| Box::new(c.clone()) as Box<dyn ElementHandle>))
    }

    async fn click(&self) -> Result<()> {
        self.check()?;
        self.clicks.fetch_add(1, Ordering::SeqCst);
        if let Some(flag) = &self.reveals {
            flag.store(true, Ordering::SeqCst);
        }
        Ok(())
    }

    async fn fill(&self, text: &str) -> Result<()> {
        self.check()?;
        self.filled.lock().unwrap().push(text.to_string());
        Ok(())
    }

    async fn press_enter(&self) -> Result<()> {
        self.check()?;
        self.entered.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn scroll_into_view(&self) -> Result<()> {
        self.check()
    }
}

/// A page with static elements plus a product grid that changes with every
/// scroll step.
pub struct FakePage {
    elements: HashMap<String, Vec<FakeElement>>,
    card_selector: String,
    frames: Vec<Vec<FakeElement>>,
    scrolls: AtomicUsize,
    grid_visible: Arc<AtomicBool>,
    reveal_on_goto: Option<String>,
    gotos: Mutex<Vec<String>>,
    fail_goto: bool,
}

impl FakePage {
    pub fn new() -> Self {
        Self {
            elements: HashMap::new(),
            card_selector: String::new(),
            frames: Vec::new(),
            scrolls: AtomicUsize::new(0),
            grid_visible: Arc::new(AtomicBool::new(true)),
            reveal_on_goto: None,
            gotos: Mutex::new(Vec::new()),
            fail_goto: false,
        }
    }

    pub fn with_elements(mut self, selector: &str, elements: Vec<FakeElement>) -> Self {
        self.elements.insert(selector.to_string(), elements);
        self
    }

    /// Cards visible under `selector`; frame `n` is shown after `n + 1`
    /// scroll steps (frame 0 also before the first scroll). The last frame
    /// repeats forever.
    pub fn with_grid(mut self, selector: &str, frames: Vec<Vec<FakeElement>>) -> Self {
        self.card_selector = selector.to_string();
        self.frames = frames;
        self
    }

    /// Hide the grid until something reveals it.
    pub fn hidden_grid(self) -> Self {
        self.grid_visible.store(false, Ordering::SeqCst);
        self
    }

    pub fn reveal_flag(&self) -> Arc<AtomicBool> {
        self.grid_visible.clone()
    }

    pub fn reveal_on_goto(mut self, url: &str) -> Self {
        self.reveal_on_goto = Some(url.to_string());
        self
    }

    pub fn failing_goto(mut self) -> Self {
        self.fail_goto = true;
        self
    }

    pub fn gotos(&self) -> Vec<String> {
        self.gotos.lock().unwrap().clone()
    }

    pub fn scrolls(&self) -> usize {
        self.scrolls.load(Ordering::SeqCst)
    }

    fn current_frame(&self) -> Vec<FakeElement> {
        if self.frames.is_empty() || !self.grid_visible.load(Ordering::SeqCst) {
            return Vec::new();
        }
        let step = self.scrolls.load(Ordering::SeqCst).saturating_sub(1);
        self.frames[step.min(self.frames.len() - 1)].clone()
    }
}

#[async_trait]
impl PageDriver for FakePage {
    async fn goto(&self, url: &str) -> Result<()> {
        self.gotos.lock().unwrap().push(url.to_string());
        if self.fail_goto {
            return Err(ShelfError::Navigation(format!("cannot reach {}", url)));
        }
        if self.reveal_on_goto.as_deref() == Some(url) {
            self.grid_visible.store(true, Ordering::SeqCst);
        }
        Ok(())
    }

    async fn wait_for_idle(&self, _timeout: Duration) -> Result<()> {
        Ok(())
    }

    async fn query_all(&self, selector: &str) -> Result<Vec<Box<dyn ElementHandle>>> {
        let found = if !self.card_selector.is_empty() && selector == self.card_selector {
            self.current_frame()
        } else {
            self.elements.get(selector).cloned().unwrap_or_default()
        };
        Ok(found
            .into_iter()
            .map(|e| Box::new(e) as Box<dyn ElementHandle>)
            .collect())
    }

    async fn scroll_container(
        &self,
        _containers: &[String],
        _fraction: f64,
    ) -> Result<ScrollMetrics> {
        let n = self.scrolls.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(ScrollMetrics {
            scroll_height: 10_000.0,
            scroll_top: 720.0 * n as f64,
            client_height: 800.0,
        })
    }
}

/// A product card with a name, a price and optionally a link.
pub fn product_card(name: &str, price: &str, href: Option<&str>) -> FakeElement {
    let mut card = FakeElement::new("")
        .with_child("div.name", FakeElement::new(name))
        .with_child("div.price", FakeElement::new(price));
    if let Some(href) = href {
        card = card.with_child("a", FakeElement::new("").with_attr("href", href));
    }
    card
}
