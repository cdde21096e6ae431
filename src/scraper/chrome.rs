use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::browser::{
    PermissionDescriptor, PermissionSetting, SetPermissionParams,
};
use chromiumoxide::cdp::browser_protocol::emulation::{
    SetGeolocationOverrideParams, SetLocaleOverrideParams,
};
use chromiumoxide::element::Element;
use chromiumoxide::error::CdpError;
use chromiumoxide::handler::viewport::Viewport;
use chromiumoxide::Page;
use futures::StreamExt;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::app::{Result, ShelfError};
use crate::scraper::config::SessionConfig;
use crate::scraper::driver::{ElementHandle, PageDriver, ScrollMetrics};

/// Run a browser call under a deadline.
async fn bounded<T, F>(limit: Duration, action: &str, fut: F) -> Result<T>
where
    F: Future<Output = std::result::Result<T, CdpError>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(ShelfError::browser(action, e)),
        Err(_) => Err(ShelfError::Timeout {
            action: action.to_string(),
            millis: limit.as_millis(),
        }),
    }
}

/// An isolated Chrome instance with one prepared tab.
///
/// Call [`close`](Self::close) when done. If the session is dropped instead
/// (for example while unwinding), the event handler task is aborted and
/// chromiumoxide kills the child process.
pub struct BrowserSession {
    browser: Browser,
    handler: JoinHandle<()>,
    page: ChromePage,
}

impl BrowserSession {
    /// Launch Chrome and prepare a tab with the configured fingerprint.
    pub async fn launch(config: &SessionConfig) -> Result<Self> {
        let mut builder = BrowserConfig::builder()
            .window_size(config.viewport_width, config.viewport_height)
            .viewport(viewport(config))
            .incognito();

        for arg in config.launch_args() {
            builder = builder.arg(arg);
        }

        if !config.headless {
            builder = builder.with_head();
        }

        let browser_config = builder
            .build()
            .map_err(|e| ShelfError::Browser(format!("Failed to build browser config: {}", e)))?;

        let (mut browser, mut handler) =
            tokio::time::timeout(config.navigation_timeout(), Browser::launch(browser_config))
                .await
                .map_err(|_| ShelfError::Timeout {
                    action: "launch browser".into(),
                    millis: config.navigation_timeout().as_millis(),
                })?
                .map_err(|e| {
                    ShelfError::Browser(format!(
                        "Failed to launch browser: {}. Is Chrome or Chromium installed and in PATH?",
                        e
                    ))
                })?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("Browser handler error: {}", e);
                }
            }
        });

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                let _ = browser.close().await;
                handler.abort();
                return Err(ShelfError::browser("open tab", e));
            }
        };

        let session = Self {
            browser,
            handler,
            page: ChromePage::new(page, config.action_timeout(), config.navigation_timeout()),
        };

        if let Err(e) = session.prepare(config).await {
            session.close().await;
            return Err(e);
        }

        info!(
            "Browser ready ({}x{}, locale {}, proxy {})",
            config.viewport_width,
            config.viewport_height,
            config.locale,
            config.proxy.as_deref().unwrap_or("none")
        );
        Ok(session)
    }

    async fn prepare(&self, config: &SessionConfig) -> Result<()> {
        let page = &self.page.page;
        let limit = config.action_timeout();

        if let Some(ref ua) = config.user_agent {
            bounded(limit, "set user agent", page.set_user_agent(ua.as_str())).await?;
        }

        let locale = SetLocaleOverrideParams::builder()
            .locale(config.locale.clone())
            .build();
        if let Err(e) = bounded(limit, "set locale", page.execute(locale)).await {
            // Some Chrome builds reject a second locale override; --lang still applies.
            warn!("{}", e);
        }

        bounded(
            limit,
            "grant geolocation",
            self.browser.execute(SetPermissionParams::new(
                PermissionDescriptor::new("geolocation"),
                PermissionSetting::Granted,
            )),
        )
        .await?;

        let geolocation = SetGeolocationOverrideParams::builder()
            .latitude(config.latitude)
            .longitude(config.longitude)
            .accuracy(100.0)
            .build();
        bounded(limit, "set geolocation", page.execute(geolocation)).await?;

        Ok(())
    }

    pub fn page(&self) -> &ChromePage {
        &self.page
    }

    /// Close the browser and reap its process.
    pub async fn close(mut self) {
        if let Err(e) = self.browser.close().await {
            debug!("Browser close failed: {}", e);
        }
        if let Err(e) = self.browser.wait().await {
            debug!("Browser wait failed: {}", e);
        }
        debug!("Browser closed");
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        self.handler.abort();
    }
}

/// Emulated page viewport. Without it chromiumoxide emulates 800x600
/// whatever the window size.
pub fn viewport(config: &SessionConfig) -> Viewport {
    Viewport {
        width: config.viewport_width,
        height: config.viewport_height,
        ..Default::default()
    }
}

/// JavaScript that scrolls the first existing container by a fraction of
/// its visible height and reports the resulting position.
pub fn scroll_script(containers: &[String], fraction: f64) -> String {
    let selectors = serde_json::to_string(containers).unwrap_or_else(|_| "[]".to_string());
    format!(
        r#"
        (() => {{
            const selectors = {selectors};
            let el = null;
            for (const s of selectors) {{
                try {{ el = document.querySelector(s); }} catch (e) {{ el = null; }}
                if (el) break;
            }}
            el = el || document.scrollingElement || document.documentElement || document.body;
            if (!el) return {{ sh: 0, st: 0, ch: 0 }};
            const delta = Math.floor((el.clientHeight || window.innerHeight || 800) * {fraction});
            el.scrollTop = Math.min((el.scrollTop || 0) + delta, el.scrollHeight || 0);
            return {{ sh: el.scrollHeight || 0, st: el.scrollTop || 0, ch: el.clientHeight || 0 }};
        }})()
        "#
    )
}

const CLEAR_VALUE: &str = "function() { \
    this.value = ''; \
    this.dispatchEvent(new Event('input', { bubbles: true })); \
}";

/// chromiumoxide tab behind [`PageDriver`].
#[derive(Clone)]
pub struct ChromePage {
    page: Page,
    action_timeout: Duration,
    navigation_timeout: Duration,
}

impl ChromePage {
    pub fn new(page: Page, action_timeout: Duration, navigation_timeout: Duration) -> Self {
        Self {
            page,
            action_timeout,
            navigation_timeout,
        }
    }

    fn wrap(&self, elements: Vec<Element>) -> Vec<Box<dyn ElementHandle>> {
        elements
            .into_iter()
            .map(|element| {
                Box::new(ChromeElement {
                    element,
                    timeout: self.action_timeout,
                }) as Box<dyn ElementHandle>
            })
            .collect()
    }
}

#[async_trait]
impl PageDriver for ChromePage {
    async fn goto(&self, url: &str) -> Result<()> {
        bounded(self.navigation_timeout, "navigate", self.page.goto(url))
            .await
            .map_err(|e| ShelfError::Navigation(format!("{}: {}", url, e)))?;
        Ok(())
    }

    async fn wait_for_idle(&self, timeout: Duration) -> Result<()> {
        bounded(timeout, "wait for navigation", self.page.wait_for_navigation()).await?;
        Ok(())
    }

    async fn query_all(&self, selector: &str) -> Result<Vec<Box<dyn ElementHandle>>> {
        let elements = bounded(
            self.action_timeout,
            "query elements",
            self.page.find_elements(selector),
        )
        .await?;
        Ok(self.wrap(elements))
    }

    async fn scroll_container(
        &self,
        containers: &[String],
        fraction: f64,
    ) -> Result<ScrollMetrics> {
        let script = scroll_script(containers, fraction);
        let result = bounded(self.action_timeout, "scroll", self.page.evaluate(script)).await?;
        Ok(result.into_value::<ScrollMetrics>()?)
    }
}

struct ChromeElement {
    element: Element,
    timeout: Duration,
}

#[async_trait]
impl ElementHandle for ChromeElement {
    async fn inner_text(&self) -> Result<Option<String>> {
        bounded(self.timeout, "read text", self.element.inner_text()).await
    }

    async fn attribute(&self, name: &str) -> Result<Option<String>> {
        bounded(self.timeout, "read attribute", self.element.attribute(name)).await
    }

    async fn find(&self, selector: &str) -> Result<Option<Box<dyn ElementHandle>>> {
        let mut found = bounded(
            self.timeout,
            "query child",
            self.element.find_elements(selector),
        )
        .await?;
        if found.is_empty() {
            return Ok(None);
        }
        Ok(Some(Box::new(ChromeElement {
            element: found.swap_remove(0),
            timeout: self.timeout,
        })))
    }

    async fn click(&self) -> Result<()> {
        bounded(self.timeout, "click", self.element.click()).await?;
        Ok(())
    }

    async fn fill(&self, text: &str) -> Result<()> {
        bounded(self.timeout, "focus", self.element.focus()).await?;
        bounded(self.timeout, "clear", self.element.call_js_fn(CLEAR_VALUE, false)).await?;
        bounded(self.timeout, "type", self.element.type_str(text)).await?;
        Ok(())
    }

    async fn press_enter(&self) -> Result<()> {
        bounded(self.timeout, "press Enter", self.element.press_key("Enter")).await?;
        Ok(())
    }

    async fn scroll_into_view(&self) -> Result<()> {
        bounded(self.timeout, "scroll into view", self.element.scroll_into_view()).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scroll_script_embeds_selectors_and_fraction() {
        let containers = vec!["#plpContainer".to_string(), "div[aria-label='grid']".to_string()];
        let script = scroll_script(&containers, 0.9);

        assert!(script.contains(r##"["#plpContainer","div[aria-label='grid']"]"##));
        assert!(script.contains("* 0.9)"));
        assert!(script.contains("document.scrollingElement"));
    }

    #[test]
    fn test_scroll_script_escapes_quotes() {
        let containers = vec![r#"div[data-x="a\"b"]"#.to_string()];
        let script = scroll_script(&containers, 0.5);
        assert!(script.contains(r#""div[data-x=\"a\\\"b\"]""#));
    }

    #[test]
    fn test_scroll_script_without_containers_uses_document() {
        let script = scroll_script(&[], 1.0);
        assert!(script.contains("const selectors = [];"));
    }

    #[test]
    fn test_viewport_follows_session_config() {
        let config = SessionConfig {
            viewport_width: 1440,
            viewport_height: 900,
            ..SessionConfig::default()
        };
        let viewport = viewport(&config);

        assert_eq!(viewport.width, 1440);
        assert_eq!(viewport.height, 900);
        assert!(!viewport.emulating_mobile);
        assert_ne!(viewport, Viewport::default());
    }

    #[test]
    fn test_scroll_metrics_from_script_shape() {
        let metrics: ScrollMetrics =
            serde_json::from_str(r#"{"sh": 4200, "st": 720, "ch": 800}"#).unwrap();
        assert_eq!(metrics.scroll_height, 4200.0);
        assert_eq!(metrics.scroll_top, 720.0);
        assert_eq!(metrics.client_height, 800.0);
    }
}
