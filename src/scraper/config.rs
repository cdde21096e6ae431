use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Browser session settings shared by every retailer run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Whether to run the browser in headless mode (default: true)
    pub headless: bool,

    /// Viewport width in pixels (default: 1280)
    pub viewport_width: u32,

    /// Viewport height in pixels (default: 800)
    pub viewport_height: u32,

    /// Locale reported to the storefront (default: "en-IN")
    pub locale: String,

    /// Latitude of the target delivery region
    pub latitude: f64,

    /// Longitude of the target delivery region
    pub longitude: f64,

    /// User agent string to use
    pub user_agent: Option<String>,

    /// Proxy endpoint, e.g. "http://127.0.0.1:8080"
    pub proxy: Option<String>,

    /// Timeout for a single browser call in milliseconds (default: 10000)
    pub action_timeout_ms: u64,

    /// Page navigation timeout in seconds (default: 120)
    pub navigation_timeout_secs: u64,

    /// Upper bound on the whole location flow in milliseconds (default: 15000)
    pub location_timeout_ms: u64,

    /// Pause between UI steps in milliseconds (default: 600)
    pub step_delay_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            headless: true,
            viewport_width: 1280,
            viewport_height: 800,
            locale: "en-IN".to_string(),
            latitude: 12.9716,
            longitude: 77.5946,
            user_agent: Some(
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36"
                    .to_string(),
            ),
            proxy: None,
            action_timeout_ms: 10_000,
            navigation_timeout_secs: 120,
            location_timeout_ms: 15_000,
            step_delay_ms: 600,
        }
    }
}

impl SessionConfig {
    pub fn action_timeout(&self) -> Duration {
        Duration::from_millis(self.action_timeout_ms)
    }

    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_secs(self.navigation_timeout_secs)
    }

    pub fn location_timeout(&self) -> Duration {
        Duration::from_millis(self.location_timeout_ms)
    }

    pub fn step_delay(&self) -> Duration {
        Duration::from_millis(self.step_delay_ms)
    }

    /// Settings for tests and dry runs: no pauses, short waits.
    pub fn instant() -> Self {
        Self {
            action_timeout_ms: 50,
            navigation_timeout_secs: 1,
            location_timeout_ms: 0,
            step_delay_ms: 0,
            ..Default::default()
        }
    }

    /// Extra Chrome command-line flags derived from these settings.
    pub fn launch_args(&self) -> Vec<String> {
        let mut args = vec![
            "--no-sandbox".to_string(),
            "--disable-setuid-sandbox".to_string(),
            "--disable-gpu".to_string(),
            "--disable-dev-shm-usage".to_string(),
            format!("--lang={}", self.locale),
        ];
        if let Some(ref proxy) = self.proxy {
            args.push(format!("--proxy-server={}", proxy));
        }
        args
    }
}
