//! Configuration management for shelfscan.
//!
//! Configuration is read from `~/.config/shelfscan/config.toml` at startup.
//! If the file doesn't exist, a default configuration with comments is created.
//! When no `[[retailers]]` are configured the built-in storefront profiles are
//! used.

use std::collections::HashSet;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::scraper::profile::RetailerProfile;
use crate::scraper::SessionConfig;

/// Main configuration struct.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub session: SessionConfig,
    pub output: OutputConfig,
    pub retailers: Vec<RetailerProfile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            session: SessionConfig::default(),
            output: OutputConfig::default(),
            retailers: RetailerProfile::builtin(),
        }
    }
}

/// Where snapshots and benchmark data live.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory for `<stem>_<date>.csv` snapshots
    pub dir: PathBuf,

    /// JSON object mapping product name to benchmark price
    pub benchmarks: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("output"),
            benchmarks: PathBuf::from("benchmarks.json"),
        }
    }
}

impl Config {
    /// Load configuration from the default path.
    ///
    /// If the config file doesn't exist, creates a default one with comments.
    /// If the config file exists but is invalid, returns an error.
    /// Missing fields in the config file will use default values.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::default_config_path()?;

        if !config_path.exists() {
            Self::create_default_config(&config_path)?;
            return Ok(Self::default());
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from an explicit path, which must exist.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Get the default config file path: `~/.config/shelfscan/config.toml`
    pub fn default_config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join("shelfscan").join("config.toml"))
    }

    /// Every retailer must be runnable and uniquely named.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for retailer in &self.retailers {
            retailer.validate().map_err(ConfigError::Invalid)?;
            if !seen.insert(retailer.name.to_lowercase()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate retailer name: {}",
                    retailer.name
                )));
            }
        }
        Ok(())
    }

    /// Look up a retailer by name, ignoring case.
    pub fn retailer(&self, name: &str) -> Option<&RetailerProfile> {
        self.retailers
            .iter()
            .find(|r| r.name.eq_ignore_ascii_case(name.trim()))
    }

    /// Create a default config file with comments.
    fn create_default_config(path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let mut file = fs::File::create(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        file.write_all(Self::default_config_content().as_bytes())
            .map_err(|e| ConfigError::Io {
                path: path.to_path_buf(),
                source: e,
            })?;

        Ok(())
    }

    /// Generate the default config file content with comments.
    fn default_config_content() -> String {
        r##"# shelfscan configuration
#
# Relative paths are resolved against the working directory.
# Leave out [[retailers]] to use the built-in profiles (blinkit, zepto,
# instamart). Declaring any [[retailers]] table replaces all of them.

[session]
# Run browser in headless mode (no visible window)
headless = true

# Browser window size
viewport_width = 1280
viewport_height = 800

# Locale and geolocation reported to the storefront
locale = "en-IN"
latitude = 12.9716
longitude = 77.5946

# Optional proxy, e.g. "http://127.0.0.1:8080"
# proxy = "http://127.0.0.1:8080"

# Timeout for a single browser call (milliseconds)
action_timeout_ms = 10000

# Page navigation timeout (seconds)
navigation_timeout_secs = 120

# Upper bound on the whole location flow (milliseconds)
location_timeout_ms = 15000

# Pause between UI steps (milliseconds)
step_delay_ms = 600

[output]
# Snapshot directory: <dir>/<stem>_<YYYY-MM-DD>.csv
dir = "output"

# Benchmark prices keyed by product name
benchmarks = "benchmarks.json"

# Example retailer. Locators are tried in order; a plain string reads the
# text of a descendant, a table reads an attribute.
#
# [[retailers]]
# name = "blinkit"
# home_url = "https://blinkit.com/"
# deep_link = "https://blinkit.com/dc/?collection_name=Pepe+Jeans+Innerfashion"
# output_stem = "blinkit_pepe"
# brand_prefix = "pepe"
# cards = ["div[data-test-id='product-card']", "a[href*='/product/']"]
#
# [retailers.location]
# pincode = "560012"
# region_keywords = ["Bengaluru", "Karnataka"]
# inputs = ["input[name=\"select-locality\"]", "input[type='text']"]
# submit = true
# suggestions = ["div.LocationSearchList__LocationDetailContainer-sc-93rfr7-1"]
# fallback_suggestions = [{ selector = "div", requires = ["560012", "India"] }]
#
# [retailers.navigation]
# search_term = "pepe"
# search_inputs = ["input[placeholder*='Search for' i]"]
# browse_steps = [[{ selector = "span", contains = ["jeans innerfashion"] }]]
#
# [retailers.scroll]
# containers = ["#plpContainer", "main"]
# stable_threshold = 5
# max_total_rounds = 300
# settle_ms = 900
#
# [retailers.fields]
# name = ["[data-test-id='product-name']", { selector = "img", attr = "alt" }]
# current_price = ["[data-test-id='current-price']"]
# product_url = [{ attr = "href" }, { selector = "a", attr = "href" }]
# image_url = [{ selector = "img", attr = "src" }]
"##
        .to_string()
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Failed to read/write config file at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scraper::locator::{Locator, TextMatch};
    use tempfile::TempDir;

    #[test]
    fn test_default_config_deserializes() {
        let content = Config::default_config_content();
        let config: Config = toml::from_str(&content).expect("Default config should be valid TOML");

        assert!(config.session.headless);
        assert_eq!(config.session.locale, "en-IN");
        assert_eq!(config.output.dir, PathBuf::from("output"));
        let names: Vec<_> = config.retailers.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["blinkit", "zepto", "instamart"]);
    }

    #[test]
    fn test_partial_config() {
        let content = r##"
[session]
headless = false
proxy = "http://127.0.0.1:8080"
"##;
        let config: Config = toml::from_str(content).expect("Partial config should work");

        assert!(!config.session.headless);
        assert_eq!(config.session.proxy.as_deref(), Some("http://127.0.0.1:8080"));
        assert_eq!(config.session.viewport_width, 1280);
        assert_eq!(config.retailers.len(), 3);
    }

    #[test]
    fn test_empty_config() {
        let config: Config = toml::from_str("").expect("Empty config should work");
        assert_eq!(config.output.benchmarks, PathBuf::from("benchmarks.json"));
        assert_eq!(config.retailers.len(), 3);
    }

    #[test]
    fn test_custom_retailer_replaces_builtins() {
        let content = r##"
[[retailers]]
name = "testmart"
home_url = "https://shop.example.com/"
output_stem = "testmart_pepe"
cards = ["div.card"]

[retailers.navigation]
browse_steps = [[{ selector = "span", contains = ["Pepe"] }, { selector = "div.brand" }]]

[retailers.scroll]
stable_threshold = 3

[retailers.fields]
name = ["h3", { selector = "img", attr = "alt" }]
product_url = [{ attr = "href" }]
"##;
        let config: Config = toml::from_str(content).unwrap();
        config.validate().unwrap();

        assert_eq!(config.retailers.len(), 1);
        let r = &config.retailers[0];
        assert_eq!(r.scroll.stable_threshold, 3);
        assert_eq!(r.scroll.max_total_rounds, 120);
        assert_eq!(r.fields.name, vec![Locator::text("h3"), Locator::attr("img", "alt")]);
        assert_eq!(r.fields.product_url, vec![Locator::own_attr("href")]);
        assert_eq!(
            r.navigation.browse_steps,
            vec![vec![
                TextMatch::containing("span", &["Pepe"]),
                TextMatch::any("div.brand")
            ]]
        );
    }

    #[test]
    fn test_duplicate_retailers_rejected() {
        let mut config = Config::default();
        config.retailers.push(RetailerProfile::zepto());
        config.retailers[3].name = "Blinkit".into();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_retailer_lookup_ignores_case() {
        let config = Config::default();
        assert_eq!(config.retailer(" Zepto ").unwrap().name, "zepto");
        assert!(config.retailer("bigbasket").is_none());
    }

    #[test]
    fn test_load_from_reports_parse_errors_with_path() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        fs::write(&path, "[session\nheadless = true").unwrap();

        match Config::load_from(&path) {
            Err(ConfigError::Parse { path: p, .. }) => assert_eq!(p, path),
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_load_from_missing_file() {
        let tmp = TempDir::new().unwrap();
        let err = Config::load_from(&tmp.path().join("nope.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_create_default_config_writes_loadable_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("shelfscan").join("config.toml");
        Config::create_default_config(&path).unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.session.step_delay_ms, 600);
    }
}
