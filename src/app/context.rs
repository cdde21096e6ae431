use std::path::PathBuf;
use std::sync::Arc;

use crate::app::error::{Result, ShelfError};
use crate::config::Config;
use crate::scraper::RetailerProfile;
use crate::store::CsvSink;

pub struct AppContext {
    pub config: Config,
    pub sink: Arc<CsvSink>,
}

impl AppContext {
    /// Load configuration (default path unless `config_path` is given) and
    /// apply command-line overrides.
    pub fn new(config_path: Option<PathBuf>, output_dir: Option<PathBuf>) -> Result<Self> {
        let mut config = match config_path {
            Some(path) => Config::load_from(&path),
            None => Config::load(),
        }
        .map_err(|e| ShelfError::Config(e.to_string()))?;

        if let Some(dir) = output_dir {
            config.output.dir = dir;
        }

        Ok(Self::with_config(config))
    }

    pub fn with_config(config: Config) -> Self {
        let sink = Arc::new(CsvSink::new(config.output.dir.clone()));
        Self { config, sink }
    }

    pub fn retailer(&self, name: &str) -> Result<&RetailerProfile> {
        self.config
            .retailer(name)
            .ok_or_else(|| ShelfError::UnknownRetailer(name.to_string()))
    }

    /// One named retailer, or all of them in configured order.
    pub fn select_retailers(&self, name: Option<&str>) -> Result<Vec<&RetailerProfile>> {
        match name {
            Some(name) => Ok(vec![self.retailer(name)?]),
            None => Ok(self.config.retailers.iter().collect()),
        }
    }
}
