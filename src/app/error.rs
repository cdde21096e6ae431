use thiserror::Error;

#[derive(Error, Debug)]
pub enum ShelfError {
    #[error("Browser error: {0}")]
    Browser(String),

    #[error("Navigation failed: {0}")]
    Navigation(String),

    #[error("Timed out after {millis}ms: {action}")]
    Timeout { action: String, millis: u128 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Unknown retailer: {0}")]
    UnknownRetailer(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

impl ShelfError {
    /// Wrap a chromiumoxide error with a short description of the failed step.
    pub fn browser(action: &str, err: impl std::fmt::Display) -> Self {
        ShelfError::Browser(format!("{}: {}", action, err))
    }
}

pub type Result<T> = std::result::Result<T, ShelfError>;
