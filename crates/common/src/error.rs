//! Error types shared by the reelcheck crates

use thiserror::Error;

/// Result type alias using [`CommonError`]
pub type CommonResult<T> = std::result::Result<T, CommonError>;

#[derive(Error, Debug)]
pub enum CommonError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
}

impl From<url::ParseError> for CommonError {
    fn from(e: url::ParseError) -> Self {
        CommonError::InvalidUrl {
            url: String::new(),
            reason: e.to_string(),
        }
    }
}
