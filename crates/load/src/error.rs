use thiserror::Error;

use reelcheck_common::CommonError;

pub type LoadResult<T> = std::result::Result<T, LoadError>;

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Invalid load profile: {0}")]
    InvalidProfile(String),

    #[error("Configuration error: {0}")]
    Config(#[from] CommonError),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid endpoint: {0}")]
    Url(#[from] url::ParseError),
}
