use thiserror::Error;

/// Configuration problems caught before any request is made.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("both age and tags not specified")]
    MissingCriteria,
    #[error("invalid tag: {0}")]
    InvalidTag(String),
}
