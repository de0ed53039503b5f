use thiserror::Error;

/// Failure of an external collaborator. The scheduler recovers from these by
/// skipping the cycle.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SourceError {
    #[error("{0} is unavailable")]
    Unavailable(String),
    #[error("{0} not found")]
    NotFound(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}
