//! Unified error handling for searchgate-core

use thiserror::Error;

/// Core error type for searchgate-core
#[derive(Error, Debug)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Configuration error: {0}")]
    Config(String),

    /// Bad admin input, rejected at the registry boundary
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// No active provider is registered
    #[error("No active search providers")]
    NoProviders,

    /// Every candidate provider is over quota
    #[error("Rate limit exceeded for all search providers")]
    QuotaExceeded { retry_after_secs: Option<u64> },

    /// Network-level failure reaching the chosen provider
    #[error("Upstream request failed: {0}")]
    UpstreamUnreachable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for searchgate-core
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create an authentication error
    pub fn auth(msg: impl Into<String>) -> Self {
        Error::Auth(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Error::Validation(msg.into())
    }

    /// Create a not found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Error::NotFound(msg.into())
    }

    /// Create an upstream unreachable error
    pub fn upstream(msg: impl Into<String>) -> Self {
        Error::UpstreamUnreachable(msg.into())
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Error::Internal(msg.into())
    }

    /// HTTP status code this error surfaces as
    pub fn status_code(&self) -> u16 {
        match self {
            Error::Validation(_) => 400,
            Error::Auth(_) => 401,
            Error::NotFound(_) | Error::NoProviders => 404,
            Error::QuotaExceeded { .. } => 429,
            Error::UpstreamUnreachable(_) => 502,
            _ => 500,
        }
    }

    /// Retry hint carried by a quota rejection
    pub fn retry_after_secs(&self) -> Option<u64> {
        match self {
            Error::QuotaExceeded { retry_after_secs } => *retry_after_secs,
            _ => None,
        }
    }
}
