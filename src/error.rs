//! Error types for the coin price service

use thiserror::Error;

/// Errors that can occur when fetching a coin from the upstream source
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Network request failed
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    /// Body could not be decoded as market info
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Provider answered with a non-success status
    #[error("Provider API error: {0}")]
    ApiError(String),

    /// Provider answered with an empty ticker list
    #[error("Empty response for {0}")]
    EmptyResponse(String),

    /// Timeout waiting for response
    #[error("Request timeout")]
    Timeout,
}

impl ProviderError {
    /// Creates an InvalidResponse error
    pub fn invalid_response(msg: impl Into<String>) -> Self {
        Self::InvalidResponse(msg.into())
    }

    /// Creates an ApiError error
    pub fn api_error(msg: impl Into<String>) -> Self {
        Self::ApiError(msg.into())
    }
}

/// Errors detected while validating the startup configuration
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// No coin to poll
    #[error("At least one coin must be configured")]
    NoCoins,

    /// Same identifier configured twice
    #[error("Coin {0} is configured more than once")]
    DuplicateCoin(String),

    /// Identifier collides with the query wildcard
    #[error("Coin identifier {0} is reserved")]
    ReservedIdentifier(String),

    /// Derived coins need the base coin to be polled
    #[error("Base coin {base} must be among the polled coins when derived coins are configured")]
    MissingBaseCoin { base: String },

    /// Route path is not absolute
    #[error("Query path must start with '/': {0}")]
    InvalidPath(String),

    /// Listen address could not be parsed
    #[error("Invalid listen address: {0}")]
    InvalidListenAddr(String),
}
