//! Gateway error types.

use thiserror::Error;

/// Errors raised outside a single upstream exchange: configuration,
/// upstream-list resolution, and the HTTP server itself.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Config file missing, unreadable, unparseable, or invalid.
    #[error("configuration error: {reason}")]
    ConfigError { reason: String },

    /// The upstream list for a caller could not be resolved.
    #[error("config source error: {reason}")]
    ConfigSourceError { reason: String },

    /// The shared HTTP client could not be built.
    #[error("failed to build HTTP client: {reason}")]
    HttpClient { reason: String },

    /// Bind or serve failure.
    #[error("server error: {reason}")]
    ServerError { reason: String },
}
