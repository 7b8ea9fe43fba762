//! Error types for the refresher
//!
//! This module defines all error types used throughout the crate.
//!
//! ## Severity
//!
//! Only a subset of failures ever reach this type. Transient IP source
//! failures (timeouts, refused connections) are absorbed by the resolver and
//! never surface as an [`Error`]; everything that does surface is fatal for
//! the refresh loop, except [`Error::Cancelled`] which marks a clean stop.

use thiserror::Error;

/// Result type alias for refresher operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the refresher
#[derive(Error, Debug)]
pub enum Error {
    /// IP source-related errors (transport level)
    #[error("IP source error: {0}")]
    IpSource(String),

    /// The IP source answered with something that is not an IP address
    #[error("Could not parse public IP address from provider response: {0:?}")]
    InvalidAddress(String),

    /// The IP source answered with an IPv6 address
    #[error("Public IP address {0} is not an IPv4 address")]
    NotIpv4(std::net::IpAddr),

    /// No public address could be determined during initialization
    #[error("Initial public IP address could not be resolved")]
    InitialAddressUnavailable,

    /// Listing the provider's zones failed
    #[error("Zone listing failed: {0}")]
    ZoneListing(String),

    /// A submitted change did not converge within the configured poll budget
    #[error("Change {change_id} still pending after {polls} status checks")]
    ConvergenceTimeout {
        /// Provider-assigned change identifier
        change_id: String,
        /// Number of status queries performed
        polls: usize,
    },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O errors (configuration files)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Provider-specific error
    #[error("Provider error ({provider}): {message}")]
    Provider {
        /// Provider name
        provider: String,
        /// Error message
        message: String,
    },

    /// The shutdown signal fired while an operation was suspended
    #[error("Operation cancelled by shutdown signal")]
    Cancelled,

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an IP source error
    pub fn ip_source(msg: impl Into<String>) -> Self {
        Self::IpSource(msg.into())
    }

    /// Create a zone listing error
    pub fn zone_listing(msg: impl Into<String>) -> Self {
        Self::ZoneListing(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a provider-specific error
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Whether this error is the shutdown signal rather than a failure
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Whether this error came from submitting a change or waiting for it
    ///
    /// These are the failures `EngineConfig::halt_on_update_failure` decides
    /// about; every other error is always fatal.
    pub fn is_update_failure(&self) -> bool {
        matches!(self, Self::Provider { .. } | Self::ConvergenceTimeout { .. })
    }
}
