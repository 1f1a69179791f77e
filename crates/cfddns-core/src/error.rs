//! Error types for the cfddns updater
//!
//! One closed enumeration covers every fallible operation in the workspace.
//! The supervisor inspects the variant to tell fatal startup failures apart
//! from failures that only affect a single hostname or a single pass.

use thiserror::Error;

/// Result type alias for cfddns operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the cfddns updater
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration file shape or content is invalid
    #[error("Configuration error: {0}")]
    Config(String),

    /// Credentials were rejected or are unusable
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// The request never produced a usable HTTP response
    #[error("Transport error: {0}")]
    Transport(String),

    /// The provider asked us to slow down
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Zone or record not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// The provider answered with a body we could not interpret
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// The public address could not be determined
    #[error("Address resolution failed: {0}")]
    AddressResolution(String),

    /// Provider-specific error
    #[error("Provider error ({provider}): {message}")]
    Provider {
        /// Provider name
        provider: String,
        /// Error message
        message: String,
    },

    /// Filesystem errors (reading the configuration file)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an authentication error
    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Authentication(msg.into())
    }

    /// Create a transport error
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Create a rate limit error
    pub fn rate_limited(msg: impl Into<String>) -> Self {
        Self::RateLimited(msg.into())
    }

    /// Create a "not found" error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create an invalid response error
    pub fn invalid_response(msg: impl Into<String>) -> Self {
        Self::InvalidResponse(msg.into())
    }

    /// Create an address resolution error
    pub fn address(msg: impl Into<String>) -> Self {
        Self::AddressResolution(msg.into())
    }

    /// Create a provider-specific error
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Whether this error came from reading or validating configuration.
    ///
    /// A hot reload that fails this way keeps the previous configuration.
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            Error::Config(_) | Error::Io(_) | Error::Json(_) | Error::Yaml(_)
        )
    }

    /// Whether the provider rejected our credentials.
    pub fn is_auth(&self) -> bool {
        matches!(self, Error::Authentication(_))
    }
}
