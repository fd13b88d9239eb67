//! Error types for cache-first resolution.

/// Errors raised by stores, transports, seeding and configuration.
///
/// The resolution pipeline never returns one of these to its caller: read-path
/// store errors degrade to a cache miss and network errors fall through to the
/// fallback chain.
#[derive(Debug, thiserror::Error)]
pub enum CacheFirstError {
    /// Opening, reading or writing a cache store failed.
    #[error("store error: {message}")]
    Store { message: String },

    /// A stored body no longer matches the digest recorded at write time.
    #[error("integrity check failed for {key}: expected {expected}, got {actual}")]
    Integrity {
        key: String,
        expected: String,
        actual: String,
    },

    /// Transport-level fetch failure (connect, DNS, timeout, abort, body read).
    #[error("network error: {message}")]
    Network { message: String },

    /// A resource in the seed list could not be fetched or stored.
    #[error("failed to seed {resource}: {reason}")]
    Seed { resource: String, reason: String },

    /// The response body has already been consumed.
    #[error("response body already used")]
    BodyUsed,

    /// The request cannot be fetched or stored as given.
    #[error("invalid request: {message}")]
    InvalidRequest { message: String },

    /// Configuration error.
    #[error("configuration error: {message}")]
    Config { message: String },
}

impl CacheFirstError {
    /// Exit code for CLI.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config { .. } | Self::InvalidRequest { .. } => 1,
            Self::Store { .. } | Self::Integrity { .. } | Self::BodyUsed => 2,
            Self::Network { .. } | Self::Seed { .. } => 3,
        }
    }

    /// Whether the error came from the network transport.
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network { .. })
    }

    pub(crate) fn store(message: impl Into<String>) -> Self {
        Self::Store {
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for CacheFirstError {
    fn from(err: reqwest::Error) -> Self {
        Self::Network {
            message: err.to_string(),
        }
    }
}

/// Result type for cache-first operations.
pub type CacheResult<T> = Result<T, CacheFirstError>;
