//! Error types for meeting AI operations.

use std::fmt;

/// Universal error type that abstracts provider-specific errors into common variants.
///
/// All provider implementations map their native errors to these variants,
/// preserving context while maintaining a provider-agnostic interface. The
/// pipeline decides retry behavior from the variant alone: `RateLimited` and
/// `Network` are candidates for backoff, `Authentication` and `Configuration`
/// are terminal.
#[derive(Debug)]
pub enum Error {
    /// API key authentication failures. Indicates the configured credential is
    /// invalid, expired, or lacks necessary permissions. Distinct from a
    /// missing credential, which is a `Configuration` error.
    Authentication(String),

    /// Network connectivity issues, DNS failures, or connection timeouts.
    /// These errors are typically transient and may benefit from retry logic.
    Network(String),

    /// Missing credentials or malformed configuration. These errors are
    /// detected before any network call is made and are never retried.
    Configuration(String),

    /// Provider-side business logic errors (e.g., unsupported audio format,
    /// transcript generation failed remotely). May require user intervention.
    Provider(String),

    /// Empty or missing input handed to a provider (e.g., a zero-byte audio
    /// file). Detected locally, never retried.
    EmptyInput(String),

    /// Provider rate limit or abuse signal. Clients must wait before retrying.
    /// Respect retry_after_seconds to avoid further rate limiting or API suspension.
    RateLimited { retry_after_seconds: u64 },

    /// Failed to deserialize a provider response into the expected shape.
    /// Indicates provider wire-format drift or a truncated response.
    Deserialization(String),

    /// Catch-all for errors that don't fit other categories.
    Other(Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
    /// Returns true when the error class is worth another attempt after a
    /// backoff delay.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Network(_) | Error::Provider(_))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Authentication(msg) => write!(f, "Authentication failed: {}", msg),
            Error::Network(msg) => write!(f, "Network error: {}", msg),
            Error::Configuration(msg) => write!(f, "Invalid configuration: {}", msg),
            Error::Provider(msg) => write!(f, "Provider error: {}", msg),
            Error::EmptyInput(msg) => write!(f, "Empty input: {}", msg),
            Error::RateLimited {
                retry_after_seconds,
            } => {
                write!(f, "Rate limited: retry after {}s", retry_after_seconds)
            }
            Error::Deserialization(msg) => write!(f, "Deserialization error: {}", msg),
            Error::Other(err) => write!(f, "Other error: {}", err),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Other(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}
