//! Error types for the chat client.

use std::time::Duration;

use thiserror::Error;

/// Result type for chat client operations.
pub type Result<T> = std::result::Result<T, ChatError>;

/// Chat client errors.
#[derive(Debug, Error)]
pub enum ChatError {
    /// Configuration error (missing API key, invalid settings)
    #[error("configuration error: {0}")]
    Config(String),

    /// Network error (connection refused, reset, DNS)
    #[error("network error: {0}")]
    Network(String),

    /// The provider did not answer within the read timeout
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// Non-2xx response from the provider
    #[error("API error ({status}): {message}")]
    Api {
        status: u16,
        message: String,
        /// Server-supplied `Retry-After`, if any
        retry_after: Option<Duration>,
    },

    /// Parse error (invalid JSON, unexpected response shape)
    #[error("parse error: {0}")]
    Parse(String),

    /// Every attempt allowed by the retry policy failed
    #[error("gave up after {attempts} attempts: {last}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        last: Box<ChatError>,
    },
}

impl ChatError {
    /// Whether a request that failed with this error may succeed if sent again.
    ///
    /// Throttling (429) and server-side failures (5xx) are transient, as are
    /// transport failures. Any other API status is a caller error.
    pub fn is_retryable(&self) -> bool {
        match self {
            ChatError::Network(_) | ChatError::Timeout(_) => true,
            ChatError::Api { status, .. } => *status == 429 || (500..600).contains(status),
            ChatError::Config(_) | ChatError::Parse(_) | ChatError::RetriesExhausted { .. } => {
                false
            }
        }
    }

    /// Whether the provider signalled throttling.
    pub fn is_throttled(&self) -> bool {
        matches!(self, ChatError::Api { status: 429, .. })
    }

    /// Server-requested wait before the next attempt.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            ChatError::Api { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api(status: u16) -> ChatError {
        ChatError::Api {
            status,
            message: "boom".into(),
            retry_after: None,
        }
    }

    #[test]
    fn test_retryable_statuses() {
        assert!(api(429).is_retryable());
        assert!(api(500).is_retryable());
        assert!(api(503).is_retryable());
        assert!(!api(400).is_retryable());
        assert!(!api(401).is_retryable());
        assert!(!api(404).is_retryable());
    }

    #[test]
    fn test_transport_errors_are_retryable() {
        assert!(ChatError::Network("reset".into()).is_retryable());
        assert!(ChatError::Timeout(Duration::from_secs(120)).is_retryable());
        assert!(!ChatError::Parse("bad json".into()).is_retryable());
        assert!(!ChatError::Config("no key".into()).is_retryable());
    }

    #[test]
    fn test_throttled_and_retry_after() {
        let err = ChatError::Api {
            status: 429,
            message: "slow down".into(),
            retry_after: Some(Duration::from_secs(7)),
        };
        assert!(err.is_throttled());
        assert_eq!(err.retry_after(), Some(Duration::from_secs(7)));
        assert!(!api(500).is_throttled());
    }
}
