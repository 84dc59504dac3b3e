//! API key handling.
//!
//! Keys are held in `secrecy::SecretBox` so they never end up in logs,
//! `Debug` output or error messages.

use secrecy::{ExposeSecret, SecretBox};
use std::fmt;

/// A provider API key.
pub struct ApiKey(SecretBox<str>);

impl ApiKey {
    pub fn new(value: impl Into<String>) -> Self {
        Self(SecretBox::new(Box::from(value.into().as_str())))
    }

    /// Expose the key; only for building the `Authorization` header.
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }

    /// Whether the key is empty or whitespace.
    pub fn is_blank(&self) -> bool {
        self.expose().trim().is_empty()
    }
}

impl Clone for ApiKey {
    fn clone(&self) -> Self {
        Self::new(self.expose())
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl From<String> for ApiKey {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for ApiKey {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_not_in_debug() {
        let key = ApiKey::new("sk-super-secret-key");
        let debug = format!("{:?}", key);
        assert!(!debug.contains("sk-super"));
        assert_eq!(debug, "[REDACTED]");
    }

    #[test]
    fn test_expose_and_clone() {
        let key = ApiKey::new("sk-super-secret-key");
        assert_eq!(key.clone().expose(), "sk-super-secret-key");
    }

    #[test]
    fn test_blank_key() {
        assert!(ApiKey::new("  ").is_blank());
        assert!(!ApiKey::new("sk").is_blank());
    }
}
