//! Redacting, zeroizing string container.
//!
//! Use [`SecretString`] for values that must never reach logs or audit
//! context. Formatting and serialization print a fixed placeholder; the
//! backing buffer is wiped on drop.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use zeroize::Zeroize;

pub const REDACTED: &str = "***REDACTED***";

#[derive(Clone, Default, PartialEq, Eq)]
pub struct SecretString {
    inner: String,
}

impl SecretString {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            inner: value.into(),
        }
    }

    /// Borrow the plain text.
    pub fn expose(&self) -> &str {
        &self.inner
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Wipe the buffer now instead of waiting for drop.
    pub fn clear(&mut self) {
        self.inner.zeroize();
    }
}

impl Drop for SecretString {
    fn drop(&mut self) {
        self.inner.zeroize();
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretString({REDACTED})")
    }
}

impl fmt::Display for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(REDACTED)
    }
}

impl Serialize for SecretString {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(REDACTED)
    }
}

impl<'de> Deserialize<'de> for SecretString {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Self::new)
    }
}

impl From<String> for SecretString {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<&str> for SecretString {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formatting_never_leaks() {
        let s = SecretString::new("SuperSecretPassword123!");
        assert_eq!(s.to_string(), REDACTED);
        assert!(!format!("{s:?}").contains("Super"));
        assert_eq!(serde_json::to_string(&s).unwrap(), format!("\"{REDACTED}\""));
        assert_eq!(s.expose(), "SuperSecretPassword123!");
    }

    #[test]
    fn clear_empties_buffer() {
        let mut s = SecretString::new("sensitive data");
        assert_eq!(s.len(), 14);
        s.clear();
        assert!(s.is_empty());
        assert_eq!(s.expose(), "");
    }

    #[test]
    fn deserializes_plain_text() {
        let s: SecretString = serde_json::from_str("\"token\"").unwrap();
        assert_eq!(s.expose(), "token");
    }
}
