//! `KeyProvider` — the asynchronous source of a database's encryption key.

use crate::error::KeyProviderError;
use async_trait::async_trait;

/// Asynchronous source of a database's encryption key.
///
/// Bound to a single database id at registration. `get_key` may await
/// (e.g. a Keychain prompt) before returning either a plaintext
/// passphrase or a `x'<hex>'` keyspec literal. Presence of
/// a key provider implies the database is treated as unlocked-capable;
/// its absence on an encrypted descriptor yields
/// `EncryptionStatus::Locked`.
#[async_trait]
pub trait KeyProvider: Send + Sync {
    /// Fetch the current key for this database.
    async fn get_key(&self) -> Result<String, KeyProviderError>;
}

/// A `KeyProvider` that always returns a fixed key, for tests and for
/// hosts that keep the passphrase in memory rather than behind an
/// async prompt.
pub struct StaticKeyProvider(String);

impl StaticKeyProvider {
    /// Wrap a fixed passphrase or hex keyspec literal.
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }
}

#[async_trait]
impl KeyProvider for StaticKeyProvider {
    async fn get_key(&self) -> Result<String, KeyProviderError> {
        Ok(self.0.clone())
    }
}

/// Validate a raw key string against 's formats: a non-empty
/// passphrase, or `x'<hex>'` with hex length 64 (SQLCipher 3) or 96
/// (SQLCipher 4), every character a hex digit.
pub fn validate_key(key: &str) -> Result<(), KeyProviderError> {
    if key.is_empty() {
        return Err(KeyProviderError::InvalidKeyFormat(
            "key must not be empty".to_string(),
        ));
    }
    if let Some(inner) = key.strip_prefix("x'").and_then(|s| s.strip_suffix('\'')) {
        if !matches!(inner.len(), 64 | 96) {
            return Err(KeyProviderError::InvalidKeyFormat(format!(
                "hex keyspec must be 64 or 96 hex characters, got {}",
                inner.len()
            )));
        }
        if !inner.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(KeyProviderError::InvalidKeyFormat(
                "hex keyspec contains non-hex characters".to_string(),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passphrase_is_accepted_as_is() {
        assert!(validate_key("s3cret").is_ok());
    }

    #[test]
    fn empty_key_is_rejected() {
        assert!(validate_key("").is_err());
    }

    #[test]
    fn valid_hex_keyspec_lengths_are_accepted() {
        assert!(validate_key(&format!("x'{}'", "a".repeat(64))).is_ok());
        assert!(validate_key(&format!("x'{}'", "b".repeat(96))).is_ok());
    }

    #[test]
    fn wrong_hex_keyspec_length_is_rejected() {
        assert!(validate_key(&format!("x'{}'", "a".repeat(32))).is_err());
    }

    #[test]
    fn non_hex_chars_in_keyspec_are_rejected() {
        assert!(validate_key(&format!("x'{}z'", "a".repeat(63))).is_err());
    }
}
