//! In-memory key provider.
//!
//! Resolves key ids against a map registered at construction time. Useful
//! for tests and for embedding scenarios where key unwrapping happens
//! before the codec is invoked; a provider backed by a real key-wrapping
//! service implements the same trait.

use std::collections::HashMap;
use std::sync::Arc;

use crate::crypto::{DataEncryptionKey, KeyProvider};
use crate::error::{Error, Result};
use crate::types::EncryptionAlgorithm;

/// Key provider over a fixed id → key map.
#[derive(Default)]
pub struct StaticKeyProvider {
    keys: HashMap<String, Arc<dyn DataEncryptionKey>>,
}

impl StaticKeyProvider {
    /// Creates an empty provider.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a key under `key_id`, replacing any previous entry.
    #[must_use]
    pub fn with_key(mut self, key_id: impl Into<String>, key: Arc<dyn DataEncryptionKey>) -> Self {
        self.keys.insert(key_id.into(), key);
        self
    }
}

#[async_trait::async_trait]
impl KeyProvider for StaticKeyProvider {
    async fn get_key(&self, key_id: &str, _algorithm: EncryptionAlgorithm) -> Result<Arc<dyn DataEncryptionKey>> {
        self.keys.get(key_id).cloned().ok_or_else(|| Error::KeyUnknown(key_id.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ROOT_KEY_LEN;
    use crate::crypto::AeadCbcHmacKey;

    #[tokio::test]
    async fn test_resolves_registered_key() {
        let key = Arc::new(AeadCbcHmacKey::new(&[1u8; ROOT_KEY_LEN]).unwrap());
        let provider = StaticKeyProvider::new().with_key("k1", key);
        assert!(provider.get_key("k1", EncryptionAlgorithm::RandomizedAeadCbcHmac).await.is_ok());
    }

    #[tokio::test]
    async fn test_unknown_id_is_distinct() {
        let provider = StaticKeyProvider::new();
        let err = provider.get_key("nope", EncryptionAlgorithm::RandomizedAeadCbcHmac).await.unwrap_err();
        assert!(matches!(err, Error::KeyUnknown(id) if id == "nope"));
    }
}
