//! Document encryption/decryption processor.
//!
//! This module provides the main high-level interface for encrypting and
//! decrypting JSON documents. It orchestrates the pipeline end to end:
//! request validation, lazy key fetch, processor dispatch (tree, stream, or
//! legacy whole-object), sidecar finalization, and version-gated
//! decryption.
//!
//! # Architecture
//!
//! A request moves through fixed stages: validate → fetch key → per-property
//! processing → finalize. The per-property stage may run zero times (empty
//! path set), in which case the input is returned unchanged without ever
//! touching the key provider. Cancellation is checked at the key fetch and
//! again at every property boundary inside the processors.
//!
//! # Format versions
//!
//! | Version | Mode |
//! |---|---|
//! | 2 | legacy whole-object blob in the sidecar |
//! | 3 | per-property, nothing compressed |
//! | 4 | per-property, at least one property compressed |
//!
//! Encryption picks 2 or 3 from the algorithm and upgrades 3 → 4 iff a
//! property actually crossed the compression threshold. Decryption reads
//! the version from the sidecar and refuses anything else.

use std::sync::Arc;

use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;

use crate::config::FORMAT_VERSION_LEGACY;
use crate::crypto::{DataEncryptionKey, KeyProvider};
use crate::error::{Error, Result};
use crate::legacy;
use crate::metadata::EncryptionMetadata;
use crate::options::EncryptionOptions;
use crate::pipeline::PropertyPipeline;
use crate::pool::BufferPool;
use crate::stream;
use crate::tree;
use crate::types::{DecryptionReport, EncryptionAlgorithm, JsonProcessor};

/// High-level document encryption and decryption processor.
///
/// Holds the shared collaborators — key provider and buffer pool — and no
/// per-request state; one instance serves concurrent calls.
pub struct Processor {
    provider: Arc<dyn KeyProvider>,
    pool: Arc<BufferPool>,
}

impl Processor {
    /// Creates a processor over the given key provider.
    #[must_use]
    pub fn new(provider: Arc<dyn KeyProvider>) -> Self {
        Self { provider, pool: BufferPool::new() }
    }

    /// Encrypts a document given as raw JSON bytes.
    ///
    /// With an empty `paths_to_encrypt` the input is returned bitwise
    /// unchanged. Otherwise the requested properties are sealed and the
    /// sidecar installed, honoring the tree/stream choice in `options`.
    ///
    /// # Errors
    ///
    /// Validation errors surface before any key fetch; processing errors
    /// carry the offending path in context.
    pub async fn encrypt(&self, input: &[u8], options: &EncryptionOptions, token: &CancellationToken) -> Result<Vec<u8>> {
        tracing::debug!(algorithm = %options.algorithm, paths = options.paths_to_encrypt.len(), "validating encryption request");
        options.validate()?;

        if options.paths_to_encrypt.is_empty() {
            return Ok(input.to_vec());
        }

        let key = self.fetch_key(&options.key_id, options.algorithm, token).await?;

        let output = match (options.algorithm, options.processor) {
            (EncryptionAlgorithm::LegacyAeadCbcHmac, _) => {
                let mut document = parse_document(input)?;
                legacy::encrypt_document(&mut document, key.as_ref(), options)?;
                serialize_document(document)?
            }
            (EncryptionAlgorithm::RandomizedAeadCbcHmac, JsonProcessor::Tree) => {
                let mut document = parse_document(input)?;
                let pipeline = PropertyPipeline::new(key.as_ref(), options.effective_compression())?;
                tree::encrypt_document(&mut document, &pipeline, options, token)?;
                serialize_document(document)?
            }
            (EncryptionAlgorithm::RandomizedAeadCbcHmac, JsonProcessor::Stream) => {
                let pipeline = PropertyPipeline::new(key.as_ref(), options.effective_compression())?;
                stream::encrypt_document(input, &pipeline, options, &self.pool, token)?
            }
        };

        tracing::debug!(output_len = output.len(), "encryption finished");
        Ok(output)
    }

    /// Decrypts a document given as raw JSON bytes.
    ///
    /// A document without a sidecar is returned unchanged with no report.
    /// Otherwise the sidecar's format version selects the mode and the
    /// report lists what was restored.
    ///
    /// # Errors
    ///
    /// [`Error::UnsupportedFormatVersion`] for unknown versions (checked
    /// before the key fetch); decryption errors carry the path in context.
    pub async fn decrypt(&self, input: &[u8], token: &CancellationToken) -> Result<(Vec<u8>, Option<DecryptionReport>)> {
        let Some(metadata) = stream::find_metadata(input)? else {
            return Ok((input.to_vec(), None));
        };
        if !metadata.version_supported() {
            return Err(Error::UnsupportedFormatVersion(metadata.format_version));
        }
        tracing::debug!(version = metadata.format_version, paths = metadata.encrypted_paths.len(), "decrypting document");

        let key = self.fetch_key(&metadata.key_id, metadata.algorithm, token).await?;

        let (output, paths_decrypted) = if metadata.format_version == FORMAT_VERSION_LEGACY {
            // The whole-object mode is not on the streaming path.
            let mut document = parse_document(input)?;
            let paths = legacy::decrypt_document(&mut document, key.as_ref(), &metadata)?;
            (serialize_document(document)?, paths)
        } else {
            let pipeline = PropertyPipeline::new(key.as_ref(), None)?;
            stream::decrypt_document(input, &pipeline, &metadata, &self.pool, token)?
        };

        let report = DecryptionReport { paths_decrypted, key_id: metadata.key_id };
        Ok((output, Some(report)))
    }

    /// Encrypts a parsed document in place.
    ///
    /// The tree counterpart of [`encrypt`](Self::encrypt); the `processor`
    /// option is ignored since the document is already materialized.
    pub async fn encrypt_tree(&self, mut document: Map<String, Value>, options: &EncryptionOptions, token: &CancellationToken) -> Result<Map<String, Value>> {
        options.validate()?;

        if options.paths_to_encrypt.is_empty() {
            return Ok(document);
        }

        let key = self.fetch_key(&options.key_id, options.algorithm, token).await?;

        match options.algorithm {
            EncryptionAlgorithm::LegacyAeadCbcHmac => legacy::encrypt_document(&mut document, key.as_ref(), options)?,
            EncryptionAlgorithm::RandomizedAeadCbcHmac => {
                let pipeline = PropertyPipeline::new(key.as_ref(), options.effective_compression())?;
                tree::encrypt_document(&mut document, &pipeline, options, token)?;
            }
        }
        Ok(document)
    }

    /// Decrypts a parsed document in place.
    ///
    /// A document without a sidecar comes back untouched with no report.
    pub async fn decrypt_tree(&self, mut document: Map<String, Value>, token: &CancellationToken) -> Result<(Map<String, Value>, Option<DecryptionReport>)> {
        let Some(metadata) = EncryptionMetadata::from_document(&document)? else {
            return Ok((document, None));
        };
        if !metadata.version_supported() {
            return Err(Error::UnsupportedFormatVersion(metadata.format_version));
        }

        let key = self.fetch_key(&metadata.key_id, metadata.algorithm, token).await?;

        let paths_decrypted = if metadata.format_version == FORMAT_VERSION_LEGACY {
            legacy::decrypt_document(&mut document, key.as_ref(), &metadata)?
        } else {
            let pipeline = PropertyPipeline::new(key.as_ref(), None)?;
            tree::decrypt_document(&mut document, &pipeline, &metadata, token)?
        };

        let report = DecryptionReport { paths_decrypted, key_id: metadata.key_id };
        Ok((document, Some(report)))
    }

    /// Fetches the data-encryption key, observing cancellation first.
    ///
    /// This is the one yield point the processors themselves do not own.
    async fn fetch_key(&self, key_id: &str, algorithm: EncryptionAlgorithm, token: &CancellationToken) -> Result<Arc<dyn DataEncryptionKey>> {
        if token.is_cancelled() {
            return Err(Error::Cancelled);
        }
        tracing::debug!(key_id, %algorithm, "fetching data encryption key");
        self.provider.get_key(key_id, algorithm).await
    }
}

/// Parses input bytes into a root object.
fn parse_document(input: &[u8]) -> Result<Map<String, Value>> {
    let value: Value = serde_json::from_slice(input).map_err(|e| Error::format("document", format!("input is not valid JSON: {e}")))?;
    match value {
        Value::Object(document) => Ok(document),
        _ => Err(Error::format("document", "root is not a JSON object")),
    }
}

/// Serializes a document back to compact JSON bytes.
fn serialize_document(document: Map<String, Value>) -> Result<Vec<u8>> {
    serde_json::to_vec(&Value::Object(document)).map_err(|e| Error::Internal(format!("document serialization failed: {e}")))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::config::ROOT_KEY_LEN;
    use crate::crypto::{AeadCbcHmacKey, StaticKeyProvider};

    fn processor() -> Processor {
        let key = Arc::new(AeadCbcHmacKey::new(&[11u8; ROOT_KEY_LEN]).unwrap());
        Processor::new(Arc::new(StaticKeyProvider::new().with_key("k1", key)))
    }

    fn options(paths: &[&str]) -> EncryptionOptions {
        EncryptionOptions::new("k1", EncryptionAlgorithm::RandomizedAeadCbcHmac, paths.iter().map(ToString::to_string).collect())
    }

    #[tokio::test]
    async fn test_bytes_roundtrip_tree_and_stream() {
        let processor = processor();
        let token = CancellationToken::new();
        let input = serde_json::to_vec(&json!({"id": "1", "s": "hello", "n": 42})).unwrap();

        for mode in [JsonProcessor::Tree, JsonProcessor::Stream] {
            let opts = options(&["/s", "/n"]).with_processor(mode);
            let encrypted = processor.encrypt(&input, &opts, &token).await.unwrap();
            let (decrypted, report) = processor.decrypt(&encrypted, &token).await.unwrap();

            let report = report.unwrap();
            assert_eq!(report.paths_decrypted, vec!["/s", "/n"]);
            assert_eq!(report.key_id, "k1");
            assert_eq!(serde_json::from_slice::<Value>(&decrypted).unwrap(), serde_json::from_slice::<Value>(&input).unwrap());
        }
    }

    #[tokio::test]
    async fn test_empty_paths_is_identity() {
        let processor = processor();
        let token = CancellationToken::new();
        let input = br#"{ "id": "1",  "keep": "formatting" }"#;

        let output = processor.encrypt(input, &options(&[]), &token).await.unwrap();
        assert_eq!(output, input);
    }

    #[tokio::test]
    async fn test_decrypt_without_sidecar_is_identity() {
        let processor = processor();
        let token = CancellationToken::new();
        let input = br#"{"id": "1", "plain": true}"#;

        let (output, report) = processor.decrypt(input, &token).await.unwrap();
        assert_eq!(output, input);
        assert!(report.is_none());
    }

    #[tokio::test]
    async fn test_unknown_key_id() {
        let processor = processor();
        let token = CancellationToken::new();
        let mut opts = options(&["/s"]);
        opts.key_id = "other".into();

        let err = processor.encrypt(br#"{"s": "x"}"#, &opts, &token).await.unwrap_err();
        assert!(matches!(err, Error::KeyUnknown(_)));
    }

    #[tokio::test]
    async fn test_unsupported_version_is_refused_before_key_fetch() {
        // Provider knows no keys at all, so reaching it would fail with
        // KeyUnknown; the version gate must fire first.
        let processor = Processor::new(Arc::new(StaticKeyProvider::new()));
        let token = CancellationToken::new();
        let input = br#"{"id": "1", "_ei": {"EncryptionFormatVersion": 99, "EncryptionAlgorithm": "randomized_aead_cbc_hmac", "DataEncryptionKeyId": "k1", "EncryptedPaths": [], "CompressionAlgorithm": "none"}}"#;

        let err = processor.decrypt(input, &token).await.unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormatVersion(99)));
    }

    #[tokio::test]
    async fn test_cancellation_before_key_fetch() {
        let processor = processor();
        let token = CancellationToken::new();
        token.cancel();

        let err = processor.encrypt(br#"{"s": "x"}"#, &options(&["/s"]), &token).await.unwrap_err();
        assert!(matches!(err, Error::Cancelled));
    }

    #[tokio::test]
    async fn test_tree_api_roundtrip() {
        let processor = processor();
        let token = CancellationToken::new();
        let original = json!({"id": "1", "o": {"k": "v"}}).as_object().unwrap().clone();

        let encrypted = processor.encrypt_tree(original.clone(), &options(&["/o"]), &token).await.unwrap();
        assert!(encrypted["o"].is_string());

        let (decrypted, report) = processor.decrypt_tree(encrypted, &token).await.unwrap();
        assert_eq!(decrypted, original);
        assert_eq!(report.unwrap().paths_decrypted, vec!["/o"]);
    }

    #[tokio::test]
    async fn test_legacy_bytes_roundtrip() {
        let processor = processor();
        let token = CancellationToken::new();
        let opts = EncryptionOptions::new("k1", EncryptionAlgorithm::LegacyAeadCbcHmac, vec!["/s".into(), "/n".into()]);
        let input = serde_json::to_vec(&json!({"id": "1", "s": "hello", "n": 42})).unwrap();

        let encrypted = processor.encrypt(&input, &opts, &token).await.unwrap();
        let encrypted_doc: Value = serde_json::from_slice(&encrypted).unwrap();
        assert!(encrypted_doc.get("s").is_none());
        assert_eq!(encrypted_doc["_ei"]["EncryptionFormatVersion"], 2);
        assert!(encrypted_doc["_ei"]["EncryptedData"].is_string());

        let (decrypted, report) = processor.decrypt(&encrypted, &token).await.unwrap();
        assert_eq!(report.unwrap().paths_decrypted.len(), 2);
        assert_eq!(serde_json::from_slice::<Value>(&decrypted).unwrap(), serde_json::from_slice::<Value>(&input).unwrap());
    }
}
