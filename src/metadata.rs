//! Sidecar metadata carried inside the encrypted document.
//!
//! One object under the reserved `_ei` property records everything a
//! compatible reader needs: format version, algorithm, key id, the ordered
//! list of encrypted paths, the document-wide compression algorithm, and
//! the pre-compression length of every compressed path. Version 2
//! documents additionally carry the whole-object ciphertext itself.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::{FORMAT_VERSION_COMPRESSED, FORMAT_VERSION_LEGACY, FORMAT_VERSION_RANDOMIZED, METADATA_PROPERTY};
use crate::error::{Error, Result};
use crate::types::{CompressionAlgorithm, EncryptionAlgorithm};

/// The `_ei` sidecar object.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EncryptionMetadata {
    /// Format version; dispatches decryption (see the version constants in
    /// [`crate::config`]).
    #[serde(rename = "EncryptionFormatVersion")]
    pub format_version: u8,

    /// Echo of the request algorithm.
    #[serde(rename = "EncryptionAlgorithm")]
    pub algorithm: EncryptionAlgorithm,

    /// Echo of the request key id.
    #[serde(rename = "DataEncryptionKeyId")]
    pub key_id: String,

    /// Whole-object ciphertext as base64; version 2 only.
    #[serde(rename = "EncryptedData", default, skip_serializing_if = "Option::is_none")]
    pub encrypted_data: Option<String>,

    /// Paths actually encrypted, in processing order.
    #[serde(rename = "EncryptedPaths")]
    pub encrypted_paths: Vec<String>,

    /// Compression algorithm used for every compressed path of this
    /// document.
    #[serde(rename = "CompressionAlgorithm", default)]
    pub compression_algorithm: CompressionAlgorithm,

    /// Pre-compression payload length per compressed path.
    #[serde(rename = "CompressedEncryptedPaths", default, skip_serializing_if = "BTreeMap::is_empty")]
    pub compressed_paths: BTreeMap<String, u64>,
}

impl EncryptionMetadata {
    /// Starts a sidecar for a randomized per-property document; the final
    /// version is settled in [`finalize_version`](Self::finalize_version).
    #[must_use]
    pub fn randomized(key_id: impl Into<String>, compression_algorithm: CompressionAlgorithm) -> Self {
        Self {
            format_version: FORMAT_VERSION_RANDOMIZED,
            algorithm: EncryptionAlgorithm::RandomizedAeadCbcHmac,
            key_id: key_id.into(),
            encrypted_data: None,
            encrypted_paths: Vec::new(),
            compression_algorithm,
            compressed_paths: BTreeMap::new(),
        }
    }

    /// Upgrades version 3 to version 4 iff a property was actually
    /// compressed.
    pub fn finalize_version(&mut self) {
        if !self.compressed_paths.is_empty() {
            self.format_version = FORMAT_VERSION_COMPRESSED;
        }
    }

    /// True when the version is one this build can decrypt.
    #[must_use]
    pub fn version_supported(&self) -> bool {
        matches!(self.format_version, FORMAT_VERSION_LEGACY | FORMAT_VERSION_RANDOMIZED | FORMAT_VERSION_COMPRESSED)
    }

    /// Reads the sidecar out of a parsed document, if present.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FormatViolation`] when `_ei` exists but does not
    /// deserialize as a sidecar object.
    pub fn from_document(document: &Map<String, Value>) -> Result<Option<Self>> {
        match document.get(METADATA_PROPERTY) {
            None => Ok(None),
            Some(value) => serde_json::from_value(value.clone())
                .map(Some)
                .map_err(|e| Error::format(METADATA_PROPERTY, format!("sidecar does not parse: {e}"))),
        }
    }

    /// Serializes the sidecar into a JSON value for insertion.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Internal`] if serde rejects the struct, which would
    /// be a bug.
    pub fn to_value(&self) -> Result<Value> {
        serde_json::to_value(self).map_err(|e| Error::Internal(format!("sidecar serialization failed: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serde_field_names() {
        let mut metadata = EncryptionMetadata::randomized("k1", CompressionAlgorithm::None);
        metadata.encrypted_paths.push("/s".into());

        let json = serde_json::to_value(&metadata).unwrap();
        assert_eq!(json["EncryptionFormatVersion"], 3);
        assert_eq!(json["EncryptionAlgorithm"], "randomized_aead_cbc_hmac");
        assert_eq!(json["DataEncryptionKeyId"], "k1");
        assert_eq!(json["EncryptedPaths"], serde_json::json!(["/s"]));
        assert_eq!(json["CompressionAlgorithm"], "none");
        // Absent unless populated.
        assert!(json.get("EncryptedData").is_none());
        assert!(json.get("CompressedEncryptedPaths").is_none());
    }

    #[test]
    fn test_version_upgrade_on_compression() {
        let mut metadata = EncryptionMetadata::randomized("k1", CompressionAlgorithm::Deflate);
        metadata.finalize_version();
        assert_eq!(metadata.format_version, FORMAT_VERSION_RANDOMIZED);

        metadata.compressed_paths.insert("/s".into(), 2816);
        metadata.finalize_version();
        assert_eq!(metadata.format_version, FORMAT_VERSION_COMPRESSED);
    }

    #[test]
    fn test_from_document() {
        let mut document = Map::new();
        assert!(EncryptionMetadata::from_document(&document).unwrap().is_none());

        let metadata = EncryptionMetadata::randomized("k1", CompressionAlgorithm::None);
        document.insert(METADATA_PROPERTY.into(), metadata.to_value().unwrap());
        let read_back = EncryptionMetadata::from_document(&document).unwrap().unwrap();
        assert_eq!(read_back, metadata);
    }

    #[test]
    fn test_malformed_sidecar_is_a_format_violation() {
        let mut document = Map::new();
        document.insert(METADATA_PROPERTY.into(), Value::String("not an object".into()));
        assert!(matches!(EncryptionMetadata::from_document(&document), Err(Error::FormatViolation { .. })));
    }

    #[test]
    fn test_version_support() {
        let mut metadata = EncryptionMetadata::randomized("k1", CompressionAlgorithm::None);
        for version in [2, 3, 4] {
            metadata.format_version = version;
            assert!(metadata.version_supported());
        }
        metadata.format_version = 99;
        assert!(!metadata.version_supported());
    }
}
