//! Legacy whole-object mode (format version 2).
//!
//! The selected properties are stripped into one sub-object, serialized as
//! compact JSON, and encrypted as a single blob stored in the sidecar's
//! `EncryptedData`. The mode predates per-property framing: no type
//! markers, no compression, no streaming. Kept for reading old documents
//! and for writers that must stay compatible with old readers.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde_json::{Map, Value};

use crate::config::{FORMAT_VERSION_LEGACY, METADATA_PROPERTY};
use crate::crypto::DataEncryptionKey;
use crate::error::{Error, Result};
use crate::metadata::EncryptionMetadata;
use crate::options::EncryptionOptions;
use crate::types::{CompressionAlgorithm, EncryptionAlgorithm};

/// Strips and encrypts the requested properties as one blob.
///
/// When nothing qualifies, the document is returned without a sidecar.
pub(crate) fn encrypt_document(document: &mut Map<String, Value>, key: &dyn DataEncryptionKey, options: &EncryptionOptions) -> Result<()> {
    let mut stripped = Map::new();
    let mut encrypted_paths = Vec::new();

    for path in &options.paths_to_encrypt {
        let name = &path[1..];
        let qualifies = document.get(name).is_some_and(|v| !v.is_null());
        if qualifies {
            if let Some(plain) = document.shift_remove(name) {
                stripped.insert(name.to_owned(), plain);
                encrypted_paths.push(path.clone());
            }
        }
    }

    if stripped.is_empty() {
        return Ok(());
    }

    let plaintext = serde_json::to_vec(&Value::Object(stripped)).map_err(|e| Error::Internal(format!("sub-object serialization failed: {e}")))?;
    let mut ciphertext = vec![0u8; key.ciphertext_length(plaintext.len())];
    key.encrypt(&plaintext, &mut ciphertext)?;

    let metadata = EncryptionMetadata {
        format_version: FORMAT_VERSION_LEGACY,
        algorithm: EncryptionAlgorithm::LegacyAeadCbcHmac,
        key_id: options.key_id.clone(),
        encrypted_data: Some(BASE64.encode(&ciphertext)),
        encrypted_paths,
        compression_algorithm: CompressionAlgorithm::None,
        compressed_paths: std::collections::BTreeMap::new(),
    };
    document.insert(METADATA_PROPERTY.to_owned(), metadata.to_value()?);
    Ok(())
}

/// Decrypts the whole-object blob and reinstates its properties.
///
/// Returns the restored paths.
pub(crate) fn decrypt_document(document: &mut Map<String, Value>, key: &dyn DataEncryptionKey, metadata: &EncryptionMetadata) -> Result<Vec<String>> {
    let encoded = metadata.encrypted_data.as_ref().ok_or_else(|| Error::format(METADATA_PROPERTY, "version 2 sidecar carries no EncryptedData"))?;
    let ciphertext = BASE64.decode(encoded).map_err(|e| Error::format(METADATA_PROPERTY, format!("EncryptedData is not valid base64: {e}")))?;

    let mut plaintext = vec![0u8; key.plaintext_length(ciphertext.len())];
    let written = key.decrypt(&ciphertext, &mut plaintext).map_err(|e| match e {
        Error::AuthFailed(_) => Error::AuthFailed(METADATA_PROPERTY.into()),
        other => other,
    })?;

    let restored: Value = serde_json::from_slice(&plaintext[..written]).map_err(|e| Error::format(METADATA_PROPERTY, format!("decrypted sub-object is not valid JSON: {e}")))?;
    let Value::Object(members) = restored else {
        return Err(Error::format(METADATA_PROPERTY, "decrypted blob is not a JSON object"));
    };

    let mut paths = Vec::with_capacity(members.len());
    for (name, plain) in members {
        paths.push(format!("/{name}"));
        document.insert(name, plain);
    }

    document.shift_remove(METADATA_PROPERTY);
    Ok(paths)
}
