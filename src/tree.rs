//! Tree processor: encrypts and decrypts a parsed, in-memory document.
//!
//! Properties are visited strictly in request order (encrypt) or sidecar
//! order (decrypt). Absent and null properties are skipped without being
//! recorded; the document's remaining members keep their positions thanks
//! to order-preserving maps.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;

use crate::config::METADATA_PROPERTY;
use crate::error::{Error, Result};
use crate::metadata::EncryptionMetadata;
use crate::options::EncryptionOptions;
use crate::pipeline::PropertyPipeline;
use crate::types::CompressionAlgorithm;

/// Encrypts the requested properties in place and installs the sidecar.
///
/// When nothing qualifies (every requested property absent or null), the
/// document is left without a sidecar so the output equals the input.
pub(crate) fn encrypt_document(document: &mut Map<String, Value>, pipeline: &PropertyPipeline<'_>, options: &EncryptionOptions, token: &CancellationToken) -> Result<()> {
    let compression_algorithm = options.effective_compression().map_or(CompressionAlgorithm::None, |c| c.algorithm);
    let mut metadata = EncryptionMetadata::randomized(&options.key_id, compression_algorithm);

    for path in &options.paths_to_encrypt {
        if token.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let name = &path[1..];
        let Some(plain) = document.get(name) else { continue };
        if plain.is_null() {
            continue;
        }

        let sealed = pipeline.seal(plain, path)?;
        if let Some(original_len) = sealed.compressed_len {
            metadata.compressed_paths.insert(path.clone(), original_len as u64);
        }
        document.insert(name.to_owned(), Value::String(BASE64.encode(&sealed.blob)));
        metadata.encrypted_paths.push(path.clone());
        tracing::trace!(path, "sealed property");
    }

    if metadata.encrypted_paths.is_empty() {
        return Ok(());
    }

    metadata.finalize_version();
    document.insert(METADATA_PROPERTY.to_owned(), metadata.to_value()?);
    Ok(())
}

/// Decrypts the sidecar-listed properties in place and strips the sidecar.
///
/// Listed paths that are absent or do not hold a JSON string are skipped
/// silently; a string that fails base64, framing, or authentication is an
/// error. Returns the paths actually restored, in sidecar order.
pub(crate) fn decrypt_document(document: &mut Map<String, Value>, pipeline: &PropertyPipeline<'_>, metadata: &EncryptionMetadata, token: &CancellationToken) -> Result<Vec<String>> {
    let mut decrypted = Vec::with_capacity(metadata.encrypted_paths.len());

    for path in &metadata.encrypted_paths {
        if token.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let name = path.strip_prefix('/').unwrap_or(path);
        let Some(Value::String(encoded)) = document.get(name) else { continue };

        let blob = BASE64.decode(encoded).map_err(|e| Error::format(path, format!("ciphertext is not valid base64: {e}")))?;
        let restored = pipeline.unseal(&blob, metadata.compressed_paths.get(path).copied(), metadata.compression_algorithm, path)?;
        document.insert(name.to_owned(), restored);
        decrypted.push(path.clone());
        tracing::trace!(path, "restored property");
    }

    document.shift_remove(METADATA_PROPERTY);
    Ok(decrypted)
}
