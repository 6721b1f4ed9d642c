//! Per-property sealing pipeline shared by the tree and stream processors.
//!
//! One value travels through up to four stages:
//!
//! ### Seal (plaintext value → blob)
//! 1. **Typed serialization**: the JSON value becomes a marker plus
//!    canonical payload bytes.
//! 2. **Compression** (optional): payloads at or above the threshold are
//!    compressed; the inner marker moves into the plaintext prefix and the
//!    outer marker becomes `Compressed`.
//! 3. **Framing**: the blob is allocated with the outer marker in place.
//! 4. **Encryption**: the key handle encrypts straight into the blob.
//!
//! ### Unseal (blob → plaintext value)
//! The inverse, with the sidecar consulted for the compression algorithm
//! and the pre-compression length, and every disagreement between framing
//! and sidecar surfaced as a distinct error.

use serde_json::Value;

use crate::compression::{self, Compressor};
use crate::crypto::DataEncryptionKey;
use crate::error::{Error, Result};
use crate::header;
use crate::options::CompressionOptions;
use crate::types::{CompressionAlgorithm, TypeMarker};
use crate::value;

/// Result of sealing one property value.
pub(crate) struct SealedValue {
    /// Framed blob: outer marker plus ciphertext.
    pub blob: Vec<u8>,

    /// Pre-compression payload length, present iff the value was
    /// compressed; recorded in the sidecar.
    pub compressed_len: Option<usize>,
}

/// The per-property stage of one request; immutable once built.
pub(crate) struct PropertyPipeline<'a> {
    key: &'a dyn DataEncryptionKey,
    compression: Option<(Compressor, usize)>,
}

impl<'a> PropertyPipeline<'a> {
    /// Builds the pipeline for one request.
    ///
    /// `compression` must already be filtered to a concrete algorithm
    /// (callers use `EncryptionOptions::effective_compression`).
    pub fn new(key: &'a dyn DataEncryptionKey, compression: Option<&CompressionOptions>) -> Result<Self> {
        let compression = match compression {
            Some(opts) => Some((Compressor::new(opts.algorithm, opts.level)?, opts.minimum_size)),
            None => None,
        };
        Ok(Self { key, compression })
    }

    /// Seals one value into a framed, encrypted blob.
    pub fn seal(&self, plain: &Value, path: &str) -> Result<SealedValue> {
        let (marker, payload) = value::serialize(plain)?;

        let (outer, plaintext, compressed_len) = match &self.compression {
            Some((compressor, minimum)) if payload.len() >= *minimum => {
                let original_len = payload.len();
                let compressed = compressor.compress(&payload)?;
                tracing::trace!(path, original_len, compressed_len = compressed.len(), "compressed property payload");
                (TypeMarker::Compressed, header::compressed_plaintext(marker, &compressed), Some(original_len))
            }
            _ => (marker, payload, None),
        };

        let mut blob = header::new_blob(outer, self.key.ciphertext_length(plaintext.len()));
        self.key.encrypt(&plaintext, header::blob_ciphertext_mut(&mut blob)).map_err(|e| wrap_path(e, path))?;

        Ok(SealedValue { blob, compressed_len })
    }

    /// Unseals one blob back into its JSON value.
    ///
    /// `compressed_len` is the sidecar's recorded length for this path (if
    /// any) and `algorithm` the sidecar's document-wide compression choice.
    pub fn unseal(&self, blob: &[u8], compressed_len: Option<u64>, algorithm: CompressionAlgorithm, path: &str) -> Result<Value> {
        let (outer, ciphertext) = header::parse_blob(blob, path)?;

        let mut plaintext = vec![0u8; self.key.plaintext_length(ciphertext.len())];
        let written = self.key.decrypt(ciphertext, &mut plaintext).map_err(|e| wrap_path(e, path))?;
        let plaintext = &plaintext[..written];

        match outer {
            TypeMarker::Compressed => {
                let Some(original_len) = compressed_len else {
                    return Err(Error::CompressionMismatch { context: path.into(), reason: "value carries a compressed marker but the sidecar records no original length".into() });
                };
                if algorithm == CompressionAlgorithm::None {
                    return Err(Error::CompressionMismatch { context: path.into(), reason: "value carries a compressed marker but the sidecar declares no compression algorithm".into() });
                }
                let original_len = usize::try_from(original_len).map_err(|_| Error::format(path, "recorded original length does not fit in memory"))?;
                let (inner, compressed) = header::parse_compressed_plaintext(plaintext, path)?;
                let payload = compression::decompress(algorithm, compressed, original_len, path)?;
                value::deserialize(inner, &payload, path)
            }
            marker => {
                if compressed_len.is_some() {
                    return Err(Error::CompressionMismatch { context: path.into(), reason: "sidecar records a compressed length but the value carries no compressed marker".into() });
                }
                value::deserialize(marker, plaintext, path)
            }
        }
    }
}

/// Re-anchors auth failures on the property path; other errors already
/// carry their own context.
fn wrap_path(error: Error, path: &str) -> Error {
    match error {
        Error::AuthFailed(_) => Error::AuthFailed(path.into()),
        other => other,
    }
}
