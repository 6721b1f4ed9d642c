//! Per-value framing.
//!
//! Every sealed property is a small framed blob. This module owns every
//! byte offset of that frame; no other component reaches into the layout.
//!
//! ## Blob layout
//!
//! ```text
//! [TypeMarker (1 byte)] [Ciphertext (N bytes)]
//! ```
//!
//! For compressed values the outer marker is [`TypeMarker::Compressed`] and
//! the *encrypted plaintext* carries a one-byte prefix of its own:
//!
//! ```text
//! [InnerTypeMarker (1 byte)] [Compressed payload (M bytes)]
//! ```
//!
//! The pre-compression payload length is not framed here; it lives in the
//! sidecar's `CompressedEncryptedPaths` map, which keeps a single source of
//! truth for the length and lets the inner type be read before any
//! decompression work.

use crate::error::{Error, Result};
use crate::types::TypeMarker;

/// Offset of the outer type marker inside a blob.
pub const MARKER_OFFSET: usize = 0;

/// Offset of the ciphertext inside a blob.
pub const CIPHERTEXT_OFFSET: usize = 1;

/// Size of the inner marker prefix inside a compressed plaintext.
pub const INNER_MARKER_SIZE: usize = 1;

/// Allocates a blob for `ciphertext_len` bytes of ciphertext and writes the
/// outer marker. The returned vector is fully sized; the caller encrypts
/// directly into [`ciphertext_mut`](blob_ciphertext_mut).
#[must_use]
pub fn new_blob(marker: TypeMarker, ciphertext_len: usize) -> Vec<u8> {
    let mut blob = vec![0u8; CIPHERTEXT_OFFSET + ciphertext_len];
    blob[MARKER_OFFSET] = marker.byte();
    blob
}

/// Returns the ciphertext region of a freshly allocated blob.
pub fn blob_ciphertext_mut(blob: &mut [u8]) -> &mut [u8] {
    &mut blob[CIPHERTEXT_OFFSET..]
}

/// Splits a received blob into its outer marker and ciphertext.
///
/// # Errors
///
/// Returns [`Error::FormatViolation`] for an empty blob, an unknown marker
/// byte, or a blob with no ciphertext bytes at all.
pub fn parse_blob<'a>(blob: &'a [u8], context: &str) -> Result<(TypeMarker, &'a [u8])> {
    let (&marker_byte, ciphertext) = blob.split_first().ok_or_else(|| Error::format(context, "encrypted blob is empty"))?;
    let marker = TypeMarker::from_byte(marker_byte, context)?;
    if ciphertext.is_empty() {
        return Err(Error::format(context, "encrypted blob carries no ciphertext"));
    }
    Ok((marker, ciphertext))
}

/// Builds the plaintext for a compressed value: inner marker followed by
/// the compressed payload.
#[must_use]
pub fn compressed_plaintext(inner: TypeMarker, compressed: &[u8]) -> Vec<u8> {
    let mut plaintext = Vec::with_capacity(INNER_MARKER_SIZE + compressed.len());
    plaintext.push(inner.byte());
    plaintext.extend_from_slice(compressed);
    plaintext
}

/// Splits a decrypted compressed plaintext into the inner marker and the
/// compressed payload.
///
/// # Errors
///
/// Returns [`Error::FormatViolation`] when the plaintext is empty, the
/// inner marker byte is unknown, or the inner marker is itself
/// [`TypeMarker::Compressed`] (nesting is not a thing).
pub fn parse_compressed_plaintext<'a>(plaintext: &'a [u8], context: &str) -> Result<(TypeMarker, &'a [u8])> {
    let (&inner_byte, payload) = plaintext.split_first().ok_or_else(|| Error::format(context, "compressed plaintext is empty"))?;
    let inner = TypeMarker::from_byte(inner_byte, context)?;
    if inner == TypeMarker::Compressed {
        return Err(Error::format(context, "nested compression marker"));
    }
    Ok((inner, payload))
}
