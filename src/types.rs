//! Common type definitions for the codec.
//!
//! Provides the core enums and structures shared across the processors:
//!
//! - [`EncryptionAlgorithm`]: whole-object legacy mode vs per-property randomized mode
//! - [`CompressionAlgorithm`] / [`CompressionLevel`]: optional pre-encryption compression
//! - [`TypeMarker`]: one-byte tag carrying the original JSON type of a sealed value
//! - [`JsonProcessor`]: tree vs stream rewrite strategy
//! - [`DecryptionReport`]: what a decrypt call actually restored

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Encryption mode requested for a document.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EncryptionAlgorithm {
    /// Whole-object mode: all selected properties are stripped into one
    /// sub-object and encrypted as a single blob. No streaming, no
    /// compression.
    LegacyAeadCbcHmac,

    /// Per-property mode with randomized ciphertexts. The only mode that
    /// supports streaming rewrites and compression.
    RandomizedAeadCbcHmac,
}

/// Compression applied to a serialized value before encryption.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CompressionAlgorithm {
    /// No compression.
    #[default]
    None,

    /// Raw DEFLATE stream.
    Deflate,

    /// Gzip-wrapped DEFLATE.
    Gzip,

    /// Brotli.
    Brotli,
}

/// Specifies the compression effort level.
///
/// Higher levels trade speed for ratio; the mapping to the backend's native
/// scale lives in the compression adapter.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CompressionLevel {
    /// Fastest compression (lowest ratio).
    #[default]
    Fast,

    /// Balanced compression.
    Default,

    /// Best compression (highest ratio, slowest).
    Best,
}

/// Selects how the document is rewritten during encryption.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum JsonProcessor {
    /// Parse the whole document into a tree and mutate it in memory.
    #[default]
    Tree,

    /// Rewrite the document token-by-token with pooled buffers, never
    /// materializing unprotected members.
    Stream,
}

/// One-byte tag identifying the original JSON type of a sealed value.
///
/// The marker is the first byte of every encrypted blob; it is what lets a
/// boolean come back as a boolean and an integer as an integer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum TypeMarker {
    /// Never written; null values are skipped before sealing.
    Null = 1,

    /// UTF-8 string payload.
    String = 2,

    /// 8-byte big-endian IEEE-754 double.
    Double = 3,

    /// 8-byte big-endian two's-complement signed integer.
    Long = 4,

    /// Single 0/1 byte.
    Boolean = 5,

    /// Compact JSON text of an array sub-tree.
    Array = 6,

    /// Compact JSON text of an object sub-tree.
    Object = 7,

    /// The payload was compressed; the inner marker precedes the compressed
    /// bytes inside the encrypted plaintext.
    Compressed = 99,
}

impl TypeMarker {
    /// Returns the wire byte for this marker.
    #[inline]
    #[must_use]
    pub const fn byte(self) -> u8 {
        self as u8
    }

    /// Parses a wire byte back into a marker.
    ///
    /// # Errors
    ///
    /// Returns a format violation for bytes outside the enumeration.
    pub fn from_byte(byte: u8, context: &str) -> Result<Self> {
        match byte {
            1 => Ok(Self::Null),
            2 => Ok(Self::String),
            3 => Ok(Self::Double),
            4 => Ok(Self::Long),
            5 => Ok(Self::Boolean),
            6 => Ok(Self::Array),
            7 => Ok(Self::Object),
            99 => Ok(Self::Compressed),
            other => Err(Error::format(context, format!("unknown type marker {other:#04x}"))),
        }
    }
}

/// Summary of what a decrypt call restored.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecryptionReport {
    /// Paths decrypted, in sidecar order.
    pub paths_decrypted: Vec<String>,

    /// Key id the document was decrypted with.
    pub key_id: String,
}
