//! Crate-wide configuration and format constants.
//!
//! This module defines the core constants used throughout the codec, including:
//! - Document-level reserved identifiers (sidecar property, protected path)
//! - Format version numbers and their meaning
//! - Cryptographic parameters (key, IV, and MAC sizes)
//! - Buffer pool limits
//!
//! These constants ensure consistency across the codebase and serve as the single
//! source of truth for the document format specification.

/// Name of the sidecar property injected into every encrypted document.
///
/// The sidecar carries the metadata a compatible reader needs to recover
/// the original document. It is stripped again on decryption.
pub const METADATA_PROPERTY: &str = "_ei";

/// The one path that may never be encrypted.
///
/// `/id` identifies the document inside the store; encrypting it would make
/// the document unaddressable, so requests naming it are rejected outright.
pub const RESERVED_ID_PATH: &str = "/id";

/// Format version for the legacy whole-object mode.
///
/// All selected properties are stripped into a sub-object, serialized, and
/// encrypted as a single blob stored inside the sidecar itself.
pub const FORMAT_VERSION_LEGACY: u8 = 2;

/// Format version for per-property encryption without compression.
pub const FORMAT_VERSION_RANDOMIZED: u8 = 3;

/// Format version for per-property encryption where at least one property
/// was compressed before encryption.
///
/// Emitted only when a property actually crossed the compression threshold,
/// so version 3 documents never require a decompressor.
pub const FORMAT_VERSION_COMPRESSED: u8 = 4;

/// Length of the root key material handed to [`crate::AeadCbcHmacKey`] in bytes.
///
/// The 64 bytes are split into two independent halves: the first 32 feed
/// AES-256, the last 32 feed HMAC-SHA256. Reusing one key for both roles
/// would void the encrypt-then-MAC guarantees.
pub const ROOT_KEY_LEN: usize = 64;

/// Size of the AES-256 encryption key in bytes.
pub const ENC_KEY_LEN: usize = 32;

/// Size of the HMAC-SHA256 authentication key in bytes.
pub const MAC_KEY_LEN: usize = 32;

/// Size of the CBC initialization vector in bytes (one AES block).
pub const IV_SIZE: usize = 16;

/// Size of the HMAC-SHA256 authentication tag in bytes.
pub const MAC_SIZE: usize = 32;

/// AES block size in bytes; PKCS7 padding rounds plaintext up to this.
pub const AES_BLOCK_SIZE: usize = 16;

/// Default minimum serialized length before a property is compressed.
///
/// Below this size the fixed compression framing costs more than it saves,
/// so short values are encrypted as-is.
pub const DEFAULT_MIN_COMPRESSION_SIZE: usize = 128;

/// Maximum number of idle buffers the pool retains.
///
/// Rentals beyond this are still served; surplus buffers are simply dropped
/// on return instead of being kept warm.
pub const POOL_MAX_BUFFERS: usize = 32;

/// Largest buffer capacity the pool will take back, in bytes.
///
/// Set to 1 MiB. Oversized buffers from pathological documents are dropped
/// on return so one huge request cannot pin memory for the process lifetime.
pub const POOL_MAX_RETAINED_CAPACITY: usize = 1024 * 1024;
