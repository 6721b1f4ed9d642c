//! Crypto adapter: the seam between the codec and its key material.
//!
//! The codec never touches a cipher directly. It asks a [`KeyProvider`]
//! for a [`DataEncryptionKey`] handle once per call and drives that handle
//! buffer-to-buffer. The handle contract is deliberately narrow:
//!
//! 1. ciphertext length is a pure function of plaintext length, so blobs
//!    can be allocated before encrypting;
//! 2. decryption is authenticated and fails loudly with a distinct error
//!    on tag mismatch.
//!
//! Anything meeting that contract can stand in for the provided
//! AES-CBC+HMAC implementation.

use std::sync::Arc;

use crate::error::Result;
use crate::types::EncryptionAlgorithm;

pub mod cbc_hmac;
pub mod provider;

pub use cbc_hmac::AeadCbcHmacKey;
pub use provider::StaticKeyProvider;

/// Handle to one data-encryption key.
///
/// Offsets are expressed through subslices; callers hand in exactly the
/// regions to read and write.
pub trait DataEncryptionKey: Send + Sync + std::fmt::Debug {
    /// Exact ciphertext length produced for `plaintext_len` bytes of input.
    fn ciphertext_length(&self, plaintext_len: usize) -> usize;

    /// Upper bound on the plaintext recovered from `ciphertext_len` bytes.
    ///
    /// The exact length is only known after unpadding; [`Self::decrypt`]
    /// returns the number of bytes actually written.
    fn plaintext_length(&self, ciphertext_len: usize) -> usize;

    /// Encrypts `plaintext` into `output`, returning the bytes written.
    ///
    /// `output` must be exactly [`Self::ciphertext_length`] of the input.
    fn encrypt(&self, plaintext: &[u8], output: &mut [u8]) -> Result<usize>;

    /// Authenticates and decrypts `ciphertext` into `output`, returning the
    /// bytes written.
    ///
    /// `output` must hold at least [`Self::plaintext_length`] bytes.
    fn decrypt(&self, ciphertext: &[u8], output: &mut [u8]) -> Result<usize>;
}

/// Resolves key ids to key handles.
///
/// Implementations are shared across calls and must be safe for concurrent
/// use; the codec fetches lazily, once per call, and drops the handle at
/// call end.
#[async_trait::async_trait]
pub trait KeyProvider: Send + Sync {
    /// Fetches the data-encryption key for `key_id` under `algorithm`.
    ///
    /// # Errors
    ///
    /// [`crate::Error::KeyUnknown`] when the id does not resolve;
    /// provider-specific failures otherwise.
    async fn get_key(&self, key_id: &str, algorithm: EncryptionAlgorithm) -> Result<Arc<dyn DataEncryptionKey>>;
}
