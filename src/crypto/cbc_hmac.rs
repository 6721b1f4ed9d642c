//! AES-256-CBC + HMAC-SHA256 data-encryption key.
//!
//! Encrypt-then-MAC with independent key halves:
//!
//! ```text
//! [IV (16 bytes)] [AES-256-CBC ciphertext, PKCS7 padded] [HMAC-SHA256 tag (32 bytes)]
//! ```
//!
//! The tag covers IV and ciphertext. A fresh random IV per value makes the
//! scheme randomized: equal plaintexts produce unrelated ciphertexts across
//! invocations. Verification is constant-time and happens before any
//! decryption work.

use aes::cipher::block_padding::Pkcs7;
use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use hmac::{Hmac, Mac};
use rand::TryRng;
use rand::rngs::SysRng;
use secrecy::{ExposeSecret, SecretBox};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::config::{AES_BLOCK_SIZE, ENC_KEY_LEN, IV_SIZE, MAC_KEY_LEN, MAC_SIZE, ROOT_KEY_LEN};
use crate::crypto::DataEncryptionKey;
use crate::error::{Error, Result};

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;
type HmacSha256 = Hmac<Sha256>;

/// Data-encryption key backed by AES-256-CBC and HMAC-SHA256.
#[derive(Debug)]
pub struct AeadCbcHmacKey {
    /// AES-256 key, first half of the root key material.
    enc_key: SecretBox<[u8; ENC_KEY_LEN]>,

    /// HMAC key, second half of the root key material.
    mac_key: SecretBox<[u8; MAC_KEY_LEN]>,
}

impl AeadCbcHmacKey {
    /// Builds a key from 64 bytes of root material.
    ///
    /// The halves are independent: bytes 0..32 encrypt, bytes 32..64
    /// authenticate.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] when the material is not exactly
    /// 64 bytes.
    pub fn new(root_key: &[u8]) -> Result<Self> {
        if root_key.len() != ROOT_KEY_LEN {
            return Err(Error::InvalidArgument(format!("root key must be {ROOT_KEY_LEN} bytes, got {}", root_key.len())));
        }

        let enc_key: [u8; ENC_KEY_LEN] = root_key[..ENC_KEY_LEN].try_into().map_err(|_| Error::Internal("key split failed".into()))?;
        let mac_key: [u8; MAC_KEY_LEN] = root_key[ENC_KEY_LEN..].try_into().map_err(|_| Error::Internal("key split failed".into()))?;

        Ok(Self { enc_key: SecretBox::new(Box::new(enc_key)), mac_key: SecretBox::new(Box::new(mac_key)) })
    }

    /// Computes the tag over IV and ciphertext.
    fn tag(&self, iv_and_ciphertext: &[u8]) -> Result<[u8; MAC_SIZE]> {
        let mut mac = HmacSha256::new_from_slice(self.mac_key.expose_secret()).map_err(|e| Error::Internal(format!("hmac init failed: {e}")))?;
        mac.update(iv_and_ciphertext);
        Ok(mac.finalize().into_bytes().into())
    }
}

impl DataEncryptionKey for AeadCbcHmacKey {
    fn ciphertext_length(&self, plaintext_len: usize) -> usize {
        // PKCS7 always pads, so a full-block input still grows by one block.
        let padded = (plaintext_len / AES_BLOCK_SIZE + 1) * AES_BLOCK_SIZE;
        IV_SIZE + padded + MAC_SIZE
    }

    fn plaintext_length(&self, ciphertext_len: usize) -> usize {
        ciphertext_len.saturating_sub(IV_SIZE + MAC_SIZE)
    }

    fn encrypt(&self, plaintext: &[u8], output: &mut [u8]) -> Result<usize> {
        let expected = self.ciphertext_length(plaintext.len());
        if output.len() != expected {
            return Err(Error::Internal(format!("encrypt output buffer is {} bytes, need {expected}", output.len())));
        }

        let mut iv = [0u8; IV_SIZE];
        SysRng.try_fill_bytes(&mut iv).map_err(|e| Error::Internal(format!("iv generation failed: {e}")))?;

        let ciphertext = Aes256CbcEnc::new(self.enc_key.expose_secret().into(), &iv.into()).encrypt_padded_vec_mut::<Pkcs7>(plaintext);

        let mac_offset = IV_SIZE + ciphertext.len();
        output[..IV_SIZE].copy_from_slice(&iv);
        output[IV_SIZE..mac_offset].copy_from_slice(&ciphertext);
        let tag = self.tag(&output[..mac_offset])?;
        output[mac_offset..].copy_from_slice(&tag);

        Ok(expected)
    }

    fn decrypt(&self, ciphertext: &[u8], output: &mut [u8]) -> Result<usize> {
        // Smallest valid message: IV, one padded block, tag.
        if ciphertext.len() < IV_SIZE + AES_BLOCK_SIZE + MAC_SIZE {
            return Err(Error::format("ciphertext", format!("{} bytes is below the minimum sealed size", ciphertext.len())));
        }

        let (body, expected_tag) = ciphertext.split_at(ciphertext.len() - MAC_SIZE);
        let computed_tag = self.tag(body)?;
        if !bool::from(computed_tag[..].ct_eq(expected_tag)) {
            return Err(Error::AuthFailed("authentication tag mismatch".into()));
        }

        let (iv, encrypted) = body.split_at(IV_SIZE);
        let iv: [u8; IV_SIZE] = iv.try_into().map_err(|_| Error::Internal("iv split failed".into()))?;
        let plaintext = Aes256CbcDec::new(self.enc_key.expose_secret().into(), &iv.into())
            .decrypt_padded_vec_mut::<Pkcs7>(encrypted)
            .map_err(|_| Error::AuthFailed("padding check failed after tag verification".into()))?;

        if output.len() < plaintext.len() {
            return Err(Error::Internal(format!("decrypt output buffer is {} bytes, need {}", output.len(), plaintext.len())));
        }
        output[..plaintext.len()].copy_from_slice(&plaintext);

        Ok(plaintext.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> AeadCbcHmacKey {
        AeadCbcHmacKey::new(&[7u8; ROOT_KEY_LEN]).unwrap()
    }

    #[test]
    fn test_rejects_short_root_key() {
        assert!(matches!(AeadCbcHmacKey::new(&[0u8; 32]), Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn test_roundtrip() {
        let key = key();
        let plaintext = b"sealed property payload";

        let mut ciphertext = vec![0u8; key.ciphertext_length(plaintext.len())];
        let written = key.encrypt(plaintext, &mut ciphertext).unwrap();
        assert_eq!(written, ciphertext.len());

        let mut recovered = vec![0u8; key.plaintext_length(ciphertext.len())];
        let len = key.decrypt(&ciphertext, &mut recovered).unwrap();
        assert_eq!(&recovered[..len], plaintext);
    }

    #[test]
    fn test_ciphertext_length_is_deterministic() {
        let key = key();
        // Full block still grows by one padding block.
        assert_eq!(key.ciphertext_length(16), IV_SIZE + 32 + MAC_SIZE);
        assert_eq!(key.ciphertext_length(0), IV_SIZE + 16 + MAC_SIZE);
        assert_eq!(key.ciphertext_length(17), IV_SIZE + 32 + MAC_SIZE);
    }

    #[test]
    fn test_randomized_ciphertexts() {
        let key = key();
        let plaintext = b"same plaintext";
        let mut first = vec![0u8; key.ciphertext_length(plaintext.len())];
        let mut second = vec![0u8; key.ciphertext_length(plaintext.len())];
        key.encrypt(plaintext, &mut first).unwrap();
        key.encrypt(plaintext, &mut second).unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn test_tampered_ciphertext_fails_auth() {
        let key = key();
        let plaintext = b"do not touch";
        let mut ciphertext = vec![0u8; key.ciphertext_length(plaintext.len())];
        key.encrypt(plaintext, &mut ciphertext).unwrap();

        ciphertext[IV_SIZE] ^= 0x01;
        let mut out = vec![0u8; key.plaintext_length(ciphertext.len())];
        assert!(matches!(key.decrypt(&ciphertext, &mut out), Err(Error::AuthFailed(_))));
    }

    #[test]
    fn test_tampered_tag_fails_auth() {
        let key = key();
        let plaintext = b"do not touch";
        let mut ciphertext = vec![0u8; key.ciphertext_length(plaintext.len())];
        key.encrypt(plaintext, &mut ciphertext).unwrap();

        let last = ciphertext.len() - 1;
        ciphertext[last] ^= 0x01;
        let mut out = vec![0u8; key.plaintext_length(ciphertext.len())];
        assert!(matches!(key.decrypt(&ciphertext, &mut out), Err(Error::AuthFailed(_))));
    }

    #[test]
    fn test_truncated_ciphertext_is_a_format_violation() {
        let key = key();
        let mut out = vec![0u8; 64];
        assert!(matches!(key.decrypt(&[0u8; 32], &mut out), Err(Error::FormatViolation { .. })));
    }

    #[test]
    fn test_wrong_key_fails_auth() {
        let plaintext = b"wrong key test";
        let mut ciphertext = vec![0u8; key().ciphertext_length(plaintext.len())];
        key().encrypt(plaintext, &mut ciphertext).unwrap();

        let other = AeadCbcHmacKey::new(&[8u8; ROOT_KEY_LEN]).unwrap();
        let mut out = vec![0u8; other.plaintext_length(ciphertext.len())];
        assert!(matches!(other.decrypt(&ciphertext, &mut out), Err(Error::AuthFailed(_))));
    }
}
