//! fieldseal - Field-level encryption codec for JSON documents.
//!
//! Seals selected top-level properties of a JSON document into
//! self-describing ciphertext blobs and records a sidecar (`_ei`) so a
//! compatible reader can restore the original document exactly:
//! - AES-256-CBC + HMAC-SHA256 encrypt-then-MAC per value, randomized IVs
//! - Typed serialization so booleans, integers, doubles, strings, arrays,
//!   and objects round-trip losslessly
//! - Optional deflate/gzip/brotli compression above a size threshold
//! - Tree (parsed) and stream (token-rewrite) processors with pooled buffers
//! - Legacy whole-object mode for format-version-2 documents
//!
//! ```no_run
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//! use fieldseal::{AeadCbcHmacKey, EncryptionAlgorithm, EncryptionOptions, Processor, StaticKeyProvider};
//!
//! # async fn demo() -> fieldseal::Result<()> {
//! let key = Arc::new(AeadCbcHmacKey::new(&[0u8; 64])?);
//! let processor = Processor::new(Arc::new(StaticKeyProvider::new().with_key("k1", key)));
//!
//! let options = EncryptionOptions::new("k1", EncryptionAlgorithm::RandomizedAeadCbcHmac, vec!["/ssn".into()]);
//! let token = CancellationToken::new();
//! let sealed = processor.encrypt(br#"{"id":"1","ssn":"000-00-0000"}"#, &options, &token).await?;
//! let (_restored, _report) = processor.decrypt(&sealed, &token).await?;
//! # Ok(())
//! # }
//! ```

pub mod compression;
pub mod config;
pub mod crypto;
pub mod error;
pub mod header;
pub mod metadata;
pub mod options;
pub mod pool;
pub mod processor;
pub mod types;
pub mod value;

mod legacy;
mod pipeline;
mod stream;
mod tree;

pub use crypto::{AeadCbcHmacKey, DataEncryptionKey, KeyProvider, StaticKeyProvider};
pub use error::{Error, Result};
pub use metadata::EncryptionMetadata;
pub use options::{CompressionOptions, EncryptionOptions};
pub use pool::{BufferPool, PooledBuffer};
pub use processor::Processor;
pub use types::{CompressionAlgorithm, CompressionLevel, DecryptionReport, EncryptionAlgorithm, JsonProcessor, TypeMarker};
