//! Pre-encryption compression of serialized values.
//!
//! Compression runs per property, before encryption, and only when the
//! serialized payload reaches the configured threshold. One algorithm
//! serves the whole document; the sidecar records which. Deflate and gzip
//! go through `flate2`, brotli through the `brotli` crate.
//!
//! # Security Note
//!
//! Compressing before encryption can leak plaintext structure through
//! output sizes when an attacker controls part of the plaintext. For
//! data-at-rest document storage this is an accepted trade; callers who
//! co-mingle attacker-controlled and secret data in one property should
//! disable compression.

use std::io::{Read, Write};

use flate2::Compression;
use flate2::read::{DeflateDecoder, GzDecoder};
use flate2::write::{DeflateEncoder, GzEncoder};

use crate::error::{Error, Result};
use crate::types::{CompressionAlgorithm, CompressionLevel};

/// Brotli sliding window size (log2); the crate's recommended default.
const BROTLI_LG_WINDOW: u32 = 22;

/// Brotli internal buffer size for the stream wrappers.
const BROTLI_BUFFER: usize = 4096;

impl CompressionLevel {
    /// Maps the level onto flate2's 0–9 scale.
    fn flate(self) -> Compression {
        match self {
            Self::Fast => Compression::fast(),
            Self::Default => Compression::default(),
            Self::Best => Compression::best(),
        }
    }

    /// Maps the level onto brotli's 0–11 quality scale.
    fn brotli(self) -> u32 {
        match self {
            Self::Fast => 1,
            Self::Default => 6,
            Self::Best => 11,
        }
    }
}

/// A configured compressor for the encrypt path.
pub struct Compressor {
    algorithm: CompressionAlgorithm,
    level: CompressionLevel,
}

impl Compressor {
    /// Creates a compressor for the given algorithm and level.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] for `CompressionAlgorithm::None`;
    /// callers decide up front whether to compress at all.
    pub fn new(algorithm: CompressionAlgorithm, level: CompressionLevel) -> Result<Self> {
        if algorithm == CompressionAlgorithm::None {
            return Err(Error::InvalidArgument("compressor requires a concrete algorithm".into()));
        }
        Ok(Self { algorithm, level })
    }

    /// Compresses a serialized payload.
    ///
    /// # Errors
    ///
    /// Backend failures on the encrypt path surface as [`Error::Internal`];
    /// the input is our own serialization output, so they indicate a bug or
    /// resource exhaustion rather than bad data.
    pub fn compress(&self, data: &[u8]) -> Result<Vec<u8>> {
        let internal = |e: std::io::Error| Error::Internal(format!("{} compression failed: {e}", self.algorithm));

        match self.algorithm {
            CompressionAlgorithm::None => Err(Error::Internal("compressor constructed without an algorithm".into())),
            CompressionAlgorithm::Deflate => {
                let mut encoder = DeflateEncoder::new(Vec::new(), self.level.flate());
                encoder.write_all(data).map_err(internal)?;
                encoder.finish().map_err(internal)
            }
            CompressionAlgorithm::Gzip => {
                let mut encoder = GzEncoder::new(Vec::new(), self.level.flate());
                encoder.write_all(data).map_err(internal)?;
                encoder.finish().map_err(internal)
            }
            CompressionAlgorithm::Brotli => {
                let mut out = Vec::new();
                {
                    let mut encoder = brotli::CompressorWriter::new(&mut out, BROTLI_BUFFER, self.level.brotli(), BROTLI_LG_WINDOW);
                    encoder.write_all(data).map_err(internal)?;
                    encoder.flush().map_err(internal)?;
                }
                Ok(out)
            }
        }
    }
}

/// Decompresses a payload recovered from a sealed value.
///
/// `original_len` is the pre-compression length recorded in the sidecar; it
/// sizes the output buffer and is verified against what actually came out.
/// `context` names the property path for error messages.
///
/// # Errors
///
/// Returns [`Error::FormatViolation`] for corrupt compressed bytes or a
/// recovered length that contradicts the sidecar, and
/// [`Error::InvalidArgument`] for `CompressionAlgorithm::None`.
pub fn decompress(algorithm: CompressionAlgorithm, data: &[u8], original_len: usize, context: &str) -> Result<Vec<u8>> {
    let violation = |e: std::io::Error| Error::format(context, format!("{algorithm} decompression failed: {e}"));

    let mut out = Vec::with_capacity(original_len);
    match algorithm {
        CompressionAlgorithm::None => return Err(Error::InvalidArgument("cannot decompress without an algorithm".into())),
        CompressionAlgorithm::Deflate => {
            DeflateDecoder::new(data).read_to_end(&mut out).map_err(violation)?;
        }
        CompressionAlgorithm::Gzip => {
            GzDecoder::new(data).read_to_end(&mut out).map_err(violation)?;
        }
        CompressionAlgorithm::Brotli => {
            brotli::Decompressor::new(data, BROTLI_BUFFER).read_to_end(&mut out).map_err(violation)?;
        }
    }

    if out.len() != original_len {
        return Err(Error::format(context, format!("decompressed to {} bytes, sidecar recorded {original_len}", out.len())));
    }

    Ok(out)
}
