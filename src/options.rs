//! Per-request options and their validation.
//!
//! Options are immutable for the duration of one encrypt call. Validation
//! happens once, up front, before any key material is fetched; every
//! rejection maps to a distinct error variant so callers can tell a typo in
//! a path apart from an unusable algorithm choice.

use std::collections::HashSet;

use crate::config::{DEFAULT_MIN_COMPRESSION_SIZE, RESERVED_ID_PATH};
use crate::error::{Error, Result};
use crate::types::{CompressionAlgorithm, CompressionLevel, EncryptionAlgorithm, JsonProcessor};

/// Compression settings for values that cross the size threshold.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CompressionOptions {
    /// Backend used for every compressed property of the document.
    pub algorithm: CompressionAlgorithm,

    /// Effort level handed to the backend.
    pub level: CompressionLevel,

    /// Serialized payloads strictly shorter than this are left uncompressed.
    pub minimum_size: usize,
}

impl Default for CompressionOptions {
    fn default() -> Self {
        Self { algorithm: CompressionAlgorithm::Deflate, level: CompressionLevel::Fast, minimum_size: DEFAULT_MIN_COMPRESSION_SIZE }
    }
}

/// Parameters of one encryption request.
#[derive(Clone, Debug)]
pub struct EncryptionOptions {
    /// Identifier resolved by the key provider.
    pub key_id: String,

    /// Encryption mode for the document.
    pub algorithm: EncryptionAlgorithm,

    /// Top-level properties to protect, each of the form `/<name>`.
    pub paths_to_encrypt: Vec<String>,

    /// Optional pre-encryption compression. `None` and
    /// `CompressionAlgorithm::None` both mean "never compress".
    pub compression: Option<CompressionOptions>,

    /// Tree or stream rewrite strategy.
    pub processor: JsonProcessor,
}

impl EncryptionOptions {
    /// Creates options with no compression and the tree processor.
    pub fn new(key_id: impl Into<String>, algorithm: EncryptionAlgorithm, paths_to_encrypt: Vec<String>) -> Self {
        Self { key_id: key_id.into(), algorithm, paths_to_encrypt, compression: None, processor: JsonProcessor::Tree }
    }

    /// Enables compression for this request.
    #[must_use]
    pub fn with_compression(mut self, compression: CompressionOptions) -> Self {
        self.compression = Some(compression);
        self
    }

    /// Selects the rewrite strategy.
    #[must_use]
    pub fn with_processor(mut self, processor: JsonProcessor) -> Self {
        self.processor = processor;
        self
    }

    /// Returns the compression settings if this request can actually
    /// compress anything.
    pub(crate) fn effective_compression(&self) -> Option<&CompressionOptions> {
        self.compression.as_ref().filter(|c| c.algorithm != CompressionAlgorithm::None)
    }

    /// Validates the whole request.
    ///
    /// Paths are checked in input order; each path's syntax is verified
    /// first, then it is tested against the previously accepted set, so a
    /// malformed duplicate reports the syntax problem.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidArgument`] for an empty key id or compression
    ///   requested alongside the legacy algorithm
    /// - [`Error::InvalidPath`] for malformed, reserved, or duplicate paths
    /// - [`Error::UnsupportedAlgorithm`] when the legacy algorithm is paired
    ///   with the stream processor
    pub(crate) fn validate(&self) -> Result<()> {
        if self.key_id.is_empty() {
            return Err(Error::InvalidArgument("data encryption key id must not be empty".into()));
        }

        let mut seen: HashSet<&str> = HashSet::with_capacity(self.paths_to_encrypt.len());
        for path in &self.paths_to_encrypt {
            validate_path_syntax(path)?;
            if !seen.insert(path.as_str()) {
                return Err(Error::path(path, "duplicate path"));
            }
        }

        if self.algorithm == EncryptionAlgorithm::LegacyAeadCbcHmac {
            if self.effective_compression().is_some() {
                return Err(Error::InvalidArgument("the legacy algorithm does not support compression".into()));
            }
            if self.processor == JsonProcessor::Stream {
                return Err(Error::UnsupportedAlgorithm(format!("{} cannot be used with the stream processor", self.algorithm)));
            }
        }

        Ok(())
    }
}

/// Checks one path against the `/<name>` shape.
fn validate_path_syntax(path: &str) -> Result<()> {
    if !path.starts_with('/') {
        return Err(Error::path(path, "must start with '/'"));
    }
    if path.len() == 1 {
        return Err(Error::path(path, "property name is empty"));
    }
    if path[1..].contains('/') {
        return Err(Error::path(path, "only top-level properties can be encrypted"));
    }
    if path == RESERVED_ID_PATH {
        return Err(Error::path(path, "the identifier property is reserved"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(paths: &[&str]) -> EncryptionOptions {
        EncryptionOptions::new("k1", EncryptionAlgorithm::RandomizedAeadCbcHmac, paths.iter().map(ToString::to_string).collect())
    }

    #[test]
    fn test_valid_request() {
        assert!(options(&["/name", "/ssn"]).validate().is_ok());
    }

    #[test]
    fn test_empty_key_id() {
        let mut opts = options(&["/name"]);
        opts.key_id = String::new();
        assert!(matches!(opts.validate(), Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn test_path_must_start_with_slash() {
        assert!(matches!(options(&["name"]).validate(), Err(Error::InvalidPath { .. })));
    }

    #[test]
    fn test_path_rejects_nested() {
        assert!(matches!(options(&["/a/b"]).validate(), Err(Error::InvalidPath { .. })));
    }

    #[test]
    fn test_path_rejects_reserved_id() {
        assert!(matches!(options(&["/id"]).validate(), Err(Error::InvalidPath { .. })));
    }

    #[test]
    fn test_path_rejects_duplicates() {
        assert!(matches!(options(&["/a", "/a"]).validate(), Err(Error::InvalidPath { .. })));
    }

    #[test]
    fn test_malformed_duplicate_reports_syntax() {
        let err = options(&["bad", "bad"]).validate().unwrap_err();
        match err {
            Error::InvalidPath { reason, .. } => assert!(reason.contains("start with")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_legacy_rejects_compression() {
        let opts = EncryptionOptions::new("k1", EncryptionAlgorithm::LegacyAeadCbcHmac, vec!["/a".into()]).with_compression(CompressionOptions::default());
        assert!(matches!(opts.validate(), Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn test_legacy_rejects_stream_processor() {
        let opts = EncryptionOptions::new("k1", EncryptionAlgorithm::LegacyAeadCbcHmac, vec!["/a".into()]).with_processor(JsonProcessor::Stream);
        assert!(matches!(opts.validate(), Err(Error::UnsupportedAlgorithm(_))));
    }

    #[test]
    fn test_legacy_allows_explicit_none_compression() {
        let compression = CompressionOptions { algorithm: CompressionAlgorithm::None, ..CompressionOptions::default() };
        let opts = EncryptionOptions::new("k1", EncryptionAlgorithm::LegacyAeadCbcHmac, vec!["/a".into()]).with_compression(compression);
        assert!(opts.validate().is_ok());
    }
}
