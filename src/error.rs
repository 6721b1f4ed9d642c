//! Error types surfaced by the codec.
//!
//! Every failure policy maps to one distinct variant so callers can react
//! per kind instead of parsing messages. Collaborator failures (key
//! provider, compression backend, JSON parsing) are wrapped with the path
//! or operation they occurred in, never retried.

use crate::config::{FORMAT_VERSION_COMPRESSED, FORMAT_VERSION_LEGACY};

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced while encrypting or decrypting a document.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A request parameter is structurally unusable (empty key id, missing
    /// compression backend, compression requested for the legacy algorithm).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A path in `paths_to_encrypt` violates the `/<name>` shape, names the
    /// reserved identifier, or repeats an earlier path.
    #[error("invalid path {path:?}: {reason}")]
    InvalidPath {
        /// The offending path as supplied by the caller.
        path: String,
        /// Why the path was rejected.
        reason: String,
    },

    /// The requested algorithm cannot serve the requested mode.
    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// The sidecar declares a format version this build does not implement.
    #[error(
        "unsupported encryption format version {0}: this reader handles versions \
         {FORMAT_VERSION_LEGACY} through {FORMAT_VERSION_COMPRESSED}; upgrade the client to decrypt this document"
    )]
    UnsupportedFormatVersion(u8),

    /// Encrypted bytes are inconsistent with the declared framing: bad
    /// base64, unknown type marker, truncated or surplus payload bytes.
    #[error("format violation at {context}: {reason}")]
    FormatViolation {
        /// Path or operation where the violation was detected.
        context: String,
        /// What was inconsistent.
        reason: String,
    },

    /// Authenticated decryption rejected the ciphertext.
    #[error("authentication failed at {0}")]
    AuthFailed(String),

    /// The sidecar and the per-value framing disagree about compression.
    #[error("compression mismatch at {context}: {reason}")]
    CompressionMismatch {
        /// Path where the disagreement was detected.
        context: String,
        /// Which side declared what.
        reason: String,
    },

    /// Cancellation was observed at a yield point; pooled buffers have been
    /// released and no output was produced.
    #[error("operation cancelled")]
    Cancelled,

    /// The key provider does not know the requested key id.
    #[error("unknown data encryption key {0:?}")]
    KeyUnknown(String),

    /// A bug-level inconsistency: unexpected writer state, pool misuse, or a
    /// compressor failing on the encrypt path.
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Builds a [`Error::FormatViolation`] with the given context.
    pub(crate) fn format(context: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::FormatViolation { context: context.into(), reason: reason.into() }
    }

    /// Builds a [`Error::InvalidPath`] for the given path.
    pub(crate) fn path(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPath { path: path.into(), reason: reason.into() }
    }
}
