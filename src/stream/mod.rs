//! Stream processor: rewrites a document without materializing it.
//!
//! The scanner walks the root object's members as raw byte spans; only
//! protected values are parsed in isolation, sealed, and re-emitted — every
//! other member is copied through verbatim. Output grows inside a pooled
//! buffer that is detached to the caller on success.
//!
//! Decryption needs the sidecar before the rewrite starts, so it runs a
//! cheap pre-pass ([`find_metadata`]) that scans members until `_ei` turns
//! up, then a second pass performs the actual rewrite.

use std::collections::HashMap;
use std::sync::Arc;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::config::METADATA_PROPERTY;
use crate::error::{Error, Result};
use crate::metadata::EncryptionMetadata;
use crate::options::EncryptionOptions;
use crate::pipeline::PropertyPipeline;
use crate::pool::BufferPool;
use crate::stream::reader::{JsonScanner, ValueKind};
use crate::stream::writer::JsonWriter;
use crate::types::CompressionAlgorithm;

pub(crate) mod reader;
pub(crate) mod writer;

/// Extra headroom over the input size when sizing the output buffer;
/// covers base64 growth and the sidecar for typical documents.
const OUTPUT_HEADROOM: usize = 512;

/// Locates and parses the sidecar without rewriting anything.
///
/// # Errors
///
/// Propagates scanner violations and a sidecar that does not parse.
pub(crate) fn find_metadata(input: &[u8]) -> Result<Option<EncryptionMetadata>> {
    let mut scanner = JsonScanner::new(input);
    scanner.begin_object()?;
    while let Some(member) = scanner.next_member()? {
        if member.name == METADATA_PROPERTY {
            let metadata = serde_json::from_slice(member.value_span).map_err(|e| Error::format(METADATA_PROPERTY, format!("sidecar does not parse: {e}")))?;
            return Ok(Some(metadata));
        }
    }
    Ok(None)
}

/// Encrypts the requested properties in one streaming pass.
///
/// Returns the rewritten document, or a verbatim copy of the input when no
/// requested property qualified.
pub(crate) fn encrypt_document(input: &[u8], pipeline: &PropertyPipeline<'_>, options: &EncryptionOptions, pool: &Arc<BufferPool>, token: &CancellationToken) -> Result<Vec<u8>> {
    let paths_by_name: HashMap<&str, &str> = options.paths_to_encrypt.iter().map(|p| (&p[1..], p.as_str())).collect();
    let compression_algorithm = options.effective_compression().map_or(CompressionAlgorithm::None, |c| c.algorithm);
    let mut metadata = EncryptionMetadata::randomized(&options.key_id, compression_algorithm);

    let mut scanner = JsonScanner::new(input);
    scanner.begin_object()?;

    let mut out = pool.rent(input.len() + OUTPUT_HEADROOM);
    {
        let mut writer = JsonWriter::new(&mut out);
        writer.begin_object();

        while let Some(member) = scanner.next_member()? {
            if token.is_cancelled() {
                return Err(Error::Cancelled);
            }

            match paths_by_name.get(member.name.as_str()) {
                Some(path) if member.kind != ValueKind::Null => {
                    // Only the protected value is ever parsed.
                    let plain: Value = serde_json::from_slice(member.value_span).map_err(|e| Error::format(*path, format!("value does not parse: {e}")))?;
                    let sealed = pipeline.seal(&plain, path)?;
                    if let Some(original_len) = sealed.compressed_len {
                        metadata.compressed_paths.insert((*path).to_owned(), original_len as u64);
                    }
                    writer.member_base64(member.name_span, &sealed.blob);
                    metadata.encrypted_paths.push((*path).to_owned());
                    tracing::trace!(path, "sealed property");
                }
                _ => writer.member_raw(member.name_span, member.value_span),
            }
        }
        scanner.finish()?;

        if metadata.encrypted_paths.is_empty() {
            return Ok(input.to_vec());
        }

        metadata.finalize_version();
        writer.member_named_value(METADATA_PROPERTY, &metadata.to_value()?)?;
        writer.end_object();
    }

    Ok(out.into_inner())
}

/// Decrypts the sidecar-listed properties in one rewrite pass.
///
/// The caller has already located the sidecar via [`find_metadata`] and
/// fetched the key. Returns the rewritten document and the restored paths.
pub(crate) fn decrypt_document(input: &[u8], pipeline: &PropertyPipeline<'_>, metadata: &EncryptionMetadata, pool: &Arc<BufferPool>, token: &CancellationToken) -> Result<(Vec<u8>, Vec<String>)> {
    let paths_by_name: HashMap<&str, &str> = metadata.encrypted_paths.iter().map(|p| (p.strip_prefix('/').unwrap_or(p), p.as_str())).collect();
    let mut decrypted = Vec::with_capacity(metadata.encrypted_paths.len());

    let mut scanner = JsonScanner::new(input);
    scanner.begin_object()?;

    let mut out = pool.rent(input.len());
    {
        let mut writer = JsonWriter::new(&mut out);
        writer.begin_object();

        while let Some(member) = scanner.next_member()? {
            if token.is_cancelled() {
                return Err(Error::Cancelled);
            }

            if member.name == METADATA_PROPERTY {
                continue;
            }

            match paths_by_name.get(member.name.as_str()) {
                Some(path) if member.kind == ValueKind::String => {
                    let encoded: String = serde_json::from_slice(member.value_span).map_err(|e| Error::format(*path, format!("ciphertext string does not parse: {e}")))?;
                    let blob = BASE64.decode(&encoded).map_err(|e| Error::format(*path, format!("ciphertext is not valid base64: {e}")))?;
                    let restored = pipeline.unseal(&blob, metadata.compressed_paths.get(*path).copied(), metadata.compression_algorithm, path)?;
                    writer.member_value(member.name_span, &restored)?;
                    decrypted.push((*path).to_owned());
                    tracing::trace!(path, "restored property");
                }
                // Listed but not a string: left untouched, like the tree
                // processor does.
                _ => writer.member_raw(member.name_span, member.value_span),
            }
        }
        scanner.finish()?;
        writer.end_object();
    }

    Ok((out.into_inner(), decrypted))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::config::{FORMAT_VERSION_COMPRESSED, ROOT_KEY_LEN};
    use crate::crypto::AeadCbcHmacKey;
    use crate::options::CompressionOptions;
    use crate::types::EncryptionAlgorithm;

    fn key() -> AeadCbcHmacKey {
        AeadCbcHmacKey::new(&[6u8; ROOT_KEY_LEN]).unwrap()
    }

    fn options(paths: &[&str]) -> EncryptionOptions {
        EncryptionOptions::new("k1", EncryptionAlgorithm::RandomizedAeadCbcHmac, paths.iter().map(ToString::to_string).collect())
    }

    #[test]
    fn test_streaming_roundtrip() {
        let key = key();
        let pipeline = PropertyPipeline::new(&key, None).unwrap();
        let pool = BufferPool::new();
        let token = CancellationToken::new();
        let opts = options(&["/s", "/n", "/a"]);

        let input = br#"{"id": "1", "s": "hello", "n": 42, "a": [1, {"k": "v"}], "rest": {"deep": [true, null]}}"#;
        let encrypted = encrypt_document(input, &pipeline, &opts, &pool, &token).unwrap();

        let encrypted_doc: Value = serde_json::from_slice(&encrypted).unwrap();
        assert_eq!(encrypted_doc["id"], "1");
        assert!(encrypted_doc["s"].is_string());
        assert_ne!(encrypted_doc["s"], "hello");
        assert!(encrypted_doc["n"].is_string());
        assert_eq!(encrypted_doc["rest"], json!({"deep": [true, null]}));

        let metadata = find_metadata(&encrypted).unwrap().unwrap();
        assert_eq!(metadata.encrypted_paths, vec!["/s", "/n", "/a"]);

        let (decrypted, restored_paths) = decrypt_document(&encrypted, &pipeline, &metadata, &pool, &token).unwrap();
        assert_eq!(restored_paths, vec!["/s", "/n", "/a"]);
        let decrypted_doc: Value = serde_json::from_slice(&decrypted).unwrap();
        assert_eq!(decrypted_doc, serde_json::from_slice::<Value>(input).unwrap());
    }

    #[test]
    fn test_nothing_qualifying_returns_input_verbatim() {
        let key = key();
        let pipeline = PropertyPipeline::new(&key, None).unwrap();
        let pool = BufferPool::new();
        let token = CancellationToken::new();

        let input = br#"{"id": "1", "x": null}"#;
        let output = encrypt_document(input, &pipeline, &options(&["/x", "/gone"]), &pool, &token).unwrap();
        assert_eq!(output, input);
    }

    #[test]
    fn test_compressed_streaming_roundtrip() {
        let key = key();
        let long = "the quick brown fox jumps over the lazy dog ".repeat(16);
        let opts = options(&["/s"]).with_compression(CompressionOptions { minimum_size: 64, ..CompressionOptions::default() });
        let pipeline = PropertyPipeline::new(&key, opts.effective_compression()).unwrap();
        let pool = BufferPool::new();
        let token = CancellationToken::new();

        let input = serde_json::to_vec(&json!({"id": "1", "s": long})).unwrap();
        let encrypted = encrypt_document(&input, &pipeline, &opts, &pool, &token).unwrap();

        let metadata = find_metadata(&encrypted).unwrap().unwrap();
        assert_eq!(metadata.format_version, FORMAT_VERSION_COMPRESSED);
        assert_eq!(metadata.compressed_paths.get("/s").copied(), Some(long.len() as u64));

        let (decrypted, _) = decrypt_document(&encrypted, &pipeline, &metadata, &pool, &token).unwrap();
        let decrypted_doc: Value = serde_json::from_slice(&decrypted).unwrap();
        assert_eq!(decrypted_doc["s"], json!(long));
    }

    #[test]
    fn test_find_metadata_absent() {
        assert!(find_metadata(br#"{"id": "1"}"#).unwrap().is_none());
    }

    #[test]
    fn test_decrypt_strips_sidecar_and_keeps_member_order() {
        let key = key();
        let pipeline = PropertyPipeline::new(&key, None).unwrap();
        let pool = BufferPool::new();
        let token = CancellationToken::new();
        let opts = options(&["/b"]);

        let input = br#"{"a": 1, "b": "secret", "c": 3}"#;
        let encrypted = encrypt_document(input, &pipeline, &opts, &pool, &token).unwrap();
        let metadata = find_metadata(&encrypted).unwrap().unwrap();
        let (decrypted, _) = decrypt_document(&encrypted, &pipeline, &metadata, &pool, &token).unwrap();

        let text = String::from_utf8(decrypted).unwrap();
        assert!(!text.contains(METADATA_PROPERTY));
        let a = text.find("\"a\"").unwrap();
        let b = text.find("\"b\"").unwrap();
        let c = text.find("\"c\"").unwrap();
        assert!(a < b && b < c);
    }

    #[test]
    fn test_cancellation_is_observed() {
        let key = key();
        let pipeline = PropertyPipeline::new(&key, None).unwrap();
        let pool = BufferPool::new();
        let token = CancellationToken::new();
        token.cancel();

        let result = encrypt_document(br#"{"s": "x"}"#, &pipeline, &options(&["/s"]), &pool, &token);
        assert!(matches!(result, Err(Error::Cancelled)));
    }
}
