//! Output writer for the streaming rewrite.
//!
//! Appends members to a caller-provided buffer, inserting separators and
//! handling the three member shapes the processors need: verbatim raw
//! copies, base64 ciphertext strings, and typed JSON values.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde_json::Value;

use crate::error::{Error, Result};

/// Member-by-member writer over an output buffer.
pub(crate) struct JsonWriter<'a> {
    out: &'a mut Vec<u8>,
    members: usize,
}

impl<'a> JsonWriter<'a> {
    pub fn new(out: &'a mut Vec<u8>) -> Self {
        Self { out, members: 0 }
    }

    pub fn begin_object(&mut self) {
        self.out.push(b'{');
    }

    pub fn end_object(&mut self) {
        self.out.push(b'}');
    }

    /// Copies a member through from the original bytes.
    pub fn member_raw(&mut self, name_span: &[u8], value_span: &[u8]) {
        self.separator();
        self.out.extend_from_slice(name_span);
        self.out.push(b':');
        self.out.extend_from_slice(value_span);
    }

    /// Writes a member whose value is the base64 rendering of `blob`.
    pub fn member_base64(&mut self, name_span: &[u8], blob: &[u8]) {
        self.separator();
        self.out.extend_from_slice(name_span);
        self.out.extend_from_slice(b":\"");
        self.out.extend_from_slice(BASE64.encode(blob).as_bytes());
        self.out.push(b'"');
    }

    /// Writes a member with a typed value, keeping the original raw name.
    pub fn member_value(&mut self, name_span: &[u8], value: &Value) -> Result<()> {
        self.separator();
        self.out.extend_from_slice(name_span);
        self.out.push(b':');
        serde_json::to_writer(&mut *self.out, value).map_err(|e| Error::Internal(format!("value serialization failed: {e}")))
    }

    /// Writes a member with an owned name and a typed value.
    pub fn member_named_value(&mut self, name: &str, value: &Value) -> Result<()> {
        self.separator();
        serde_json::to_writer(&mut *self.out, name).map_err(|e| Error::Internal(format!("name serialization failed: {e}")))?;
        self.out.push(b':');
        serde_json::to_writer(&mut *self.out, value).map_err(|e| Error::Internal(format!("value serialization failed: {e}")))
    }

    fn separator(&mut self) {
        if self.members > 0 {
            self.out.push(b',');
        }
        self.members += 1;
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_member_shapes() {
        let mut out = Vec::new();
        let mut writer = JsonWriter::new(&mut out);
        writer.begin_object();
        writer.member_raw(b"\"a\"", b"1");
        writer.member_base64(b"\"b\"", &[1, 2, 3]);
        writer.member_named_value("c", &json!({"k": "v"})).unwrap();
        writer.end_object();

        let parsed: Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(parsed, json!({"a": 1, "b": "AQID", "c": {"k": "v"}}));
    }

    #[test]
    fn test_empty_object() {
        let mut out = Vec::new();
        let mut writer = JsonWriter::new(&mut out);
        writer.begin_object();
        writer.end_object();
        assert_eq!(out, b"{}");
    }
}
