//! Token scanner over a JSON document's bytes.
//!
//! Yields the root object's members one at a time as raw byte spans,
//! without materializing anything but the member name. Nested containers
//! and strings are skipped structurally (depth counter, escape-aware
//! string scanning), so a member the caller passes through is copied from
//! the original bytes verbatim.

use crate::error::{Error, Result};

/// Classification of a member's value token.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ValueKind {
    Null,
    Bool,
    Number,
    String,
    Array,
    Object,
}

/// One top-level member: unescaped name plus raw spans.
pub(crate) struct RawMember<'a> {
    /// Unescaped property name.
    pub name: String,

    /// Raw name token including the surrounding quotes.
    pub name_span: &'a [u8],

    /// Raw value token(s), whitespace-trimmed at both ends.
    pub value_span: &'a [u8],

    /// What the value token is, judged from its first byte.
    pub kind: ValueKind,
}

/// Cursor over the input bytes.
pub(crate) struct JsonScanner<'a> {
    input: &'a [u8],
    pos: usize,
    first: bool,
    done: bool,
}

impl<'a> JsonScanner<'a> {
    pub fn new(input: &'a [u8]) -> Self {
        Self { input, pos: 0, first: true, done: false }
    }

    /// Consumes the opening brace of the root object.
    pub fn begin_object(&mut self) -> Result<()> {
        self.skip_whitespace();
        match self.bump() {
            Some(b'{') => Ok(()),
            Some(other) => Err(self.violation(format!("expected an object, found {:?}", char::from(other)))),
            None => Err(self.violation("empty input")),
        }
    }

    /// Yields the next member, or `None` after the closing brace.
    pub fn next_member(&mut self) -> Result<Option<RawMember<'a>>> {
        if self.done {
            return Ok(None);
        }

        self.skip_whitespace();
        if self.first {
            if self.peek() == Some(b'}') {
                self.pos += 1;
                self.done = true;
                return Ok(None);
            }
            self.first = false;
        } else {
            match self.bump() {
                Some(b',') => self.skip_whitespace(),
                Some(b'}') => {
                    self.done = true;
                    return Ok(None);
                }
                Some(other) => return Err(self.violation(format!("expected ',' or '}}', found {:?}", char::from(other)))),
                None => return Err(self.violation("unterminated object")),
            }
        }

        let name_span = self.scan_string()?;
        let name: String = serde_json::from_slice(name_span).map_err(|e| self.violation(format!("property name does not parse: {e}")))?;

        self.skip_whitespace();
        match self.bump() {
            Some(b':') => {}
            _ => return Err(self.violation(format!("expected ':' after property name {name:?}"))),
        }
        self.skip_whitespace();

        let (value_span, kind) = self.scan_value()?;
        Ok(Some(RawMember { name, name_span, value_span, kind }))
    }

    /// Verifies only whitespace remains after the root object.
    pub fn finish(&mut self) -> Result<()> {
        self.skip_whitespace();
        if self.pos == self.input.len() {
            Ok(())
        } else {
            Err(self.violation("trailing bytes after the root object"))
        }
    }

    fn scan_value(&mut self) -> Result<(&'a [u8], ValueKind)> {
        match self.peek() {
            Some(b'"') => Ok((self.scan_string()?, ValueKind::String)),
            Some(b'{') => Ok((self.scan_container(b'{', b'}')?, ValueKind::Object)),
            Some(b'[') => Ok((self.scan_container(b'[', b']')?, ValueKind::Array)),
            Some(b't') => Ok((self.scan_literal(b"true")?, ValueKind::Bool)),
            Some(b'f') => Ok((self.scan_literal(b"false")?, ValueKind::Bool)),
            Some(b'n') => Ok((self.scan_literal(b"null")?, ValueKind::Null)),
            Some(b'-' | b'0'..=b'9') => Ok((self.scan_number(), ValueKind::Number)),
            Some(other) => Err(self.violation(format!("unexpected value byte {:?}", char::from(other)))),
            None => Err(self.violation("unterminated member value")),
        }
    }

    /// Scans a quoted string, returning the span including both quotes.
    ///
    /// Multi-byte UTF-8 sequences never contain '"' or '\\', so a bytewise
    /// walk is safe.
    fn scan_string(&mut self) -> Result<&'a [u8]> {
        let start = self.pos;
        match self.bump() {
            Some(b'"') => {}
            _ => return Err(self.violation("expected a string")),
        }
        loop {
            match self.bump() {
                Some(b'"') => return Ok(&self.input[start..self.pos]),
                Some(b'\\') => {
                    if self.bump().is_none() {
                        return Err(self.violation("unterminated escape sequence"));
                    }
                }
                Some(_) => {}
                None => return Err(self.violation("unterminated string")),
            }
        }
    }

    /// Scans a nested container by depth counting, skipping inner strings.
    fn scan_container(&mut self, open: u8, close: u8) -> Result<&'a [u8]> {
        let start = self.pos;
        let mut depth = 0usize;
        loop {
            match self.peek() {
                Some(b'"') => {
                    self.scan_string()?;
                }
                Some(b) if b == open => {
                    depth += 1;
                    self.pos += 1;
                }
                Some(b) if b == close => {
                    self.pos += 1;
                    depth -= 1;
                    if depth == 0 {
                        return Ok(&self.input[start..self.pos]);
                    }
                }
                Some(_) => self.pos += 1,
                None => return Err(self.violation("unterminated container")),
            }
        }
    }

    fn scan_literal(&mut self, literal: &'static [u8]) -> Result<&'a [u8]> {
        let start = self.pos;
        let end = start + literal.len();
        if self.input.get(start..end) == Some(literal) {
            self.pos = end;
            Ok(&self.input[start..end])
        } else {
            Err(self.violation(format!("malformed literal, expected {}", String::from_utf8_lossy(literal))))
        }
    }

    fn scan_number(&mut self) -> &'a [u8] {
        let start = self.pos;
        while let Some(b) = self.peek() {
            match b {
                b'-' | b'+' | b'.' | b'e' | b'E' | b'0'..=b'9' => self.pos += 1,
                _ => break,
            }
        }
        &self.input[start..self.pos]
    }

    fn skip_whitespace(&mut self) {
        while let Some(b' ' | b'\t' | b'\n' | b'\r') = self.peek() {
            self.pos += 1;
        }
    }

    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let byte = self.peek();
        if byte.is_some() {
            self.pos += 1;
        }
        byte
    }

    fn violation(&self, reason: impl Into<String>) -> Error {
        Error::format(format!("document byte {}", self.pos), reason.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn members(input: &str) -> Vec<(String, String, ValueKind)> {
        let mut scanner = JsonScanner::new(input.as_bytes());
        scanner.begin_object().unwrap();
        let mut collected = Vec::new();
        while let Some(member) = scanner.next_member().unwrap() {
            collected.push((member.name, String::from_utf8(member.value_span.to_vec()).unwrap(), member.kind));
        }
        scanner.finish().unwrap();
        collected
    }

    #[test]
    fn test_scans_scalars() {
        let collected = members(r#"{"a": 1, "b": -2.5e3, "c": "x", "d": true, "e": null}"#);
        assert_eq!(collected[0], ("a".into(), "1".into(), ValueKind::Number));
        assert_eq!(collected[1], ("b".into(), "-2.5e3".into(), ValueKind::Number));
        assert_eq!(collected[2], ("c".into(), "\"x\"".into(), ValueKind::String));
        assert_eq!(collected[3], ("d".into(), "true".into(), ValueKind::Bool));
        assert_eq!(collected[4], ("e".into(), "null".into(), ValueKind::Null));
    }

    #[test]
    fn test_scans_nested_containers_as_single_spans() {
        let collected = members(r#"{"a": [1, {"x": "}"}, [2]], "o": {"k": {"deep": "]"}}}"#);
        assert_eq!(collected[0].1, r#"[1, {"x": "}"}, [2]]"#);
        assert_eq!(collected[0].2, ValueKind::Array);
        assert_eq!(collected[1].1, r#"{"k": {"deep": "]"}}"#);
        assert_eq!(collected[1].2, ValueKind::Object);
    }

    #[test]
    fn test_unescapes_names() {
        let collected = members(r#"{"quo\"ted": 1}"#);
        assert_eq!(collected[0].0, "quo\"ted");
    }

    #[test]
    fn test_empty_object() {
        assert!(members("{}").is_empty());
        assert!(members("  { }  ").is_empty());
    }

    #[test]
    fn test_rejects_non_object_root() {
        let mut scanner = JsonScanner::new(b"[1]");
        assert!(scanner.begin_object().is_err());
    }

    #[test]
    fn test_rejects_trailing_bytes() {
        let mut scanner = JsonScanner::new(b"{} x");
        scanner.begin_object().unwrap();
        assert!(scanner.next_member().unwrap().is_none());
        assert!(scanner.finish().is_err());
    }

    #[test]
    fn test_rejects_unterminated_string() {
        let mut scanner = JsonScanner::new(br#"{"a": "oops"#);
        scanner.begin_object().unwrap();
        assert!(scanner.next_member().is_err());
    }

    #[test]
    fn test_rejects_missing_comma() {
        let mut scanner = JsonScanner::new(br#"{"a": 1 "b": 2}"#);
        scanner.begin_object().unwrap();
        scanner.next_member().unwrap();
        assert!(scanner.next_member().is_err());
    }
}
