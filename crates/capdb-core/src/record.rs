//! The capability record buffer.
//!
//! A record is one logical line of a capability database:
//!
//! ```text
//! vt100|dec vt100:am:co#80:cl=\E[H\E[2J:tc=vt100-base:
//! ```
//!
//! The first field lists the record's names separated by `|`; every later
//! field is a bare flag (`am`), a numeric field (`co#80`), a string field
//! (`cl=...`) or a negation (`xn@`).

use crate::error::Result;
use crate::{field, matcher};
use serde::Serialize;
use std::fmt;

/// Growth step for record buffers.
pub const RECORD_FRAG: usize = 1024;

/// Make room for `additional` more bytes, growing by at least `chunk` and at
/// least the current capacity so repeated growth stays geometric.
pub(crate) fn reserve_chunked(buf: &mut Vec<u8>, additional: usize, chunk: usize) -> Result<()> {
    if buf.capacity() - buf.len() >= additional {
        return Ok(());
    }
    let step = additional.max(chunk).max(buf.capacity());
    buf.try_reserve_exact(step)?;
    Ok(())
}

/// Append one byte, growing in chunks.
pub(crate) fn push_chunked(buf: &mut Vec<u8>, byte: u8, chunk: usize) -> Result<()> {
    reserve_chunked(buf, 1, chunk)?;
    buf.push(byte);
    Ok(())
}

/// An owned capability record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapabilityRecord {
    bytes: Vec<u8>,
}

impl CapabilityRecord {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: bytes.into(),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Record length in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// The `|`-separated name field, without its terminating `:`.
    pub fn name_field(&self) -> &[u8] {
        let end = self
            .bytes
            .iter()
            .position(|&b| b == b':')
            .unwrap_or(self.bytes.len());
        &self.bytes[..end]
    }

    /// Every alias in the name field, in order.
    pub fn aliases(&self) -> Vec<String> {
        self.name_field()
            .split(|&b| b == b'|')
            .map(|alias| String::from_utf8_lossy(alias).into_owned())
            .collect()
    }

    /// The first alias.
    pub fn primary_name(&self) -> String {
        self.aliases().into_iter().next().unwrap_or_default()
    }

    /// True when `name` is one of the record's aliases.
    pub fn matches(&self, name: &str) -> bool {
        matcher::matches(&self.bytes, name)
    }

    /// Fields after the name field, in record order. Empty fields are skipped.
    pub fn fields(&self) -> Fields<'_> {
        Fields {
            bytes: &self.bytes,
            at: field::skip_field(&self.bytes, 0),
        }
    }

    pub fn find_field(&self, name: &str, kind: u8) -> Option<field::FieldValue<'_>> {
        field::find_field(&self.bytes, name, kind)
    }

    pub fn has_flag(&self, name: &str) -> bool {
        field::has_flag(&self.bytes, name)
    }

    pub fn get_number(&self, name: &str) -> Option<i64> {
        field::get_number(&self.bytes, name)
    }

    pub fn extract_string(&self, name: &str) -> Result<Vec<u8>> {
        field::extract_string(&self.bytes, name)
    }

    pub fn get_string(&self, name: &str) -> Result<Vec<u8>> {
        field::get_string(&self.bytes, name)
    }

    /// Release spare capacity left over from growth.
    pub(crate) fn shrink(&mut self) {
        self.bytes.shrink_to_fit();
    }
}

impl From<Vec<u8>> for CapabilityRecord {
    fn from(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }
}

impl From<&str> for CapabilityRecord {
    fn from(text: &str) -> Self {
        Self::new(text.as_bytes())
    }
}

impl fmt::Display for CapabilityRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.bytes))
    }
}

/// How a field is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Flag,
    Number,
    String,
    Negated,
}

/// One parsed field of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field<'a> {
    pub name: &'a [u8],
    pub kind: FieldKind,
    /// Raw value text (empty for flags and negations).
    pub value: &'a [u8],
}

/// Iterator over a record's fields.
pub struct Fields<'a> {
    bytes: &'a [u8],
    at: Option<usize>,
}

impl<'a> Iterator for Fields<'a> {
    type Item = Field<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let start = self.at?;
            let end = field::value_end(self.bytes, start);
            self.at = field::skip_field(self.bytes, start);
            let text = &self.bytes[start..end];
            if text.is_empty() {
                continue;
            }
            let split = text
                .iter()
                .position(|&b| matches!(b, b'=' | b'#' | b'@'));
            return Some(match split {
                None => Field {
                    name: text,
                    kind: FieldKind::Flag,
                    value: &[],
                },
                Some(idx) => {
                    let kind = match text[idx] {
                        b'@' => FieldKind::Negated,
                        b'#' if text.get(idx + 1) == Some(&b'@') => FieldKind::Negated,
                        b'=' if text.get(idx + 1) == Some(&b'@') => FieldKind::Negated,
                        b'#' => FieldKind::Number,
                        _ => FieldKind::String,
                    };
                    let value = if kind == FieldKind::Negated {
                        &[][..]
                    } else {
                        &text[idx + 1..]
                    };
                    Field {
                        name: &text[..idx],
                        kind,
                        value,
                    }
                }
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_field_and_aliases() {
        let rec = CapabilityRecord::from("vt100|vt100-am|dec vt100:co#80:");
        assert_eq!(rec.name_field(), b"vt100|vt100-am|dec vt100");
        assert_eq!(rec.aliases(), vec!["vt100", "vt100-am", "dec vt100"]);
        assert_eq!(rec.primary_name(), "vt100");
    }

    #[test]
    fn record_without_fields() {
        let rec = CapabilityRecord::from("dumb");
        assert_eq!(rec.name_field(), b"dumb");
        assert_eq!(rec.fields().count(), 0);
    }

    #[test]
    fn fields_are_classified() {
        let rec = CapabilityRecord::from("x:am:co#80:cl=\\E[H:xn@:li#@::bs:");
        let fields: Vec<_> = rec.fields().collect();
        let summary: Vec<(&[u8], FieldKind, &[u8])> =
            fields.iter().map(|f| (f.name, f.kind, f.value)).collect();
        assert_eq!(
            summary,
            vec![
                (&b"am"[..], FieldKind::Flag, &b""[..]),
                (&b"co"[..], FieldKind::Number, &b"80"[..]),
                (&b"cl"[..], FieldKind::String, &b"\\E[H"[..]),
                (&b"xn"[..], FieldKind::Negated, &b""[..]),
                (&b"li"[..], FieldKind::Negated, &b""[..]),
                (&b"bs"[..], FieldKind::Flag, &b""[..]),
            ]
        );
    }

    #[test]
    fn escaped_colon_stays_in_value() {
        let rec = CapabilityRecord::from("x:sep=a\\:b:am:");
        let fields: Vec<_> = rec.fields().collect();
        assert_eq!(fields[0].value, b"a\\:b");
        assert_eq!(fields[1].name, b"am");
    }

    #[test]
    fn chunked_growth_is_geometric() {
        let mut buf = Vec::new();
        reserve_chunked(&mut buf, 1, 16).unwrap();
        assert!(buf.capacity() >= 16);
        buf.resize(buf.capacity(), 0);
        let before = buf.capacity();
        push_chunked(&mut buf, 1, 16).unwrap();
        assert!(buf.capacity() >= before * 2);
    }
}
