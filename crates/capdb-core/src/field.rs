//! Field lookup inside a resolved record.
//!
//! Fields are searched left to right after the name field. The first field
//! whose identifier matches decides the outcome: a negated field (`xx@`,
//! `xx=@`, `xx#@`) hides every later field of the same name, which is how a
//! record vetoes a capability it inherits through `tc`.

use crate::error::{CapError, Result};
use crate::record::push_chunked;

/// Type marker for bare flags (`:am:`).
pub const FLAG: u8 = b':';
/// Type marker for string fields (`:cl=...:`).
pub const STRING: u8 = b'=';
/// Type marker for numeric fields (`:co#80:`).
pub const NUMBER: u8 = b'#';

/// Growth step for extracted strings.
const STRING_FRAG: usize = 100;

/// Location of a matched field value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldValue<'a> {
    /// Offset of the first value byte (for flags: of the terminator).
    pub start: usize,
    /// Offset one past the last value byte.
    pub end: usize,
    pub value: &'a [u8],
}

/// Offset of the next unescaped `:` at or after `from`, or the record length.
pub(crate) fn value_end(record: &[u8], from: usize) -> usize {
    let mut i = from;
    while i < record.len() {
        match record[i] {
            b'\\' => i += 2,
            b':' => return i,
            _ => i += 1,
        }
    }
    record.len()
}

/// Offset just past the field containing `from`, or `None` at end of record.
pub(crate) fn skip_field(record: &[u8], from: usize) -> Option<usize> {
    let end = value_end(record, from);
    (end < record.len()).then_some(end + 1)
}

/// Find field `name` of type `kind` in `record`.
///
/// With `kind` [`FLAG`] the field must carry no value; otherwise its
/// separator must equal `kind`. Same-named fields of a different type are
/// passed over. A negation returns `None` regardless of what follows.
pub fn find_field<'a>(record: &'a [u8], name: &str, kind: u8) -> Option<FieldValue<'a>> {
    find_field_from(record, 0, name, kind)
}

/// As [`find_field`], starting inside the field that contains `from`.
pub(crate) fn find_field_from<'a>(
    record: &'a [u8],
    from: usize,
    name: &str,
    kind: u8,
) -> Option<FieldValue<'a>> {
    let name = name.as_bytes();
    let mut at = from;
    loop {
        at = skip_field(record, at)?;
        if !record[at..].starts_with(name) {
            continue;
        }
        let mut pos = at + name.len();
        let next = record.get(pos).copied();
        if next == Some(b'@') {
            return None;
        }
        if kind == FLAG {
            if matches!(next, None | Some(b':')) {
                return Some(FieldValue {
                    start: pos,
                    end: pos,
                    value: &[],
                });
            }
            continue;
        }
        if next != Some(kind) {
            continue;
        }
        pos += 1;
        if record.get(pos) == Some(&b'@') {
            return None;
        }
        let end = value_end(record, pos);
        return Some(FieldValue {
            start: pos,
            end,
            value: &record[pos..end],
        });
    }
}

/// True when flag `name` is present and not negated.
pub fn has_flag(record: &[u8], name: &str) -> bool {
    find_field(record, name, FLAG).is_some()
}

/// Numeric field `name`.
///
/// `0x`/`0X` introduces hexadecimal, a leading `0` octal, anything else is
/// decimal. Parsing stops at the first byte that is not a digit of the base.
/// Values with no digits, or that overflow `i64`, are `None`.
pub fn get_number(record: &[u8], name: &str) -> Option<i64> {
    let value = find_field(record, name, NUMBER)?.value;
    let (base, digits, mut seen) = match value {
        [b'0', b'x' | b'X', rest @ ..] => (16, rest, true),
        [b'0', rest @ ..] => (8, rest, true),
        _ => (10, value, false),
    };
    let mut n: i64 = 0;
    for &b in digits {
        let Some(d) = (b as char).to_digit(base) else {
            break;
        };
        n = n.checked_mul(base as i64)?.checked_add(d as i64)?;
        seen = true;
    }
    seen.then_some(n)
}

/// Copy string field `name` verbatim (no escape decoding).
pub fn extract_string(record: &[u8], name: &str) -> Result<Vec<u8>> {
    let found = find_field(record, name, STRING).ok_or_else(|| CapError::not_found(name))?;
    let mut out = Vec::new();
    for &b in found.value {
        push_chunked(&mut out, b, STRING_FRAG)?;
    }
    out.shrink_to_fit();
    Ok(out)
}

/// String field `name` with escapes decoded.
///
/// Recognised: `\E`/`\e` (ESC), `\n`, `\r`, `\t`, `\b`, `\f`, `\ddd` octal,
/// and `^X` control characters (`^?` is DEL). Any other escaped byte stands
/// for itself, so `\\`, `\^` and `\:` yield `\`, `^` and `:`.
pub fn get_string(record: &[u8], name: &str) -> Result<Vec<u8>> {
    let found = find_field(record, name, STRING).ok_or_else(|| CapError::not_found(name))?;
    let value = found.value;
    let mut out = Vec::new();
    let mut i = 0;
    while i < value.len() {
        let b = value[i];
        i += 1;
        let decoded = match b {
            b'^' => {
                let Some(&c) = value.get(i) else { break };
                i += 1;
                if c == b'?' {
                    0x7f
                } else {
                    c & 0x1f
                }
            }
            b'\\' => {
                let Some(&c) = value.get(i) else { break };
                i += 1;
                match c {
                    b'0'..=b'7' => {
                        let mut n = u32::from(c - b'0');
                        let mut count = 1;
                        while count < 3 {
                            match value.get(i) {
                                Some(&d @ b'0'..=b'7') => {
                                    n = n * 8 + u32::from(d - b'0');
                                    i += 1;
                                    count += 1;
                                }
                                _ => break,
                            }
                        }
                        (n & 0xff) as u8
                    }
                    b'E' | b'e' => 0x1b,
                    b'n' => b'\n',
                    b'r' => b'\r',
                    b't' => b'\t',
                    b'b' => 0x08,
                    b'f' => 0x0c,
                    other => other,
                }
            }
            other => other,
        };
        push_chunked(&mut out, decoded, STRING_FRAG)?;
    }
    out.shrink_to_fit();
    Ok(out)
}
