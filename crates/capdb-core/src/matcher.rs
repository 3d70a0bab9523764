//! Record name matching.

/// True when `name` is exactly one of the `|`-separated aliases in the name
/// field of `record`.
///
/// The name field ends at the first `:` (or the end of the record). Only
/// whole aliases match: `"ab"` does not match `"a"`.
pub fn matches(record: &[u8], name: &str) -> bool {
    let end = record
        .iter()
        .position(|&b| b == b':')
        .unwrap_or(record.len());
    record[..end]
        .split(|&b| b == b'|')
        .any(|alias| alias == name.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_any_alias() {
        assert!(matches(b"a|b|c:co#80:", "a"));
        assert!(matches(b"a|b|c:co#80:", "b"));
        assert!(matches(b"a|b|c:co#80:", "c"));
    }

    #[test]
    fn no_prefix_match() {
        assert!(!matches(b"ab:co#80:", "a"));
        assert!(!matches(b"a:co#80:", "ab"));
    }

    #[test]
    fn absent_name() {
        assert!(!matches(b"a|b:...", "d"));
    }

    #[test]
    fn only_name_field_is_considered() {
        assert!(!matches(b"a|b:c:d|e:", "c"));
        assert!(!matches(b"a|b:c:d|e:", "e"));
    }

    #[test]
    fn record_without_terminator() {
        assert!(matches(b"lp|printer", "printer"));
        assert!(!matches(b"lp|printer", "print"));
    }

    #[test]
    fn aliases_may_contain_spaces() {
        assert!(matches(b"vt100|dec vt100:am:", "dec vt100"));
    }
}
