//! Flat-text record scanner.
//!
//! Reads a capability database one logical record at a time:
//!
//! - a backslash immediately before a newline joins the next physical line
//!   (only the backslash-newline pair is removed, indentation is kept);
//! - a field holding only blanks is dropped when the next `:` arrives, as are
//!   blanks after the last `:` of a line;
//! - empty lines and lines starting with `#` are skipped.
//!
//! Input is pulled in fixed-size chunks and a record may span any number of
//! them. The match test runs once per complete record.

use crate::error::{CapError, Result};
use crate::matcher;
use crate::record::{push_chunked, reserve_chunked, CapabilityRecord, RECORD_FRAG};
use std::io::{ErrorKind, Read};
use std::path::{Path, PathBuf};
use tracing::trace;

/// Size of each read from the underlying source.
pub const READ_CHUNK: usize = 8192;

/// Streaming record reader over one source.
pub struct RecordScanner<R> {
    reader: R,
    path: PathBuf,
    chunk: Box<[u8]>,
    pos: usize,
    filled: usize,
    eof: bool,
}

impl<R: Read> RecordScanner<R> {
    /// Wrap `reader`; `path` is only used in error reports and logs.
    pub fn new(reader: R, path: &Path) -> Self {
        Self::with_chunk_size(reader, path, READ_CHUNK)
    }

    pub fn with_chunk_size(reader: R, path: &Path, chunk_size: usize) -> Self {
        Self {
            reader,
            path: path.to_path_buf(),
            chunk: vec![0u8; chunk_size.max(1)].into_boxed_slice(),
            pos: 0,
            filled: 0,
            eof: false,
        }
    }

    /// Refill the chunk buffer. Returns false at end of stream.
    fn fill(&mut self) -> Result<bool> {
        if self.eof {
            return Ok(false);
        }
        loop {
            match self.reader.read(&mut self.chunk) {
                Ok(0) => {
                    self.eof = true;
                    return Ok(false);
                }
                Ok(n) => {
                    self.pos = 0;
                    self.filled = n;
                    return Ok(true);
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    return Err(CapError::Io {
                        path: self.path.clone(),
                        source: e,
                    })
                }
            }
        }
    }

    fn next_byte(&mut self) -> Result<Option<u8>> {
        if self.pos >= self.filled && !self.fill()? {
            return Ok(None);
        }
        let b = self.chunk[self.pos];
        self.pos += 1;
        Ok(Some(b))
    }

    /// Read one logical line. `None` once the stream is exhausted.
    fn next_line(&mut self) -> Result<Option<Vec<u8>>> {
        let mut line = Vec::new();
        reserve_chunked(&mut line, 1, RECORD_FRAG)?;
        // Offset of the `:` that opened the current field while that field
        // has held only blanks.
        let mut blank_since: Option<usize> = None;
        let mut escaped = false;
        let mut read_any = false;

        while let Some(c) = self.next_byte()? {
            read_any = true;
            if c == b'\n' {
                if escaped {
                    escaped = false;
                    line.pop();
                    continue;
                }
                break;
            }
            // The byte after a backslash still counts as a separator,
            // a backslash or a blank below.
            if escaped {
                escaped = false;
                blank_since = None;
            }
            if c == b':' {
                match blank_since {
                    Some(colon) => line.truncate(colon),
                    None => blank_since = Some(line.len()),
                }
            } else if c == b'\\' {
                escaped = true;
            } else if c != b' ' && c != b'\t' {
                blank_since = None;
            }
            push_chunked(&mut line, c, RECORD_FRAG)?;
        }

        if !read_any {
            return Ok(None);
        }
        if let Some(colon) = blank_since {
            line.truncate(colon + 1);
        }
        Ok(Some(line))
    }

    /// Next record in the source, skipping blank lines and comments.
    pub fn next_record(&mut self) -> Result<Option<CapabilityRecord>> {
        while let Some(line) = self.next_line()? {
            if line.is_empty() || line[0] == b'#' {
                continue;
            }
            return Ok(Some(CapabilityRecord::from(line)));
        }
        Ok(None)
    }

    /// Scan forward for the first record with `name` among its aliases.
    pub fn find(&mut self, name: &str) -> Result<Option<CapabilityRecord>> {
        let mut seen = 0usize;
        while let Some(record) = self.next_record()? {
            seen += 1;
            if matcher::matches(record.as_bytes(), name) {
                trace!(
                    name,
                    source = %self.path.display(),
                    records_seen = seen,
                    bytes = record.len(),
                    "Record matched"
                );
                return Ok(Some(record));
            }
        }
        trace!(name, source = %self.path.display(), records_seen = seen, "No match in source");
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn records(input: &[u8]) -> Vec<String> {
        records_chunked(input, READ_CHUNK)
    }

    fn records_chunked(input: &[u8], chunk: usize) -> Vec<String> {
        let mut scanner =
            RecordScanner::with_chunk_size(Cursor::new(input.to_vec()), Path::new("test"), chunk);
        let mut out = Vec::new();
        while let Some(rec) = scanner.next_record().unwrap() {
            out.push(rec.to_string());
        }
        out
    }

    #[test]
    fn one_record_per_line() {
        assert_eq!(records(b"a:x:\nb:y:\n"), vec!["a:x:", "b:y:"]);
    }

    #[test]
    fn continuation_keeps_indentation() {
        assert_eq!(records(b"field1:\\\n  field2:\n"), vec!["field1:  field2:"]);
    }

    #[test]
    fn termcap_style_continuation_collapses_empty_fields() {
        let input = b"vt100|dec vt100:\\\n\t:co#80:li#24:\\\n\t:am:\n";
        assert_eq!(records(input), vec!["vt100|dec vt100:co#80:li#24:am:"]);
    }

    #[test]
    fn blank_field_between_colons_is_elided() {
        assert_eq!(records(b"a:x: \t :y:\n"), vec!["a:x:y:"]);
    }

    #[test]
    fn trailing_blanks_after_last_colon_dropped() {
        assert_eq!(records(b"a:x:   \n"), vec!["a:x:"]);
    }

    #[test]
    fn blanks_inside_values_kept() {
        assert_eq!(records(b"a:s=x y:\n"), vec!["a:s=x y:"]);
    }

    #[test]
    fn comments_and_blank_lines_skipped() {
        let input = b"# header\n\na:x:\n#b:y:\n\nc:z:\n";
        assert_eq!(records(input), vec!["a:x:", "c:z:"]);
    }

    #[test]
    fn final_record_without_newline_is_returned() {
        assert_eq!(records(b"a:x:\nb:y:"), vec!["a:x:", "b:y:"]);
    }

    #[test]
    fn doubled_backslash_before_newline_continues() {
        // The second backslash escapes the newline.
        assert_eq!(records(b"a:s=\\\\\n:x:\n"), vec!["a:s=\\:x:"]);
        assert_eq!(records(b"a:s=\\\\\nb:\n"), vec!["a:s=\\b:"]);
    }

    #[test]
    fn escaped_colon_opens_field() {
        assert_eq!(records(b"a:s=\\: :x:\n"), vec!["a:s=\\:x:"]);
    }

    #[test]
    fn escaped_blank_starts_value() {
        assert_eq!(records(b"a:\\ :x:\n"), vec!["a:\\ :x:"]);
    }

    #[test]
    fn tiny_chunks_give_same_records() {
        let input = b"# c\nvt100|dec:\\\n\t:co#80:\\\n\t:li#24:\nansi:am:\n";
        assert_eq!(records_chunked(input, 1), records(input));
        assert_eq!(records_chunked(input, 3), records(input));
    }

    #[test]
    fn record_larger_than_chunk_and_fragment() {
        let value = "v".repeat(3 * RECORD_FRAG);
        let input = format!("big:s={value}:\nsmall:x:\n");
        let out = records_chunked(input.as_bytes(), 64);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0], format!("big:s={value}:"));
    }

    #[test]
    fn find_checks_aliases() {
        let input = b"a|alpha:x:\nb|beta:y:\n";
        let mut scanner = RecordScanner::new(Cursor::new(input.to_vec()), Path::new("t"));
        let rec = scanner.find("beta").unwrap().unwrap();
        assert_eq!(rec.as_bytes(), b"b|beta:y:");
        assert!(scanner.find("alpha").unwrap().is_none());
    }

    struct FailingReader;

    impl Read for FailingReader {
        fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
            Err(std::io::Error::other("disk on fire"))
        }
    }

    #[test]
    fn read_error_is_system_error() {
        let mut scanner = RecordScanner::new(FailingReader, Path::new("/dev/broken"));
        let err = scanner.next_record().unwrap_err();
        assert!(err.is_system());
        assert!(err.to_string().contains("/dev/broken"));
    }
}
