//! Fuzz target for flat-text record scanning.
//!
//! Scans arbitrary input with a fuzzer-chosen chunk size. Scanning must never
//! panic, and the records must not depend on the chunk size.

#![no_main]

use arbitrary::Arbitrary;
use capdb_core::RecordScanner;
use libfuzzer_sys::fuzz_target;
use std::io::Cursor;
use std::path::Path;

#[derive(Debug, Arbitrary)]
struct Input {
    chunk: u8,
    data: Vec<u8>,
}

fn scan(data: &[u8], chunk: usize) -> Vec<Vec<u8>> {
    let mut scanner = RecordScanner::with_chunk_size(Cursor::new(data), Path::new("fuzz"), chunk);
    let mut out = Vec::new();
    while let Ok(Some(record)) = scanner.next_record() {
        out.push(record.into_bytes());
    }
    out
}

fuzz_target!(|input: Input| {
    let small = scan(&input.data, usize::from(input.chunk).max(1));
    let large = scan(&input.data, 8192);
    assert_eq!(small, large);
});
