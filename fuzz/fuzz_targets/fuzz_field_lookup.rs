//! Fuzz target for field lookup and string decoding.
//!
//! Field access runs on records read from untrusted databases and must never
//! panic or index out of bounds.

#![no_main]

use arbitrary::Arbitrary;
use capdb_core::field::{self, FLAG, NUMBER, STRING};
use capdb_core::CapabilityRecord;
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
struct Input {
    name: String,
    record: Vec<u8>,
}

fuzz_target!(|input: Input| {
    let record = input.record.as_slice();
    for kind in [FLAG, STRING, NUMBER] {
        if let Some(found) = field::find_field(record, &input.name, kind) {
            assert!(found.start <= found.end && found.end <= record.len());
        }
    }
    let _ = field::get_number(record, &input.name);
    let _ = field::get_string(record, &input.name);
    let _ = capdb_core::matches(record, &input.name);
    let _ = CapabilityRecord::new(input.record.clone()).fields().count();
});
