//! Fuzz target for hash store parsing.
//!
//! Stores sit next to databases on disk and may be truncated or corrupt;
//! parsing must fail cleanly instead of panicking.

#![no_main]

use capdb_store::HashStore;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(store) = HashStore::from_bytes(data) {
        for key in store.primary_keys() {
            let _ = store.lookup(&key);
        }
    }
});
