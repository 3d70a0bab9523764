//! Hash-indexed capability store.
//!
//! A store is the fast path for a flat-text capability database: it lives
//! next to the source as `<source>.db` and maps every record name to its
//! (already expanded) record bytes.
//!
//! # Values
//!
//! Each value starts with a one-byte marker:
//! - `none`: the rest is the record
//! - `error`: the rest is the record, but one of its `tc` references did not
//!   resolve when the store was built
//! - `shadow`: the rest is another key; look that up instead
//!
//! # Example
//!
//! ```no_run
//! use capdb_store::{HashStore, StoreWriter};
//! use std::path::Path;
//!
//! let mut writer = StoreWriter::new();
//! writer.insert_record("vt100", b"vt100|dec vt100:co#80:", false).unwrap();
//! writer.insert_shadow("dec vt100", "vt100").unwrap();
//! writer.write(Path::new("termcap.db")).unwrap();
//!
//! let store = HashStore::open(Path::new("termcap.db")).unwrap();
//! let value = store.lookup("dec vt100").unwrap();
//! assert!(!value.tc_error);
//! ```

pub mod error;
pub mod format;
pub mod reader;
pub mod writer;

pub use error::{Result, StoreError};
pub use format::{compute_checksum, Marker, StoreHeader, STORE_SUFFIX, STORE_VERSION};
pub use reader::{store_path_for, HashStore, StoreValue};
pub use writer::StoreWriter;
