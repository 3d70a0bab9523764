//! Capability database resolver.
//!
//! This library reads termcap-style capability databases:
//! - Name matching against `|`-separated alias lists
//! - Streaming record scanning with line continuation
//! - Lookup across an ordered list of sources, with optional hash stores
//! - `tc=` reference expansion with a depth ceiling
//! - Typed field access on resolved records
//! - Building hash stores from flat-text sources
//!
//! The `capdb` binary entry point is in `main.rs`.
//!
//! ```no_run
//! use capdb_core::Resolver;
//!
//! let resolver = Resolver::new(["/etc/termcap"]);
//! let vt100 = resolver.resolve("vt100").unwrap();
//! assert_eq!(vt100.record.get_number("co"), Some(80));
//! ```

pub mod error;
pub mod exit_codes;
pub mod expand;
pub mod field;
pub mod locate;
pub mod logging;
pub mod matcher;
pub mod mkdb;
pub mod record;
pub mod resolver;
pub mod scanner;

pub use error::{CapError, ErrorKind, Result};
pub use field::{extract_string, find_field, get_number, get_string, has_flag, FieldValue};
pub use matcher::matches;
pub use mkdb::{build_store, BuildReport};
pub use record::{CapabilityRecord, Field, FieldKind};
pub use resolver::{resolve, Resolution, ResolveStatus, Resolver, ResolverOptions};
pub use scanner::RecordScanner;
