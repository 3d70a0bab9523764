//! Database locator: find the raw record for a name across ordered sources.
//!
//! Each source is tried in order. When hash stores are enabled the
//! `<source>.db` store is consulted first; a source without a usable store is
//! scanned as flat text. A source that cannot be opened at all is skipped,
//! but a read failure on an opened source ends the search.

use crate::error::{CapError, Result};
use crate::record::CapabilityRecord;
use crate::scanner::RecordScanner;
use capdb_store::{store_path_for, HashStore, StoreError};
use std::fs::File;
use std::io::{Seek, SeekFrom};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

#[cfg(test)]
thread_local! {
    /// Hash stores opened on this thread.
    pub(crate) static STORE_OPENS: std::cell::Cell<usize> = const { std::cell::Cell::new(0) };
}

/// How a located record was read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Scanned from the flat-text source.
    FlatText,
    /// Read from the source's hash store.
    HashStore {
        /// The store flagged the record as partially unresolved.
        tc_error: bool,
    },
}

/// An opened source: the flat-text file or its verified hash store.
#[derive(Debug)]
pub enum OpenSource {
    Text(File),
    Store(HashStore),
}

/// Position in the source list, plus the source the locator opened for
/// this record.
#[derive(Debug)]
pub struct SourceCursor {
    pub index: usize,
    pub handle: Option<OpenSource>,
}

/// A raw (unexpanded) record and where it came from.
#[derive(Debug)]
pub struct Located {
    pub record: CapabilityRecord,
    pub origin: Origin,
    pub cursor: SourceCursor,
}

/// Searches an ordered list of database sources.
#[derive(Debug, Clone, Copy)]
pub struct Locator<'a> {
    sources: &'a [PathBuf],
    use_hash_store: bool,
}

impl<'a> Locator<'a> {
    pub fn new(sources: &'a [PathBuf], use_hash_store: bool) -> Self {
        Self {
            sources,
            use_hash_store,
        }
    }

    pub fn sources(&self) -> &'a [PathBuf] {
        self.sources
    }

    /// Locate `name`, searching `sources[start..]`.
    ///
    /// `shared` is an already-open `sources[start]`. A text handle is rewound
    /// and scanned and a store is queried, in place of reopening that source;
    /// when the record is found through it, the returned cursor carries no
    /// handle of its own.
    pub fn locate(
        &self,
        name: &str,
        start: usize,
        mut shared: Option<&mut OpenSource>,
    ) -> Result<Located> {
        for index in start..self.sources.len() {
            let path = &self.sources[index];

            if index == start {
                if let Some(open) = shared.as_deref_mut() {
                    let found = match open {
                        OpenSource::Text(file) => scan_text(file, path, name)?,
                        OpenSource::Store(store) => store_lookup(store, path, name)?,
                    };
                    if let Some((record, origin)) = found {
                        debug!(name, source = %path.display(), "Located in shared source");
                        return Ok(Located {
                            record,
                            origin,
                            cursor: SourceCursor {
                                index,
                                handle: None,
                            },
                        });
                    }
                    continue;
                }
            }

            if self.use_hash_store {
                if let Some(store) = open_store(path) {
                    let Some((record, origin)) = store_lookup(&store, path, name)? else {
                        continue;
                    };
                    return Ok(Located {
                        record,
                        origin,
                        cursor: SourceCursor {
                            index,
                            handle: Some(OpenSource::Store(store)),
                        },
                    });
                }
            }

            let mut file = match File::open(path) {
                Ok(file) => file,
                Err(e) => {
                    debug!(source = %path.display(), error = %e, "Skipping unopenable source");
                    continue;
                }
            };
            let found = RecordScanner::new(&mut file, path).find(name)?;
            if let Some(record) = found {
                debug!(name, source = %path.display(), bytes = record.len(), "Located in flat text");
                return Ok(Located {
                    record,
                    origin: Origin::FlatText,
                    cursor: SourceCursor {
                        index,
                        handle: Some(OpenSource::Text(file)),
                    },
                });
            }
        }

        debug!(name, sources = self.sources.len() - start.min(self.sources.len()), "Not found in any source");
        Err(CapError::not_found(name))
    }
}

/// Rewind an open flat-text source and scan it for `name`.
fn scan_text(
    file: &mut File,
    path: &Path,
    name: &str,
) -> Result<Option<(CapabilityRecord, Origin)>> {
    file.seek(SeekFrom::Start(0)).map_err(|e| CapError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    let found = RecordScanner::new(&mut *file, path).find(name)?;
    Ok(found.map(|record| (record, Origin::FlatText)))
}

/// Look `name` up in the store for `source`. A miss is `None`.
fn store_lookup(
    store: &HashStore,
    source: &Path,
    name: &str,
) -> Result<Option<(CapabilityRecord, Origin)>> {
    match store.lookup(name) {
        Ok(value) => {
            debug!(
                name,
                source = %source.display(),
                tc_error = value.tc_error,
                "Located in hash store"
            );
            Ok(Some((
                CapabilityRecord::from(value.payload),
                Origin::HashStore {
                    tc_error: value.tc_error,
                },
            )))
        }
        Err(StoreError::NotFound(_)) => {
            debug!(name, source = %source.display(), "Not in hash store");
            Ok(None)
        }
        Err(e) => Err(CapError::Store {
            path: store_path_for(source),
            source: e,
        }),
    }
}

/// Open the hash store for `source`, or `None` when there is no usable one.
fn open_store(source: &Path) -> Option<HashStore> {
    #[cfg(test)]
    STORE_OPENS.with(|opens| opens.set(opens.get() + 1));

    match HashStore::open_for_source(source) {
        Ok(store) => Some(store),
        Err(StoreError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => None,
        Err(e) => {
            warn!(
                store = %store_path_for(source).display(),
                error = %e,
                "Unusable hash store, scanning flat text"
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use capdb_store::StoreWriter;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, body: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn first_source_wins() {
        let dir = TempDir::new().unwrap();
        let sources = vec![
            write(&dir, "one", "x:from=one:\n"),
            write(&dir, "two", "x:from=two:\ny:from=two:\n"),
        ];
        let locator = Locator::new(&sources, false);

        let x = locator.locate("x", 0, None).unwrap();
        assert_eq!(x.record.as_bytes(), b"x:from=one:");
        assert_eq!(x.cursor.index, 0);
        assert!(x.cursor.handle.is_some());

        let y = locator.locate("y", 0, None).unwrap();
        assert_eq!(y.cursor.index, 1);
    }

    #[test]
    fn missing_sources_are_skipped() {
        let dir = TempDir::new().unwrap();
        let sources = vec![dir.path().join("absent"), write(&dir, "db", "x:a:\n")];
        let located = Locator::new(&sources, true).locate("x", 0, None).unwrap();
        assert_eq!(located.cursor.index, 1);
    }

    #[test]
    fn not_found_after_all_sources() {
        let dir = TempDir::new().unwrap();
        let sources = vec![write(&dir, "db", "x:a:\n")];
        let err = Locator::new(&sources, false).locate("nope", 0, None).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn start_skips_earlier_sources() {
        let dir = TempDir::new().unwrap();
        let sources = vec![
            write(&dir, "one", "x:from=one:\n"),
            write(&dir, "two", "x:from=two:\n"),
        ];
        let located = Locator::new(&sources, false).locate("x", 1, None).unwrap();
        assert_eq!(located.record.as_bytes(), b"x:from=two:");
    }

    #[test]
    fn shared_handle_is_rewound() {
        let dir = TempDir::new().unwrap();
        let sources = vec![write(&dir, "db", "a:x:\nb:y:\n")];
        let mut open = OpenSource::Text(File::open(&sources[0]).unwrap());
        let locator = Locator::new(&sources, false);

        let b = locator.locate("b", 0, Some(&mut open)).unwrap();
        assert!(b.cursor.handle.is_none());
        let a = locator.locate("a", 0, Some(&mut open)).unwrap();
        assert_eq!(a.record.as_bytes(), b"a:x:");
    }

    #[test]
    fn store_is_handed_back_and_reused() {
        let dir = TempDir::new().unwrap();
        let sources = vec![
            write(&dir, "one", ""),
            write(&dir, "two", "later:z:\n"),
        ];
        let mut writer = StoreWriter::new();
        writer.insert_record("a", b"a:x:", false).unwrap();
        writer.insert_record("b", b"b:y:", true).unwrap();
        writer.write(&store_path_for(&sources[0])).unwrap();
        let locator = Locator::new(&sources, true);

        let a = locator.locate("a", 0, None).unwrap();
        assert_eq!(a.origin, Origin::HashStore { tc_error: false });
        let mut open = a.cursor.handle.expect("store kept open");
        assert!(matches!(open, OpenSource::Store(_)));

        // Later lookups through the open store leave the file alone.
        fs::remove_file(store_path_for(&sources[0])).unwrap();
        let b = locator.locate("b", 0, Some(&mut open)).unwrap();
        assert_eq!(b.record.as_bytes(), b"b:y:");
        assert_eq!(b.origin, Origin::HashStore { tc_error: true });
        assert!(b.cursor.handle.is_none());

        // A store miss moves on to the next source.
        let later = locator.locate("later", 0, Some(&mut open)).unwrap();
        assert_eq!(later.cursor.index, 1);
    }

    #[test]
    fn directory_source_is_a_system_error() {
        let dir = TempDir::new().unwrap();
        let sources = vec![dir.path().to_path_buf(), write(&dir, "db", "x:a:\n")];
        let err = Locator::new(&sources, false).locate("x", 0, None).unwrap_err();
        assert!(err.is_system(), "unexpected: {err}");
    }
}
