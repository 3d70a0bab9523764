//! Store writer for building `.db` files.

use crate::format::{self, Marker, StoreHeader, STORE_VERSION};
use crate::{Result, StoreError};
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::Path;
use tracing::{debug, info};

/// Builder for a capability hash store.
///
/// Entries are kept sorted by key so the same input always produces the same
/// bytes (apart from the build time, which can be pinned).
#[derive(Debug, Default)]
pub struct StoreWriter {
    entries: BTreeMap<Vec<u8>, Vec<u8>>,
    created_at: Option<i64>,
}

impl StoreWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pin the build time written to the header.
    pub fn with_created_at(mut self, unix_seconds: i64) -> Self {
        self.created_at = Some(unix_seconds);
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key.as_bytes())
    }

    /// Store a record under `key`.
    pub fn insert_record(&mut self, key: &str, record: &[u8], tc_error: bool) -> Result<()> {
        let marker = if tc_error {
            Marker::TcError
        } else {
            Marker::None
        };
        self.insert(key, marker, record)
    }

    /// Store `alias` as a pointer to the record stored under `target`.
    pub fn insert_shadow(&mut self, alias: &str, target: &str) -> Result<()> {
        self.insert(alias, Marker::Shadow, target.as_bytes())
    }

    fn insert(&mut self, key: &str, marker: Marker, payload: &[u8]) -> Result<()> {
        if key.is_empty() {
            return Err(StoreError::EmptyKey);
        }
        if self.contains(key) {
            return Err(StoreError::DuplicateKey(key.to_string()));
        }
        let mut value = Vec::with_capacity(payload.len() + 1);
        value.push(marker.as_byte());
        value.extend_from_slice(payload);
        self.entries.insert(key.as_bytes().to_vec(), value);
        debug!(key, ?marker, bytes = payload.len(), "Added store entry");
        Ok(())
    }

    /// Serialize the store image, digest included.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let entry_count =
            u32::try_from(self.entries.len()).map_err(|_| StoreError::TooLarge {
                what: "entry count",
                len: self.entries.len(),
            })?;
        let header = StoreHeader {
            version: STORE_VERSION,
            created_at: self
                .created_at
                .unwrap_or_else(|| chrono::Utc::now().timestamp()),
            entry_count,
        };

        let mut out = Vec::new();
        out.extend_from_slice(&header.encode());
        for (key, value) in &self.entries {
            format::put_bytes(&mut out, key)?;
            format::put_bytes(&mut out, value)?;
        }
        let digest = format::digest(&out);
        out.extend_from_slice(&digest);
        Ok(out)
    }

    /// Write the store to `path`.
    ///
    /// The image goes to a sibling temporary file first and is renamed over
    /// `path`, so readers never observe a half-written store.
    pub fn write(&self, path: &Path) -> Result<()> {
        let bytes = self.to_bytes()?;
        let mut tmp_name = path.as_os_str().to_owned();
        tmp_name.push(".tmp");
        let tmp_path = Path::new(&tmp_name);

        let mut file = fs::File::create(tmp_path)?;
        file.write_all(&bytes)?;
        file.sync_all()?;
        drop(file);
        fs::rename(tmp_path, path)?;

        info!(
            path = %path.display(),
            entries = self.entries.len(),
            bytes = bytes.len(),
            checksum = %format::compute_checksum(&bytes),
            "Hash store written"
        );
        Ok(())
    }
}
