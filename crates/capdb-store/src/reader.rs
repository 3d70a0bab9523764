//! Store reader: opening, verifying and querying `.db` files.

use crate::format::{
    self, Marker, StoreHeader, DIGEST_BYTES, HEADER_BYTES, STORE_SUFFIX,
};
use crate::{Result, StoreError};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

/// Value returned by a successful [`HashStore::lookup`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreValue {
    /// Record bytes with the marker stripped.
    pub payload: Vec<u8>,
    /// The record was stored with the `error` marker: one of its references
    /// failed to resolve when the store was built.
    pub tc_error: bool,
}

/// An opened, verified hash store held in memory.
#[derive(Debug)]
pub struct HashStore {
    header: StoreHeader,
    entries: HashMap<Vec<u8>, Vec<u8>>,
}

/// Path of the store that shadows a flat-text source.
pub fn store_path_for(source: &Path) -> PathBuf {
    let mut os = source.as_os_str().to_owned();
    os.push(STORE_SUFFIX);
    PathBuf::from(os)
}

impl HashStore {
    /// Open a store from a file path.
    pub fn open(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        let store = Self::from_bytes(&bytes)?;
        debug!(
            path = %path.display(),
            entries = store.len(),
            "Hash store opened"
        );
        Ok(store)
    }

    /// Open the store that accompanies a flat-text `source` (`<source>.db`).
    pub fn open_for_source(source: &Path) -> Result<Self> {
        Self::open(&store_path_for(source))
    }

    /// Parse and verify a store image.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let header = StoreHeader::decode(bytes)?;
        if bytes.len() < HEADER_BYTES + DIGEST_BYTES {
            return Err(StoreError::Truncated("missing digest".to_string()));
        }

        let (body, trailer) = bytes.split_at(bytes.len() - DIGEST_BYTES);
        let actual = format::digest(body);
        if actual.as_slice() != trailer {
            return Err(StoreError::ChecksumMismatch {
                expected: hex::encode(trailer),
                actual: hex::encode(actual),
            });
        }

        let mut entries = HashMap::with_capacity(header.entry_count as usize);
        let mut at = HEADER_BYTES;
        for _ in 0..header.entry_count {
            let key = format::take_bytes(body, &mut at)?;
            let value = format::take_bytes(body, &mut at)?;
            if value.is_empty() {
                return Err(StoreError::Truncated(format!(
                    "value for '{}' has no marker",
                    String::from_utf8_lossy(key)
                )));
            }
            entries.insert(key.to_vec(), value.to_vec());
        }
        if at != body.len() {
            return Err(StoreError::Truncated(format!(
                "{} trailing bytes after last entry",
                body.len() - at
            )));
        }

        Ok(Self { header, entries })
    }

    pub fn header(&self) -> &StoreHeader {
        &self.header
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Raw marker-prefixed value stored under `key`.
    pub fn get_raw(&self, key: &[u8]) -> Option<&[u8]> {
        self.entries.get(key).map(Vec::as_slice)
    }

    /// Look up `name`, following shadow entries to the record they name.
    ///
    /// A chain longer than the number of entries must revisit a key, so it
    /// is reported as [`StoreError::ShadowLoop`] instead of spinning.
    pub fn lookup(&self, name: &str) -> Result<StoreValue> {
        let mut key: &[u8] = name.as_bytes();
        let mut hops = 0usize;
        loop {
            let value = self
                .get_raw(key)
                .ok_or_else(|| StoreError::NotFound(String::from_utf8_lossy(key).into_owned()))?;
            let (marker, payload) = (Marker::from_byte(value[0]), &value[1..]);
            match marker {
                Marker::Shadow => {
                    hops += 1;
                    if hops > self.entries.len() {
                        return Err(StoreError::ShadowLoop(name.to_string()));
                    }
                    trace!(
                        from = %String::from_utf8_lossy(key),
                        to = %String::from_utf8_lossy(payload),
                        "Following shadow entry"
                    );
                    key = payload;
                }
                Marker::None | Marker::TcError => {
                    return Ok(StoreValue {
                        payload: payload.to_vec(),
                        tc_error: marker == Marker::TcError,
                    });
                }
            }
        }
    }

    /// Keys stored with a direct (non-shadow) value, sorted.
    pub fn primary_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, v)| Marker::from_byte(v[0]) != Marker::Shadow)
            .map(|(k, _)| String::from_utf8_lossy(k).into_owned())
            .collect();
        keys.sort();
        keys
    }
}
