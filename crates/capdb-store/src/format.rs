//! On-disk layout of a capability hash store.
//!
//! All integers are little-endian:
//!
//! ```text
//! 0..4    magic "CAPD"
//! 4..8    format version (u32)
//! 8..16   build time, unix seconds (i64)
//! 16..20  entry count (u32)
//! 20..    entries: key_len u32, key, value_len u32, value
//! end-32  SHA-256 of every preceding byte
//! ```
//!
//! Every value starts with a one-byte [`Marker`].

use crate::{Result, StoreError};
use sha2::{Digest, Sha256};

/// Store file magic.
pub const STORE_MAGIC: [u8; 4] = *b"CAPD";

/// Current on-disk format version.
pub const STORE_VERSION: u32 = 1;

/// Size of the fixed header in bytes.
pub const HEADER_BYTES: usize = 20;

/// Size of the trailing digest in bytes.
pub const DIGEST_BYTES: usize = 32;

/// File suffix appended to a source path to find its store.
pub const STORE_SUFFIX: &str = ".db";

/// Value marker stored as the first byte of every value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Marker {
    /// The payload is the record itself.
    None = 0,
    /// The payload is a record whose references did not all resolve.
    TcError = 1,
    /// The payload is another key to look up.
    Shadow = 2,
}

impl Marker {
    /// Decode a marker byte. Unknown bytes read as a direct value.
    pub fn from_byte(byte: u8) -> Self {
        match byte {
            1 => Marker::TcError,
            2 => Marker::Shadow,
            _ => Marker::None,
        }
    }

    pub fn as_byte(self) -> u8 {
        self as u8
    }
}

/// Fixed store header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreHeader {
    pub version: u32,
    pub created_at: i64,
    pub entry_count: u32,
}

impl StoreHeader {
    pub fn encode(&self) -> [u8; HEADER_BYTES] {
        let mut out = [0u8; HEADER_BYTES];
        out[0..4].copy_from_slice(&STORE_MAGIC);
        out[4..8].copy_from_slice(&self.version.to_le_bytes());
        out[8..16].copy_from_slice(&self.created_at.to_le_bytes());
        out[16..20].copy_from_slice(&self.entry_count.to_le_bytes());
        out
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_BYTES {
            return Err(StoreError::Truncated(format!(
                "header needs {HEADER_BYTES} bytes, have {}",
                bytes.len()
            )));
        }
        if bytes[0..4] != STORE_MAGIC {
            return Err(StoreError::BadMagic);
        }
        let version = read_u32(bytes, 4)?;
        if version != STORE_VERSION {
            return Err(StoreError::UnsupportedVersion {
                version,
                supported: STORE_VERSION,
            });
        }
        let mut created = [0u8; 8];
        created.copy_from_slice(&bytes[8..16]);
        Ok(Self {
            version,
            created_at: i64::from_le_bytes(created),
            entry_count: read_u32(bytes, 16)?,
        })
    }
}

/// Hex SHA-256 of `data`.
pub fn compute_checksum(data: &[u8]) -> String {
    hex::encode(digest(data))
}

pub(crate) fn digest(data: &[u8]) -> [u8; DIGEST_BYTES] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

pub(crate) fn read_u32(bytes: &[u8], at: usize) -> Result<u32> {
    let slice = bytes
        .get(at..at + 4)
        .ok_or_else(|| StoreError::Truncated(format!("u32 at offset {at}")))?;
    let mut array = [0u8; 4];
    array.copy_from_slice(slice);
    Ok(u32::from_le_bytes(array))
}

/// A length or count as its on-disk `u32`.
pub(crate) fn encode_len(what: &'static str, len: usize) -> Result<[u8; 4]> {
    u32::try_from(len)
        .map(u32::to_le_bytes)
        .map_err(|_| StoreError::TooLarge { what, len })
}

/// Append a length-prefixed byte string.
pub(crate) fn put_bytes(out: &mut Vec<u8>, bytes: &[u8]) -> Result<()> {
    out.extend_from_slice(&encode_len("entry length", bytes.len())?);
    out.extend_from_slice(bytes);
    Ok(())
}

/// Read a length-prefixed byte string at `*at`, advancing the offset.
pub(crate) fn take_bytes<'a>(bytes: &'a [u8], at: &mut usize) -> Result<&'a [u8]> {
    let len = read_u32(bytes, *at)? as usize;
    let start = *at + 4;
    let slice = bytes.get(start..start + len).ok_or_else(|| {
        StoreError::Truncated(format!("{len}-byte field at offset {start}"))
    })?;
    *at = start + len;
    Ok(slice)
}
