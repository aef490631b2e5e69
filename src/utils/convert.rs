//! Byte layout helpers for sled keys.
//!
//! Keys scoped to an election are `<election_id bytes> 0x00 <suffix>`, so a prefix scan over
//! `<election_id bytes> 0x00` yields exactly one election's rows.

use crate::ElectionId;
use crate::Result;
use crate::StorageError;

pub(crate) const KEY_SEPARATOR: u8 = 0;

pub fn safe_kv(num: u64) -> [u8; 8] {
    num.to_be_bytes()
}

pub fn safe_vk<K: AsRef<[u8]>>(bytes: K) -> Result<u64> {
    let bytes = bytes.as_ref();
    let array: [u8; 8] = bytes.try_into().map_err(|_| StorageError::DataCorruption {
        location: format!("u64 value with {} bytes", bytes.len()),
    })?;
    Ok(u64::from_be_bytes(array))
}

/// Prefix shared by every row of one election.
pub fn election_prefix(election_id: &ElectionId) -> Vec<u8> {
    let mut key = Vec::with_capacity(election_id.as_str().len() + 1);
    key.extend_from_slice(election_id.as_str().as_bytes());
    key.push(KEY_SEPARATOR);
    key
}

pub fn scoped_key(
    election_id: &ElectionId,
    suffix: &[u8],
) -> Vec<u8> {
    let mut key = election_prefix(election_id);
    key.extend_from_slice(suffix);
    key
}
