//! Store key builders & byte helpers
//!
//! Composite keys always lead with the fingerprint bytes so each column
//! family can be scanned per fingerprint by prefix iteration.

use crate::base::{badge::Badge, fingerprint::Fingerprint};
use anyhow::bail;
use std::mem::size_of;

pub const U32_LEN: usize = size_of::<u32>();
pub const U64_LEN: usize = size_of::<u64>();

pub fn u32_from_be_bytes(bytes: &[u8]) -> anyhow::Result<u32> {
    if bytes.len() != U32_LEN {
        bail!("Invalid u32 bytes len: {}", bytes.len())
    }

    let mut be_bytes = [0; U32_LEN];
    be_bytes.copy_from_slice(bytes);
    Ok(u32::from_be_bytes(be_bytes))
}

pub fn u64_from_be_bytes(bytes: &[u8]) -> anyhow::Result<u64> {
    if bytes.len() != U64_LEN {
        bail!("Invalid u64 bytes len: {}", bytes.len())
    }

    let mut be_bytes = [0; U64_LEN];
    be_bytes.copy_from_slice(bytes);
    Ok(u64::from_be_bytes(be_bytes))
}

/// Key format
/// ```text
/// {fingerprint}{kind}
/// where
/// - fingerprint: [Fingerprint] bytes
/// - kind:        u8 column kind byte
/// ```
pub fn column_key(fingerprint: &Fingerprint, kind: u8) -> Vec<u8> {
    let mut key = Vec::with_capacity(fingerprint.as_bytes().len() + 1);
    key.extend_from_slice(fingerprint.as_bytes());
    key.push(kind);
    key
}

/// Key format
/// ```text
/// {fingerprint}{badge}
/// where
/// - fingerprint: [Fingerprint] bytes
/// - badge:       u8 badge kind byte
/// ```
pub fn bitset_key(fingerprint: &Fingerprint, badge: Badge) -> Vec<u8> {
    let mut key = Vec::with_capacity(fingerprint.as_bytes().len() + 1);
    key.extend_from_slice(fingerprint.as_bytes());
    key.push(badge.kind());
    key
}

/// Key format
/// ```text
/// {fingerprint}{username}
/// where
/// - fingerprint: [Fingerprint] bytes
/// - username:    UTF-8 bytes
/// ```
pub fn timestamp_key(fingerprint: &Fingerprint, username: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(fingerprint.as_bytes().len() + username.len());
    key.extend_from_slice(fingerprint.as_bytes());
    key.extend_from_slice(username.as_bytes());
    key
}

/// Key format
/// ```text
/// {fingerprint}{type}{key}
/// where
/// - fingerprint: [Fingerprint] bytes
/// - type:        u8 index type byte
/// - key:         UTF-8 prefix or trigram bytes
/// ```
pub fn search_index_key(fingerprint: &Fingerprint, index_type: u8, key: &str) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(fingerprint.as_bytes().len() + 1 + key.len());
    bytes.extend_from_slice(fingerprint.as_bytes());
    bytes.push(index_type);
    bytes.extend_from_slice(key.as_bytes());
    bytes
}

/// Key format
/// ```text
/// {timestamp}{suffix}
/// where
/// - timestamp: u64 BE millis (sort order)
/// - suffix:    the primary key of the record being sorted
/// ```
pub fn sort_key(timestamp: u64, suffix: &[u8]) -> Vec<u8> {
    let mut key = Vec::with_capacity(U64_LEN + suffix.len());
    key.extend_from_slice(&timestamp.to_be_bytes());
    key.extend_from_slice(suffix);
    key
}
