//! Badge bitset records
//!
//! One little-endian packed bit vector per `(fingerprint, badge)`: bit `i`
//! set iff account `i` bears the badge. The popcount rides in a companion
//! count entry so stats reads never materialize the vector.

use super::Result;
use crate::{
    base::{badge::Badge, fingerprint::Fingerprint},
    collection::bitset::Bitset,
};
use bincode::{Decode, Encode};
use speedb::WriteBatch;
use std::{collections::HashMap, sync::Arc};

#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct BitsetRecord {
    pub fingerprint: String,
    pub badge: Badge,
    pub data: Vec<u8>,
    pub set_count: u32,
}

impl BitsetRecord {
    pub fn from_bitset(fingerprint: &Fingerprint, badge: Badge, bitset: &Bitset) -> Self {
        Self {
            fingerprint: fingerprint.to_string(),
            badge,
            data: bitset.to_bytes(),
            set_count: bitset.count() as u32,
        }
    }
}

pub trait BitsetStore {
    /// Stage the record & its count entry into a batch
    fn put_bitset_batch(&self, record: &BitsetRecord, batch: &mut WriteBatch) -> Result<()>;

    fn get_bitset_record(
        &self,
        fingerprint: &Fingerprint,
        badge: Badge,
    ) -> Result<Option<BitsetRecord>>;

    /// Materialized bitset, memoized per process
    fn get_badge_bitset(
        &self,
        fingerprint: &Fingerprint,
        badge: Badge,
    ) -> Result<Option<Arc<Bitset>>>;

    /// Per-badge set counts from the count entries alone
    fn get_badge_stats(&self, fingerprint: &Fingerprint) -> Result<HashMap<Badge, u32>>;
}
