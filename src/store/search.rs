//! Search-index records
//!
//! Inverted-index rows mapping a prefix or trigram key to the bitset of
//! account positions containing it. Records expire three days after
//! creation; expired rows are deleted lazily on read.

use super::Result;
use crate::base::fingerprint::Fingerprint;
use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};
use speedb::WriteBatch;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Encode, Decode,
)]
pub enum IndexType {
    Prefix,
    Trigram,
}

impl IndexType {
    /// Stable storage byte
    pub fn kind(&self) -> u8 {
        match self {
            Self::Prefix => 0,
            Self::Trigram => 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct SearchIndexRecord {
    pub fingerprint: String,
    pub index_type: IndexType,
    pub key: String,
    pub data: Vec<u8>,
    pub created_at: u64,
    pub expires_at: u64,
}

pub trait SearchIndexStore {
    /// Stage the record & its expiry sort entry into a batch
    fn put_search_record_batch(
        &self,
        record: &SearchIndexRecord,
        batch: &mut WriteBatch,
    ) -> Result<()>;

    /// Fetch a record; expired records are deleted and read as a miss
    fn get_search_record(
        &self,
        fingerprint: &Fingerprint,
        index_type: IndexType,
        key: &str,
    ) -> Result<Option<SearchIndexRecord>>;

    /// Keys of every trigram record under the fingerprint, values untouched
    fn get_trigram_keys(&self, fingerprint: &Fingerprint) -> Result<Vec<String>>;

    /// Cheap readiness probe: true iff the representative prefix record
    /// written at build completion is present & unexpired
    fn has_search_indexes(&self, fingerprint: &Fingerprint) -> Result<bool>;

    /// Sweep every record past its expiry, returning the count removed
    fn delete_expired_search_records(&self) -> Result<u32>;
}
