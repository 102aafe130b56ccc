//! File records
//!
//! One record per ingested archive, keyed by fingerprint. `last_accessed`
//! is refreshed on every cache-hit lookup; records idle past the TTL are
//! evicted together with all companion records on the next access.

use super::Result;
use crate::base::fingerprint::Fingerprint;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    pub fingerprint: String,
    pub name: String,
    pub size_bytes: u64,
    pub uploaded_at: u64,
    pub account_count: u32,
    pub last_accessed: u64,
    pub schema_version: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processing_time_ms: Option<u64>,
}

pub trait FileStore {
    /// Write the record & its access-time sort entry
    fn put_file(&self, record: &FileRecord) -> Result<()>;

    /// Fetch the record, refreshing `last_accessed` on hit. Stale-schema and
    /// TTL-expired records are evicted and read as a miss.
    fn get_file(&self, fingerprint: &Fingerprint) -> Result<Option<FileRecord>>;

    /// All live records, oldest access first
    fn get_all_files(&self) -> Result<Vec<FileRecord>>;

    /// Delete the record & its sort entry, leaving companion records alone
    fn delete_file(&self, fingerprint: &Fingerprint) -> Result<()>;
}
