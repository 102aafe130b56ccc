//! Crate-wide constants

/// On-disk schema version. Records written by an older version are treated
/// as a miss and force a re-ingest.
pub const STORE_VERSION: u32 = 2;

/// Fingerprints hash at most this many leading bytes of an archive.
pub const FINGERPRINT_SAMPLE_BYTES: usize = 1 << 20;

/// Largest accepted archive.
pub const MAX_ARCHIVE_BYTES: u64 = 512 * 1024 * 1024;

/// File records expire this long after their last access.
pub const FILE_TTL_MILLIS: u64 = 7 * 24 * 60 * 60 * 1000;

/// Search-index records expire this long after creation.
pub const SEARCH_INDEX_TTL_MILLIS: u64 = 3 * 24 * 60 * 60 * 1000;

/// Accounts per search-index build batch.
pub const SEARCH_INDEX_BATCH_SIZE: usize = 250;

/// Representative prefix key probed to test search-index readiness.
/// The builder always writes this record on completion.
pub const SEARCH_PROBE_KEY: &str = "us";

/// Prefix index key lengths.
pub const PREFIX_MIN_LEN: usize = 2;
pub const PREFIX_MAX_LEN: usize = 4;

/// Indices per batch on the linear substring-scan fallback.
pub const LINEAR_SCAN_BATCH_SIZE: usize = 1000;

/// Consecutive hydration indices at most this far apart coalesce into one
/// range read.
pub const RANGE_COALESCE_GAP: u32 = 10;

/// Skip building search indexes projected to exceed this footprint.
pub const MAX_INDEX_BYTES: u64 = 256 * 1024 * 1024;

/// Background parse + store deadline in seconds.
pub const INGEST_DEADLINE_SECS: u64 = 60;

/// Well-known fingerprint of the bundled demo snapshot.
pub const SAMPLE_FINGERPRINT: &str = "sample-demo-data-v1";

/// Ingest progress channel capacity. Events beyond a slow consumer's
/// backlog are coalesced (dropped).
pub const PROGRESS_CHANNEL_CAPACITY: usize = 64;
