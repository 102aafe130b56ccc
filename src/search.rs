//! Search index builder
//!
//! Two inverted indexes per fingerprint map string keys to bitsets of
//! account positions:
//!
//! - prefix index: leading 2–4 characters of each lowercased username
//! - trigram index: every length-3 window of the username padded as
//!   `__name__`, so boundary trigrams make starts-with and ends-with
//!   queries expressible through the same mechanism
//!
//! Accounts are processed in batches to allow cooperative progress; all
//! batches merge into the same keyed bitsets and land in one write at
//! completion, together with the representative probe record that marks the
//! build finished.

use crate::{
    base::fingerprint::Fingerprint,
    collection::bitset::Bitset,
    constants::{
        PREFIX_MAX_LEN, PREFIX_MIN_LEN, SEARCH_INDEX_BATCH_SIZE, SEARCH_INDEX_TTL_MILLIS,
        SEARCH_PROBE_KEY,
    },
    store::{
        search::{IndexType, SearchIndexRecord, SearchIndexStore},
        IndexerStore, Result,
    },
    utility::now_millis,
};
use bytesize::ByteSize;
use log::debug;
use speedb::WriteBatch;
use std::collections::HashMap;

/// Prefixes of length 2 through 4 of a lowercased username.
/// Single-character names yield nothing.
pub fn prefixes_of(username: &str) -> Vec<String> {
    let chars: Vec<char> = username.chars().collect();

    (PREFIX_MIN_LEN..=PREFIX_MAX_LEN.min(chars.len()))
        .map(|len| chars[..len].iter().collect())
        .collect()
}

/// Every length-3 window of `__name__`
pub fn trigrams_of(username: &str) -> Vec<String> {
    let padded: Vec<char> = format!("__{username}__").chars().collect();

    padded.windows(3).map(|w| w.iter().collect()).collect()
}

/// Length-3 windows of a raw query string, no padding. Each window of a
/// substring also appears among its containing username's padded windows,
/// so intersecting these yields a candidate superset.
pub fn query_trigrams(query: &str) -> Vec<String> {
    let chars: Vec<char> = query.chars().collect();

    chars.windows(3).map(|w| w.iter().collect()).collect()
}

/// Projected index footprint: one bitset of `account_count` bits per key
pub fn estimated_index_bytes(key_count: usize, account_count: u32) -> u64 {
    key_count as u64 * (account_count as u64).div_ceil(8)
}

/// Build & persist both indexes for the lowercased usernames at their
/// canonical positions
pub async fn build_search_indexes(
    store: &IndexerStore,
    fingerprint: &Fingerprint,
    usernames: &[(String, u32)],
) -> Result<()> {
    let account_count = usernames.len();
    let mut keyed: HashMap<(IndexType, String), Bitset> = HashMap::new();

    for batch in usernames.chunks(SEARCH_INDEX_BATCH_SIZE) {
        for (username, position) in batch {
            for prefix in prefixes_of(username) {
                keyed
                    .entry((IndexType::Prefix, prefix))
                    .or_insert_with(|| Bitset::new(account_count))
                    .set(*position as usize);
            }

            for trigram in trigrams_of(username) {
                keyed
                    .entry((IndexType::Trigram, trigram))
                    .or_insert_with(|| Bitset::new(account_count))
                    .set(*position as usize);
            }
        }

        // cooperative batch boundary
        tokio::task::yield_now().await;
    }

    // completion marker: the probe key always exists, even when empty
    keyed
        .entry((IndexType::Prefix, SEARCH_PROBE_KEY.to_string()))
        .or_insert_with(|| Bitset::new(account_count));

    debug!(
        "Search indexes for {fingerprint}: {} keys, ~{}",
        keyed.len(),
        ByteSize(estimated_index_bytes(keyed.len(), account_count as u32))
    );

    let created_at = now_millis();
    let expires_at = created_at + SEARCH_INDEX_TTL_MILLIS;
    let mut batch = WriteBatch::default();

    for ((index_type, key), bitset) in keyed {
        let record = SearchIndexRecord {
            fingerprint: fingerprint.to_string(),
            index_type,
            key,
            data: bitset.to_bytes(),
            created_at,
            expires_at,
        };
        store.put_search_record_batch(&record, &mut batch)?;
    }

    store.database.write(batch).map_err(crate::store::db_error)
}
