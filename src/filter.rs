//! Filter engine
//!
//! Answers `(badges, query)` queries against one fingerprint by
//! intersecting cached badge bitsets, narrowing through the search indexes
//! when they are ready, and verifying candidates against the username
//! column so results are always exact case-insensitive substring matches.
//! Hydration coalesces nearby indices into range reads and returns accounts
//! in the caller's order.

use crate::{
    base::{account::Account, badge::Badge, fingerprint::Fingerprint},
    collection::bitset::Bitset,
    constants::{LINEAR_SCAN_BATCH_SIZE, RANGE_COALESCE_GAP},
    search::query_trigrams,
    store::{
        account::AccountStore,
        bitset::BitsetStore,
        column::ColumnKind,
        file::FileStore,
        search::{IndexType, SearchIndexStore},
        IndexerStore, Result,
    },
};
use anyhow::{anyhow, bail};
use log::{debug, trace};
use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

struct EngineState {
    fingerprint: Fingerprint,
    account_count: u32,

    // engine-local memoization, separate from the store's
    bitsets: HashMap<Badge, Arc<Bitset>>,
}

pub struct FilterEngine {
    store: Arc<IndexerStore>,
    state: Option<EngineState>,
}

impl FilterEngine {
    pub fn new(store: Arc<IndexerStore>) -> Self {
        Self { store, state: None }
    }

    /// Bind the engine to a fingerprint. The account count is read from the
    /// file record when not supplied. Preloads the hot badge bitsets.
    pub async fn init(
        &mut self,
        fingerprint: Fingerprint,
        account_count: Option<u32>,
    ) -> Result<()> {
        let account_count = match account_count {
            Some(count) => count,
            None => self
                .store
                .get_file(&fingerprint)?
                .map(|record| record.account_count)
                .ok_or_else(|| anyhow!("no file record for {fingerprint}"))?,
        };

        debug!("Filter engine bound to {fingerprint} ({account_count} accounts)");
        self.state = Some(EngineState {
            fingerprint,
            account_count,
            bitsets: HashMap::new(),
        });

        for badge in [Badge::Following, Badge::Followers, Badge::Mutuals] {
            self.load_bitset(badge).await?;
        }

        Ok(())
    }

    pub fn fingerprint(&self) -> Option<&Fingerprint> {
        self.state.as_ref().map(|s| &s.fingerprint)
    }

    /// Drop the binding and every memoized bitset
    pub fn clear(&mut self) {
        self.state = None;
    }

    fn state(&self) -> Result<&EngineState> {
        match self.state.as_ref() {
            Some(state) => Ok(state),
            None => bail!("filter engine not initialized"),
        }
    }

    async fn load_bitset(&mut self, badge: Badge) -> Result<Option<Arc<Bitset>>> {
        let state = match self.state.as_mut() {
            Some(state) => state,
            None => bail!("filter engine not initialized"),
        };

        if let Some(bitset) = state.bitsets.get(&badge) {
            return Ok(Some(bitset.clone()));
        }

        match self.store.get_badge_bitset(&state.fingerprint, badge)? {
            Some(bitset) => {
                state.bitsets.insert(badge, bitset.clone());
                Ok(Some(bitset))
            }
            None => Ok(None),
        }
    }

    /// Canonical positions matching every badge filter and the query, in
    /// ascending order
    pub async fn filter_to_indices(&mut self, query: &str, filters: &[Badge]) -> Result<Vec<u32>> {
        let account_count = self.state()?.account_count;

        let mut filtered: Option<Bitset> = None;
        if !filters.is_empty() {
            let mut loaded = vec![];
            for badge in filters {
                if let Some(bitset) = self.load_bitset(*badge).await? {
                    loaded.push(bitset);
                }
            }

            // every filter lacked a bitset: nothing can match
            if loaded.is_empty() {
                return Ok(vec![]);
            }

            let mut acc = (*loaded[0]).clone();
            for bitset in &loaded[1..] {
                acc.intersect_in_place(bitset);
            }
            filtered = Some(acc);
        }

        let mut indices: Vec<u32> = match &filtered {
            Some(bitset) => bitset.to_indices(),
            None => (0..account_count).collect(),
        };

        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return Ok(indices);
        }

        let fingerprint = self.state()?.fingerprint.clone();
        if self.store.has_search_indexes(&fingerprint)? {
            if let Some(search) = self.smart_search(&query).await? {
                let requested = Bitset::from_indices(&indices, account_count as usize);
                let candidates = requested.intersect(&search).to_indices();
                trace!(
                    "Search index narrowed {} indices to {} candidates",
                    indices.len(),
                    candidates.len()
                );
                return self.substring_filter(&candidates, &query);
            }
        }

        indices = self.substring_filter(&indices, &query)?;
        Ok(indices)
    }

    /// Index-backed candidate lookup. None means the indexes cannot answer
    /// this query and the caller must scan.
    async fn smart_search(&self, query: &str) -> Result<Option<Bitset>> {
        let state = self.state()?;

        let query_len = query.chars().count();
        if query_len <= 3 {
            let prefix_hit = self.prefix_lookup(&state.fingerprint, query)?;

            // a 3-char query is itself one padded window, so its trigram
            // bitset is the complete containment set; the union repairs
            // mid-string matches the prefix key alone would miss
            if query_len == 3 {
                if let Some(record) =
                    self.store
                        .get_search_record(&state.fingerprint, IndexType::Trigram, query)?
                {
                    let trigram_hit = Bitset::from_bytes(&record.data);
                    return Ok(Some(match prefix_hit {
                        Some(prefix_hit) => prefix_hit.union(&trigram_hit),
                        None => trigram_hit,
                    }));
                }
            }

            // a 2-char query sits inside some padded window of every
            // username containing it, so the union of trigram bitsets
            // whose key contains the query is a complete candidate
            // superset; windows spanning the padding can only add false
            // positives, which substring verification strips
            if query_len == 2 {
                let mut candidates = prefix_hit;

                for key in self.store.get_trigram_keys(&state.fingerprint)? {
                    if !key.contains(query) {
                        continue;
                    }

                    if let Some(record) = self.store.get_search_record(
                        &state.fingerprint,
                        IndexType::Trigram,
                        &key,
                    )? {
                        let trigram_hit = Bitset::from_bytes(&record.data);
                        candidates = Some(match candidates {
                            Some(candidates) => candidates.union(&trigram_hit),
                            None => trigram_hit,
                        });
                    }
                }

                return Ok(candidates);
            }

            return Ok(prefix_hit);
        }

        // intersect trigram bitsets smallest-first
        let mut bitsets = vec![];
        for trigram in query_trigrams(query) {
            match self
                .store
                .get_search_record(&state.fingerprint, IndexType::Trigram, &trigram)?
            {
                Some(record) => bitsets.push(Bitset::from_bytes(&record.data)),
                None => return self.prefix_lookup(&state.fingerprint, query),
            }
        }

        if bitsets.is_empty() {
            return self.prefix_lookup(&state.fingerprint, query);
        }

        bitsets.sort_by_key(|b| b.count());
        let mut acc = bitsets.remove(0);
        for bitset in &bitsets {
            acc.intersect_in_place(bitset);
            if acc.is_empty() {
                break;
            }
        }

        Ok(Some(acc))
    }

    /// Prefix-index lookup on the leading 2–4 query characters
    fn prefix_lookup(&self, fingerprint: &Fingerprint, query: &str) -> Result<Option<Bitset>> {
        let chars: Vec<char> = query.chars().collect();
        if chars.len() < 2 {
            return Ok(None);
        }

        let key: String = chars[..chars.len().min(4)].iter().collect();
        Ok(self
            .store
            .get_search_record(fingerprint, IndexType::Prefix, &key)?
            .map(|record| Bitset::from_bytes(&record.data)))
    }

    /// Keep the indices whose lowercased username contains the query.
    /// Scans in batches, one username range read per batch.
    fn substring_filter(&self, indices: &[u32], query: &str) -> Result<Vec<u32>> {
        let state = self.state()?;

        let Some(usernames) = self
            .store
            .get_string_column(&state.fingerprint, ColumnKind::Usernames)?
        else {
            return Ok(vec![]);
        };

        let mut matched = vec![];
        for batch in indices.chunks(LINEAR_SCAN_BATCH_SIZE) {
            let (Some(min), Some(max)) = (batch.first(), batch.last()) else {
                continue;
            };

            let names = usernames.get_range(*min as usize, *max as usize + 1);
            for index in batch {
                if let Some(name) = names.get((index - min) as usize) {
                    if name.contains(query) {
                        matched.push(*index);
                    }
                }
            }
        }

        Ok(matched)
    }

    /// Hydrate accounts for the given positions, preserving their order
    /// exactly. Nearby positions coalesce into one range read.
    pub async fn load_accounts_by_indices(&mut self, indices: &[u32]) -> Result<Vec<Account>> {
        let state = self.state()?;
        if indices.is_empty() {
            return Ok(vec![]);
        }

        let fingerprint = state.fingerprint.clone();
        let requested: HashSet<u32> = indices.iter().copied().collect();

        let mut sorted: Vec<u32> = indices.to_vec();
        sorted.sort_unstable();
        sorted.dedup();

        let mut by_index: HashMap<u32, Account> = HashMap::new();
        for (start, end) in coalesce_ranges(&sorted, RANGE_COALESCE_GAP) {
            let accounts = self
                .store
                .get_accounts_by_range(&fingerprint, start, end + 1)?;

            for (offset, account) in accounts.into_iter().enumerate() {
                let index = start + offset as u32;
                if requested.contains(&index) {
                    by_index.insert(index, account);
                }
            }
        }

        Ok(indices
            .iter()
            .filter_map(|index| by_index.get(index).cloned())
            .collect())
    }
}

/// Coalesce ascending indices into inclusive ranges, merging neighbors at
/// most `gap` apart
fn coalesce_ranges(sorted: &[u32], gap: u32) -> Vec<(u32, u32)> {
    let mut ranges: Vec<(u32, u32)> = vec![];

    for &index in sorted {
        match ranges.last_mut() {
            Some((_, end)) if index - *end <= gap => *end = index,
            _ => ranges.push((index, index)),
        }
    }

    ranges
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coalesce_ranges() {
        assert_eq!(
            coalesce_ranges(&[0, 1, 2, 20, 25, 100], 10),
            vec![(0, 2), (20, 25), (100, 100)]
        );
        assert_eq!(coalesce_ranges(&[], 10), vec![]);
        assert_eq!(coalesce_ranges(&[7], 10), vec![(7, 7)]);
    }

    #[test]
    fn test_coalesce_gap_boundary() {
        assert_eq!(coalesce_ranges(&[0, 10], 10), vec![(0, 10)]);
        assert_eq!(coalesce_ranges(&[0, 11], 10), vec![(0, 0), (11, 11)]);
    }
}
