//! Slice cache
//!
//! A bounded LRU over fixed-size slices of the account sequence, fronting
//! the storage engine for view-layer reads. Misses trigger background
//! loads; callers retry on a later tick. Eviction runs with hysteresis:
//! nothing is swept until the cache overshoots 1.5x its budget, then the
//! oldest-accessed slices go until the budget holds again.

use crate::{
    base::{account::Account, fingerprint::Fingerprint},
    store::{account::AccountStore, IndexerStore},
};
use log::{trace, warn};
use lru::LruCache;
use smart_default::SmartDefault;
use std::{
    collections::HashSet,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
};

#[derive(Debug, Clone, Copy, SmartDefault)]
pub struct SliceCacheConfig {
    #[default = 500]
    pub slice_size: usize,

    #[default = 20]
    pub max_cached_slices: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub size: usize,
    pub max_size: usize,
}

struct CacheState {
    fingerprint: Option<Fingerprint>,
    account_count: u32,

    // keyed by slice start position; recency order is the eviction order
    slices: LruCache<u32, Arc<Vec<Account>>>,
    in_flight: HashSet<u32>,
}

struct SliceCacheInner {
    store: Arc<IndexerStore>,
    config: SliceCacheConfig,
    state: Mutex<CacheState>,

    // cleared on teardown so late loads drop their results
    mounted: AtomicBool,
}

#[derive(Clone)]
pub struct SliceCache {
    inner: Arc<SliceCacheInner>,
}

impl SliceCache {
    pub fn new(store: Arc<IndexerStore>, config: SliceCacheConfig) -> Self {
        Self {
            inner: Arc::new(SliceCacheInner {
                store,
                config,
                state: Mutex::new(CacheState {
                    fingerprint: None,
                    account_count: 0,
                    slices: LruCache::unbounded(),
                    in_flight: HashSet::new(),
                }),
                mounted: AtomicBool::new(true),
            }),
        }
    }

    /// Bind to a fingerprint, flushing everything cached for the previous one
    pub fn set_fingerprint(&self, fingerprint: Option<Fingerprint>, account_count: u32) {
        let mut state = self.inner.state.lock().expect("slice cache lock");
        state.fingerprint = fingerprint;
        state.account_count = account_count;
        state.slices.clear();
        state.in_flight.clear();
    }

    /// Late async results are dropped once torn down
    pub fn teardown(&self) {
        self.inner.mounted.store(false, Ordering::SeqCst);
    }

    /// Cached account at the position, or None with a background load
    /// scheduled; the caller retries on a later tick
    pub fn get_account(&self, index: u32) -> Option<Account> {
        let slice_start = {
            let mut state = self.inner.state.lock().expect("slice cache lock");
            if state.fingerprint.is_none() || index >= state.account_count {
                return None;
            }

            let slice_start = self.slice_start(index);
            if let Some(slice) = state.slices.get(&slice_start) {
                return slice.get((index - slice_start) as usize).cloned();
            }
            slice_start
        };

        self.schedule_load(slice_start);
        None
    }

    /// Cached accounts in `[start, end)`, or empty with loads scheduled for
    /// the missing slices
    pub fn get_range(&self, start: u32, end: u32) -> Vec<Account> {
        let mut missing = vec![];
        let mut accounts = vec![];

        {
            let mut state = self.inner.state.lock().expect("slice cache lock");
            if state.fingerprint.is_none() || start >= end {
                return vec![];
            }

            let end = end.min(state.account_count);
            let mut slice_start = self.slice_start(start);

            while slice_start < end {
                match state.slices.get(&slice_start).cloned() {
                    Some(slice) => {
                        for index in start.max(slice_start)..end.min(slice_start + slice.len() as u32)
                        {
                            if let Some(account) = slice.get((index - slice_start) as usize) {
                                accounts.push(account.clone());
                            }
                        }
                    }
                    None => missing.push(slice_start),
                }
                slice_start += self.inner.config.slice_size as u32;
            }
        }

        if missing.is_empty() {
            return accounts;
        }

        for slice_start in missing {
            self.schedule_load(slice_start);
        }
        vec![]
    }

    /// Accounts at the given positions, loading any missing slices inline.
    /// Preserves input order.
    pub async fn get_by_indices(&self, indices: &[u32]) -> Vec<Account> {
        let (account_count, has_fingerprint) = {
            let state = self.inner.state.lock().expect("slice cache lock");
            (state.account_count, state.fingerprint.is_some())
        };
        if !has_fingerprint || indices.is_empty() {
            return vec![];
        }

        // nearby indices collapse onto the same slice, so one load serves
        // the whole cluster
        let mut needed: Vec<u32> = indices
            .iter()
            .copied()
            .filter(|i| *i < account_count)
            .map(|i| self.slice_start(i))
            .collect();
        needed.sort_unstable();
        needed.dedup();

        for slice_start in needed {
            self.ensure_slice(slice_start).await;
        }

        let mut state = self.inner.state.lock().expect("slice cache lock");
        indices
            .iter()
            .filter_map(|index| {
                let slice_start = self.slice_start(*index);
                state
                    .slices
                    .get(&slice_start)
                    .and_then(|slice| slice.get((index - slice_start) as usize))
                    .cloned()
            })
            .collect()
    }

    /// Warm the next slice (and the previous when not at the top) around the
    /// visible window. Already-cached slices are left alone; load errors are
    /// swallowed.
    pub fn preload_adjacent(&self, visible_start: u32, visible_end: u32) {
        let slice_size = self.inner.config.slice_size as u32;
        let account_count = {
            let state = self.inner.state.lock().expect("slice cache lock");
            if state.fingerprint.is_none() {
                return;
            }
            state.account_count
        };

        let next = self.slice_start(visible_end) + slice_size;
        if next < account_count {
            self.schedule_load(next);
        }

        if visible_start > 0 {
            let current = self.slice_start(visible_start);
            if current >= slice_size {
                self.schedule_load(current - slice_size);
            }
        }
    }

    pub fn clear_cache(&self) {
        let mut state = self.inner.state.lock().expect("slice cache lock");
        state.slices.clear();
        state.in_flight.clear();
    }

    pub fn cache_stats(&self) -> CacheStats {
        let state = self.inner.state.lock().expect("slice cache lock");
        CacheStats {
            size: state.slices.len(),
            max_size: self.inner.config.max_cached_slices,
        }
    }

    fn slice_start(&self, index: u32) -> u32 {
        let slice_size = self.inner.config.slice_size as u32;
        (index / slice_size) * slice_size
    }

    /// Kick off a background load unless one is already in flight
    fn schedule_load(&self, slice_start: u32) {
        {
            let mut state = self.inner.state.lock().expect("slice cache lock");
            if state.slices.contains(&slice_start) || !state.in_flight.insert(slice_start) {
                return;
            }
        }

        let cache = self.clone();
        tokio::spawn(async move {
            cache.load_slice(slice_start).await;
        });
    }

    /// Load a slice inline, waiting out an in-flight load by polling
    async fn ensure_slice(&self, slice_start: u32) {
        loop {
            {
                let mut state = self.inner.state.lock().expect("slice cache lock");
                if state.slices.contains(&slice_start) {
                    return;
                }
                if state.in_flight.insert(slice_start) {
                    break;
                }
            }
            tokio::task::yield_now().await;
        }

        self.load_slice(slice_start).await;
    }

    async fn load_slice(&self, slice_start: u32) {
        let (fingerprint, slice_end) = {
            let mut state = self.inner.state.lock().expect("slice cache lock");
            let Some(fingerprint) = state.fingerprint.clone() else {
                state.in_flight.remove(&slice_start);
                return;
            };

            let slice_end = (slice_start + self.inner.config.slice_size as u32)
                .min(state.account_count);
            (fingerprint, slice_end)
        };

        let loaded = self
            .inner
            .store
            .get_accounts_by_range(&fingerprint, slice_start, slice_end);

        let mut state = self.inner.state.lock().expect("slice cache lock");
        state.in_flight.remove(&slice_start);

        if !self.inner.mounted.load(Ordering::SeqCst) {
            return;
        }

        // the binding moved while we were loading; drop the stale result
        if state.fingerprint.as_ref() != Some(&fingerprint) {
            return;
        }

        match loaded {
            Ok(accounts) => {
                trace!("Cached slice [{slice_start}, {slice_end})");
                state.slices.put(slice_start, Arc::new(accounts));
                self.evict(&mut state);
            }
            Err(e) => warn!("Failed to load slice [{slice_start}, {slice_end}): {e}"),
        }
    }

    /// Hysteresis sweep: trip past 1.5x the budget, evict oldest-accessed
    /// until the budget holds
    fn evict(&self, state: &mut CacheState) {
        let max = self.inner.config.max_cached_slices;
        if state.slices.len() > max * 3 / 2 {
            while state.slices.len() > max {
                if let Some((evicted, _)) = state.slices.pop_lru() {
                    trace!("Evicted slice starting at {evicted}");
                }
            }
        }
    }
}
