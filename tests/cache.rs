//! Slice cache: LRU hysteresis, fingerprint flush, order preservation

mod helpers;

use follow_indexer::{
    base::fingerprint::Fingerprint,
    cache::{SliceCache, SliceCacheConfig},
    store::account::AccountStore,
};
use helpers::{create_store, roster_of};
use pretty_assertions::assert_eq;
use std::sync::Arc;

const SLICE_SIZE: usize = 100;

async fn setup(
    prefix: &str,
    account_count: usize,
    max_cached_slices: usize,
) -> anyhow::Result<(tempfile::TempDir, SliceCache)> {
    let (dir, store) = create_store(prefix)?;
    let fp = Fingerprint::from("fp-cache");

    let names: Vec<String> = (0..account_count).map(|i| format!("user_{i:05}")).collect();
    let roster = roster_of(&names.iter().map(String::as_str).collect::<Vec<_>>());
    store.store_all(&fp, &roster)?;

    let cache = SliceCache::new(
        Arc::new(store),
        SliceCacheConfig {
            slice_size: SLICE_SIZE,
            max_cached_slices,
        },
    );
    cache.set_fingerprint(Some(fp), account_count as u32);

    Ok((dir, cache))
}

/// Load the slice holding `index` and wait for it to land
async fn load_slice_of(cache: &SliceCache, index: u32) {
    let loaded = cache.get_by_indices(&[index]).await;
    assert_eq!(loaded.len(), 1, "slice load for index {index}");
}

#[tokio::test]
async fn test_lru_hysteresis_sweep() -> anyhow::Result<()> {
    let (_dir, cache) = setup("cache-lru", 400, 2).await?;

    // slices 0, 1, touch 0, then 2: count 3 stays within 1.5x the budget
    load_slice_of(&cache, 5).await;
    load_slice_of(&cache, 105).await;
    load_slice_of(&cache, 7).await;
    load_slice_of(&cache, 205).await;
    assert_eq!(cache.cache_stats().size, 3);

    // slice 3 overshoots: sweep down to the budget, oldest access first
    load_slice_of(&cache, 305).await;
    let stats = cache.cache_stats();
    assert_eq!(stats.size, 2);
    assert_eq!(stats.max_size, 2);

    // survivors are the two most recently used
    cache.teardown();
    assert!(cache.get_account(205).is_some());
    assert!(cache.get_account(305).is_some());
    assert!(cache.get_account(105).is_none());
    assert!(cache.get_account(5).is_none());

    Ok(())
}

#[tokio::test]
async fn test_get_account_miss_then_hit() -> anyhow::Result<()> {
    let (_dir, cache) = setup("cache-miss-hit", 150, 4).await?;

    // cold read schedules a background load
    assert!(cache.get_account(3).is_none());

    // wait out the load, then the hit is synchronous
    for _ in 0..200 {
        if cache.get_account(3).is_some() {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }

    let account = cache.get_account(3).expect("cached account");
    assert_eq!(account.username.as_str(), "user_00003");

    // out-of-range & unbound reads stay None
    assert!(cache.get_account(150).is_none());
    assert!(cache.get_account(u32::MAX).is_none());

    Ok(())
}

#[tokio::test]
async fn test_get_range_returns_cached_synchronously() -> anyhow::Result<()> {
    let (_dir, cache) = setup("cache-range", 250, 4).await?;

    // empty until loaded
    assert!(cache.get_range(90, 110).is_empty());

    load_slice_of(&cache, 90).await;
    load_slice_of(&cache, 110).await;

    let accounts = cache.get_range(90, 110);
    assert_eq!(accounts.len(), 20);
    assert_eq!(accounts[0].username.as_str(), "user_00090");
    assert_eq!(accounts[19].username.as_str(), "user_00109");

    // final partial slice clamps
    load_slice_of(&cache, 240).await;
    assert_eq!(cache.get_range(240, 999).len(), 10);

    Ok(())
}

#[tokio::test]
async fn test_get_by_indices_preserves_order() -> anyhow::Result<()> {
    let (_dir, cache) = setup("cache-order", 300, 4).await?;

    let accounts = cache.get_by_indices(&[250, 10, 120]).await;
    assert_eq!(accounts.len(), 3);
    assert_eq!(accounts[0].username.as_str(), "user_00250");
    assert_eq!(accounts[1].username.as_str(), "user_00010");
    assert_eq!(accounts[2].username.as_str(), "user_00120");

    Ok(())
}

#[tokio::test]
async fn test_fingerprint_change_flushes() -> anyhow::Result<()> {
    let (_dir, cache) = setup("cache-flush", 200, 4).await?;

    load_slice_of(&cache, 0).await;
    assert_eq!(cache.cache_stats().size, 1);

    cache.set_fingerprint(Some(Fingerprint::from("fp-other")), 10);
    assert_eq!(cache.cache_stats().size, 0);

    cache.set_fingerprint(None, 0);
    assert!(cache.get_account(0).is_none());

    Ok(())
}

#[tokio::test]
async fn test_preload_adjacent_warms_neighbors() -> anyhow::Result<()> {
    let (_dir, cache) = setup("cache-preload", 400, 4).await?;

    load_slice_of(&cache, 105).await;
    cache.preload_adjacent(100, 199);

    // next & previous slices land shortly after
    for _ in 0..200 {
        if cache.get_account(5).is_some() && cache.get_account(205).is_some() {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }

    assert!(cache.get_account(5).is_some());
    assert!(cache.get_account(205).is_some());

    Ok(())
}
