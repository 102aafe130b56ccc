//! Demo snapshot loader
//!
//! A pre-built account set shipped as a static JSON resource, installed
//! under a well-known fingerprint without going through the parser. Lets a
//! consumer explore the full query surface before uploading anything.

use crate::{
    base::fingerprint::Fingerprint,
    constants::{SAMPLE_FINGERPRINT, STORE_VERSION},
    store::{account::AccountStore, file::FileRecord, file::FileStore, IndexerStore},
    utility::now_millis,
};
use anyhow::ensure;
use log::info;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SampleSnapshot {
    pub version: u32,
    pub generated_at: String,
    pub account_count: u32,
    pub accounts: Vec<crate::base::account::Account>,
}

/// Install the snapshot under the demo fingerprint, skipping work when it
/// is already live. Returns the fingerprint and account count.
pub fn install_sample(store: &IndexerStore, json: &str) -> anyhow::Result<(Fingerprint, u32)> {
    let fingerprint = Fingerprint::from(SAMPLE_FINGERPRINT);

    if let Some(record) = store.get_file(&fingerprint)? {
        return Ok((fingerprint, record.account_count));
    }

    let snapshot: SampleSnapshot = serde_json::from_str(json)?;
    ensure!(
        snapshot.version == 1,
        "unsupported sample snapshot version {}",
        snapshot.version
    );
    ensure!(
        snapshot.account_count as usize == snapshot.accounts.len(),
        "sample snapshot count {} does not match its {} accounts",
        snapshot.account_count,
        snapshot.accounts.len()
    );

    info!(
        "Installing sample snapshot ({} accounts, generated {})",
        snapshot.account_count, snapshot.generated_at
    );

    store.store_all(&fingerprint, &snapshot.accounts)?;

    let now = now_millis();
    store.put_file(&FileRecord {
        fingerprint: fingerprint.to_string(),
        name: "sample-data".to_string(),
        size_bytes: json.len() as u64,
        uploaded_at: now,
        account_count: snapshot.account_count,
        last_accessed: now,
        schema_version: STORE_VERSION,
        processing_time_ms: None,
    })?;

    Ok((fingerprint, snapshot.account_count))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{base::badge::Badge, store::bitset::BitsetStore};

    const SNAPSHOT: &str = r#"{
        "version": 1,
        "generatedAt": "2025-11-02T09:30:00Z",
        "accountCount": 2,
        "accounts": [
            {"username": "demo_one", "badges": {"Following": 1000, "Mutuals": true, "Followers": 1200}},
            {"username": "demo_two", "badges": {"Followers": true, "NotFollowingBack": true}}
        ]
    }"#;

    #[test]
    fn test_install_sample() -> anyhow::Result<()> {
        let dir = tempfile::TempDir::with_prefix("sample-tests")?;
        let store = IndexerStore::new(dir.path())?;

        let (fingerprint, count) = install_sample(&store, SNAPSHOT)?;
        assert_eq!(fingerprint.as_str(), SAMPLE_FINGERPRINT);
        assert_eq!(count, 2);

        let stats = store.get_badge_stats(&fingerprint)?;
        assert_eq!(stats[&Badge::Following], 1);
        assert_eq!(stats[&Badge::Followers], 2);
        assert_eq!(stats[&Badge::Mutuals], 1);

        // second install is a no-op cache hit
        let (_, count) = install_sample(&store, SNAPSHOT)?;
        assert_eq!(count, 2);
        Ok(())
    }

    #[test]
    fn test_install_rejects_bad_version() -> anyhow::Result<()> {
        let dir = tempfile::TempDir::with_prefix("sample-tests")?;
        let store = IndexerStore::new(dir.path())?;

        let json = SNAPSHOT.replace("\"version\": 1", "\"version\": 9");
        assert!(install_sample(&store, &json).is_err());
        Ok(())
    }
}
