//! Sparse timestamp rows
//!
//! Only accounts with at least one timestamped badge get a row. Filtering
//! never reads these; they exist for timestamp display and future
//! time-ordered queries.

use super::Result;
use crate::base::{account::Account, badge::Badge, fingerprint::Fingerprint};
use serde::{Deserialize, Serialize};
use speedb::WriteBatch;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimestampRecord {
    pub fingerprint: String,
    pub username: String,
    pub badges: BTreeMap<Badge, u64>,
}

impl TimestampRecord {
    /// Build the sparse row; None when no badge carries a timestamp
    pub fn from_account(fingerprint: &Fingerprint, account: &Account) -> Option<Self> {
        let badges: BTreeMap<Badge, u64> = account
            .badges
            .iter()
            .filter_map(|(badge, value)| value.timestamp().map(|ts| (*badge, ts)))
            .collect();

        if badges.is_empty() {
            return None;
        }

        Some(Self {
            fingerprint: fingerprint.to_string(),
            username: account.username.to_string(),
            badges,
        })
    }
}

pub trait TimestampStore {
    /// Stage the row into a batch
    fn put_timestamps_batch(&self, record: &TimestampRecord, batch: &mut WriteBatch) -> Result<()>;

    fn get_timestamps(
        &self,
        fingerprint: &Fingerprint,
        username: &str,
    ) -> Result<Option<TimestampRecord>>;
}
