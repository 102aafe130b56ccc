//! Account record
//!
//! An account is a username plus the set of badges it bears, at a canonical
//! 0-based position within a fingerprint. Positions are assigned by the
//! roster builder and are stable for the lifetime of the fingerprint's
//! records.

use crate::base::{
    badge::{Badge, BadgeValue},
    username::Username,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub username: Username,
    pub badges: BTreeMap<Badge, BadgeValue>,

    /// Profile link from the export, when present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
}

impl Account {
    pub fn new(username: impl Into<Username>) -> Self {
        Self {
            username: username.into(),
            badges: BTreeMap::new(),
            href: None,
        }
    }

    pub fn has_badge(&self, badge: Badge) -> bool {
        self.badges.contains_key(&badge)
    }

    pub fn badge_timestamp(&self, badge: Badge) -> Option<u64> {
        self.badges.get(&badge).and_then(BadgeValue::timestamp)
    }

    /// True when any badge carries an export timestamp
    pub fn has_timestamps(&self) -> bool {
        self.badges.values().any(|v| v.timestamp().is_some())
    }
}
