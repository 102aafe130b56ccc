//! Relation file decoding
//!
//! Export relation files come in two JSON shapes: a wrapper object keyed by
//! `relationships_*` holding an entry array, or the entry array itself.
//! Entries are decoded leniently; anything without a recoverable username is
//! skipped.

use anyhow::bail;
use serde::Deserialize;
use std::collections::HashMap;

#[derive(Debug, Clone, Deserialize)]
pub struct RelationEntry {
    #[serde(default)]
    pub title: Option<String>,

    #[serde(default)]
    pub string_list_data: Vec<StringListItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StringListItem {
    #[serde(default)]
    pub value: Option<String>,

    #[serde(default)]
    pub href: Option<String>,

    #[serde(default)]
    pub timestamp: Option<u64>,
}

/// One decoded relation row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationItem {
    pub username: String,
    pub timestamp: Option<u64>,
    pub href: Option<String>,
}

/// Decode one relation file's content into rows.
///
/// Fails with a JSON error on unparseable input and a structure error when
/// the parsed document holds no entry array.
pub fn decode_relation(content: &str) -> anyhow::Result<Vec<RelationItem>> {
    let value: serde_json::Value = serde_json::from_str(content)?;

    let entries = match value {
        serde_json::Value::Array(entries) => entries,
        serde_json::Value::Object(map) => {
            let relationship_array = map
                .iter()
                .find(|(key, value)| key.starts_with("relationships") && value.is_array())
                .or_else(|| map.iter().find(|(_, value)| value.is_array()));

            match relationship_array {
                Some((_, serde_json::Value::Array(entries))) => entries.clone(),
                _ => bail!("invalid data structure: no relationship entry array"),
            }
        }
        _ => bail!("invalid data structure: expected array or wrapper object"),
    };

    let mut items = vec![];
    for entry in entries {
        // tolerate malformed rows within an otherwise valid file
        let Ok(entry) = serde_json::from_value::<RelationEntry>(entry) else {
            continue;
        };

        if entry.string_list_data.is_empty() {
            if let Some(username) = entry.title.filter(|t| !t.is_empty()) {
                items.push(RelationItem {
                    username,
                    timestamp: None,
                    href: None,
                });
            }
            continue;
        }

        for item in entry.string_list_data {
            let username = item
                .value
                .clone()
                .filter(|v| !v.is_empty())
                .or_else(|| item.href.as_deref().and_then(username_from_href))
                .or_else(|| entry.title.clone().filter(|t| !t.is_empty()));

            if let Some(username) = username {
                items.push(RelationItem {
                    username,
                    timestamp: item.timestamp,
                    href: item.href,
                });
            }
        }
    }

    Ok(items)
}

/// Pull a username out of a profile link
fn username_from_href(href: &str) -> Option<String> {
    let trimmed = href.trim_end_matches('/');
    let name = trimmed.rsplit('/').next()?;

    if name.is_empty() || name.contains(':') {
        return None;
    }

    Some(name.to_string())
}

/// An insertion-ordered username set with last-wins timestamps.
///
/// Insertion order is what breaks ordering ties between accounts whose
/// lowercased usernames are equal, so it is preserved across duplicate
/// inserts.
#[derive(Debug, Default, Clone)]
pub struct RelationSet {
    order: Vec<String>,
    entries: HashMap<String, Option<u64>>,
}

impl RelationSet {
    pub fn insert(&mut self, username: String, timestamp: Option<u64>) {
        match self.entries.get_mut(&username) {
            Some(slot) => *slot = timestamp,
            None => {
                self.order.push(username.clone());
                self.entries.insert(username, timestamp);
            }
        }
    }

    pub fn contains(&self, username: &str) -> bool {
        self.entries.contains_key(username)
    }

    pub fn timestamp(&self, username: &str) -> Option<u64> {
        self.entries.get(username).copied().flatten()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Entries in first-insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<u64>)> {
        self.order
            .iter()
            .map(|name| (name.as_str(), self.entries[name]))
    }
}
