//! Canonical account roster
//!
//! Combines parsed relation sets into the ordered account sequence whose
//! positions every bitset and search index is keyed by. The order —
//! lowercased username ascending, ties by first insertion — is part of the
//! storage contract: changing it invalidates all records for a fingerprint.

use crate::{
    base::{
        account::Account,
        badge::{Badge, BadgeValue},
    },
    parser::{discovery::RelationKind, ParsedRelations},
};
use log::debug;
use std::collections::HashMap;

pub fn build_roster(data: &ParsedRelations) -> Vec<Account> {
    let mut accounts: HashMap<String, (usize, Account)> = HashMap::new();
    let mut next_seen = 0usize;

    // direct badges, one relation set at a time
    for kind in RelationKind::ALL {
        let badge = kind.badge();

        for (username, timestamp) in data.set(kind).iter() {
            let (_, account) = accounts.entry(username.to_string()).or_insert_with(|| {
                let seen = next_seen;
                next_seen += 1;
                (seen, Account::new(username))
            });

            let value = timestamp.map(BadgeValue::At).unwrap_or_default();
            account.badges.insert(badge, value);
        }
    }

    // derived badges from following/followers membership
    for (username, (_, account)) in accounts.iter_mut() {
        let following = data.following.contains(username);
        let followers = data.followers.contains(username);

        if following && followers {
            account.badges.insert(Badge::Mutuals, BadgeValue::default());
        }
        if followers && !following {
            account
                .badges
                .insert(Badge::NotFollowingBack, BadgeValue::default());
        }
        if following && !followers {
            account
                .badges
                .insert(Badge::NotFollowedBack, BadgeValue::default());
        }

        account.href = data.hrefs.get(username).cloned();
    }

    let mut roster: Vec<(usize, Account)> = accounts.into_values().collect();
    roster.sort_by(|(seen_a, a), (seen_b, b)| {
        a.username
            .search_key()
            .cmp(&b.username.search_key())
            .then(seen_a.cmp(seen_b))
    });

    debug!("Built roster of {} accounts", roster.len());
    roster.into_iter().map(|(_, account)| account).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn relations(
        following: &[(&str, Option<u64>)],
        followers: &[(&str, Option<u64>)],
    ) -> ParsedRelations {
        let mut data = ParsedRelations::default();
        for (name, ts) in following {
            data.following.insert(name.to_string(), *ts);
        }
        for (name, ts) in followers {
            data.followers.insert(name.to_string(), *ts);
        }
        data
    }

    #[test]
    fn test_badge_derivation() {
        let data = relations(
            &[("alice", Some(1000)), ("carol", Some(3000))],
            &[("bob", Some(2000)), ("alice", Some(1500))],
        );

        let roster = build_roster(&data);
        let names: Vec<&str> = roster.iter().map(|a| a.username.as_str()).collect();
        assert_eq!(names, vec!["alice", "bob", "carol"]);

        let alice = &roster[0];
        assert!(alice.has_badge(Badge::Mutuals));
        assert!(!alice.has_badge(Badge::NotFollowingBack));
        assert!(!alice.has_badge(Badge::NotFollowedBack));
        assert_eq!(alice.badge_timestamp(Badge::Following), Some(1000));
        assert_eq!(alice.badge_timestamp(Badge::Followers), Some(1500));

        let bob = &roster[1];
        assert!(bob.has_badge(Badge::NotFollowingBack));
        assert!(!bob.has_badge(Badge::Mutuals));

        let carol = &roster[2];
        assert!(carol.has_badge(Badge::NotFollowedBack));
    }

    #[test]
    fn test_order_lowercase_then_insertion() {
        let data = relations(
            &[("Zed", None), ("apple", None), ("ZED", None)],
            &[],
        );

        let roster = build_roster(&data);
        let names: Vec<&str> = roster.iter().map(|a| a.username.as_str()).collect();

        // "Zed" and "ZED" tie on the lowercase key; insertion order breaks it
        assert_eq!(names, vec!["apple", "Zed", "ZED"]);
    }

    #[test]
    fn test_every_account_has_a_badge() {
        let mut data = relations(&[("a", None)], &[("b", None)]);
        data.restricted.insert("c".to_string(), Some(7));

        for account in build_roster(&data) {
            assert!(!account.badges.is_empty());
        }
    }

    #[test]
    fn test_missing_timestamp_is_flag() {
        let data = relations(&[("jane", None)], &[]);
        let roster = build_roster(&data);

        assert_eq!(
            roster[0].badges.get(&Badge::Following),
            Some(&BadgeValue::Flag(true))
        );
        assert_eq!(roster[0].badge_timestamp(Badge::Following), None);
    }

    #[test]
    fn test_hrefs_attached() {
        let mut data = relations(&[("jane", None)], &[]);
        data.hrefs
            .insert("jane".to_string(), "https://example.com/jane".to_string());

        let roster = build_roster(&data);
        assert_eq!(roster[0].href.as_deref(), Some("https://example.com/jane"));
    }
}
