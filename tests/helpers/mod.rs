#![allow(dead_code)]

//////////////////
// Test helpers //
//////////////////

use follow_indexer::{
    base::{
        account::Account,
        badge::{Badge, BadgeValue},
    },
    store::IndexerStore,
};
use std::io::Write;
use zip::{write::SimpleFileOptions, ZipWriter};

/// Route `log` output to stderr for a test run; safe to call repeatedly
pub fn init_logging() {
    let _ = stderrlog::new().verbosity(2).init();
}

/// Sets up a new temp dir, deleted when it goes out of scope
pub fn setup_new_db_dir(prefix: &str) -> anyhow::Result<tempfile::TempDir> {
    let store_dir = tempfile::TempDir::with_prefix(prefix)?;
    if store_dir.path().exists() {
        std::fs::remove_dir_all(store_dir.path())?;
    }
    Ok(store_dir)
}

pub fn create_store(prefix: &str) -> anyhow::Result<(tempfile::TempDir, IndexerStore)> {
    let dir = setup_new_db_dir(prefix)?;
    let store = IndexerStore::new(dir.path())?;
    Ok((dir, store))
}

/// Build an in-memory ZIP from (path, content) pairs
pub fn zip_of(entries: &[(&str, &str)]) -> Vec<u8> {
    let mut writer = ZipWriter::new(std::io::Cursor::new(vec![]));
    for (path, content) in entries {
        writer
            .start_file(*path, SimpleFileOptions::default())
            .unwrap();
        writer.write_all(content.as_bytes()).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

/// The canonical tiny export: following `alice@1000, carol@3000`,
/// followers `bob@2000, alice@1500`
pub fn trivial_archive() -> Vec<u8> {
    let following = r#"{"relationships_following": [
        {"string_list_data": [{"value": "alice", "timestamp": 1000}]},
        {"string_list_data": [{"value": "carol", "timestamp": 3000}]}
    ]}"#;
    let followers = r#"[
        {"string_list_data": [{"value": "bob", "timestamp": 2000}]},
        {"string_list_data": [{"value": "alice", "timestamp": 1500}]}
    ]"#;

    zip_of(&[
        (
            "connections/followers_and_following/following.json",
            following,
        ),
        (
            "connections/followers_and_following/followers_1.json",
            followers,
        ),
    ])
}

/// Account with flag badges only
pub fn account(username: &str, badges: &[Badge]) -> Account {
    let mut account = Account::new(username);
    for badge in badges {
        account.badges.insert(*badge, BadgeValue::Flag(true));
    }
    account
}

/// Accounts for plain usernames, each bearing just the Following badge,
/// already in canonical order
pub fn roster_of(usernames: &[&str]) -> Vec<Account> {
    let mut roster: Vec<Account> = usernames
        .iter()
        .map(|name| account(name, &[Badge::Following]))
        .collect();
    roster.sort_by_key(|a| a.username.search_key());
    roster
}
