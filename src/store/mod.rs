//! This module contains the implementations of all store traits for the
//! [IndexerStore]

// traits
pub mod account;
pub mod bitset;
pub mod column;
pub mod column_families;
pub mod file;
pub mod fixed_keys;
pub mod search;
pub mod timestamp;
pub mod version;

// impls
pub mod account_store_impl;
pub mod bitset_store_impl;
pub mod column_families_impl;
pub mod column_store_impl;
pub mod file_store_impl;
pub mod search_store_impl;
pub mod timestamp_store_impl;
pub mod version_store_impl;

use crate::{
    base::{badge::Badge, fingerprint::Fingerprint},
    collection::{bitset::Bitset, string_column::StringColumn},
    constants::STORE_VERSION,
    error::{classify, ErrorCode, IndexerError},
    utility::store::U64_LEN,
};
use bincode::config;
use column_families::ColumnFamilyHelpers;
use log::{error, trace, warn};
use speedb::{ColumnFamilyDescriptor, DBCompressionType, IteratorMode, WriteBatch, DB};
use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::{Arc, RwLock},
};
use version::VersionStore;

pub type Result<T, E = anyhow::Error> = std::result::Result<T, E>;

pub const BIN_CODE_CONFIG: config::Configuration = config::standard();

#[derive(Debug)]
pub struct IndexerStore {
    pub db_path: PathBuf,
    pub database: DB,

    // per-process memoization, keyed by fingerprint, evicted on clear
    bitset_cache: RwLock<HashMap<(Fingerprint, Badge), Arc<Bitset>>>,
    column_cache: RwLock<HashMap<(Fingerprint, column::ColumnKind), Arc<StringColumn>>>,
}

impl IndexerStore {
    /// Check these match with the cf helpers below
    const COLUMN_FAMILIES: [&'static str; 8] = [
        "files",
        "files-last-accessed-sort",
        "columns",
        "bitsets",
        "bitsets-count",
        "timestamps",
        "indexes",
        "indexes-expires-sort",
    ];

    pub fn new(path: &Path) -> anyhow::Result<Self> {
        let mut cf_opts = speedb::Options::default();
        cf_opts.set_max_write_buffer_number(16);
        cf_opts.set_compression_type(DBCompressionType::Zstd);

        let mut database_opts = speedb::Options::default();
        database_opts.set_compression_type(DBCompressionType::Zstd);
        database_opts.create_missing_column_families(true);
        database_opts.create_if_missing(true);

        let column_families: Vec<ColumnFamilyDescriptor> = Self::COLUMN_FAMILIES
            .iter()
            .map(|cf| ColumnFamilyDescriptor::new(*cf, cf_opts.clone()))
            .collect();

        let store = Self {
            db_path: path.into(),
            database: speedb::DBWithThreadMode::open_cf_descriptors(
                &database_opts,
                path,
                column_families,
            )?,
            bitset_cache: RwLock::new(HashMap::new()),
            column_cache: RwLock::new(HashMap::new()),
        };

        // records written under an older schema are unusable; wipe & restamp
        match store.get_store_version()? {
            Some(version) if version == STORE_VERSION => (),
            Some(version) => {
                warn!("Store version {version} is stale, clearing all records");
                store.clear_all()?;
                store.set_store_version(STORE_VERSION)?;
            }
            None => store.set_store_version(STORE_VERSION)?,
        }

        Ok(store)
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Delete every record for the fingerprint across all column families in
    /// one atomic batch, then drop its in-memory memoizations
    pub fn clear_fingerprint(&self, fingerprint: &Fingerprint) -> Result<()> {
        trace!("Clearing all records for fingerprint {fingerprint}");

        let mut batch = WriteBatch::default();
        batch.delete_cf(self.files_cf(), fingerprint.as_bytes());

        for cf in [
            self.columns_cf(),
            self.bitsets_cf(),
            self.bitsets_count_cf(),
            self.timestamps_cf(),
            self.indexes_cf(),
        ] {
            for (key, _) in self
                .database
                .iterator_cf(
                    cf,
                    IteratorMode::From(fingerprint.as_bytes(), speedb::Direction::Forward),
                )
                .flatten()
                .take_while(|(key, _)| key.starts_with(fingerprint.as_bytes()))
            {
                batch.delete_cf(cf, key);
            }
        }

        // sort CFs key by {timestamp}{primary key}; match on the suffix
        for cf in [self.files_last_accessed_sort_cf(), self.indexes_expires_sort_cf()] {
            for (key, _) in self.database.iterator_cf(cf, IteratorMode::Start).flatten() {
                if key[U64_LEN..].starts_with(fingerprint.as_bytes()) {
                    batch.delete_cf(cf, key);
                }
            }
        }

        self.database.write(batch).map_err(db_error)?;
        self.evict_caches(fingerprint);
        Ok(())
    }

    /// Drop every record in every column family
    pub fn clear_all(&self) -> Result<()> {
        trace!("Clearing the entire store");

        let mut batch = WriteBatch::default();
        for cf_name in Self::COLUMN_FAMILIES {
            let cf = self
                .database
                .cf_handle(cf_name)
                .unwrap_or_else(|| panic!("{cf_name} column family exists"));

            for (key, _) in self.database.iterator_cf(cf, IteratorMode::Start).flatten() {
                batch.delete_cf(cf, key);
            }
        }

        self.database.write(batch).map_err(db_error)?;

        self.bitset_cache.write().expect("bitset cache lock").clear();
        self.column_cache.write().expect("column cache lock").clear();
        Ok(())
    }

    fn evict_caches(&self, fingerprint: &Fingerprint) {
        self.bitset_cache
            .write()
            .expect("bitset cache lock")
            .retain(|(fp, _), _| fp != fingerprint);
        self.column_cache
            .write()
            .expect("column cache lock")
            .retain(|(fp, _), _| fp != fingerprint);
    }

    pub(crate) fn cached_bitset(&self, fingerprint: &Fingerprint, badge: Badge) -> Option<Arc<Bitset>> {
        self.bitset_cache
            .read()
            .expect("bitset cache lock")
            .get(&(fingerprint.clone(), badge))
            .cloned()
    }

    pub(crate) fn memoize_bitset(&self, fingerprint: &Fingerprint, badge: Badge, bitset: Arc<Bitset>) {
        self.bitset_cache
            .write()
            .expect("bitset cache lock")
            .insert((fingerprint.clone(), badge), bitset);
    }

    pub(crate) fn cached_column(
        &self,
        fingerprint: &Fingerprint,
        kind: column::ColumnKind,
    ) -> Option<Arc<StringColumn>> {
        self.column_cache
            .read()
            .expect("column cache lock")
            .get(&(fingerprint.clone(), kind))
            .cloned()
    }

    pub(crate) fn memoize_column(
        &self,
        fingerprint: &Fingerprint,
        kind: column::ColumnKind,
        column: Arc<StringColumn>,
    ) {
        self.column_cache
            .write()
            .expect("column cache lock")
            .insert((fingerprint.clone(), kind), column);
    }
}

/// Map a database failure onto the closed error taxonomy, keeping quota
/// exhaustion distinguishable from other storage faults
pub(crate) fn db_error(e: speedb::Error) -> anyhow::Error {
    error!("Database error: {e}");

    let message = e.to_string();
    let code = match classify(&message) {
        ErrorCode::QuotaExceeded => ErrorCode::QuotaExceeded,
        _ => ErrorCode::IndexedDbError,
    };

    anyhow::Error::new(IndexerError::new(code, message))
}
