//! Version store impl

use super::{fixed_keys::FixedKeys, version::VersionStore, IndexerStore, Result};
use crate::utility::store::u32_from_be_bytes;
use log::trace;

impl FixedKeys for IndexerStore {}

impl VersionStore for IndexerStore {
    fn set_store_version(&self, version: u32) -> Result<()> {
        trace!("Setting store version {version}");

        Ok(self
            .database
            .put(Self::STORE_VERSION_KEY, version.to_be_bytes())?)
    }

    fn get_store_version(&self) -> Result<Option<u32>> {
        Ok(self
            .database
            .get(Self::STORE_VERSION_KEY)?
            .map(|bytes| u32_from_be_bytes(&bytes))
            .transpose()?)
    }
}
