//! Store schema version

use super::Result;

pub trait VersionStore {
    /// Stamp the on-disk schema version
    fn set_store_version(&self, version: u32) -> Result<()>;

    /// Read the on-disk schema version
    fn get_store_version(&self) -> Result<Option<u32>>;
}
