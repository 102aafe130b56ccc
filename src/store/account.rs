//! Account persistence & hydration
//!
//! `store_all` is the single write path for a fingerprint's account set:
//! both string columns, one bitset per badge (empty included), and the
//! sparse timestamp rows land in one atomic batch. The file record is
//! written afterwards by the caller, so readers never observe a file record
//! without its companions.

use super::Result;
use crate::{
    base::{account::Account, fingerprint::Fingerprint},
    collection::string_column::StringColumn,
    store::column::ColumnKind,
};
use std::sync::Arc;

pub trait AccountStore {
    /// Persist the canonical account sequence under the fingerprint
    fn store_all(&self, fingerprint: &Fingerprint, accounts: &[Account]) -> Result<()>;

    /// Hydrate accounts in the half-open position range `[start, end)`,
    /// clamped to the account count. Badges come back as flags; missing
    /// fingerprints yield an empty vec.
    fn get_accounts_by_range(
        &self,
        fingerprint: &Fingerprint,
        start: u32,
        end: u32,
    ) -> Result<Vec<Account>>;

    /// Lazily-memoized column reader
    fn get_string_column(
        &self,
        fingerprint: &Fingerprint,
        kind: ColumnKind,
    ) -> Result<Option<Arc<StringColumn>>>;
}
