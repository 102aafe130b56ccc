//! Column family helpers trait

use speedb::ColumnFamily;

pub trait ColumnFamilyHelpers {
    /// CF for storing file records: fingerprint -> [FileRecord] JSON
    fn files_cf(&self) -> &ColumnFamily;

    /// CF for sorting file records by last access time.
    /// Key: `{last_accessed BE}{fingerprint}`
    fn files_last_accessed_sort_cf(&self) -> &ColumnFamily;

    /// CF for storing string columns: `{fingerprint}{kind}` -> [ColumnRecord]
    fn columns_cf(&self) -> &ColumnFamily;

    /// CF for storing badge bitsets: `{fingerprint}{badge}` -> [BitsetRecord]
    fn bitsets_cf(&self) -> &ColumnFamily;

    /// CF for storing badge popcounts: `{fingerprint}{badge}` -> u32 BE
    fn bitsets_count_cf(&self) -> &ColumnFamily;

    /// CF for storing sparse timestamp rows:
    /// `{fingerprint}{username}` -> [TimestampRecord] JSON
    fn timestamps_cf(&self) -> &ColumnFamily;

    /// CF for storing search-index records:
    /// `{fingerprint}{type}{key}` -> [SearchIndexRecord]
    fn indexes_cf(&self) -> &ColumnFamily;

    /// CF for sorting search-index records by expiry.
    /// Key: `{expires_at BE}{fingerprint}{type}{key}`
    fn indexes_expires_sort_cf(&self) -> &ColumnFamily;
}
