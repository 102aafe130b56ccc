//! Column family helpers impl

use super::{column_families::ColumnFamilyHelpers, IndexerStore};
use speedb::ColumnFamily;

impl ColumnFamilyHelpers for IndexerStore {
    fn files_cf(&self) -> &ColumnFamily {
        self.database
            .cf_handle("files")
            .expect("files column family exists")
    }

    fn files_last_accessed_sort_cf(&self) -> &ColumnFamily {
        self.database
            .cf_handle("files-last-accessed-sort")
            .expect("files-last-accessed-sort column family exists")
    }

    fn columns_cf(&self) -> &ColumnFamily {
        self.database
            .cf_handle("columns")
            .expect("columns column family exists")
    }

    fn bitsets_cf(&self) -> &ColumnFamily {
        self.database
            .cf_handle("bitsets")
            .expect("bitsets column family exists")
    }

    fn bitsets_count_cf(&self) -> &ColumnFamily {
        self.database
            .cf_handle("bitsets-count")
            .expect("bitsets-count column family exists")
    }

    fn timestamps_cf(&self) -> &ColumnFamily {
        self.database
            .cf_handle("timestamps")
            .expect("timestamps column family exists")
    }

    fn indexes_cf(&self) -> &ColumnFamily {
        self.database
            .cf_handle("indexes")
            .expect("indexes column family exists")
    }

    fn indexes_expires_sort_cf(&self) -> &ColumnFamily {
        self.database
            .cf_handle("indexes-expires-sort")
            .expect("indexes-expires-sort column family exists")
    }
}
