//! File store impl

use super::{
    column_families::ColumnFamilyHelpers,
    db_error,
    file::{FileRecord, FileStore},
    IndexerStore, Result,
};
use crate::{
    base::fingerprint::Fingerprint,
    constants::{FILE_TTL_MILLIS, STORE_VERSION},
    utility::{now_millis, store::sort_key},
};
use log::{trace, warn};
use speedb::{IteratorMode, WriteBatch};

impl FileStore for IndexerStore {
    fn put_file(&self, record: &FileRecord) -> Result<()> {
        trace!("Adding file record for {}", record.fingerprint);

        let fingerprint = Fingerprint(record.fingerprint.clone());
        let mut batch = WriteBatch::default();

        // drop the stale sort entry when overwriting
        if let Some(bytes) = self
            .database
            .get_cf(self.files_cf(), fingerprint.as_bytes())
            .map_err(db_error)?
        {
            if let Ok(prev) = serde_json::from_slice::<FileRecord>(&bytes) {
                batch.delete_cf(
                    self.files_last_accessed_sort_cf(),
                    sort_key(prev.last_accessed, fingerprint.as_bytes()),
                );
            }
        }

        batch.put_cf(
            self.files_cf(),
            fingerprint.as_bytes(),
            serde_json::to_vec(record)?,
        );
        batch.put_cf(
            self.files_last_accessed_sort_cf(),
            sort_key(record.last_accessed, fingerprint.as_bytes()),
            b"",
        );

        self.database.write(batch).map_err(db_error)
    }

    fn get_file(&self, fingerprint: &Fingerprint) -> Result<Option<FileRecord>> {
        trace!("Getting file record for {fingerprint}");

        let Some(bytes) = self
            .database
            .get_cf(self.files_cf(), fingerprint.as_bytes())
            .map_err(db_error)?
        else {
            return Ok(None);
        };

        let mut record: FileRecord = serde_json::from_slice(&bytes)?;

        if record.schema_version != STORE_VERSION {
            warn!(
                "File record {fingerprint} has stale schema v{}, evicting",
                record.schema_version
            );
            self.clear_fingerprint(fingerprint)?;
            return Ok(None);
        }

        let now = now_millis();
        if now.saturating_sub(record.last_accessed) > FILE_TTL_MILLIS {
            trace!("File record {fingerprint} expired, evicting");
            self.clear_fingerprint(fingerprint)?;
            return Ok(None);
        }

        // refresh the access time & its sort entry
        let mut batch = WriteBatch::default();
        batch.delete_cf(
            self.files_last_accessed_sort_cf(),
            sort_key(record.last_accessed, fingerprint.as_bytes()),
        );

        record.last_accessed = now;
        batch.put_cf(
            self.files_cf(),
            fingerprint.as_bytes(),
            serde_json::to_vec(&record)?,
        );
        batch.put_cf(
            self.files_last_accessed_sort_cf(),
            sort_key(now, fingerprint.as_bytes()),
            b"",
        );
        self.database.write(batch).map_err(db_error)?;

        Ok(Some(record))
    }

    fn get_all_files(&self) -> Result<Vec<FileRecord>> {
        trace!("Getting all file records");

        let mut records = vec![];
        let now = now_millis();

        for (key, _) in self
            .database
            .iterator_cf(self.files_last_accessed_sort_cf(), IteratorMode::Start)
            .flatten()
        {
            let fingerprint =
                Fingerprint(String::from_utf8_lossy(&key[crate::utility::store::U64_LEN..]).into());
            let Some(bytes) = self
                .database
                .get_cf(self.files_cf(), fingerprint.as_bytes())
                .map_err(db_error)?
            else {
                continue;
            };

            let record: FileRecord = serde_json::from_slice(&bytes)?;
            if record.schema_version != STORE_VERSION
                || now.saturating_sub(record.last_accessed) > FILE_TTL_MILLIS
            {
                self.clear_fingerprint(&fingerprint)?;
                continue;
            }

            records.push(record);
        }

        Ok(records)
    }

    fn delete_file(&self, fingerprint: &Fingerprint) -> Result<()> {
        trace!("Deleting file record for {fingerprint}");

        let mut batch = WriteBatch::default();
        if let Some(bytes) = self
            .database
            .get_cf(self.files_cf(), fingerprint.as_bytes())
            .map_err(db_error)?
        {
            if let Ok(record) = serde_json::from_slice::<FileRecord>(&bytes) {
                batch.delete_cf(
                    self.files_last_accessed_sort_cf(),
                    sort_key(record.last_accessed, fingerprint.as_bytes()),
                );
            }
        }

        batch.delete_cf(self.files_cf(), fingerprint.as_bytes());
        self.database.write(batch).map_err(db_error)
    }
}
