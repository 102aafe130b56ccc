//! Search-index store impl

use super::{
    column_families::ColumnFamilyHelpers,
    db_error,
    search::{IndexType, SearchIndexRecord, SearchIndexStore},
    IndexerStore, Result, BIN_CODE_CONFIG,
};
use crate::{
    base::fingerprint::Fingerprint,
    constants::SEARCH_PROBE_KEY,
    utility::{
        now_millis,
        store::{search_index_key, sort_key, u64_from_be_bytes, U64_LEN},
    },
};
use log::trace;
use speedb::{Direction, IteratorMode, WriteBatch};

impl SearchIndexStore for IndexerStore {
    fn put_search_record_batch(
        &self,
        record: &SearchIndexRecord,
        batch: &mut WriteBatch,
    ) -> Result<()> {
        let fingerprint = Fingerprint(record.fingerprint.clone());
        let key = search_index_key(&fingerprint, record.index_type.kind(), &record.key);

        batch.put_cf(
            self.indexes_cf(),
            &key,
            bincode::encode_to_vec(record, BIN_CODE_CONFIG)?,
        );
        batch.put_cf(
            self.indexes_expires_sort_cf(),
            sort_key(record.expires_at, &key),
            b"",
        );

        Ok(())
    }

    fn get_search_record(
        &self,
        fingerprint: &Fingerprint,
        index_type: IndexType,
        key: &str,
    ) -> Result<Option<SearchIndexRecord>> {
        trace!("Getting {index_type:?} index record {key:?} for {fingerprint}");

        let db_key = search_index_key(fingerprint, index_type.kind(), key);
        let Some(bytes) = self
            .database
            .get_cf(self.indexes_cf(), &db_key)
            .map_err(db_error)?
        else {
            return Ok(None);
        };

        let (record, _): (SearchIndexRecord, _) =
            bincode::decode_from_slice(&bytes, BIN_CODE_CONFIG)?;

        if now_millis() > record.expires_at {
            trace!("Index record {key:?} expired, deleting");

            let mut batch = WriteBatch::default();
            batch.delete_cf(self.indexes_cf(), &db_key);
            batch.delete_cf(
                self.indexes_expires_sort_cf(),
                sort_key(record.expires_at, &db_key),
            );
            self.database.write(batch).map_err(db_error)?;

            return Ok(None);
        }

        Ok(Some(record))
    }

    fn get_trigram_keys(&self, fingerprint: &Fingerprint) -> Result<Vec<String>> {
        trace!("Getting trigram keys for {fingerprint}");

        let prefix = search_index_key(fingerprint, IndexType::Trigram.kind(), "");
        let mut keys = vec![];

        for (key, _) in self
            .database
            .iterator_cf(
                self.indexes_cf(),
                IteratorMode::From(&prefix, Direction::Forward),
            )
            .flatten()
            .take_while(|(key, _)| key.starts_with(&prefix))
        {
            keys.push(String::from_utf8_lossy(&key[prefix.len()..]).into());
        }

        Ok(keys)
    }

    fn has_search_indexes(&self, fingerprint: &Fingerprint) -> Result<bool> {
        Ok(self
            .get_search_record(fingerprint, IndexType::Prefix, SEARCH_PROBE_KEY)?
            .is_some())
    }

    fn delete_expired_search_records(&self) -> Result<u32> {
        let now = now_millis();
        let mut batch = WriteBatch::default();
        let mut removed = 0;

        for (key, _) in self
            .database
            .iterator_cf(self.indexes_expires_sort_cf(), IteratorMode::Start)
            .flatten()
        {
            if u64_from_be_bytes(&key[..U64_LEN])? > now {
                break;
            }

            batch.delete_cf(self.indexes_cf(), &key[U64_LEN..]);
            batch.delete_cf(self.indexes_expires_sort_cf(), &key);
            removed += 1;
        }

        if removed > 0 {
            trace!("Sweeping {removed} expired index records");
            self.database.write(batch).map_err(db_error)?;
        }

        Ok(removed)
    }
}
