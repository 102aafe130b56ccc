//! Timestamp store impl

use super::{
    column_families::ColumnFamilyHelpers,
    db_error,
    timestamp::{TimestampRecord, TimestampStore},
    IndexerStore, Result,
};
use crate::{base::fingerprint::Fingerprint, utility::store::timestamp_key};
use log::trace;
use speedb::WriteBatch;

impl TimestampStore for IndexerStore {
    fn put_timestamps_batch(&self, record: &TimestampRecord, batch: &mut WriteBatch) -> Result<()> {
        trace!(
            "Staging timestamps for {} @ {}",
            record.username,
            record.fingerprint
        );

        let fingerprint = Fingerprint(record.fingerprint.clone());
        batch.put_cf(
            self.timestamps_cf(),
            timestamp_key(&fingerprint, &record.username),
            serde_json::to_vec(record)?,
        );

        Ok(())
    }

    fn get_timestamps(
        &self,
        fingerprint: &Fingerprint,
        username: &str,
    ) -> Result<Option<TimestampRecord>> {
        trace!("Getting timestamps for {username} @ {fingerprint}");

        Ok(self
            .database
            .get_cf(self.timestamps_cf(), timestamp_key(fingerprint, username))
            .map_err(db_error)?
            .map(|bytes| serde_json::from_slice(&bytes))
            .transpose()?)
    }
}
