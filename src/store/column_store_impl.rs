//! Column store impl

use super::{
    column::{ColumnKind, ColumnRecord, ColumnStore},
    column_families::ColumnFamilyHelpers,
    db_error, IndexerStore, Result, BIN_CODE_CONFIG,
};
use crate::{base::fingerprint::Fingerprint, utility::store::column_key};
use log::trace;
use speedb::WriteBatch;

impl ColumnStore for IndexerStore {
    fn put_column_batch(&self, record: &ColumnRecord, batch: &mut WriteBatch) -> Result<()> {
        trace!(
            "Staging {:?} column for {} ({} entries)",
            record.kind,
            record.fingerprint,
            record.length
        );

        let fingerprint = Fingerprint(record.fingerprint.clone());
        batch.put_cf(
            self.columns_cf(),
            column_key(&fingerprint, record.kind.kind()),
            bincode::encode_to_vec(record, BIN_CODE_CONFIG)?,
        );

        Ok(())
    }

    fn get_column(
        &self,
        fingerprint: &Fingerprint,
        kind: ColumnKind,
    ) -> Result<Option<ColumnRecord>> {
        trace!("Getting {kind:?} column for {fingerprint}");

        Ok(self
            .database
            .get_cf(self.columns_cf(), column_key(fingerprint, kind.kind()))
            .map_err(db_error)?
            .map(|bytes| bincode::decode_from_slice(&bytes, BIN_CODE_CONFIG).map(|(rec, _)| rec))
            .transpose()?)
    }
}
