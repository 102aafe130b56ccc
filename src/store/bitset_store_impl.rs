//! Bitset store impl

use super::{
    bitset::{BitsetRecord, BitsetStore},
    column_families::ColumnFamilyHelpers,
    db_error, IndexerStore, Result, BIN_CODE_CONFIG,
};
use crate::{
    base::{badge::Badge, fingerprint::Fingerprint},
    collection::bitset::Bitset,
    utility::store::{bitset_key, u32_from_be_bytes},
};
use log::trace;
use speedb::WriteBatch;
use std::{collections::HashMap, sync::Arc};

impl BitsetStore for IndexerStore {
    fn put_bitset_batch(&self, record: &BitsetRecord, batch: &mut WriteBatch) -> Result<()> {
        trace!(
            "Staging {} bitset for {} (count {})",
            record.badge,
            record.fingerprint,
            record.set_count
        );

        let fingerprint = Fingerprint(record.fingerprint.clone());
        let key = bitset_key(&fingerprint, record.badge);

        batch.put_cf(
            self.bitsets_cf(),
            &key,
            bincode::encode_to_vec(record, BIN_CODE_CONFIG)?,
        );
        batch.put_cf(self.bitsets_count_cf(), &key, record.set_count.to_be_bytes());

        Ok(())
    }

    fn get_bitset_record(
        &self,
        fingerprint: &Fingerprint,
        badge: Badge,
    ) -> Result<Option<BitsetRecord>> {
        trace!("Getting {badge} bitset record for {fingerprint}");

        Ok(self
            .database
            .get_cf(self.bitsets_cf(), bitset_key(fingerprint, badge))
            .map_err(db_error)?
            .map(|bytes| bincode::decode_from_slice(&bytes, BIN_CODE_CONFIG).map(|(rec, _)| rec))
            .transpose()?)
    }

    fn get_badge_bitset(
        &self,
        fingerprint: &Fingerprint,
        badge: Badge,
    ) -> Result<Option<Arc<Bitset>>> {
        if let Some(bitset) = self.cached_bitset(fingerprint, badge) {
            return Ok(Some(bitset));
        }

        let Some(record) = self.get_bitset_record(fingerprint, badge)? else {
            return Ok(None);
        };

        let bitset = Arc::new(Bitset::from_bytes(&record.data));
        self.memoize_bitset(fingerprint, badge, bitset.clone());
        Ok(Some(bitset))
    }

    fn get_badge_stats(&self, fingerprint: &Fingerprint) -> Result<HashMap<Badge, u32>> {
        trace!("Getting badge stats for {fingerprint}");

        let mut stats = HashMap::new();
        for badge in Badge::ALL {
            if let Some(bytes) = self
                .database
                .get_cf(self.bitsets_count_cf(), bitset_key(fingerprint, badge))
                .map_err(db_error)?
            {
                stats.insert(badge, u32_from_be_bytes(&bytes)?);
            }
        }

        Ok(stats)
    }
}
