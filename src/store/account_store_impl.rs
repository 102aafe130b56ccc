//! Account store impl

use super::{
    account::AccountStore,
    bitset::{BitsetRecord, BitsetStore},
    column::{ColumnKind, ColumnRecord, ColumnStore},
    db_error,
    timestamp::{TimestampRecord, TimestampStore},
    IndexerStore, Result,
};
use crate::{
    base::{
        account::Account,
        badge::{Badge, BadgeValue},
        fingerprint::Fingerprint,
        username::Username,
    },
    collection::{
        bitset::Bitset,
        string_column::{StringColumn, StringColumnBuilder},
    },
};
use log::{debug, trace};
use speedb::WriteBatch;
use std::{collections::HashMap, sync::Arc};

impl AccountStore for IndexerStore {
    fn store_all(&self, fingerprint: &Fingerprint, accounts: &[Account]) -> Result<()> {
        debug!(
            "Storing {} accounts under fingerprint {fingerprint}",
            accounts.len()
        );

        let mut usernames = StringColumnBuilder::new();
        let mut display_names = StringColumnBuilder::new();
        let mut hrefs = StringColumnBuilder::new();
        let mut bitsets: HashMap<Badge, Bitset> = Badge::ALL
            .iter()
            .map(|badge| (*badge, Bitset::new(accounts.len())))
            .collect();

        let mut batch = WriteBatch::default();

        for (position, account) in accounts.iter().enumerate() {
            usernames.push(&account.username.search_key());
            display_names.push(account.username.as_str());
            hrefs.push(account.href.as_deref().unwrap_or(""));

            for badge in account.badges.keys() {
                bitsets
                    .get_mut(badge)
                    .expect("every badge has a bitset")
                    .set(position);
            }

            if let Some(record) = TimestampRecord::from_account(fingerprint, account) {
                self.put_timestamps_batch(&record, &mut batch)?;
            }
        }

        for (kind, column) in [
            (ColumnKind::Usernames, usernames.build()),
            (ColumnKind::DisplayNames, display_names.build()),
            (ColumnKind::Hrefs, hrefs.build()),
        ] {
            self.put_column_batch(
                &ColumnRecord::from_column(fingerprint, kind, column),
                &mut batch,
            )?;
        }

        // every badge gets a record, empty bitsets included
        for badge in Badge::ALL {
            let record = BitsetRecord::from_bitset(fingerprint, badge, &bitsets[&badge]);
            self.put_bitset_batch(&record, &mut batch)?;
        }

        self.database.write(batch).map_err(db_error)?;

        // fresh data invalidates anything memoized under this fingerprint
        self.evict_caches(fingerprint);
        Ok(())
    }

    fn get_accounts_by_range(
        &self,
        fingerprint: &Fingerprint,
        start: u32,
        end: u32,
    ) -> Result<Vec<Account>> {
        trace!("Getting accounts [{start}, {end}) for {fingerprint}");

        let Some(display_names) = self.get_string_column(fingerprint, ColumnKind::DisplayNames)?
        else {
            return Ok(vec![]);
        };

        let mut badge_bitsets = vec![];
        for badge in Badge::ALL {
            if let Some(bitset) = self.get_badge_bitset(fingerprint, badge)? {
                badge_bitsets.push((badge, bitset));
            }
        }

        let end = (end as usize).min(display_names.len());
        let mut accounts = vec![];

        for position in (start as usize)..end {
            let Some(display_name) = display_names.get(position) else {
                continue;
            };

            let mut account = Account::new(Username::new(display_name));
            for (badge, bitset) in &badge_bitsets {
                if bitset.has(position) {
                    account.badges.insert(*badge, BadgeValue::Flag(true));
                }
            }

            accounts.push(account);
        }

        Ok(accounts)
    }

    fn get_string_column(
        &self,
        fingerprint: &Fingerprint,
        kind: ColumnKind,
    ) -> Result<Option<Arc<StringColumn>>> {
        if let Some(column) = self.cached_column(fingerprint, kind) {
            return Ok(Some(column));
        }

        let Some(record) = self.get_column(fingerprint, kind)? else {
            return Ok(None);
        };

        let column = Arc::new(record.into_column()?);
        self.memoize_column(fingerprint, kind, column.clone());
        Ok(Some(column))
    }
}
