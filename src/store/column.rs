//! String column records
//!
//! Packed variable-length string storage per fingerprint: usernames
//! (lowercased search keys), display names (original case), and profile
//! links.

use super::Result;
use crate::{base::fingerprint::Fingerprint, collection::string_column::StringColumn};
use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};
use speedb::WriteBatch;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Encode, Decode,
)]
pub enum ColumnKind {
    Usernames,
    DisplayNames,
    Hrefs,
}

impl ColumnKind {
    pub const ALL: [ColumnKind; 3] = [Self::Usernames, Self::DisplayNames, Self::Hrefs];

    /// Stable storage byte
    pub fn kind(&self) -> u8 {
        match self {
            Self::Usernames => 0,
            Self::DisplayNames => 1,
            Self::Hrefs => 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct ColumnRecord {
    pub fingerprint: String,
    pub kind: ColumnKind,
    pub data: Vec<u8>,
    pub offsets: Vec<u32>,
    pub length: u32,
}

impl ColumnRecord {
    pub fn from_column(fingerprint: &Fingerprint, kind: ColumnKind, column: StringColumn) -> Self {
        let length = column.len() as u32;
        let (data, offsets) = column.into_parts();

        Self {
            fingerprint: fingerprint.to_string(),
            kind,
            data,
            offsets,
            length,
        }
    }

    pub fn into_column(self) -> anyhow::Result<StringColumn> {
        StringColumn::from_parts(self.data, self.offsets)
    }
}

pub trait ColumnStore {
    /// Stage the record into a batch
    fn put_column_batch(&self, record: &ColumnRecord, batch: &mut WriteBatch) -> Result<()>;

    fn get_column(&self, fingerprint: &Fingerprint, kind: ColumnKind)
        -> Result<Option<ColumnRecord>>;
}
