//! Relation badges
//!
//! A badge marks one relation an account bears within a fingerprint. The
//! first eight kinds come straight from the export and may carry a Unix
//! seconds timestamp; the last three are derived from set membership.

use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Encode,
    Decode,
)]
pub enum Badge {
    Following,
    Followers,
    Pending,
    Permanent,
    Restricted,
    Close,
    Unfollowed,
    Dismissed,
    Mutuals,
    NotFollowingBack,
    NotFollowedBack,
}

impl Badge {
    /// Every badge, in storage order. The per-badge storage byte is the
    /// position in this array — do not reorder without a schema bump.
    pub const ALL: [Badge; 11] = [
        Self::Following,
        Self::Followers,
        Self::Pending,
        Self::Permanent,
        Self::Restricted,
        Self::Close,
        Self::Unfollowed,
        Self::Dismissed,
        Self::Mutuals,
        Self::NotFollowingBack,
        Self::NotFollowedBack,
    ];

    /// Badges sourced directly from the export, each with an optional
    /// timestamp
    pub const TIME_VALUED: [Badge; 8] = [
        Self::Following,
        Self::Followers,
        Self::Pending,
        Self::Permanent,
        Self::Restricted,
        Self::Close,
        Self::Unfollowed,
        Self::Dismissed,
    ];

    /// True for badges derived from set operations
    pub fn is_computed(&self) -> bool {
        matches!(
            self,
            Self::Mutuals | Self::NotFollowingBack | Self::NotFollowedBack
        )
    }

    /// Stable storage byte
    pub fn kind(&self) -> u8 {
        Self::ALL.iter().position(|b| b == self).expect("badge in ALL") as u8
    }

    pub fn from_kind(kind: u8) -> Option<Self> {
        Self::ALL.get(kind as usize).copied()
    }
}

impl std::fmt::Display for Badge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

/// Value a badge carries on an account: a bare flag or a Unix seconds
/// timestamp from the export
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BadgeValue {
    Flag(bool),
    At(u64),
}

impl BadgeValue {
    pub fn timestamp(&self) -> Option<u64> {
        match self {
            Self::At(ts) => Some(*ts),
            Self::Flag(_) => None,
        }
    }
}

impl Default for BadgeValue {
    fn default() -> Self {
        Self::Flag(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_round_trip() {
        for badge in Badge::ALL {
            assert_eq!(Badge::from_kind(badge.kind()), Some(badge));
        }
        assert_eq!(Badge::from_kind(Badge::ALL.len() as u8), None);
    }

    #[test]
    fn test_computed_partition() {
        for badge in Badge::TIME_VALUED {
            assert!(!badge.is_computed());
        }
        assert!(Badge::Mutuals.is_computed());
        assert!(Badge::NotFollowingBack.is_computed());
        assert!(Badge::NotFollowedBack.is_computed());
    }

    #[test]
    fn test_badge_value_serde() -> anyhow::Result<()> {
        assert_eq!(serde_json::to_string(&BadgeValue::Flag(true))?, "true");
        assert_eq!(serde_json::to_string(&BadgeValue::At(1000))?, "1000");

        let flag: BadgeValue = serde_json::from_str("true")?;
        let at: BadgeValue = serde_json::from_str("1500")?;
        assert_eq!(flag, BadgeValue::Flag(true));
        assert_eq!(at, BadgeValue::At(1500));
        Ok(())
    }
}
