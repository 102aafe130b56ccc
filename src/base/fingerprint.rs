//! Content fingerprint
//!
//! A hex-encoded SHA-256 digest over the first MiB of an archive. The
//! fingerprint is the primary key of every derived storage record.

use crate::{
    constants::FINGERPRINT_SAMPLE_BYTES,
    error::{ErrorCode, IndexerError},
};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

#[derive(Debug, PartialEq, Eq, Clone, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Fingerprint(pub String);

impl Fingerprint {
    /// Hex digest length
    pub const LEN: usize = 64;

    /// Digest the first MiB of the input (the whole input if smaller).
    /// Zero-length input is rejected.
    pub fn digest(bytes: &[u8]) -> Result<Self, IndexerError> {
        if bytes.is_empty() {
            return Err(IndexerError::new(
                ErrorCode::EmptyFile,
                "cannot fingerprint an empty file",
            ));
        }

        let sample = &bytes[..bytes.len().min(FINGERPRINT_SAMPLE_BYTES)];
        let mut hasher = Sha256::new();
        hasher.update(sample);

        Ok(Self(hex::encode(hasher.finalize())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl From<&str> for Fingerprint {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
