//! Error taxonomy & classification
//!
//! Every error surfaced to a consumer carries one code from the closed
//! [ErrorCode] sum. Free-text errors from underlying systems are mapped to a
//! canonical code by a keyword ruleset; a structured [IndexerError] bypasses
//! classification.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCode {
    // parse/ingest
    NotZip,
    HtmlFormat,
    NotInstagramExport,
    IncompleteExport,
    NoDataFiles,
    MissingFollowing,
    MissingFollowers,
    CorruptedZip,
    ZipEncrypted,
    EmptyFile,
    FileTooLarge,
    JsonParseError,
    InvalidDataStructure,

    // runtime
    WorkerTimeout,
    WorkerInitError,
    WorkerCrashed,
    #[serde(rename = "IndexedDBError")]
    IndexedDbError,
    QuotaExceeded,
    #[serde(rename = "IDBNotSupported")]
    IdbNotSupported,
    #[serde(rename = "IDBPermissionDenied")]
    IdbPermissionDenied,
    UploadCancelled,
    CryptoNotAvailable,
    NetworkError,
    Unknown,
}

impl ErrorCode {
    /// Canonical consumer-facing code string
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotZip => "NotZip",
            Self::HtmlFormat => "HtmlFormat",
            Self::NotInstagramExport => "NotInstagramExport",
            Self::IncompleteExport => "IncompleteExport",
            Self::NoDataFiles => "NoDataFiles",
            Self::MissingFollowing => "MissingFollowing",
            Self::MissingFollowers => "MissingFollowers",
            Self::CorruptedZip => "CorruptedZip",
            Self::ZipEncrypted => "ZipEncrypted",
            Self::EmptyFile => "EmptyFile",
            Self::FileTooLarge => "FileTooLarge",
            Self::JsonParseError => "JsonParseError",
            Self::InvalidDataStructure => "InvalidDataStructure",
            Self::WorkerTimeout => "WorkerTimeout",
            Self::WorkerInitError => "WorkerInitError",
            Self::WorkerCrashed => "WorkerCrashed",
            Self::IndexedDbError => "IndexedDBError",
            Self::QuotaExceeded => "QuotaExceeded",
            Self::IdbNotSupported => "IDBNotSupported",
            Self::IdbPermissionDenied => "IDBPermissionDenied",
            Self::UploadCancelled => "UploadCancelled",
            Self::CryptoNotAvailable => "CryptoNotAvailable",
            Self::NetworkError => "NetworkError",
            Self::Unknown => "Unknown",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A coded error with a human-readable message
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{code}: {message}")]
pub struct IndexerError {
    pub code: ErrorCode,
    pub message: String,
}

impl IndexerError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn cancelled() -> Self {
        Self::new(ErrorCode::UploadCancelled, "upload cancelled")
    }

    pub fn is_cancelled(&self) -> bool {
        self.code == ErrorCode::UploadCancelled
    }
}

/// Multi-keyword rules: every listed keyword must appear (case-insensitive).
/// First match wins, so specific rules come before general ones.
const CLASSIFICATION_RULES: &[(&[&str], ErrorCode)] = &[
    (&["quota"], ErrorCode::QuotaExceeded),
    (&["zip", "password"], ErrorCode::ZipEncrypted),
    (&["zip", "encrypted"], ErrorCode::ZipEncrypted),
    (&["invalid zip"], ErrorCode::NotZip),
    (&["not a zip"], ErrorCode::NotZip),
    (&["zip", "corrupt"], ErrorCode::CorruptedZip),
    (&["zip", "truncated"], ErrorCode::CorruptedZip),
    (&["empty file"], ErrorCode::EmptyFile),
    (&["file too large"], ErrorCode::FileTooLarge),
    (&["json", "parse"], ErrorCode::JsonParseError),
    (&["json", "expected"], ErrorCode::JsonParseError),
    (&["permission denied"], ErrorCode::IdbPermissionDenied),
    (&["database", "not supported"], ErrorCode::IdbNotSupported),
    (&["timed out"], ErrorCode::WorkerTimeout),
    (&["timeout"], ErrorCode::WorkerTimeout),
    (&["cancelled"], ErrorCode::UploadCancelled),
    (&["canceled"], ErrorCode::UploadCancelled),
    (&["crypto"], ErrorCode::CryptoNotAvailable),
    (&["network"], ErrorCode::NetworkError),
    (&["connection refused"], ErrorCode::NetworkError),
    (&["no space left"], ErrorCode::QuotaExceeded),
    (&["io error"], ErrorCode::IndexedDbError),
    (&["rocksdb"], ErrorCode::IndexedDbError),
    (&["column family"], ErrorCode::IndexedDbError),
    (&["corruption"], ErrorCode::IndexedDbError),
];

/// Map a free-text error message to a canonical code
pub fn classify(message: &str) -> ErrorCode {
    let message = message.to_lowercase();

    CLASSIFICATION_RULES
        .iter()
        .find(|(keywords, _)| keywords.iter().all(|kw| message.contains(kw)))
        .map(|(_, code)| *code)
        .unwrap_or(ErrorCode::Unknown)
}

/// Classify an [anyhow::Error], honoring an embedded structured code
pub fn classify_error(error: &anyhow::Error) -> ErrorCode {
    if let Some(indexer_error) = error.downcast_ref::<IndexerError>() {
        return indexer_error.code;
    }

    classify(&format!("{error:#}"))
}

/// Coerce an [anyhow::Error] into a coded error, classifying if needed
pub fn into_indexer_error(error: anyhow::Error) -> IndexerError {
    match error.downcast::<IndexerError>() {
        Ok(indexer_error) => indexer_error,
        Err(error) => IndexerError::new(classify(&format!("{error:#}")), format!("{error:#}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_quota() {
        assert_eq!(
            classify("IO error: No space left on device"),
            ErrorCode::QuotaExceeded
        );
        assert_eq!(classify("storage quota exceeded"), ErrorCode::QuotaExceeded);
    }

    #[test]
    fn test_classify_multi_keyword_requires_all() {
        // "zip" alone matches nothing, "password" alone matches nothing
        assert_eq!(classify("zip archive looks fine"), ErrorCode::Unknown);
        assert_eq!(
            classify("Zip file is password protected"),
            ErrorCode::ZipEncrypted
        );
    }

    #[test]
    fn test_classify_case_insensitive() {
        assert_eq!(classify("OPERATION TIMED OUT"), ErrorCode::WorkerTimeout);
    }

    #[test]
    fn test_classify_unknown() {
        assert_eq!(classify("something inexplicable"), ErrorCode::Unknown);
    }

    #[test]
    fn test_structured_error_bypasses_classification() {
        let err = anyhow::Error::new(IndexerError::new(
            ErrorCode::EmptyFile,
            "quota mentioned but irrelevant",
        ));
        assert_eq!(classify_error(&err), ErrorCode::EmptyFile);
    }

    #[test]
    fn test_code_strings_exact() {
        assert_eq!(ErrorCode::IndexedDbError.to_string(), "IndexedDBError");
        assert_eq!(ErrorCode::IdbNotSupported.to_string(), "IDBNotSupported");
        assert_eq!(
            ErrorCode::IdbPermissionDenied.to_string(),
            "IDBPermissionDenied"
        );
        assert_eq!(ErrorCode::NotZip.to_string(), "NotZip");
    }
}
