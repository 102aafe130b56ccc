//! Archive parser
//!
//! Turns raw archive bytes into normalized per-relation username sets plus
//! a discovery summary and warnings. Unopenable archives produce a single
//! error-severity warning; recoverable problems (one bad file, a missing
//! relation) produce pass-through warnings and parsing continues.

pub mod discovery;
pub mod relation;

use crate::{
    constants::MAX_ARCHIVE_BYTES,
    error::ErrorCode,
    parser::{
        discovery::{discover, FileDiscovery, FileFormat, RelationKind},
        relation::{decode_relation, RelationSet},
    },
};
use log::{debug, trace, warn};
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, io::Read};
use zip::{result::ZipError, ZipArchive};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseWarning {
    pub severity: Severity,
    pub code: ErrorCode,
    pub message: String,
}

impl ParseWarning {
    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            code,
            message: message.into(),
        }
    }

    pub fn warning(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            code,
            message: message.into(),
        }
    }

    pub fn is_fatal(&self) -> bool {
        self.severity == Severity::Error
    }
}

/// Normalized relation sets, one per export relation kind
#[derive(Debug, Default, Clone)]
pub struct ParsedRelations {
    pub following: RelationSet,
    pub followers: RelationSet,
    pub pending: RelationSet,
    pub permanent: RelationSet,
    pub restricted: RelationSet,
    pub close_friends: RelationSet,
    pub unfollowed: RelationSet,
    pub dismissed: RelationSet,

    /// Profile links harvested along the way, first one wins
    pub hrefs: HashMap<String, String>,
}

impl ParsedRelations {
    pub fn set(&self, kind: RelationKind) -> &RelationSet {
        match kind {
            RelationKind::Following => &self.following,
            RelationKind::Followers => &self.followers,
            RelationKind::Pending => &self.pending,
            RelationKind::Permanent => &self.permanent,
            RelationKind::Restricted => &self.restricted,
            RelationKind::Close => &self.close_friends,
            RelationKind::Unfollowed => &self.unfollowed,
            RelationKind::Dismissed => &self.dismissed,
        }
    }

    fn set_mut(&mut self, kind: RelationKind) -> &mut RelationSet {
        match kind {
            RelationKind::Following => &mut self.following,
            RelationKind::Followers => &mut self.followers,
            RelationKind::Pending => &mut self.pending,
            RelationKind::Permanent => &mut self.permanent,
            RelationKind::Restricted => &mut self.restricted,
            RelationKind::Close => &mut self.close_friends,
            RelationKind::Unfollowed => &mut self.unfollowed,
            RelationKind::Dismissed => &mut self.dismissed,
        }
    }
}

#[derive(Debug, Default)]
pub struct ParseResult {
    pub data: ParsedRelations,
    pub warnings: Vec<ParseWarning>,
    pub discovery: FileDiscovery,
    pub has_minimal_data: bool,
}

impl ParseResult {
    fn fatal(code: ErrorCode, message: impl Into<String>, discovery: FileDiscovery) -> Self {
        Self {
            data: ParsedRelations::default(),
            warnings: vec![ParseWarning::error(code, message)],
            discovery,
            has_minimal_data: false,
        }
    }

    /// The warning that aborts the pipeline, if any
    pub fn fatal_warning(&self) -> Option<&ParseWarning> {
        self.warnings.iter().find(|w| w.is_fatal())
    }
}

pub fn parse_archive(bytes: &[u8]) -> ParseResult {
    parse_archive_with_progress(bytes, &mut |_, _| true)
}

/// Parse with a per-file progress callback `(processed, total)`. The
/// callback returning false aborts the parse as cancelled.
pub fn parse_archive_with_progress(
    bytes: &[u8],
    progress: &mut dyn FnMut(usize, usize) -> bool,
) -> ParseResult {
    if bytes.is_empty() {
        return ParseResult::fatal(
            ErrorCode::EmptyFile,
            "archive is empty",
            FileDiscovery::default(),
        );
    }

    if bytes.len() as u64 > MAX_ARCHIVE_BYTES {
        return ParseResult::fatal(
            ErrorCode::FileTooLarge,
            format!("archive is {} bytes, over the limit", bytes.len()),
            FileDiscovery::default(),
        );
    }

    let mut archive = match ZipArchive::new(std::io::Cursor::new(bytes)) {
        Ok(archive) => archive,
        Err(e) => {
            let code = if bytes.starts_with(b"PK") {
                ErrorCode::CorruptedZip
            } else {
                ErrorCode::NotZip
            };
            return ParseResult::fatal(
                code,
                format!("cannot open archive: {e}"),
                FileDiscovery::default(),
            );
        }
    };

    let entry_paths: Vec<String> = archive.file_names().map(String::from).collect();
    let discovery = discover(&entry_paths);
    debug!(
        "Discovered {} relation files under {:?}",
        discovery.files.len(),
        discovery.base_path
    );

    if entry_paths.is_empty() {
        return ParseResult::fatal(ErrorCode::NoDataFiles, "archive has no entries", discovery);
    }

    if !discovery.is_recognized_export {
        return ParseResult::fatal(
            ErrorCode::NotInstagramExport,
            "archive holds no recognized relation files",
            discovery,
        );
    }

    if discovery.format == FileFormat::Html {
        return ParseResult::fatal(
            ErrorCode::HtmlFormat,
            "archive holds only HTML relation files; JSON export required",
            discovery,
        );
    }

    let mut data = ParsedRelations::default();
    let mut warnings = vec![];

    let json_files: Vec<_> = discovery.json_files().cloned().collect();
    let total = json_files.len();

    for (processed, file) in json_files.iter().enumerate() {
        if !progress(processed, total) {
            return ParseResult::fatal(
                ErrorCode::UploadCancelled,
                "parse cancelled",
                discovery,
            );
        }

        let mut content = String::new();
        match archive.by_name(&file.path) {
            Ok(mut entry) => {
                if let Err(e) = entry.read_to_string(&mut content) {
                    return ParseResult::fatal(
                        ErrorCode::CorruptedZip,
                        format!("cannot read {}: {e}", file.path),
                        discovery,
                    );
                }
            }
            Err(ZipError::InvalidPassword) => {
                return ParseResult::fatal(
                    ErrorCode::ZipEncrypted,
                    format!("{} is encrypted", file.path),
                    discovery,
                );
            }
            Err(ZipError::UnsupportedArchive(msg)) if msg.to_lowercase().contains("password") => {
                return ParseResult::fatal(
                    ErrorCode::ZipEncrypted,
                    format!("{} is encrypted", file.path),
                    discovery,
                );
            }
            Err(e) => {
                return ParseResult::fatal(
                    ErrorCode::CorruptedZip,
                    format!("cannot read {}: {e}", file.path),
                    discovery,
                );
            }
        }

        if content.trim().is_empty() {
            trace!("Skipping empty relation file {}", file.path);
            continue;
        }

        match decode_relation(&content) {
            Ok(items) => {
                trace!("Decoded {} entries from {}", items.len(), file.path);

                for item in items {
                    if let Some(href) = item.href {
                        data.hrefs.entry(item.username.clone()).or_insert(href);
                    }
                    data.set_mut(file.kind).insert(item.username, item.timestamp);
                }
            }
            Err(e) => {
                warn!("Failed to decode {}: {e}", file.path);
                let code = if e.downcast_ref::<serde_json::Error>().is_some() {
                    ErrorCode::JsonParseError
                } else {
                    ErrorCode::InvalidDataStructure
                };
                warnings.push(ParseWarning::warning(
                    code,
                    format!("{}: {e}", file.path),
                ));
            }
        }
    }

    if data.following.is_empty() {
        warnings.push(ParseWarning::warning(
            ErrorCode::MissingFollowing,
            "no following entries found",
        ));
    }
    if data.followers.is_empty() {
        warnings.push(ParseWarning::warning(
            ErrorCode::MissingFollowers,
            "no followers entries found",
        ));
    }

    let has_minimal_data = !data.following.is_empty() || !data.followers.is_empty();
    if !has_minimal_data {
        warnings.push(ParseWarning::error(
            ErrorCode::IncompleteExport,
            "export holds neither following nor followers data",
        ));
    }

    ParseResult {
        data,
        warnings,
        discovery,
        has_minimal_data,
    }
}
