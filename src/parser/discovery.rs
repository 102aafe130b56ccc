//! Archive entry discovery
//!
//! Classifies archive paths against the known set of relation filenames and
//! summarizes what the archive contains before any decoding happens.

use crate::base::badge::Badge;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RelationKind {
    Following,
    Followers,
    Pending,
    Permanent,
    Restricted,
    Close,
    Unfollowed,
    Dismissed,
}

impl RelationKind {
    pub const ALL: [RelationKind; 8] = [
        Self::Following,
        Self::Followers,
        Self::Pending,
        Self::Permanent,
        Self::Restricted,
        Self::Close,
        Self::Unfollowed,
        Self::Dismissed,
    ];

    pub fn badge(&self) -> Badge {
        match self {
            Self::Following => Badge::Following,
            Self::Followers => Badge::Followers,
            Self::Pending => Badge::Pending,
            Self::Permanent => Badge::Permanent,
            Self::Restricted => Badge::Restricted,
            Self::Close => Badge::Close,
            Self::Unfollowed => Badge::Unfollowed,
            Self::Dismissed => Badge::Dismissed,
        }
    }
}

/// Recognized file stems. Numbered continuations (`followers_1`) map to the
/// same kind.
const RELATION_STEMS: [(&str, RelationKind); 8] = [
    ("following", RelationKind::Following),
    ("followers", RelationKind::Followers),
    ("pending_follow_requests", RelationKind::Pending),
    ("permanent_follow_requests", RelationKind::Permanent),
    ("restricted_profiles", RelationKind::Restricted),
    ("close_friends", RelationKind::Close),
    ("recently_unfollowed_accounts", RelationKind::Unfollowed),
    (
        "recommended_accounts_you_saw_less_often",
        RelationKind::Dismissed,
    ),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileFormat {
    Json,
    Html,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveredFile {
    pub path: String,
    pub kind: RelationKind,
    pub format: FileFormat,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDiscovery {
    pub format: FileFormat,
    pub is_recognized_export: bool,
    pub base_path: String,
    pub files: Vec<DiscoveredFile>,
}

impl Default for FileDiscovery {
    fn default() -> Self {
        Self {
            format: FileFormat::Unknown,
            is_recognized_export: false,
            base_path: String::new(),
            files: vec![],
        }
    }
}

impl FileDiscovery {
    /// Recognized JSON relation files, the ones the parser decodes
    pub fn json_files(&self) -> impl Iterator<Item = &DiscoveredFile> {
        self.files
            .iter()
            .filter(|f| f.format == FileFormat::Json)
    }
}

/// Classify one archive path. Directories and unrecognized names yield None.
pub fn classify_entry(path: &str) -> Option<(RelationKind, FileFormat)> {
    let basename = path.rsplit('/').next().unwrap_or(path);
    let (stem, extension) = basename.rsplit_once('.')?;

    let format = match extension.to_lowercase().as_str() {
        "json" => FileFormat::Json,
        "html" | "htm" => FileFormat::Html,
        _ => return None,
    };

    let stem = stem.to_lowercase();
    let kind = RELATION_STEMS.iter().find_map(|(base, kind)| {
        if stem == *base {
            return Some(*kind);
        }

        // numbered continuation: {base}_{n}
        stem.strip_prefix(base)
            .and_then(|rest| rest.strip_prefix('_'))
            .filter(|n| !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()))
            .map(|_| *kind)
    })?;

    Some((kind, format))
}

/// Summarize an archive's entry listing
pub fn discover(entry_paths: &[String]) -> FileDiscovery {
    let files: Vec<DiscoveredFile> = entry_paths
        .iter()
        .filter_map(|path| {
            classify_entry(path).map(|(kind, format)| DiscoveredFile {
                path: path.clone(),
                kind,
                format,
            })
        })
        .collect();

    let format = if files.iter().any(|f| f.format == FileFormat::Json) {
        FileFormat::Json
    } else if files.iter().any(|f| f.format == FileFormat::Html) {
        FileFormat::Html
    } else {
        FileFormat::Unknown
    };

    FileDiscovery {
        format,
        is_recognized_export: !files.is_empty(),
        base_path: common_parent(&files),
        files,
    }
}

/// Longest common directory prefix of the recognized files
fn common_parent(files: &[DiscoveredFile]) -> String {
    let mut common: Option<Vec<&str>> = None;

    for file in files {
        let dir: Vec<&str> = match file.path.rsplit_once('/') {
            Some((dir, _)) => dir.split('/').collect(),
            None => vec![],
        };

        common = Some(match common {
            None => dir,
            Some(prev) => prev
                .iter()
                .zip(dir.iter())
                .take_while(|(a, b)| a == b)
                .map(|(a, _)| *a)
                .collect(),
        });
    }

    match common {
        Some(parts) if !parts.is_empty() => format!("{}/", parts.join("/")),
        _ => String::new(),
    }
}
