//! Ingestion data types

use serde::{Deserialize, Serialize};

/// One blob fetched from the repository tree, still undecoded
#[derive(Debug, Clone)]
pub struct RepoFile {
    pub path: String,
    /// Size reported by the tree listing (original bytes)
    pub size_bytes: u64,
    pub bytes: Vec<u8>,
}

/// A consistent snapshot of a repository at one commit
#[derive(Debug, Clone)]
pub struct RepoSnapshot {
    /// Canonical "owner/name"
    pub repo_id: String,
    pub commit_hash: String,
    pub default_branch: String,
    pub files: Vec<RepoFile>,
}

/// A file that survived the filter, decoded to UTF-8
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub path: String,
    pub size_bytes: u64,
    pub content: String,
}

/// Why the filter rejected a file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RejectReason {
    IgnoredPath,
    ExtensionNotAllowed,
    TooLarge,
    Binary,
    Empty,
}

impl RejectReason {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::IgnoredPath => "ignored-path",
            Self::ExtensionNotAllowed => "extension-not-allowed",
            Self::TooLarge => "too-large",
            Self::Binary => "binary",
            Self::Empty => "empty",
        }
    }
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A rejected file and the first rule it violated
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RejectedFile {
    pub path: String,
    pub reason: RejectReason,
}

/// The filter's verdict over one snapshot
#[derive(Debug, Clone, Default)]
pub struct FilterOutcome {
    pub accepted: Vec<SourceFile>,
    pub rejected: Vec<RejectedFile>,
}
