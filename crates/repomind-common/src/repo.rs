//! Canonical repository identity
//!
//! A repository is identified by the pair (owner, name); the canonical
//! string form is `"owner/name"` and is used as `repo_id` everywhere a
//! repository is persisted or scoped.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error returned when an input cannot be parsed as a repository identity
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RepoIdError {
    #[error("not a GitHub repository URL or owner/name pair: {0}")]
    Unrecognized(String),
    #[error("repository segment contains invalid characters: {0}")]
    InvalidSegment(String),
}

/// Owner/name pair identifying one repository
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepoId {
    owner: String,
    name: String,
}

impl RepoId {
    /// Build from already-validated parts
    ///
    /// # Errors
    ///
    /// Returns `InvalidSegment` if either part is empty or contains
    /// characters GitHub does not allow in owner or repository names.
    pub fn new(owner: &str, name: &str) -> Result<Self, RepoIdError> {
        for segment in [owner, name] {
            if segment.is_empty() || !segment.chars().all(valid_segment_char) {
                return Err(RepoIdError::InvalidSegment(segment.to_string()));
            }
        }
        Ok(Self {
            owner: owner.to_string(),
            name: name.trim_end_matches(".git").to_string(),
        })
    }

    /// Parse a GitHub URL or a bare `owner/name` pair
    ///
    /// Accepts `https://github.com/owner/name`, the same with a `.git`
    /// suffix or trailing path segments, and plain `owner/name`.
    ///
    /// # Errors
    ///
    /// Returns `Unrecognized` for anything else.
    pub fn parse(input: &str) -> Result<Self, RepoIdError> {
        let trimmed = input.trim().trim_end_matches('/');

        let path = if let Some(rest) = trimmed
            .strip_prefix("https://github.com/")
            .or_else(|| trimmed.strip_prefix("http://github.com/"))
            .or_else(|| trimmed.strip_prefix("github.com/"))
        {
            rest
        } else if trimmed.contains("://") || trimmed.starts_with("git@") {
            // Some other host or transport; out of scope
            return Err(RepoIdError::Unrecognized(input.to_string()));
        } else {
            trimmed
        };

        let mut segments = path.split('/');
        match (segments.next(), segments.next()) {
            (Some(owner), Some(name)) if !owner.is_empty() && !name.is_empty() => {
                // Trailing segments like /tree/main are tolerated and dropped
                Self::new(owner, name.trim_end_matches(".git"))
            }
            _ => Err(RepoIdError::Unrecognized(input.to_string())),
        }
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Canonical `"owner/name"` string used as the persistence key
    pub fn as_key(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}

impl std::fmt::Display for RepoId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

impl std::str::FromStr for RepoId {
    type Err = RepoIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

fn valid_segment_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_https_url() {
        let id = RepoId::parse("https://github.com/rust-lang/cargo").unwrap();
        assert_eq!(id.owner(), "rust-lang");
        assert_eq!(id.name(), "cargo");
        assert_eq!(id.as_key(), "rust-lang/cargo");
    }

    #[test]
    fn parses_url_with_git_suffix_and_trailing_path() {
        let id = RepoId::parse("https://github.com/tokio-rs/tokio.git").unwrap();
        assert_eq!(id.name(), "tokio");

        let id = RepoId::parse("https://github.com/tokio-rs/tokio/tree/master/tokio").unwrap();
        assert_eq!(id.as_key(), "tokio-rs/tokio");
    }

    #[test]
    fn parses_bare_pair() {
        let id = RepoId::parse("serde-rs/serde").unwrap();
        assert_eq!(id.as_key(), "serde-rs/serde");
    }

    #[test]
    fn rejects_other_hosts_and_garbage() {
        assert!(RepoId::parse("https://gitlab.com/a/b").is_err());
        assert!(RepoId::parse("git@github.com:a/b.git").is_err());
        assert!(RepoId::parse("just-one-segment").is_err());
        assert!(RepoId::parse("").is_err());
    }

    #[test]
    fn rejects_invalid_segment_characters() {
        assert!(RepoId::parse("owner/na me").is_err());
        assert!(RepoId::new("ow ner", "name").is_err());
    }
}
