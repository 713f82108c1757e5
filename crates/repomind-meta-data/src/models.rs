//! Domain models for database entities

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle of a repository's index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexStatus {
    Pending,
    Indexing,
    Ready,
    Failed,
}

impl IndexStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Indexing => "indexing",
            Self::Ready => "ready",
            Self::Failed => "failed",
        }
    }
}

impl std::str::FromStr for IndexStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "indexing" => Ok(Self::Indexing),
            "ready" => Ok(Self::Ready),
            "failed" => Ok(Self::Failed),
            _ => Err(format!("invalid index status: {s}")),
        }
    }
}

impl std::fmt::Display for IndexStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of `repo_index`: everything known about a repository's index
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepoIndexRecord {
    pub repo_id: String,
    pub status: IndexStatus,
    pub commit_hash: Option<String>,
    pub default_branch: Option<String>,
    /// Model that produced the stored vectors; reads refuse to mix spaces
    pub embedding_model: Option<String>,
    pub chunk_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// State of a background indexing job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Waiting,
    Active,
    Completed,
    Failed,
}

impl JobState {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Waiting => "waiting",
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// Whether the job still occupies the repo key
    pub const fn is_unfinished(self) -> bool {
        matches!(self, Self::Waiting | Self::Active)
    }
}

impl std::str::FromStr for JobState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "waiting" => Ok(Self::Waiting),
            "active" => Ok(Self::Active),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            _ => Err(format!("invalid job state: {s}")),
        }
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of `index_jobs`: a queued or running ingestion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexJob {
    pub job_id: Uuid,
    pub repo_id: String,
    pub github_url: String,
    pub state: JobState,
    /// 0-100, advanced per pipeline stage
    pub progress: i16,
    /// Human-readable stage label ("fetch", "embed", ...)
    pub stage: Option<String>,
    pub error_message: Option<String>,
    pub chunks_written: Option<i64>,
    pub write_strategy: Option<String>,
    pub correlation_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_strings() {
        for status in [
            IndexStatus::Pending,
            IndexStatus::Indexing,
            IndexStatus::Ready,
            IndexStatus::Failed,
        ] {
            assert_eq!(status.as_str().parse::<IndexStatus>().unwrap(), status);
        }
        assert!("bogus".parse::<IndexStatus>().is_err());
    }

    #[test]
    fn unfinished_states_occupy_the_repo_key() {
        assert!(JobState::Waiting.is_unfinished());
        assert!(JobState::Active.is_unfinished());
        assert!(!JobState::Completed.is_unfinished());
        assert!(!JobState::Failed.is_unfinished());
    }
}
