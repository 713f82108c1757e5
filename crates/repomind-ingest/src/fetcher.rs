//! GitHub snapshot fetcher
//!
//! Resolves the default branch, pins the head commit of that branch, and
//! enumerates the tree recursively against the commit (never the branch)
//! so every downstream stage shares one consistent snapshot. Blob
//! downloads run with bounded fan-out; an individual blob failure drops
//! that file with a logged reason instead of aborting the run.

use std::time::Duration;

use futures_util::{StreamExt, stream};
use repomind_common::{CorrelationId, RepoId};
use repomind_config::GithubConfig;
use reqwest::{Client, Response, StatusCode, header};
use serde::Deserialize;

use crate::error::{IngestError, IngestResult};
use crate::types::{RepoFile, RepoSnapshot};

const USER_AGENT: &str = "repomind-indexer";
const REQUEST_TIMEOUT_SECS: u64 = 30;
const MAX_RETRIES: u32 = 3;
const RETRY_BASE_DELAY_MS: u64 = 250;

#[derive(Debug, Deserialize)]
struct RepoInfo {
    default_branch: String,
}

#[derive(Debug, Deserialize)]
struct BranchInfo {
    commit: BranchCommit,
}

#[derive(Debug, Deserialize)]
struct BranchCommit {
    sha: String,
}

#[derive(Debug, Deserialize)]
struct TreeListing {
    tree: Vec<TreeEntry>,
    #[serde(default)]
    truncated: bool,
}

#[derive(Debug, Deserialize)]
struct TreeEntry {
    path: String,
    #[serde(rename = "type")]
    entry_type: String,
    sha: String,
    #[serde(default)]
    size: Option<u64>,
}

/// Fetches repository snapshots from the GitHub REST API
pub struct GithubFetcher {
    client: Client,
    config: GithubConfig,
}

impl GithubFetcher {
    /// Build a fetcher with a shared connection pool
    ///
    /// # Errors
    ///
    /// Returns an error when the HTTP client cannot be constructed.
    pub fn new(config: GithubConfig) -> IngestResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| IngestError::Http(e.to_string()))?;
        Ok(Self { client, config })
    }

    /// Fetch the full snapshot for one repository
    ///
    /// # Errors
    ///
    /// `NotFound` for a missing repository, `Unauthorized` on token
    /// failure, `RateLimited` on quota exhaustion, `Upstream` after
    /// retries run out. Individual blob failures do not error.
    #[tracing::instrument(skip(self), fields(repo = %repo, correlation_id = %correlation_id))]
    pub async fn fetch(
        &self,
        repo: &RepoId,
        correlation_id: &CorrelationId,
    ) -> IngestResult<RepoSnapshot> {
        let base = &self.config.api_base;
        let owner = repo.owner();
        let name = repo.name();

        let info: RepoInfo = self
            .get_json(&format!("{base}/repos/{owner}/{name}"))
            .await?;
        let default_branch = info.default_branch;

        let branch: BranchInfo = self
            .get_json(&format!("{base}/repos/{owner}/{name}/branches/{default_branch}"))
            .await?;
        let commit_hash = branch.commit.sha;

        // Tree is listed against the pinned commit, not the branch name
        let listing: TreeListing = self
            .get_json(&format!(
                "{base}/repos/{owner}/{name}/git/trees/{commit_hash}?recursive=1"
            ))
            .await?;
        if listing.truncated {
            tracing::warn!(repo = %repo, "tree listing truncated by upstream; snapshot is partial");
        }

        let blobs: Vec<TreeEntry> = listing
            .tree
            .into_iter()
            .filter(|entry| entry.entry_type == "blob")
            .filter(|entry| {
                let within_cap = entry.size.is_none_or(|s| s <= self.config.max_file_bytes);
                if !within_cap {
                    tracing::debug!(path = %entry.path, size = ?entry.size, "skipping oversized blob before download");
                }
                within_cap
            })
            .collect();

        tracing::info!(
            repo = %repo,
            commit = %commit_hash,
            blob_count = blobs.len(),
            "tree resolved, downloading blobs"
        );

        let mut files: Vec<RepoFile> = stream::iter(blobs)
            .map(|entry| {
                let url = format!("{base}/repos/{owner}/{name}/git/blobs/{}", entry.sha);
                async move {
                    match self.get_raw(&url).await {
                        Ok(bytes) => Some(RepoFile {
                            size_bytes: entry.size.unwrap_or(bytes.len() as u64),
                            path: entry.path,
                            bytes,
                        }),
                        Err(e) => {
                            tracing::warn!(path = %entry.path, error = %e, "dropping file, blob fetch failed");
                            None
                        }
                    }
                }
            })
            .buffer_unordered(self.config.fetch_concurrency.max(1))
            .filter_map(|file| async move { file })
            .collect()
            .await;

        // buffer_unordered scrambles completion order; keep paths stable
        files.sort_by(|a, b| a.path.cmp(&b.path));

        Ok(RepoSnapshot {
            repo_id: repo.as_key(),
            commit_hash,
            default_branch,
            files,
        })
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> IngestResult<T> {
        let response = self.get_with_retry(url, "application/vnd.github+json").await?;
        response
            .json()
            .await
            .map_err(|e| IngestError::Decode(e.to_string()))
    }

    /// Fetch a blob with the raw media type, skipping the base64 detour
    async fn get_raw(&self, url: &str) -> IngestResult<Vec<u8>> {
        let response = self.get_with_retry(url, "application/vnd.github.raw+json").await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| IngestError::Http(e.to_string()))?;
        Ok(bytes.to_vec())
    }

    async fn get_with_retry(&self, url: &str, accept: &str) -> IngestResult<Response> {
        let mut last_error = IngestError::Upstream("no attempt made".to_string());

        for attempt in 0..=MAX_RETRIES {
            if attempt > 0 {
                tokio::time::sleep(backoff_delay(attempt)).await;
            }

            let mut request = self.client.get(url).header(header::ACCEPT, accept);
            if let Some(token) = &self.config.token {
                request = request.bearer_auth(token);
            }

            match request.send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return Ok(response);
                    }
                    let error = classify_status(status, &response);
                    match &error {
                        // Never retried: the answer will not change
                        IngestError::NotFound(_) | IngestError::Unauthorized(_) => {
                            return Err(error);
                        }
                        _ => {
                            tracing::debug!(url, attempt, status = %status, "retryable upstream failure");
                            last_error = error;
                        }
                    }
                }
                Err(e) => {
                    tracing::debug!(url, attempt, error = %e, "transport failure");
                    last_error = IngestError::Http(e.to_string());
                }
            }
        }

        Err(last_error)
    }
}

/// Exponential backoff with a little clock-derived jitter
fn backoff_delay(attempt: u32) -> Duration {
    let base = RETRY_BASE_DELAY_MS.saturating_mul(1 << attempt.min(6));
    let jitter = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| u64::from(d.subsec_millis()) % 100)
        .unwrap_or(0);
    Duration::from_millis(base.saturating_add(jitter))
}

fn classify_status(status: StatusCode, response: &Response) -> IngestError {
    match status {
        StatusCode::NOT_FOUND => IngestError::NotFound("repository or ref missing".to_string()),
        StatusCode::UNAUTHORIZED => IngestError::Unauthorized("token rejected".to_string()),
        StatusCode::FORBIDDEN | StatusCode::TOO_MANY_REQUESTS => {
            let exhausted = response
                .headers()
                .get("x-ratelimit-remaining")
                .and_then(|v| v.to_str().ok())
                .is_some_and(|v| v == "0");
            if status == StatusCode::TOO_MANY_REQUESTS || exhausted {
                IngestError::RateLimited {
                    retry_after: response
                        .headers()
                        .get(header::RETRY_AFTER)
                        .and_then(|v| v.to_str().ok())
                        .and_then(|v| v.parse().ok()),
                }
            } else {
                IngestError::Unauthorized("access forbidden".to_string())
            }
        }
        s => IngestError::Upstream(format!("unexpected status {s}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fetcher_for(server: &MockServer) -> GithubFetcher {
        GithubFetcher::new(GithubConfig {
            api_base: server.uri(),
            token: None,
            fetch_concurrency: 4,
            max_file_bytes: 512 * 1024,
        })
        .unwrap()
    }

    async fn mock_repo(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/repos/acme/web"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({
                    "default_branch": "main"
                })),
            )
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path("/repos/acme/web/branches/main"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({
                    "commit": { "sha": "abc123def" }
                })),
            )
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn resolves_branch_then_commit_then_tree() {
        let server = MockServer::start().await;
        mock_repo(&server).await;

        Mock::given(method("GET"))
            .and(path("/repos/acme/web/git/trees/abc123def"))
            .and(query_param("recursive", "1"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({
                    "tree": [
                        { "path": "src/main.rs", "type": "blob", "sha": "b1", "size": 24 },
                        { "path": "src", "type": "tree", "sha": "t1" }
                    ],
                    "truncated": false
                })),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/repos/acme/web/git/blobs/b1"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"fn main() { run(); }".to_vec()))
            .mount(&server)
            .await;

        let repo = RepoId::parse("acme/web").unwrap();
        let snapshot = fetcher_for(&server)
            .fetch(&repo, &CorrelationId::new())
            .await
            .unwrap();

        assert_eq!(snapshot.repo_id, "acme/web");
        assert_eq!(snapshot.commit_hash, "abc123def");
        assert_eq!(snapshot.default_branch, "main");
        assert_eq!(snapshot.files.len(), 1, "tree entries are not downloaded");
        assert_eq!(snapshot.files[0].path, "src/main.rs");
        assert_eq!(snapshot.files[0].bytes, b"fn main() { run(); }");
    }

    #[tokio::test]
    async fn missing_repository_maps_to_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/acme/web"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let repo = RepoId::parse("acme/web").unwrap();
        let err = fetcher_for(&server)
            .fetch(&repo, &CorrelationId::new())
            .await
            .unwrap_err();
        assert!(matches!(err, IngestError::NotFound(_)));
    }

    #[tokio::test]
    async fn failed_blob_drops_file_without_aborting() {
        let server = MockServer::start().await;
        mock_repo(&server).await;

        Mock::given(method("GET"))
            .and(path("/repos/acme/web/git/trees/abc123def"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({
                    "tree": [
                        { "path": "src/ok.rs", "type": "blob", "sha": "good", "size": 10 },
                        { "path": "src/broken.rs", "type": "blob", "sha": "bad", "size": 10 }
                    ]
                })),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/repos/acme/web/git/blobs/good"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"fn ok() {}".to_vec()))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/repos/acme/web/git/blobs/bad"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let repo = RepoId::parse("acme/web").unwrap();
        let snapshot = fetcher_for(&server)
            .fetch(&repo, &CorrelationId::new())
            .await
            .unwrap();

        assert_eq!(snapshot.files.len(), 1);
        assert_eq!(snapshot.files[0].path, "src/ok.rs");
    }

    #[tokio::test]
    async fn oversized_tree_entries_are_skipped_before_download() {
        let server = MockServer::start().await;
        mock_repo(&server).await;

        Mock::given(method("GET"))
            .and(path("/repos/acme/web/git/trees/abc123def"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({
                    "tree": [
                        { "path": "huge.sql", "type": "blob", "sha": "h1", "size": 10_000_000 }
                    ]
                })),
            )
            .mount(&server)
            .await;

        let repo = RepoId::parse("acme/web").unwrap();
        let snapshot = fetcher_for(&server)
            .fetch(&repo, &CorrelationId::new())
            .await
            .unwrap();
        assert!(snapshot.files.is_empty());
    }

    #[tokio::test]
    async fn rate_limit_surfaces_retry_after() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/acme/web"))
            .respond_with(
                ResponseTemplate::new(429).insert_header("retry-after", "42"),
            )
            .mount(&server)
            .await;

        let repo = RepoId::parse("acme/web").unwrap();
        let err = fetcher_for(&server)
            .fetch(&repo, &CorrelationId::new())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            IngestError::RateLimited {
                retry_after: Some(42)
            }
        ));
    }
}
