//! Repomind ingestion crate
//!
//! Fetches a consistent snapshot of a public GitHub repository (default
//! branch resolved to a commit, tree enumerated against that commit) and
//! filters the result down to the text files worth chunking.

pub mod error;
pub mod fetcher;
pub mod filter;
pub mod types;

pub use error::{IngestError, IngestResult};
pub use fetcher::GithubFetcher;
pub use filter::partition;
pub use types::{FilterOutcome, RejectReason, RejectedFile, RepoFile, RepoSnapshot, SourceFile};
