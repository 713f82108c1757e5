//! The chunk: repomind's unit of retrieval

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// How a file was decomposed into chunks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChunkStrategy {
    /// One chunk per top-level symbol, plus unlabelled filler for the
    /// lines between symbols
    Ast,
    /// Overlapping fixed-height windows
    SlidingWindow,
}

impl ChunkStrategy {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ast => "ast",
            Self::SlidingWindow => "sliding-window",
        }
    }
}

impl std::fmt::Display for ChunkStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A contiguous span of one file with enough metadata to cite it
///
/// Invariants: `start_line <= end_line` (1-based, inclusive); `content`
/// matches that line range of the file at the captured commit;
/// `chunk_index` is monotone within (`repo_id`, `file_path`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub id: Uuid,
    pub repo_id: String,
    pub file_path: String,
    pub language: Option<String>,
    /// Set only for symbol-aware chunks (and only on the first piece
    /// when an oversized chunk is split)
    pub symbol_name: Option<String>,
    pub start_line: usize,
    pub end_line: usize,
    pub content: String,
    pub chunk_index: usize,
    /// Present once the embedder has run; never persisted standalone
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
}

impl Chunk {
    /// Number of lines this chunk spans
    pub const fn line_count(&self) -> usize {
        self.end_line - self.start_line + 1
    }
}

/// The chunker's output for one file
#[derive(Debug, Clone)]
pub struct ChunkSet {
    pub chunks: Vec<Chunk>,
    pub strategy: ChunkStrategy,
}

impl ChunkSet {
    pub const fn empty(strategy: ChunkStrategy) -> Self {
        Self {
            chunks: Vec::new(),
            strategy,
        }
    }
}
