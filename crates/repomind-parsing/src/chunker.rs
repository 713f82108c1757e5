//! File-to-chunk decomposition
//!
//! Symbol-aware when the language has a registered extractor and at
//! least one top-level symbol, sliding-window otherwise. Symbol chunks
//! carry their leading doc comment when contiguous; the lines between
//! symbols (imports, constants) become unlabelled filler chunks so the
//! whole file stays retrievable.

use std::sync::Arc;

use repomind_config::ChunkingConfig;
use uuid::Uuid;

use crate::chunk::{Chunk, ChunkSet, ChunkStrategy};
use crate::error::ParsingResult;
use crate::extractor::{SymbolExtractor, SymbolSpan, TreeSitterExtractor};
use crate::languages::{language_for_path, registry_config};
use crate::window::sliding_windows;

/// A planned chunk before content materialization (1-based inclusive)
struct PlannedRange {
    start: usize,
    end: usize,
    symbol_name: Option<String>,
}

/// Splits file content into retrieval chunks
pub struct Chunker {
    config: ChunkingConfig,
    extractor: Arc<dyn SymbolExtractor>,
}

impl Chunker {
    /// Chunker with the default Tree-sitter extractor
    pub fn new(config: ChunkingConfig) -> Self {
        Self {
            config,
            extractor: Arc::new(TreeSitterExtractor::new()),
        }
    }

    /// Chunker with a custom extractor (tests)
    pub fn with_extractor(config: ChunkingConfig, extractor: Arc<dyn SymbolExtractor>) -> Self {
        Self { config, extractor }
    }

    /// Decompose one file into chunks
    ///
    /// # Errors
    ///
    /// Returns an error only when a registered grammar fails to load;
    /// unparseable content falls back to sliding windows instead.
    pub fn chunk_file(&self, repo_id: &str, path: &str, content: &str) -> ParsingResult<ChunkSet> {
        let lines: Vec<&str> = content.lines().collect();
        if lines.is_empty() {
            return Ok(ChunkSet::empty(ChunkStrategy::SlidingWindow));
        }

        let language = language_for_path(path);

        let mut strategy = ChunkStrategy::SlidingWindow;
        let mut planned: Vec<PlannedRange> = Vec::new();

        if let Some(lang) = language
            && self.extractor.supports(lang)
        {
            let spans = self.extractor.extract(lang, content)?;
            if !spans.is_empty() {
                strategy = ChunkStrategy::Ast;
                planned = plan_symbol_ranges(&spans, &lines, lang);
            }
        }

        if planned.is_empty() {
            strategy = ChunkStrategy::SlidingWindow;
            planned = sliding_windows(lines.len(), &self.config)
                .into_iter()
                .map(|(start, end)| PlannedRange {
                    start,
                    end,
                    symbol_name: None,
                })
                .collect();
        }

        let chunks = self.materialize(repo_id, path, language, &lines, planned);
        Ok(ChunkSet { chunks, strategy })
    }

    /// Turn planned ranges into chunks, enforcing the char cap
    fn materialize(
        &self,
        repo_id: &str,
        path: &str,
        language: Option<&str>,
        lines: &[&str],
        planned: Vec<PlannedRange>,
    ) -> Vec<Chunk> {
        let mut chunks = Vec::new();
        for range in planned {
            let mut symbol_name = range.symbol_name;
            for (start, end, content) in self.split_to_budget(lines, range.start, range.end) {
                chunks.push(Chunk {
                    id: Uuid::new_v4(),
                    repo_id: repo_id.to_string(),
                    file_path: path.to_string(),
                    language: language.map(str::to_string),
                    // Only the first piece of an oversized chunk keeps the name
                    symbol_name: symbol_name.take(),
                    start_line: start,
                    end_line: end,
                    content,
                    chunk_index: chunks.len(),
                    embedding: None,
                });
            }
        }
        chunks
    }

    /// Split one line range into pieces within `max_chunk_chars`,
    /// breaking at line boundaries (or inside a single oversized line)
    fn split_to_budget(
        &self,
        lines: &[&str],
        start: usize,
        end: usize,
    ) -> Vec<(usize, usize, String)> {
        let max_chars = self.config.max_chunk_chars;
        let mut pieces = Vec::new();

        let mut piece_start = start;
        let mut buffer = String::new();
        // Tracks lines (blank ones included) appended to the buffer;
        // an empty buffer alone cannot tell "no lines" from "one blank line"
        let mut lines_in_piece = 0usize;
        for line_no in start..=end {
            let line = lines.get(line_no - 1).copied().unwrap_or_default();

            if line.len() > max_chars {
                // A single line blows the budget: flush, then hard-split it
                if lines_in_piece > 0 {
                    pieces.push((piece_start, line_no - 1, std::mem::take(&mut buffer)));
                    lines_in_piece = 0;
                }
                for fragment in split_oversized_line(line, max_chars) {
                    pieces.push((line_no, line_no, fragment));
                }
                piece_start = line_no + 1;
                continue;
            }

            let needed = if lines_in_piece == 0 {
                line.len()
            } else {
                buffer.len() + 1 + line.len()
            };
            if needed > max_chars && lines_in_piece > 0 {
                pieces.push((piece_start, line_no - 1, std::mem::take(&mut buffer)));
                lines_in_piece = 0;
                piece_start = line_no;
            }
            if lines_in_piece > 0 {
                buffer.push('\n');
            }
            buffer.push_str(line);
            lines_in_piece += 1;
        }

        if lines_in_piece > 0 || pieces.is_empty() {
            pieces.push((piece_start, end, buffer));
        }
        pieces
    }
}

/// Symbol spans -> chunk plan: doc comments attached, gaps filled
fn plan_symbol_ranges(spans: &[SymbolSpan], lines: &[&str], language: &str) -> Vec<PlannedRange> {
    let doc_prefixes = registry_config(language).map_or(&[][..], |c| c.doc_prefixes);
    let total = lines.len();

    let mut symbol_ranges: Vec<PlannedRange> = Vec::with_capacity(spans.len());
    for span in spans {
        let floor = symbol_ranges.last().map_or(0, |prev: &PlannedRange| prev.end);
        let start = attach_leading_docs(lines, span.start_line, floor, doc_prefixes);
        let end = span.end_line.min(total);
        if start > end || end <= floor {
            continue; // nested or degenerate span; outer symbol already covers it
        }
        symbol_ranges.push(PlannedRange {
            start: start.max(floor + 1),
            end,
            symbol_name: span.name.clone(),
        });
    }

    // Fill the non-blank lines between and around symbols
    let mut planned: Vec<PlannedRange> = Vec::new();
    let mut cursor = 1usize;
    for symbol in symbol_ranges {
        if symbol.start > cursor
            && let Some(filler) = filler_range(lines, cursor, symbol.start - 1)
        {
            planned.push(filler);
        }
        cursor = symbol.end + 1;
        planned.push(symbol);
    }
    if cursor <= total
        && let Some(filler) = filler_range(lines, cursor, total)
    {
        planned.push(filler);
    }

    planned
}

/// Walk upward from a symbol over its contiguous doc-comment block
fn attach_leading_docs(
    lines: &[&str],
    symbol_start: usize,
    floor: usize,
    doc_prefixes: &[&str],
) -> usize {
    let mut start = symbol_start;
    while start > floor + 1 {
        let Some(above) = lines.get(start - 2) else { break };
        let trimmed = above.trim_start();
        if trimmed.is_empty() || !doc_prefixes.iter().any(|p| trimmed.starts_with(p)) {
            break;
        }
        start -= 1;
    }
    start
}

/// Trim a gap to its first and last non-blank lines; None when all blank
fn filler_range(lines: &[&str], start: usize, end: usize) -> Option<PlannedRange> {
    let non_blank = |line_no: &usize| {
        lines
            .get(line_no - 1)
            .is_some_and(|l| !l.trim().is_empty())
    };
    let first = (start..=end).find(non_blank)?;
    let last = (start..=end).rev().find(non_blank)?;
    Some(PlannedRange {
        start: first,
        end: last,
        symbol_name: None,
    })
}

/// Hard split of a single line that exceeds the chunk budget
fn split_oversized_line(line: &str, max_chars: usize) -> Vec<String> {
    let mut fragments = Vec::new();
    let mut current = String::with_capacity(max_chars);
    for ch in line.chars() {
        if current.len() + ch.len_utf8() > max_chars {
            fragments.push(std::mem::take(&mut current));
        }
        current.push(ch);
    }
    if !current.is_empty() {
        fragments.push(current);
    }
    fragments
}
