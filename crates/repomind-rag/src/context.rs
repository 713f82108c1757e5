//! Context assembler
//!
//! Turns ranked chunks into a grounded prompt pair: a system prompt that
//! scopes the model to the injected code and a user prompt carrying the
//! question plus citation-labelled chunk bodies. The character budget is
//! enforced tail-first, and the citation map shrinks in lockstep so no
//! dangling key can appear in the answer.

use repomind_search::RetrievedChunk;
use serde::Serialize;

/// One entry of the citation map: "[N]" resolves to a file location
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Citation {
    /// Short key as it appears in the answer, e.g. "[1]"
    pub key: String,
    pub file_path: String,
    pub start_line: usize,
    pub end_line: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbol_name: Option<String>,
}

/// Prompt pair plus the citation map that grounds it
#[derive(Debug, Clone)]
pub struct AssembledContext {
    pub system_prompt: String,
    pub user_prompt: String,
    /// Injective: one key per injected chunk, in injection order
    pub citations: Vec<Citation>,
    /// Rough size of both prompts at ~4 chars per token
    pub token_estimate: usize,
}

impl AssembledContext {
    /// Whether any code context made it into the prompt
    pub fn has_context(&self) -> bool {
        !self.citations.is_empty()
    }
}

/// Builds grounded prompts under a character budget
pub struct ContextAssembler {
    char_budget: usize,
}

impl ContextAssembler {
    pub const fn new(char_budget: usize) -> Self {
        Self { char_budget }
    }

    /// Assemble the prompt pair for one question
    pub fn assemble(
        &self,
        query: &str,
        chunks: &[RetrievedChunk],
        repo_id: &str,
    ) -> AssembledContext {
        let system_prompt = format!(
            "You are a code assistant answering questions about the repository {repo_id}. \
             Answer ONLY from the code excerpts provided in the user message. \
             Never invent file paths, line numbers, or code that is not shown. \
             Every factual claim about the code must reference one of the provided \
             citation keys ([1], [2], ...). If the excerpts do not contain the answer, \
             say so explicitly."
        );

        let mut citations = Vec::new();
        let mut body = String::new();
        let preamble = format!("Question: {query}\n\nCode excerpts from {repo_id}:\n\n");

        for (position, retrieved) in chunks.iter().enumerate() {
            let chunk = &retrieved.chunk;
            let key = format!("[{}]", position + 1);
            let symbol_suffix = chunk
                .symbol_name
                .as_deref()
                .map(|s| format!(" · {s}"))
                .unwrap_or_default();
            let block = format!(
                "{key} {} Lines {}–{}{symbol_suffix}\n{}\n\n",
                chunk.file_path, chunk.start_line, chunk.end_line, chunk.content
            );

            // Tail-first budget: once a block does not fit, it and
            // everything after it is dropped, citations included
            if preamble.len() + body.len() + block.len() > self.char_budget {
                break;
            }

            body.push_str(&block);
            citations.push(Citation {
                key,
                file_path: chunk.file_path.clone(),
                start_line: chunk.start_line,
                end_line: chunk.end_line,
                symbol_name: chunk.symbol_name.clone(),
            });
        }

        let user_prompt = if citations.is_empty() {
            format!(
                "Question: {query}\n\nNo code context was available for this question. \
                 State that the repository index produced no relevant excerpts and do \
                 not attempt an answer from memory."
            )
        } else {
            format!("{preamble}{body}")
        };

        let token_estimate = (system_prompt.len() + user_prompt.len()).div_ceil(4);

        AssembledContext {
            system_prompt,
            user_prompt,
            citations,
            token_estimate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use repomind_parsing::Chunk;
    use uuid::Uuid;

    fn retrieved(path: &str, index: usize, content: &str) -> RetrievedChunk {
        RetrievedChunk {
            chunk: Chunk {
                id: Uuid::new_v4(),
                repo_id: "acme/web".to_string(),
                file_path: path.to_string(),
                language: Some("rust".to_string()),
                symbol_name: (index == 0).then(|| "handler".to_string()),
                start_line: index * 10 + 1,
                end_line: index * 10 + 9,
                content: content.to_string(),
                chunk_index: index,
                embedding: None,
            },
            vector_score: 0.9,
            proximity_boost: 0.0,
            score: 0.9,
        }
    }

    #[test]
    fn citation_keys_are_sequential_and_injective() {
        let chunks = vec![
            retrieved("src/a.rs", 0, "fn a() {}"),
            retrieved("src/b.rs", 1, "fn b() {}"),
            retrieved("src/c.rs", 2, "fn c() {}"),
        ];
        let assembled = ContextAssembler::new(24_000).assemble("what is a?", &chunks, "acme/web");

        let keys: Vec<&str> = assembled.citations.iter().map(|c| c.key.as_str()).collect();
        assert_eq!(keys, vec!["[1]", "[2]", "[3]"]);

        // Every key appears exactly once in the user prompt
        for citation in &assembled.citations {
            assert_eq!(assembled.user_prompt.matches(&citation.key).count(), 1);
        }
    }

    #[test]
    fn chunk_header_carries_path_lines_and_symbol() {
        let chunks = vec![retrieved("src/auth.rs", 0, "fn handler() {}")];
        let assembled = ContextAssembler::new(24_000).assemble("q", &chunks, "acme/web");

        assert!(assembled.user_prompt.contains("[1] src/auth.rs Lines 1–9 · handler"));
        assert!(assembled.system_prompt.contains("Never invent file paths"));
        assert!(assembled.token_estimate > 0);
    }

    #[test]
    fn budget_drops_tail_chunks_and_their_citations_together() {
        let chunks: Vec<RetrievedChunk> = (0..10)
            .map(|i| retrieved(&format!("src/f{i}.rs"), i, &"x".repeat(400)))
            .collect();
        // Budget that fits roughly three blocks
        let assembled = ContextAssembler::new(1_500).assemble("q", &chunks, "acme/web");

        assert!(assembled.citations.len() < 10);
        assert!(!assembled.citations.is_empty());
        assert!(assembled.user_prompt.len() <= 1_500);

        // No dangling keys: the last kept citation is also the last key
        // mentioned in the prompt
        let last_key = &assembled.citations.last().unwrap().key;
        assert!(assembled.user_prompt.contains(last_key.as_str()));
        let dropped_key = format!("[{}]", assembled.citations.len() + 1);
        assert!(!assembled.user_prompt.contains(&dropped_key));
    }

    #[test]
    fn zero_chunks_yield_a_well_formed_no_context_prompt() {
        let assembled = ContextAssembler::new(24_000).assemble("what?", &[], "acme/web");
        assert!(!assembled.has_context());
        assert!(assembled.user_prompt.contains("No code context was available"));
        assert!(assembled.citations.is_empty());
    }
}
