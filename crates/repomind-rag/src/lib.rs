//! Repomind RAG crate
//!
//! Everything between retrieval and the caller: the context assembler
//! that builds a citation-bearing prompt, the streaming chat provider,
//! and the pipeline driver that walks the staged flow and emits typed
//! events for the SSE surface.

pub mod context;
pub mod error;
pub mod llm;
pub mod pipeline;

pub use context::{AssembledContext, Citation, ContextAssembler};
pub use error::{RagError, RagResult};
pub use llm::{AnthropicChat, ChatProvider, ChatRequest, MockChat};
pub use pipeline::{PipelineEvent, PipelineMeta, PipelineOutcome, PipelineStage, RagPipeline};
