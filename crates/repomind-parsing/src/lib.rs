//! Repomind parsing and chunking crate
//!
//! Splits accepted files into retrieval chunks: one chunk per top-level
//! symbol for languages with a registered extractor, overlapping
//! sliding windows for everything else.

pub mod chunk;
pub mod chunker;
pub mod error;
pub mod extractor;
pub mod languages;
pub mod window;

pub use chunk::{Chunk, ChunkSet, ChunkStrategy};
pub use chunker::Chunker;
pub use error::{ParsingError, ParsingResult};
pub use extractor::{SymbolExtractor, SymbolSpan, TreeSitterExtractor};
pub use languages::get_language_from_extension;
