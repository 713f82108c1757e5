//! Symbol extraction capability
//!
//! A [`SymbolExtractor`] turns file content into a list of top-level
//! symbol spans. The default implementation walks the Tree-sitter parse
//! tree for languages registered in [`crate::languages`]; anything it
//! cannot handle falls back to sliding-window chunking upstream.

use tree_sitter::{Node, Parser};

use crate::error::{ParsingError, ParsingResult};
use crate::languages::{LanguageConfig, registry_config};

/// One top-level symbol found in a file (lines are 1-based, inclusive)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolSpan {
    pub name: Option<String>,
    pub start_line: usize,
    pub end_line: usize,
}

/// Capability for finding top-level symbols in a file
pub trait SymbolExtractor: Send + Sync {
    /// Whether this extractor can handle the given language id
    fn supports(&self, language: &str) -> bool;

    /// Extract top-level symbol spans, ordered by start line
    ///
    /// An empty result means the caller should fall back to sliding
    /// windows; it is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error only when the grammar itself cannot be loaded.
    fn extract(&self, language: &str, content: &str) -> ParsingResult<Vec<SymbolSpan>>;
}

/// Tree-sitter backed extractor over the language registry
#[derive(Debug, Default, Clone, Copy)]
pub struct TreeSitterExtractor;

impl TreeSitterExtractor {
    pub const fn new() -> Self {
        Self
    }

    fn extract_with_config(
        config: &LanguageConfig,
        content: &str,
    ) -> ParsingResult<Vec<SymbolSpan>> {
        let mut parser = Parser::new();
        parser
            .set_language(&config.grammar)
            .map_err(|e| ParsingError::Grammar {
                language: config.id.to_string(),
                reason: e.to_string(),
            })?;

        let Some(tree) = parser.parse(content, None) else {
            // Parser gave up (timeout or cancellation); treat as no symbols
            return Ok(Vec::new());
        };

        let source = content.as_bytes();
        let root = tree.root_node();
        let mut spans = Vec::new();
        let mut cursor = root.walk();

        for child in root.named_children(&mut cursor) {
            let kind = child.kind();
            if config.symbol_kinds.contains(&kind) {
                spans.push(Self::span_for(child, child, source));
            } else if config.wrapper_kinds.contains(&kind) {
                // export statement / decorated definition: span of the
                // wrapper, name from the wrapped declaration
                if let Some(inner) = Self::wrapped_symbol(child, config) {
                    spans.push(Self::span_for(child, inner, source));
                }
            }
        }

        spans.sort_by_key(|s| s.start_line);
        Ok(spans)
    }

    fn wrapped_symbol<'tree>(
        wrapper: Node<'tree>,
        config: &LanguageConfig,
    ) -> Option<Node<'tree>> {
        let mut cursor = wrapper.walk();
        let found = wrapper
            .named_children(&mut cursor)
            .find(|inner| config.symbol_kinds.contains(&inner.kind()));
        found
    }

    fn span_for(outer: Node<'_>, named: Node<'_>, source: &[u8]) -> SymbolSpan {
        SymbolSpan {
            name: node_name(named, source),
            start_line: outer.start_position().row.saturating_add(1),
            end_line: outer.end_position().row.saturating_add(1),
        }
    }
}

impl SymbolExtractor for TreeSitterExtractor {
    fn supports(&self, language: &str) -> bool {
        registry_config(language).is_some()
    }

    fn extract(&self, language: &str, content: &str) -> ParsingResult<Vec<SymbolSpan>> {
        match registry_config(language) {
            Some(config) => Self::extract_with_config(config, content),
            None => Ok(Vec::new()),
        }
    }
}

/// Best-effort symbol name: `name` field, then Rust impl target type,
/// then the C-family declarator chain
fn node_name(node: Node<'_>, source: &[u8]) -> Option<String> {
    if let Some(name) = node.child_by_field_name("name") {
        return text_of(name, source);
    }
    if let Some(ty) = node.child_by_field_name("type") {
        return text_of(ty, source);
    }
    if let Some(declarator) = node.child_by_field_name("declarator") {
        return declarator_identifier(declarator, source);
    }
    None
}

fn declarator_identifier(node: Node<'_>, source: &[u8]) -> Option<String> {
    if matches!(node.kind(), "identifier" | "field_identifier") {
        return text_of(node, source);
    }
    if let Some(inner) = node.child_by_field_name("declarator") {
        return declarator_identifier(inner, source);
    }
    None
}

fn text_of(node: Node<'_>, source: &[u8]) -> Option<String> {
    node.utf8_text(source).ok().map(str::to_string)
}
