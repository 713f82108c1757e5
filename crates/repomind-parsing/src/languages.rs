//! Language-specific configurations for symbol extraction
//!
//! Centralizes the Tree-sitter grammar, the node kinds that count as
//! top-level symbols, and the doc-comment prefixes for each supported
//! language. Languages without an entry here fall back to sliding-window
//! chunking but may still get a language label for grounding headers.

use lazy_static::lazy_static;
use std::collections::HashMap;
use tree_sitter::Language;

/// Configuration for a symbol-extractable language
#[derive(Clone)]
pub struct LanguageConfig {
    /// The language identifier (e.g., "rust", "python")
    pub id: &'static str,
    /// File extensions associated with this language
    pub extensions: &'static [&'static str],
    /// Tree-sitter grammar
    pub grammar: Language,
    /// Node kinds treated as one symbol chunk each
    pub symbol_kinds: &'static [&'static str],
    /// Node kinds that wrap a symbol one level down (export statements,
    /// decorated definitions); the wrapper's span is used, the inner
    /// node supplies the name
    pub wrapper_kinds: &'static [&'static str],
    /// Line prefixes recognized as doc comments when attaching the
    /// leading comment block to a symbol
    pub doc_prefixes: &'static [&'static str],
}

impl LanguageConfig {
    fn new(id: &'static str, grammar: Language) -> Self {
        Self {
            id,
            extensions: &[],
            grammar,
            symbol_kinds: &[],
            wrapper_kinds: &[],
            doc_prefixes: &[],
        }
    }

    fn with_extensions(mut self, extensions: &'static [&'static str]) -> Self {
        self.extensions = extensions;
        self
    }

    fn with_symbol_kinds(mut self, kinds: &'static [&'static str]) -> Self {
        self.symbol_kinds = kinds;
        self
    }

    fn with_wrapper_kinds(mut self, kinds: &'static [&'static str]) -> Self {
        self.wrapper_kinds = kinds;
        self
    }

    fn with_doc_prefixes(mut self, prefixes: &'static [&'static str]) -> Self {
        self.doc_prefixes = prefixes;
        self
    }
}

lazy_static! {
    /// Registry of all symbol-extractable language configurations
    pub static ref LANGUAGE_REGISTRY: HashMap<&'static str, LanguageConfig> = {
        let mut registry = HashMap::new();

        registry.insert(
            "rust",
            LanguageConfig::new("rust", tree_sitter_rust::LANGUAGE.into())
                .with_extensions(&["rs"])
                .with_symbol_kinds(&[
                    "function_item",
                    "struct_item",
                    "enum_item",
                    "trait_item",
                    "impl_item",
                    "mod_item",
                    "macro_definition",
                ])
                .with_doc_prefixes(&["///", "//!", "#["]),
        );

        registry.insert(
            "python",
            LanguageConfig::new("python", tree_sitter_python::LANGUAGE.into())
                .with_extensions(&["py", "pyi"])
                .with_symbol_kinds(&["function_definition", "class_definition"])
                .with_wrapper_kinds(&["decorated_definition"])
                .with_doc_prefixes(&["#"]),
        );

        registry.insert(
            "javascript",
            LanguageConfig::new("javascript", tree_sitter_javascript::LANGUAGE.into())
                .with_extensions(&["js", "jsx", "mjs", "cjs"])
                .with_symbol_kinds(&[
                    "function_declaration",
                    "generator_function_declaration",
                    "class_declaration",
                ])
                .with_wrapper_kinds(&["export_statement"])
                .with_doc_prefixes(&["//", "/*", "*", "*/"]),
        );

        registry.insert(
            "typescript",
            LanguageConfig::new(
                "typescript",
                tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
            )
            .with_extensions(&["ts", "mts", "cts"])
            .with_symbol_kinds(&[
                "function_declaration",
                "generator_function_declaration",
                "class_declaration",
                "interface_declaration",
                "type_alias_declaration",
                "enum_declaration",
            ])
            .with_wrapper_kinds(&["export_statement"])
            .with_doc_prefixes(&["//", "/*", "*", "*/"]),
        );

        registry.insert(
            "tsx",
            LanguageConfig::new("tsx", tree_sitter_typescript::LANGUAGE_TSX.into())
                .with_extensions(&["tsx"])
                .with_symbol_kinds(&[
                    "function_declaration",
                    "class_declaration",
                    "interface_declaration",
                    "type_alias_declaration",
                ])
                .with_wrapper_kinds(&["export_statement"])
                .with_doc_prefixes(&["//", "/*", "*", "*/"]),
        );

        registry.insert(
            "go",
            LanguageConfig::new("go", tree_sitter_go::LANGUAGE.into())
                .with_extensions(&["go"])
                .with_symbol_kinds(&[
                    "function_declaration",
                    "method_declaration",
                    "type_declaration",
                ])
                .with_doc_prefixes(&["//"]),
        );

        registry.insert(
            "java",
            LanguageConfig::new("java", tree_sitter_java::LANGUAGE.into())
                .with_extensions(&["java"])
                .with_symbol_kinds(&[
                    "class_declaration",
                    "interface_declaration",
                    "enum_declaration",
                    "record_declaration",
                ])
                .with_doc_prefixes(&["/**", "*", "*/", "//"]),
        );

        registry.insert(
            "c",
            LanguageConfig::new("c", tree_sitter_c::LANGUAGE.into())
                .with_extensions(&["c", "h"])
                .with_symbol_kinds(&["function_definition"])
                .with_doc_prefixes(&["//", "/*", "*", "*/"]),
        );

        registry.insert(
            "cpp",
            LanguageConfig::new("cpp", tree_sitter_cpp::LANGUAGE.into())
                .with_extensions(&["cc", "cpp", "cxx", "hpp", "hh"])
                .with_symbol_kinds(&["function_definition"])
                .with_doc_prefixes(&["//", "/*", "*", "*/"]),
        );

        registry
    };

    /// Extension -> language id, covering both extractable languages and
    /// label-only ones (prose, markup, config)
    static ref EXTENSION_LABELS: HashMap<&'static str, &'static str> = {
        let mut labels: HashMap<&'static str, &'static str> = HashMap::new();
        for config in LANGUAGE_REGISTRY.values() {
            for ext in config.extensions {
                labels.insert(*ext, config.id);
            }
        }
        // Label-only languages; these always chunk by sliding window
        for (ext, id) in [
            ("md", "markdown"),
            ("markdown", "markdown"),
            ("txt", "text"),
            ("rst", "restructuredtext"),
            ("json", "json"),
            ("yaml", "yaml"),
            ("yml", "yaml"),
            ("toml", "toml"),
            ("xml", "xml"),
            ("html", "html"),
            ("htm", "html"),
            ("css", "css"),
            ("scss", "scss"),
            ("sh", "shell"),
            ("bash", "shell"),
            ("zsh", "shell"),
            ("sql", "sql"),
            ("rb", "ruby"),
            ("php", "php"),
            ("kt", "kotlin"),
            ("swift", "swift"),
            ("scala", "scala"),
            ("vue", "vue"),
            ("svelte", "svelte"),
            ("graphql", "graphql"),
            ("proto", "protobuf"),
            ("dockerfile", "dockerfile"),
            ("env", "dotenv"),
            ("ini", "ini"),
            ("cfg", "ini"),
            ("lock", "lockfile"),
        ] {
            labels.insert(ext, id);
        }
        labels
    };
}

/// Resolve a language id from a file extension (lowercased by the caller)
pub fn get_language_from_extension(ext: &str) -> Option<&'static str> {
    EXTENSION_LABELS.get(ext).copied()
}

/// Resolve the language label for a path, if any
pub fn language_for_path(path: &str) -> Option<&'static str> {
    let ext = path.rsplit('.').next()?;
    get_language_from_extension(&ext.to_ascii_lowercase())
}

/// Look up the extractable-language config for a language id
pub fn registry_config(language: &str) -> Option<&'static LanguageConfig> {
    LANGUAGE_REGISTRY.get(language)
}
