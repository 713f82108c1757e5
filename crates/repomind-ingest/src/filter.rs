//! Pre-chunking file filter
//!
//! Pure and side-effect free: every input file is classified exactly once
//! as accepted or rejected with an enumerated reason. Classification
//! order is fixed (ignored path, extension, size, binary, empty) so the
//! reported reason is deterministic.

use crate::types::{FilterOutcome, RejectReason, RejectedFile, RepoFile, SourceFile};

/// Path segments that disqualify a file wherever they appear
const IGNORED_SEGMENTS: &[&str] = &[
    "node_modules",
    ".git",
    "dist",
    "build",
    ".next",
    "__pycache__",
    "vendor",
    "coverage",
    "target",
    "bin",
    "obj",
    "out",
    ".venv",
    "venv",
    ".idea",
    ".vscode",
    ".cache",
];

/// Generated lockfiles carry no meaning worth embedding
const IGNORED_FILENAMES: &[&str] = &[
    "package-lock.json",
    "yarn.lock",
    "pnpm-lock.yaml",
    "Cargo.lock",
    "poetry.lock",
    "Pipfile.lock",
    "composer.lock",
    "Gemfile.lock",
    "go.sum",
];

/// Extensions we are willing to chunk and embed
const ALLOWED_EXTENSIONS: &[&str] = &[
    // code
    "rs", "py", "pyi", "js", "jsx", "mjs", "cjs", "ts", "tsx", "mts", "cts", "go", "java", "c",
    "h", "cc", "cpp", "cxx", "hpp", "hh", "rb", "php", "kt", "swift", "scala", "cs", "sh", "bash",
    "zsh", "sql", "vue", "svelte", "graphql", "proto",
    // prose and markup
    "md", "markdown", "txt", "rst", "html", "htm", "css", "scss",
    // config
    "json", "yaml", "yml", "toml", "xml", "ini", "cfg", "env",
];

/// Filenames without an extension that are still worth keeping
const ALLOWED_FILENAMES: &[&str] = &["Dockerfile", "Makefile", "Justfile"];

/// Hard cap on file size: 500 KiB
const MAX_FILE_BYTES: u64 = 500 * 1024;

/// Split the input into accepted source files and rejected files
///
/// Invariant: `accepted.len() + rejected.len() == input.len()`.
pub fn partition(files: Vec<RepoFile>) -> FilterOutcome {
    let mut accepted = Vec::new();
    let mut rejected = Vec::new();

    for file in files {
        match classify(file) {
            Ok(source) => accepted.push(source),
            Err(rejection) => rejected.push(rejection),
        }
    }

    FilterOutcome { accepted, rejected }
}

fn classify(file: RepoFile) -> Result<SourceFile, RejectedFile> {
    let reject = |reason| {
        Err(RejectedFile {
            path: file.path.clone(),
            reason,
        })
    };

    if has_ignored_segment(&file.path) || has_ignored_filename(&file.path) {
        return reject(RejectReason::IgnoredPath);
    }
    if !has_allowed_extension(&file.path) {
        return reject(RejectReason::ExtensionNotAllowed);
    }
    if file.size_bytes > MAX_FILE_BYTES || file.bytes.len() as u64 > MAX_FILE_BYTES {
        return reject(RejectReason::TooLarge);
    }
    if file.bytes.contains(&0) {
        return reject(RejectReason::Binary);
    }
    let Ok(content) = String::from_utf8(file.bytes.clone()) else {
        return reject(RejectReason::Binary);
    };
    if content.trim().is_empty() {
        return reject(RejectReason::Empty);
    }

    Ok(SourceFile {
        path: file.path,
        size_bytes: file.size_bytes,
        content,
    })
}

fn has_ignored_segment(path: &str) -> bool {
    path.split('/').any(|segment| IGNORED_SEGMENTS.contains(&segment))
}

fn has_ignored_filename(path: &str) -> bool {
    let filename = path.rsplit('/').next().unwrap_or(path);
    IGNORED_FILENAMES.contains(&filename)
}

fn has_allowed_extension(path: &str) -> bool {
    let filename = path.rsplit('/').next().unwrap_or(path);
    if ALLOWED_FILENAMES.contains(&filename) {
        return true;
    }
    match filename.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => {
            ALLOWED_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str())
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(path: &str, content: &[u8]) -> RepoFile {
        RepoFile {
            path: path.to_string(),
            size_bytes: content.len() as u64,
            bytes: content.to_vec(),
        }
    }

    #[test]
    fn classifies_each_input_exactly_once() {
        let input = vec![
            file("node_modules/x/index.js", b"module.exports = 1;"),
            file("package-lock.json", b"{}"),
            file("src/index.ts", b"export const x = 1;"),
            file("dist/bundle.js", b"!function(){}();"),
        ];
        let total = input.len();
        let outcome = partition(input);

        assert_eq!(outcome.accepted.len() + outcome.rejected.len(), total);
        assert_eq!(outcome.accepted.len(), 1);
        assert_eq!(outcome.accepted[0].path, "src/index.ts");

        let reasons: Vec<_> = outcome.rejected.iter().map(|r| r.reason).collect();
        assert_eq!(
            reasons
                .iter()
                .filter(|r| **r == RejectReason::IgnoredPath)
                .count(),
            3,
            "node_modules, dist, and the lockfile are all path-ignored"
        );
    }

    #[test]
    fn size_boundary_is_inclusive_at_500_kib() {
        let at_limit = RepoFile {
            path: "src/big.rs".to_string(),
            size_bytes: 500 * 1024,
            bytes: vec![b'x'; 500 * 1024],
        };
        let over_limit = RepoFile {
            path: "src/bigger.rs".to_string(),
            size_bytes: 500 * 1024 + 1,
            bytes: vec![b'x'; 500 * 1024 + 1],
        };

        let outcome = partition(vec![at_limit, over_limit]);
        assert_eq!(outcome.accepted.len(), 1);
        assert_eq!(outcome.accepted[0].path, "src/big.rs");
        assert_eq!(outcome.rejected[0].reason, RejectReason::TooLarge);
    }

    #[test]
    fn oversize_file_is_rejected_as_too_large() {
        let outcome = partition(vec![RepoFile {
            path: "assets/data.json".to_string(),
            size_bytes: 600 * 1024,
            bytes: vec![b'{'; 600 * 1024],
        }]);
        assert!(outcome.accepted.is_empty());
        assert_eq!(outcome.rejected[0].reason, RejectReason::TooLarge);
    }

    #[test]
    fn binary_and_empty_files_are_rejected() {
        let outcome = partition(vec![
            file("src/blob.rs", b"fn main\x00() {}"),
            file("src/invalid.rs", &[0xff, 0xfe, 0x41]),
            file("src/blank.rs", b"   \n\t\n"),
        ]);
        let reasons: Vec<_> = outcome.rejected.iter().map(|r| r.reason).collect();
        assert_eq!(
            reasons,
            vec![RejectReason::Binary, RejectReason::Binary, RejectReason::Empty]
        );
    }

    #[test]
    fn unknown_extensions_are_rejected_but_known_filenames_pass() {
        let outcome = partition(vec![
            file("firmware.bin2", b"whatever"),
            file("Dockerfile", b"FROM rust:1.85"),
            file("archive.tar", b"data"),
        ]);
        assert_eq!(outcome.accepted.len(), 1);
        assert_eq!(outcome.accepted[0].path, "Dockerfile");
        assert!(
            outcome
                .rejected
                .iter()
                .all(|r| r.reason == RejectReason::ExtensionNotAllowed)
        );
    }

    #[test]
    fn ignored_segment_wins_over_other_rules() {
        // Binary content inside node_modules: reported as ignored-path,
        // classification order is fixed
        let outcome = partition(vec![file("node_modules/a.wasm", &[0x00, 0x61])]);
        assert_eq!(outcome.rejected[0].reason, RejectReason::IgnoredPath);
    }
}
