//! Definition parsers, one per source format
//!
//! Each parser turns one file's bytes into a candidate command record or a
//! parse failure. Parsers are independent and stateless; the loader routes
//! files to them by extension and isolates their failures per file.

pub mod data;
pub mod module;
pub mod prose;

use std::path::Path;

/// Parser family a file routes to, decided by extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Json,
    Yaml,
    Prose,
    Module,
}

/// Route a file to a parser by extension. `None` means the file is not a
/// loadable command and should be skipped.
pub fn classify(path: &Path, module_extensions: &[String]) -> Option<FileKind> {
    let ext = path.extension().and_then(|s| s.to_str())?;
    match ext {
        "json" => Some(FileKind::Json),
        "yaml" | "yml" => Some(FileKind::Yaml),
        "md" | "markdown" => Some(FileKind::Prose),
        other if module_extensions.iter().any(|m| m == other) => Some(FileKind::Module),
        _ => None,
    }
}
