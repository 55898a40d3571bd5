//! Command-resolution engine for a Gemini-style terminal CLI.
//!
//! Discovers command definitions across source formats (JSON/YAML data
//! files, markdown prose files, executable modules) and filesystem scopes
//! (builtin, project, personal), validates them against the command
//! contract, merges them into one registry with last-write-wins override
//! precedence, and keeps the namespace live as files change on disk.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use gemini_commands::{
//!     CommandContext, CommandLoader, CommandRegistry, CommandWatcher, LoaderConfig,
//! };
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! # #[tokio::main]
//! # async fn main() -> gemini_commands::Result<()> {
//! let config = LoaderConfig::discover(Some(Path::new(".")));
//! let loader = Arc::new(CommandLoader::new(config));
//! let registry = Arc::new(CommandRegistry::new());
//!
//! // Bring the namespace up, then keep it fresh
//! registry.replace(loader.load().await?);
//! let watcher = CommandWatcher::new(loader, registry.clone());
//! watcher.start()?;
//!
//! if let Some(command) = registry.get("build") {
//!     let outcome = command.invoke(&CommandContext::new(), "release")?;
//!     // hand the outcome to the dispatcher
//! }
//! # Ok(())
//! # }
//! ```

pub mod command;
pub mod error;
pub mod loader;
pub mod parser;
pub mod registry;
pub mod watcher;

// Re-export commonly used types
pub use command::{
    CommandAction, CommandContext, CommandKind, CommandMetadata, CommandOutcome, CommandRecord,
    CommandScope, CommandSpec, CompletionFn, MessageLevel, SourceFormat,
};
pub use error::{CommandError, Result};
pub use loader::{CommandLoader, LoaderConfig, ScopeDir, DEFAULT_DEBOUNCE};
pub use parser::module::{ModuleHost, ProcessModuleHost};
pub use registry::{CommandRegistry, RegistrySnapshot};
pub use watcher::CommandWatcher;

use std::path::{Path, PathBuf};

/// Version information for the engine
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Directory under a project root or home directory that holds command
/// definition files
pub const COMMANDS_DIR: &str = ".gemini/commands";

/// Project-scope command directory for the given project root
pub fn project_commands_dir(project_root: &Path) -> PathBuf {
    project_root.join(COMMANDS_DIR)
}

/// Personal-scope command directory under the user's home, if resolvable
pub fn personal_commands_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(COMMANDS_DIR))
}

/// Whether the host runs in development mode. Documentation-level gate for
/// watcher activation; the engine itself only ever watches on explicit
/// `start`.
pub fn dev_mode() -> bool {
    std::env::var("GEMINI_DEV")
        .map(|v| !v.is_empty() && v != "0" && v.to_lowercase() != "false")
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commands_dir_layout() {
        assert_eq!(
            project_commands_dir(Path::new("/repo")),
            PathBuf::from("/repo/.gemini/commands")
        );
    }

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
