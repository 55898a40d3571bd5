use std::path::PathBuf;
use thiserror::Error;

/// Comprehensive error type for the command-resolution engine
#[derive(Error, Debug)]
pub enum CommandError {
    #[error("Command discovery error: {0}")]
    Discovery(String),

    #[error("Syntax error in {path}: {message}")]
    Syntax { path: PathBuf, message: String },

    #[error("Parse error in {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Validation failed for '{name}': {}", .defects.join("; "))]
    Validation { name: String, defects: Vec<String> },

    #[error("Module load error in {path}: {message}")]
    ModuleLoad { path: PathBuf, message: String },

    #[error("Watcher error: {0}")]
    Watcher(String),

    #[error("Dispatch error: {0}")]
    Dispatch(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("File watcher error: {0}")]
    FileWatcher(#[from] notify::Error),

    #[error("Async task error: {0}")]
    AsyncTask(#[from] tokio::task::JoinError),
}

impl CommandError {
    /// Create a command discovery error
    pub fn discovery<S: Into<String>>(msg: S) -> Self {
        Self::Discovery(msg.into())
    }

    /// Create a syntax error for a definition file
    pub fn syntax<P: Into<PathBuf>, S: Into<String>>(path: P, msg: S) -> Self {
        Self::Syntax {
            path: path.into(),
            message: msg.into(),
        }
    }

    /// Create a parse error for a definition file
    pub fn parse<P: Into<PathBuf>, S: Into<String>>(path: P, msg: S) -> Self {
        Self::Parse {
            path: path.into(),
            message: msg.into(),
        }
    }

    /// Create a validation error carrying the full defect list
    pub fn validation<S: Into<String>>(name: S, defects: Vec<String>) -> Self {
        Self::Validation {
            name: name.into(),
            defects,
        }
    }

    /// Create a module load error
    pub fn module_load<P: Into<PathBuf>, S: Into<String>>(path: P, msg: S) -> Self {
        Self::ModuleLoad {
            path: path.into(),
            message: msg.into(),
        }
    }

    /// Create a dispatch error
    pub fn dispatch<S: Into<String>>(msg: S) -> Self {
        Self::Dispatch(msg.into())
    }

    /// Whether this error came from malformed file content rather than the host
    pub fn is_definition_error(&self) -> bool {
        matches!(
            self,
            Self::Syntax { .. }
                | Self::Parse { .. }
                | Self::Validation { .. }
                | Self::ModuleLoad { .. }
        )
    }
}

/// Convenient result type for the command-resolution engine
pub type Result<T> = std::result::Result<T, CommandError>;
