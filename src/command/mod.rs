//! Command records and the invocation surface
//!
//! This module defines:
//! - The validated, in-memory representation of one command (`CommandRecord`)
//! - The declarative file schema shared by data files and module manifests (`CommandSpec`)
//! - The four tagged dispatch outcomes consumed by the host (`CommandOutcome`)
//! - Leaf vs parent dispatch for records with sub-commands

pub mod validation;

use crate::error::{CommandError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Provenance tier of a command definition, governing override precedence.
///
/// Later scopes win name collisions: personal overrides project overrides
/// builtin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandScope {
    Builtin,
    Project,
    Personal,
}

impl CommandScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommandScope::Builtin => "builtin",
            CommandScope::Project => "project",
            CommandScope::Personal => "personal",
        }
    }
}

impl fmt::Display for CommandScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Source format a command definition was loaded from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceFormat {
    /// Registered in code by the host, not loaded from disk
    Builtin,
    /// Structured data file (JSON or YAML)
    Data,
    /// Markdown prose file
    Prose,
    /// Executable module
    Module,
}

impl SourceFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceFormat::Builtin => "builtin",
            SourceFormat::Data => "data",
            SourceFormat::Prose => "prose",
            SourceFormat::Module => "module",
        }
    }
}

/// Metadata stamped onto every loaded command record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandMetadata {
    /// Provenance tier of the definition
    pub scope: CommandScope,
    /// Source format the definition was parsed from
    pub format: SourceFormat,
    /// File the definition came from, absent for builtins
    pub source_path: Option<PathBuf>,
    /// Grouping category for help output
    pub category: Option<String>,
    /// Free-form tags
    pub tags: Vec<String>,
    pub author: Option<String>,
    pub version: Option<String>,
    /// Whether the record's action may request shell execution
    pub can_execute_shell: bool,
}

impl Default for CommandMetadata {
    fn default() -> Self {
        Self {
            scope: CommandScope::Builtin,
            format: SourceFormat::Builtin,
            source_path: None,
            category: None,
            tags: Vec::new(),
            author: None,
            version: None,
            can_execute_shell: false,
        }
    }
}

/// Severity of a user-facing message outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageLevel {
    Info,
    Error,
}

/// Result of dispatching a command, consumed by the host's dispatcher.
///
/// The engine never executes anything itself; it only describes what the
/// host should do. `ShellDispatch` and `Prompt` are structurally distinct on
/// purpose: a prose command without a shell block hands its content to the
/// AI orchestrator verbatim and must never be treated as a shell request.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandOutcome {
    /// Request execution of a composed command string by the shell tool
    ShellDispatch {
        command: String,
        cwd: PathBuf,
    },
    /// Show a message to the user
    Message {
        level: MessageLevel,
        text: String,
    },
    /// Open a named dialog in the UI
    OpenDialog {
        dialog: String,
    },
    /// Hand raw content to the AI orchestrator as conversational input
    Prompt {
        content: String,
    },
}

/// Read-only context supplied by the host when invoking a command
#[derive(Debug, Clone, Default)]
pub struct CommandContext {
    /// Resolved project root, if the host is inside a project
    pub project_root: Option<PathBuf>,
    /// Host settings exposed to command actions
    pub settings: HashMap<String, String>,
    /// Debug flag gating verbose surfaces
    pub debug: bool,
}

impl CommandContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_project_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.project_root = Some(root.into());
        self
    }
}

/// Invocable behavior of a leaf command
pub type CommandAction =
    Arc<dyn Fn(&CommandContext, &str) -> Result<CommandOutcome> + Send + Sync>;

/// Maps a partial argument string to candidate completions
pub type CompletionFn = Arc<dyn Fn(&str) -> Vec<String> + Send + Sync>;

/// Declarative shape of a structured-data command file or module manifest.
///
/// ```json
/// {
///   "name": "deploy",
///   "description": "Deploy the current branch",
///   "command": "scripts/deploy.sh",
///   "args": "{{args}}"
/// }
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CommandSpec {
    pub name: String,
    pub alt_name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub tags: Vec<String>,
    pub author: Option<String>,
    pub version: Option<String>,
    /// Shell-invocation template; presence makes the record shell-dispatching
    pub command: Option<String>,
    /// Argument template, `{{args}}` is replaced with the raw argument string
    pub args: Option<String>,
    /// Working directory for the composed command
    pub cwd: Option<String>,
    pub sub_commands: Vec<CommandSpec>,
    pub metadata: Option<SpecMetadata>,
}

/// Optional nested metadata block in a definition file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SpecMetadata {
    pub category: Option<String>,
    pub tags: Vec<String>,
    pub author: Option<String>,
    pub version: Option<String>,
    pub can_execute_shell: Option<bool>,
}

/// Dispatch classification of a record
#[derive(Clone, Copy)]
pub enum CommandKind<'a> {
    /// Record groups sub-commands; any bare action is ignored at dispatch
    Parent(&'a [CommandRecord]),
    /// Record is directly invocable (or inert, if it has no action)
    Leaf(Option<&'a CommandAction>),
}

/// The unit of invocation: one validated command, regardless of origin format
#[derive(Clone)]
pub struct CommandRecord {
    /// Primary registry key, matches `^[A-Za-z][A-Za-z0-9-]*$`
    pub name: String,
    /// Optional secondary registry key, same naming rule
    pub alt_name: Option<String>,
    pub description: Option<String>,
    pub action: Option<CommandAction>,
    pub completion: Option<CompletionFn>,
    /// Nested commands; when non-empty this record dispatches as a parent
    pub sub_commands: Vec<CommandRecord>,
    pub metadata: CommandMetadata,
}

impl fmt::Debug for CommandRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandRecord")
            .field("name", &self.name)
            .field("alt_name", &self.alt_name)
            .field("description", &self.description)
            .field("action", &self.action.as_ref().map(|_| "<fn>"))
            .field("completion", &self.completion.as_ref().map(|_| "<fn>"))
            .field("sub_commands", &self.sub_commands)
            .field("metadata", &self.metadata)
            .finish()
    }
}

impl CommandRecord {
    /// Create a bare record with the given primary name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            alt_name: None,
            description: None,
            action: None,
            completion: None,
            sub_commands: Vec::new(),
            metadata: CommandMetadata::default(),
        }
    }

    /// Create a builtin record, for the host's built-in command set
    pub fn builtin(name: impl Into<String>, description: impl Into<String>) -> Self {
        let mut record = Self::new(name);
        record.description = Some(description.into());
        record
    }

    pub fn with_alt_name(mut self, alt: impl Into<String>) -> Self {
        self.alt_name = Some(alt.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_action(mut self, action: CommandAction) -> Self {
        self.action = Some(action);
        self
    }

    pub fn with_completion(mut self, completion: CompletionFn) -> Self {
        self.completion = Some(completion);
        self
    }

    pub fn with_sub_commands(mut self, sub_commands: Vec<CommandRecord>) -> Self {
        self.sub_commands = sub_commands;
        self
    }

    /// Classify this record for dispatch.
    ///
    /// A record with sub-commands is always a parent, even if it also
    /// carries an action; the bare action is ignored in that case.
    pub fn kind(&self) -> CommandKind<'_> {
        if !self.sub_commands.is_empty() {
            CommandKind::Parent(&self.sub_commands)
        } else {
            CommandKind::Leaf(self.action.as_ref())
        }
    }

    /// Find a direct sub-command by primary or alternate name
    pub fn find_sub_command(&self, token: &str) -> Option<&CommandRecord> {
        self.sub_commands
            .iter()
            .find(|sub| sub.name == token || sub.alt_name.as_deref() == Some(token))
    }

    /// Invoke the record with the raw (untokenized) argument string.
    ///
    /// Parents resolve the first argument token against their sub-commands
    /// and recurse with the remainder; an unmatched or missing token yields
    /// an informational message listing the available sub-commands.
    pub fn invoke(&self, context: &CommandContext, raw_args: &str) -> Result<CommandOutcome> {
        match self.kind() {
            CommandKind::Parent(subs) => {
                let trimmed = raw_args.trim_start();
                let (token, rest) = match trimmed.split_once(char::is_whitespace) {
                    Some((token, rest)) => (token, rest),
                    None => (trimmed, ""),
                };
                if !token.is_empty() {
                    if let Some(sub) = self.find_sub_command(token) {
                        return sub.invoke(context, rest);
                    }
                }
                let names: Vec<&str> = subs.iter().map(|s| s.name.as_str()).collect();
                Ok(CommandOutcome::Message {
                    level: MessageLevel::Info,
                    text: format!(
                        "'{}' requires a sub-command: {}",
                        self.name,
                        names.join(", ")
                    ),
                })
            }
            CommandKind::Leaf(Some(action)) => action(context, raw_args),
            CommandKind::Leaf(None) => Err(CommandError::dispatch(format!(
                "command '{}' has no action",
                self.name
            ))),
        }
    }

    /// Complete a partial argument string using the record's completion
    /// function, if any
    pub fn complete(&self, partial: &str) -> Vec<String> {
        match &self.completion {
            Some(completion) => completion(partial),
            None => Vec::new(),
        }
    }
}
