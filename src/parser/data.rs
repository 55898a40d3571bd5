//! Structured-data command files (JSON and YAML)
//!
//! Both syntaxes deserialize into the same `serde_json::Value` candidate and
//! flow through the shared validator before becoming a `CommandSpec`. A spec
//! with a `command` template gets a generated shell-dispatch action.

use crate::command::validation::validate_value;
use crate::command::{
    CommandAction, CommandContext, CommandMetadata, CommandOutcome, CommandRecord, CommandSpec,
};
use crate::error::{CommandError, Result};
use crate::parser::FileKind;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Placeholder replaced with the user's raw argument string
pub const ARGS_PLACEHOLDER: &str = "{{args}}";

/// Parse one JSON or YAML command file into a validated spec.
///
/// Malformed syntax is a distinguishable [`CommandError::Syntax`]; schema
/// violations come back as [`CommandError::Validation`] with the full defect
/// list.
pub async fn parse_data_file(path: &Path, kind: FileKind) -> Result<CommandSpec> {
    let content = tokio::fs::read_to_string(path).await?;
    let value: Value = match kind {
        FileKind::Yaml => serde_yaml::from_str(&content)
            .map_err(|e| CommandError::syntax(path, e.to_string()))?,
        _ => serde_json::from_str(&content)
            .map_err(|e| CommandError::syntax(path, e.to_string()))?,
    };
    spec_from_value(value, path)
}

/// Validate a raw candidate value and convert it into a spec. Shared by the
/// data parser and the module host path.
pub fn spec_from_value(value: Value, path: &Path) -> Result<CommandSpec> {
    let defects = validate_value(&value);
    if !defects.is_empty() {
        let name = value
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or("unknown")
            .to_string();
        return Err(CommandError::validation(name, defects));
    }
    serde_json::from_value(value).map_err(|e| CommandError::parse(path, e.to_string()))
}

/// Build an invocable record from a validated spec.
///
/// Scope, format, and source path are stamped by the loader afterwards; this
/// only fills what the definition itself declares.
pub fn record_from_spec(spec: CommandSpec) -> CommandRecord {
    let meta = spec.metadata.unwrap_or_default();
    let can_execute_shell =
        spec.command.is_some() || meta.can_execute_shell.unwrap_or(false);

    let mut metadata = CommandMetadata {
        // Definition-level fields win over the nested metadata block
        category: spec.category.or(meta.category),
        author: spec.author.or(meta.author),
        version: spec.version.or(meta.version),
        can_execute_shell,
        ..CommandMetadata::default()
    };
    metadata.tags = if spec.tags.is_empty() {
        meta.tags
    } else {
        spec.tags
    };

    let action = spec
        .command
        .map(|command| shell_action(command, spec.args, spec.cwd));

    CommandRecord {
        name: spec.name,
        alt_name: spec.alt_name,
        description: spec.description,
        action,
        completion: None,
        sub_commands: spec
            .sub_commands
            .into_iter()
            .map(record_from_spec)
            .collect(),
        metadata,
    }
}

/// Generated action for a shell-invocation template
pub(crate) fn shell_action(
    command: String,
    args_template: Option<String>,
    cwd: Option<String>,
) -> CommandAction {
    Arc::new(move |context: &CommandContext, raw_args: &str| {
        let composed = compose_command(&command, args_template.as_deref(), raw_args);
        Ok(CommandOutcome::ShellDispatch {
            command: composed,
            cwd: resolve_cwd(cwd.as_deref(), context),
        })
    })
}

/// Substitute the args placeholder and compose the final command string.
///
/// Without an explicit args template the raw argument string is appended
/// as-is, so `command: "echo hi"` invoked with `world` still sees its
/// arguments.
pub(crate) fn compose_command(
    command: &str,
    args_template: Option<&str>,
    raw_args: &str,
) -> String {
    let raw_args = raw_args.trim();
    let expanded = match args_template {
        Some(template) => template.replace(ARGS_PLACEHOLDER, raw_args),
        None => raw_args.to_string(),
    };
    let expanded = expanded.trim();
    if expanded.is_empty() {
        command.trim().to_string()
    } else {
        format!("{} {}", command.trim(), expanded)
    }
}

/// Working directory resolution: file-declared cwd, else the caller's
/// project root, else the process working directory
pub(crate) fn resolve_cwd(cwd: Option<&str>, context: &CommandContext) -> PathBuf {
    if let Some(cwd) = cwd {
        return PathBuf::from(cwd);
    }
    if let Some(root) = &context.project_root {
        return root.clone();
    }
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}
