//! The shared command validator
//!
//! Every candidate definition, regardless of origin format, passes through
//! here before it becomes callable. Defects are collected exhaustively so a
//! single report surfaces every problem in a file; any non-empty defect list
//! rejects the whole candidate.

use crate::command::CommandRecord;
use serde_json::Value;
use tracing::warn;

/// Naming rule for command names and alternate names
pub const NAME_PATTERN: &str = "^[A-Za-z][A-Za-z0-9-]*$";

/// Check a name against the naming rule: ASCII letter first, then ASCII
/// letters, digits, or hyphens
pub fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '-')
}

/// Validate a raw candidate definition, collecting every defect.
///
/// An empty result accepts the candidate. Defect strings are human-readable
/// and name the offending field.
pub fn validate_value(value: &Value) -> Vec<String> {
    let mut defects = Vec::new();

    let obj = match value.as_object() {
        Some(obj) => obj,
        None => {
            defects.push("definition must be an object".to_string());
            return defects;
        }
    };

    match obj.get("name") {
        None | Some(Value::Null) => defects.push("name: required".to_string()),
        Some(Value::String(name)) => {
            if !is_valid_name(name) {
                defects.push(format!("name: must match {}", NAME_PATTERN));
            }
        }
        Some(_) => defects.push("name: must be a string".to_string()),
    }

    if let Some(alt) = obj.get("altName").filter(|v| !v.is_null()) {
        match alt.as_str() {
            Some(alt) if is_valid_name(alt) => {}
            Some(_) => defects.push(format!("altName: must match {}", NAME_PATTERN)),
            None => defects.push("altName: must be a string".to_string()),
        }
    }

    for field in [
        "description",
        "category",
        "author",
        "version",
        "command",
        "args",
        "cwd",
    ] {
        if let Some(v) = obj.get(field).filter(|v| !v.is_null()) {
            if !v.is_string() {
                defects.push(format!("{}: must be a string", field));
            }
        }
    }

    if let Some(tags) = obj.get("tags").filter(|v| !v.is_null()) {
        match tags.as_array() {
            Some(items) => {
                for (index, item) in items.iter().enumerate() {
                    if !item.is_string() {
                        defects.push(format!("tags[{}]: must be a string", index));
                    }
                }
            }
            None => defects.push("tags: must be a list".to_string()),
        }
    }

    // Functions cannot appear in structured data; a present key is a defect
    for field in ["action", "completion"] {
        if obj.get(field).filter(|v| !v.is_null()).is_some() {
            defects.push(format!("{}: must be invocable", field));
        }
    }

    if let Some(subs) = obj.get("subCommands").filter(|v| !v.is_null()) {
        match subs.as_array() {
            Some(items) => {
                for (index, item) in items.iter().enumerate() {
                    for defect in validate_value(item) {
                        defects.push(format!(
                            "invalid sub-command at index {}: {}",
                            index, defect
                        ));
                    }
                }
            }
            None => defects.push("subCommands: must be a list".to_string()),
        }
    }

    if let Some(metadata) = obj.get("metadata").filter(|v| !v.is_null()) {
        match metadata.as_object() {
            Some(meta) => {
                for field in ["category", "author", "version"] {
                    if let Some(v) = meta.get(field).filter(|v| !v.is_null()) {
                        if !v.is_string() {
                            defects.push(format!("metadata.{}: must be a string", field));
                        }
                    }
                }
                if let Some(tags) = meta.get("tags").filter(|v| !v.is_null()) {
                    match tags.as_array() {
                        Some(items) => {
                            for (index, item) in items.iter().enumerate() {
                                if !item.is_string() {
                                    defects.push(format!(
                                        "metadata.tags[{}]: must be a string",
                                        index
                                    ));
                                }
                            }
                        }
                        None => defects.push("metadata.tags: must be a list".to_string()),
                    }
                }
                if let Some(v) = meta.get("canExecuteShell").filter(|v| !v.is_null()) {
                    if !v.is_boolean() {
                        defects.push("metadata.canExecuteShell: must be a boolean".to_string());
                    }
                }
            }
            None => defects.push("metadata: must be an object".to_string()),
        }
    }

    warn_on_dead_action(
        obj.get("name").and_then(Value::as_str).unwrap_or("unknown"),
        obj.get("command").map_or(false, Value::is_string),
        obj.get("subCommands")
            .and_then(Value::as_array)
            .map_or(false, |subs| !subs.is_empty()),
    );

    defects
}

/// Validate an already-typed record: naming rules and recursive sub-command
/// checks. Field typing is guaranteed by construction for typed records.
pub fn validate_record(record: &CommandRecord) -> Vec<String> {
    let mut defects = Vec::new();

    if !is_valid_name(&record.name) {
        defects.push(format!("name: must match {}", NAME_PATTERN));
    }
    if let Some(alt) = &record.alt_name {
        if !is_valid_name(alt) {
            defects.push(format!("altName: must match {}", NAME_PATTERN));
        }
    }
    for (index, sub) in record.sub_commands.iter().enumerate() {
        for defect in validate_record(sub) {
            defects.push(format!("invalid sub-command at index {}: {}", index, defect));
        }
    }

    warn_on_dead_action(
        &record.name,
        record.action.is_some(),
        !record.sub_commands.is_empty(),
    );

    defects
}

/// Non-fatal structural inconsistency: both an action and sub-commands on
/// one record. Sub-commands win at dispatch, the bare action is dead weight.
fn warn_on_dead_action(name: &str, has_action: bool, has_sub_commands: bool) {
    if has_action && has_sub_commands {
        warn!(
            command = name,
            "record declares both an action and sub-commands; sub-commands take precedence"
        );
    }
}
