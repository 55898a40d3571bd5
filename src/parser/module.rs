//! Executable command modules
//!
//! Modules let users extend the command namespace with real code. The engine
//! treats module loading as a capability interface: a [`ModuleHost`] turns an
//! opaque module file into a candidate definition, and the default host runs
//! the file as a subprocess. Loaded modules run with full host privilege;
//! that is the stated trust model of user-authored commands, and no
//! sandboxing is applied here.
//!
//! The default protocol: the module is executed with the single argument
//! `manifest` and must print a JSON definition on stdout, either the
//! definition object itself or wrapped under a top-level `"command"` object.
//! Every load cycle spawns a fresh process, so a reload always observes the
//! module's current content.

use crate::error::{CommandError, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::path::Path;
use tokio::process::Command;
use tracing::debug;

/// Capability interface for loading a command definition from an opaque
/// executable source.
///
/// `Ok(None)` means the file is not a loadable command; the loader logs and
/// moves on. Errors are isolated per file by the loader.
#[async_trait]
pub trait ModuleHost: Send + Sync {
    async fn load(&self, path: &Path) -> Result<Option<Value>>;
}

/// Default host: execute the module file and read its manifest from stdout
#[derive(Debug, Default, Clone)]
pub struct ProcessModuleHost;

impl ProcessModuleHost {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ModuleHost for ProcessModuleHost {
    async fn load(&self, path: &Path) -> Result<Option<Value>> {
        debug!(path = %path.display(), "loading command module");

        let output = Command::new(path)
            .arg("manifest")
            .output()
            .await
            .map_err(|e| CommandError::module_load(path, e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(CommandError::module_load(
                path,
                format!(
                    "manifest run exited with {}: {}",
                    output.status,
                    stderr.trim()
                ),
            ));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let value: Value = serde_json::from_str(stdout.trim())
            .map_err(|e| CommandError::module_load(path, format!("invalid manifest: {}", e)))?;

        Ok(Some(unwrap_export(value, path)?))
    }
}

/// Accept the manifest either as the primary output object or under the
/// conventional `"command"` key
fn unwrap_export(value: Value, path: &Path) -> Result<Value> {
    match value {
        Value::Object(ref obj) if obj.get("command").map_or(false, Value::is_object) => {
            Ok(obj.get("command").cloned().unwrap_or(Value::Null))
        }
        Value::Object(_) => Ok(value),
        _ => Err(CommandError::module_load(
            path,
            "manifest output is not an object",
        )),
    }
}
