//! Command discovery and loading
//!
//! The loader walks each enabled scope directory in declared order, routes
//! every file to the matching parser, gates the result through the shared
//! validator, stamps provenance metadata, and folds accepted records into a
//! registry snapshot. One bad file never blocks the rest of the walk: every
//! per-file failure is caught, logged, and isolated.


use crate::command::validation::validate_record;
use crate::command::{CommandRecord, CommandScope, SourceFormat};
use crate::error::{CommandError, Result};
use crate::parser::module::{ModuleHost, ProcessModuleHost};
use crate::parser::{classify, data, prose, FileKind};
use crate::registry::RegistrySnapshot;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Quiet period between a change burst and the reload it triggers
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

/// One filesystem location commands may live in, with its provenance tier
#[derive(Debug, Clone)]
pub struct ScopeDir {
    pub path: PathBuf,
    pub scope: CommandScope,
    pub enabled: bool,
}

impl ScopeDir {
    pub fn new(path: impl Into<PathBuf>, scope: CommandScope) -> Self {
        Self {
            path: path.into(),
            scope,
            enabled: true,
        }
    }
}

/// Loader configuration, fixed at construction.
///
/// The scope list order is the override order: scopes listed later win name
/// collisions against scopes listed earlier (and every custom scope wins
/// against builtins).
#[derive(Debug, Clone)]
pub struct LoaderConfig {
    pub scopes: Vec<ScopeDir>,
    /// Extensions routed to the executable-module host
    pub module_extensions: Vec<String>,
    /// Watcher debounce delay
    pub debounce: Duration,
}

impl LoaderConfig {
    pub fn new(scopes: Vec<ScopeDir>) -> Self {
        Self {
            scopes,
            module_extensions: vec!["sh".to_string()],
            debounce: DEFAULT_DEBOUNCE,
        }
    }

    /// Standard two-scope layout: `<project-root>/.gemini/commands` then
    /// `<home>/.gemini/commands`, project before personal so personal wins
    pub fn discover(project_root: Option<&Path>) -> Self {
        let mut scopes = Vec::new();
        if let Some(root) = project_root {
            scopes.push(ScopeDir::new(
                crate::project_commands_dir(root),
                CommandScope::Project,
            ));
        }
        if let Some(personal) = crate::personal_commands_dir() {
            scopes.push(ScopeDir::new(personal, CommandScope::Personal));
        }
        Self::new(scopes)
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    pub fn with_module_extensions(mut self, extensions: Vec<String>) -> Self {
        self.module_extensions = extensions;
        self
    }
}

/// Walks scope directories and produces registry snapshots
pub struct CommandLoader {
    config: LoaderConfig,
    builtins: Vec<CommandRecord>,
    module_host: Arc<dyn ModuleHost>,
}

impl CommandLoader {
    pub fn new(config: LoaderConfig) -> Self {
        Self {
            config,
            builtins: Vec::new(),
            module_host: Arc::new(ProcessModuleHost::new()),
        }
    }

    /// Seed the registry with the host's built-in command set. Builtins are
    /// inserted first on every load cycle, so any custom scope can shadow
    /// them.
    pub fn with_builtins(mut self, builtins: Vec<CommandRecord>) -> Self {
        self.builtins = builtins;
        self
    }

    /// Replace the executable-module host
    pub fn with_module_host(mut self, host: Arc<dyn ModuleHost>) -> Self {
        self.module_host = host;
        self
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// Run one full load cycle: builtins first, then every enabled scope in
    /// declared order. The returned snapshot is complete and self-contained;
    /// the caller decides when to swap it in.
    pub async fn load(&self) -> Result<RegistrySnapshot> {
        let mut snapshot = RegistrySnapshot::new();

        for builtin in &self.builtins {
            let mut record = builtin.clone();
            stamp(
                &mut record,
                CommandScope::Builtin,
                SourceFormat::Builtin,
                None,
            );
            let defects = validate_record(&record);
            if defects.is_empty() {
                snapshot.insert(record);
            } else {
                error!(
                    command = %record.name,
                    defects = ?defects,
                    "rejecting invalid builtin command"
                );
            }
        }

        for scope_dir in self.config.scopes.iter().filter(|s| s.enabled) {
            self.load_scope(scope_dir, &mut snapshot).await;
        }

        info!(
            commands = snapshot.len(),
            records = snapshot.records().len(),
            "command load cycle complete"
        );
        Ok(snapshot)
    }

    async fn load_scope(&self, scope_dir: &ScopeDir, snapshot: &mut RegistrySnapshot) {
        let dir = &scope_dir.path;

        // Directory absence is a no-op, not an error
        match tokio::fs::metadata(dir).await {
            Ok(meta) if meta.is_dir() => {}
            _ => {
                debug!(dir = %dir.display(), scope = %scope_dir.scope, "scope directory absent");
                return;
            }
        }

        let mut entries = match tokio::fs::read_dir(dir).await {
            Ok(entries) => entries,
            Err(error) => {
                warn!(dir = %dir.display(), %error, "cannot list scope directory");
                return;
            }
        };

        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(error) => {
                    warn!(dir = %dir.display(), %error, "error while listing scope directory");
                    break;
                }
            };
            let path = entry.path();

            // Non-recursive: directories and other non-files are skipped
            match entry.file_type().await {
                Ok(file_type) if file_type.is_file() => {}
                _ => continue,
            }

            match self.load_file(&path, scope_dir.scope).await {
                Ok(Some(record)) => snapshot.insert(record),
                Ok(None) => {}
                Err(error) => {
                    error!(path = %path.display(), %error, "failed to load command definition");
                }
            }
        }
    }

    /// Parse, validate, and stamp one file. `Ok(None)` means "not a loadable
    /// command" (unsupported extension, or a parser declined with a log line
    /// of its own).
    async fn load_file(&self, path: &Path, scope: CommandScope) -> Result<Option<CommandRecord>> {
        let kind = match classify(path, &self.config.module_extensions) {
            Some(kind) => kind,
            None => {
                debug!(path = %path.display(), "unsupported file type; skipping");
                return Ok(None);
            }
        };

        let (mut record, format) = match kind {
            FileKind::Json | FileKind::Yaml => {
                let spec = data::parse_data_file(path, kind).await?;
                (data::record_from_spec(spec), SourceFormat::Data)
            }
            FileKind::Prose => match prose::parse_prose_file(path).await? {
                Some(record) => (record, SourceFormat::Prose),
                None => return Ok(None),
            },
            FileKind::Module => match self.module_host.load(path).await? {
                Some(value) => {
                    let spec = data::spec_from_value(value, path)?;
                    (data::record_from_spec(spec), SourceFormat::Module)
                }
                None => return Ok(None),
            },
        };

        let defects = validate_record(&record);
        if !defects.is_empty() {
            return Err(CommandError::validation(record.name, defects));
        }

        stamp(&mut record, scope, format, Some(path));
        Ok(Some(record))
    }
}

/// Stamp provenance metadata onto a record and its sub-commands. The loader
/// owns scope, format, and source path; parser-supplied fields like category
/// and tags are left untouched.
fn stamp(record: &mut CommandRecord, scope: CommandScope, format: SourceFormat, path: Option<&Path>) {
    record.metadata.scope = scope;
    record.metadata.format = format;
    record.metadata.source_path = path.map(Path::to_path_buf);
    for sub in &mut record.sub_commands {
        stamp(sub, scope, format, path);
    }
}
