//! The merged command namespace
//!
//! A registry snapshot maps every addressable name (primary and alternate)
//! to one record. Snapshots are immutable once built: a load cycle
//! constructs its snapshot locally and swaps it in as a single atomic step,
//! so readers always observe a fully-old or fully-new namespace.

use crate::command::CommandRecord;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

/// One fully-built command namespace
#[derive(Debug)]
pub struct RegistrySnapshot {
    /// Name and alternate-name resolution map; both keys of a record point
    /// at the same `Arc`
    commands: HashMap<String, Arc<CommandRecord>>,
    /// Flat list of every record that survived loading, in insertion order,
    /// including records later shadowed by a higher-priority scope
    records: Vec<Arc<CommandRecord>>,
    /// When this snapshot was built
    pub loaded_at: DateTime<Utc>,
}

impl RegistrySnapshot {
    pub fn new() -> Self {
        Self {
            commands: HashMap::new(),
            records: Vec::new(),
            loaded_at: Utc::now(),
        }
    }

    /// Fold one record into the namespace under its primary and alternate
    /// names. Later insertions replace earlier entries sharing a key; the
    /// replacement is silent at the contract level but logged once so hosts
    /// can surface shadowing.
    pub fn insert(&mut self, record: CommandRecord) {
        let record = Arc::new(record);
        let mut keys = vec![record.name.clone()];
        if let Some(alt) = &record.alt_name {
            keys.push(alt.clone());
        }
        for key in keys {
            if let Some(previous) = self.commands.insert(key.clone(), Arc::clone(&record)) {
                info!(
                    command = %key,
                    old_scope = %previous.metadata.scope,
                    new_scope = %record.metadata.scope,
                    "command overridden"
                );
            }
        }
        self.records.push(record);
    }

    /// Resolve a command by primary or alternate name
    pub fn get(&self, name: &str) -> Option<&Arc<CommandRecord>> {
        self.commands.get(name)
    }

    /// Every record loaded into this snapshot, shadowed ones included
    pub fn records(&self) -> &[Arc<CommandRecord>] {
        &self.records
    }

    /// Sorted list of every addressable name, aliases included
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.commands.keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of addressable names in the namespace
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

impl Default for RegistrySnapshot {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared handle to the live command namespace.
///
/// Lookups clone an `Arc` of the current snapshot, so a concurrent reload
/// never invalidates a resolution already in progress.
#[derive(Debug)]
pub struct CommandRegistry {
    current: RwLock<Arc<RegistrySnapshot>>,
}

impl CommandRegistry {
    /// Create a registry holding an empty namespace
    pub fn new() -> Self {
        Self {
            current: RwLock::new(Arc::new(RegistrySnapshot::new())),
        }
    }

    /// The current snapshot
    pub fn snapshot(&self) -> Arc<RegistrySnapshot> {
        Arc::clone(&self.current.read())
    }

    /// Atomically replace the namespace with a freshly built snapshot
    pub fn replace(&self, snapshot: RegistrySnapshot) {
        let snapshot = Arc::new(snapshot);
        info!(
            commands = snapshot.len(),
            loaded_at = %snapshot.loaded_at,
            "command registry replaced"
        );
        *self.current.write() = snapshot;
    }

    /// Resolve a command by primary or alternate name
    pub fn get(&self, name: &str) -> Option<Arc<CommandRecord>> {
        self.current.read().get(name).cloned()
    }

    /// Sorted list of every addressable name
    pub fn names(&self) -> Vec<String> {
        self.current.read().names()
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{CommandMetadata, CommandScope, SourceFormat};

    fn scoped(name: &str, scope: CommandScope) -> CommandRecord {
        let mut record = CommandRecord::new(name);
        record.metadata = CommandMetadata {
            scope,
            format: SourceFormat::Data,
            ..CommandMetadata::default()
        };
        record
    }

    #[test]
    fn test_last_write_wins_across_scopes() {
        let mut snapshot = RegistrySnapshot::new();
        snapshot.insert(scoped("deploy", CommandScope::Builtin));
        snapshot.insert(scoped("deploy", CommandScope::Project));
        snapshot.insert(scoped("deploy", CommandScope::Personal));

        let resolved = snapshot.get("deploy").unwrap();
        assert_eq!(resolved.metadata.scope, CommandScope::Personal);
        // The flat list still remembers every loaded record
        assert_eq!(snapshot.records().len(), 3);
        assert_eq!(snapshot.len(), 1);
    }

    #[test]
    fn test_project_overrides_builtin_only() {
        let mut snapshot = RegistrySnapshot::new();
        snapshot.insert(scoped("deploy", CommandScope::Builtin));
        snapshot.insert(scoped("deploy", CommandScope::Project));

        let resolved = snapshot.get("deploy").unwrap();
        assert_eq!(resolved.metadata.scope, CommandScope::Project);
    }

    #[test]
    fn test_alias_resolves_to_same_record() {
        let mut snapshot = RegistrySnapshot::new();
        snapshot.insert(CommandRecord::new("quit").with_alt_name("exit"));

        let by_name = snapshot.get("quit").unwrap();
        let by_alias = snapshot.get("exit").unwrap();
        assert!(Arc::ptr_eq(by_name, by_alias));
        assert_eq!(snapshot.len(), 2);
    }

    #[test]
    fn test_alias_collisions_follow_last_write() {
        let mut snapshot = RegistrySnapshot::new();
        snapshot.insert(scoped("quit", CommandScope::Builtin).with_alt_name("exit"));
        snapshot.insert(scoped("leave", CommandScope::Personal).with_alt_name("exit"));

        assert_eq!(
            snapshot.get("exit").unwrap().metadata.scope,
            CommandScope::Personal
        );
        // The builtin's primary name is untouched
        assert_eq!(
            snapshot.get("quit").unwrap().metadata.scope,
            CommandScope::Builtin
        );
    }

    #[test]
    fn test_replace_is_atomic_for_held_snapshots() {
        let registry = CommandRegistry::new();

        let mut first = RegistrySnapshot::new();
        first.insert(CommandRecord::new("old"));
        registry.replace(first);

        let held = registry.snapshot();

        let mut second = RegistrySnapshot::new();
        second.insert(CommandRecord::new("new"));
        registry.replace(second);

        // The held snapshot is unchanged; the live one is fully new
        assert!(held.get("old").is_some());
        assert!(held.get("new").is_none());
        assert!(registry.get("old").is_none());
        assert!(registry.get("new").is_some());
    }

    #[test]
    fn test_names_sorted() {
        let mut snapshot = RegistrySnapshot::new();
        snapshot.insert(CommandRecord::new("zeta"));
        snapshot.insert(CommandRecord::new("alpha").with_alt_name("first"));
        assert_eq!(snapshot.names(), vec!["alpha", "first", "zeta"]);
    }
}
