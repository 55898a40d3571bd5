//! Watcher integration tests: debounce collapse and clean shutdown
//!
//! These use a counting module host so each completed load cycle is
//! observable without racing on registry contents.

use crate::command::CommandScope;
use crate::error::Result;
use crate::loader::{CommandLoader, LoaderConfig, ScopeDir};
use crate::parser::module::ModuleHost;
use crate::registry::CommandRegistry;
use crate::watcher::CommandWatcher;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

const TEST_DEBOUNCE: Duration = Duration::from_millis(100);

struct CountingHost {
    loads: AtomicUsize,
}

impl CountingHost {
    fn new() -> Self {
        Self {
            loads: AtomicUsize::new(0),
        }
    }

    fn count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ModuleHost for CountingHost {
    async fn load(&self, _path: &Path) -> Result<Option<Value>> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        Ok(Some(json!({ "name": "probe" })))
    }
}

struct Fixture {
    dir: TempDir,
    host: Arc<CountingHost>,
    watcher: CommandWatcher,
}

async fn fixture() -> Fixture {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("probe.sh"), "#!/bin/sh\n").unwrap();

    let config = LoaderConfig::new(vec![ScopeDir::new(dir.path(), CommandScope::Project)])
        .with_debounce(TEST_DEBOUNCE);
    let host = Arc::new(CountingHost::new());
    let loader = Arc::new(CommandLoader::new(config).with_module_host(host.clone()));
    let registry = Arc::new(CommandRegistry::new());

    // Initial load, the way a host would bring the registry up
    registry.replace(loader.load().await.unwrap());
    assert_eq!(host.count(), 1);

    let watcher = CommandWatcher::new(loader, registry);
    Fixture { dir, host, watcher }
}

fn touch(fixture: &Fixture) {
    std::fs::write(fixture.dir.path().join("probe.sh"), "#!/bin/sh\n# touched\n").unwrap();
}

#[tokio::test]
async fn test_burst_of_changes_triggers_exactly_one_reload() {
    let fx = fixture().await;
    fx.watcher.start().unwrap();
    assert!(fx.watcher.is_watching());

    // Several rapid edits inside one debounce window
    for _ in 0..4 {
        touch(&fx);
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    // Well past the quiet period: the burst must have collapsed to one reload
    tokio::time::sleep(TEST_DEBOUNCE * 6).await;
    assert_eq!(fx.host.count(), 2);

    fx.watcher.stop();
}

#[tokio::test]
async fn test_no_reload_before_quiet_period_elapses() {
    let fx = fixture().await;
    fx.watcher.start().unwrap();

    touch(&fx);
    // Shorter than the debounce delay: nothing may have fired yet
    tokio::time::sleep(TEST_DEBOUNCE / 3).await;
    assert_eq!(fx.host.count(), 1);

    tokio::time::sleep(TEST_DEBOUNCE * 6).await;
    assert_eq!(fx.host.count(), 2);

    fx.watcher.stop();
}

#[tokio::test]
async fn test_stop_prevents_further_reloads() {
    let fx = fixture().await;
    fx.watcher.start().unwrap();

    touch(&fx);
    tokio::time::sleep(TEST_DEBOUNCE * 6).await;
    let after_first = fx.host.count();
    assert_eq!(after_first, 2);

    fx.watcher.stop();
    assert!(!fx.watcher.is_watching());

    // Late-arriving changes after stop must not schedule anything
    touch(&fx);
    tokio::time::sleep(TEST_DEBOUNCE * 6).await;
    assert_eq!(fx.host.count(), after_first);
}

#[tokio::test]
async fn test_reload_replaces_registry_contents() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("cmd.json"), r#"{"name": "one"}"#).unwrap();

    let config = LoaderConfig::new(vec![ScopeDir::new(dir.path(), CommandScope::Project)])
        .with_debounce(TEST_DEBOUNCE);
    let loader = Arc::new(CommandLoader::new(config));
    let registry = Arc::new(CommandRegistry::new());
    registry.replace(loader.load().await.unwrap());
    assert!(registry.get("one").is_some());

    let watcher = CommandWatcher::new(loader, registry.clone());
    watcher.start().unwrap();

    std::fs::write(dir.path().join("cmd.json"), r#"{"name": "two"}"#).unwrap();
    tokio::time::sleep(TEST_DEBOUNCE * 6).await;

    // Wholesale rebuild: the old name is gone, the new one resolves
    assert!(registry.get("one").is_none());
    assert!(registry.get("two").is_some());

    watcher.stop();
}

#[tokio::test]
async fn test_start_is_idempotent_and_stop_without_start_is_harmless() {
    let fx = fixture().await;

    fx.watcher.stop();
    assert!(!fx.watcher.is_watching());

    fx.watcher.start().unwrap();
    fx.watcher.start().unwrap();
    assert!(fx.watcher.is_watching());

    fx.watcher.stop();
    assert!(!fx.watcher.is_watching());
}

#[tokio::test]
async fn test_corrupt_definition_drops_out_on_reload() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("cmd.json"), r#"{"name": "stable"}"#).unwrap();

    let config = LoaderConfig::new(vec![ScopeDir::new(dir.path(), CommandScope::Project)])
        .with_debounce(TEST_DEBOUNCE);
    let loader = Arc::new(CommandLoader::new(config));
    let registry = Arc::new(CommandRegistry::new());
    registry.replace(loader.load().await.unwrap());

    let watcher = CommandWatcher::new(loader, registry.clone());
    watcher.start().unwrap();

    // Corrupt the definition: the reload drops this file but still succeeds
    // as a cycle, and the command simply disappears from the new snapshot
    std::fs::write(dir.path().join("cmd.json"), "{ broken").unwrap();
    tokio::time::sleep(TEST_DEBOUNCE * 6).await;

    assert!(registry.get("stable").is_none());
    assert!(registry.snapshot().is_empty());

    watcher.stop();
}
