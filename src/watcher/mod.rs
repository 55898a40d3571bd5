//! Hot reload of the command namespace
//!
//! Each enabled, existing scope directory gets a non-recursive filesystem
//! watch. Raw change notifications restart a single shared debounce timer;
//! once the quiet period elapses, the whole Loader -> Validator -> Registry
//! pipeline re-runs from scratch and the registry snapshot is swapped
//! atomically. Reload failures keep the previous snapshot authoritative.
//!
//! Watching starts only on explicit [`CommandWatcher::start`] and
//! [`CommandWatcher::stop`] synchronously closes every watch handle; a
//! reload already past its debounce may finish, but nothing further is
//! scheduled afterwards.

#[cfg(test)]
pub mod watcher_test;

use crate::error::Result;
use crate::loader::CommandLoader;
use crate::registry::CommandRegistry;
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Watches scope directories and keeps a registry fresh
pub struct CommandWatcher {
    loader: Arc<CommandLoader>,
    registry: Arc<CommandRegistry>,
    state: Mutex<Option<WatchState>>,
}

struct WatchState {
    /// Live watch handles; dropping them closes the underlying watches
    watchers: Vec<RecommendedWatcher>,
    /// Sender side of the raw-event funnel; dropping it ends the debounce
    /// task after at most one in-flight reload
    sender: mpsc::UnboundedSender<()>,
}

impl CommandWatcher {
    pub fn new(loader: Arc<CommandLoader>, registry: Arc<CommandRegistry>) -> Self {
        Self {
            loader,
            registry,
            state: Mutex::new(None),
        }
    }

    pub fn is_watching(&self) -> bool {
        self.state.lock().is_some()
    }

    /// Start watching every enabled scope directory that exists.
    ///
    /// Must be called from within a tokio runtime. Directories that cannot
    /// be watched are logged and skipped; the others proceed. Calling
    /// `start` while already watching is a no-op.
    pub fn start(&self) -> Result<()> {
        let mut state = self.state.lock();
        if state.is_some() {
            return Ok(());
        }

        let (sender, receiver) = mpsc::unbounded_channel();
        let mut watchers = Vec::new();

        for scope_dir in self.loader.config().scopes.iter().filter(|s| s.enabled) {
            if !scope_dir.path.is_dir() {
                debug!(
                    dir = %scope_dir.path.display(),
                    scope = %scope_dir.scope,
                    "not watching absent scope directory"
                );
                continue;
            }
            match watch_directory(&scope_dir.path, sender.clone()) {
                Ok(watcher) => watchers.push(watcher),
                Err(error) => {
                    warn!(
                        dir = %scope_dir.path.display(),
                        %error,
                        "cannot watch scope directory; hot reload disabled for it"
                    );
                }
            }
        }

        let loader = Arc::clone(&self.loader);
        let registry = Arc::clone(&self.registry);
        let debounce = self.loader.config().debounce;
        tokio::spawn(debounce_loop(receiver, debounce, loader, registry));

        *state = Some(WatchState { watchers, sender });
        Ok(())
    }

    /// Stop watching: close every watch handle and cancel the pending
    /// debounce, synchronously. An in-flight reload is allowed to finish;
    /// no further reloads fire, even for late-arriving change events.
    pub fn stop(&self) {
        if let Some(state) = self.state.lock().take() {
            drop(state.watchers);
            drop(state.sender);
            debug!("command watcher stopped");
        }
    }
}

impl Drop for CommandWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

fn watch_directory(
    path: &std::path::Path,
    sender: mpsc::UnboundedSender<()>,
) -> notify::Result<RecommendedWatcher> {
    let mut watcher =
        notify::recommended_watcher(move |event: notify::Result<notify::Event>| match event {
            Ok(_) => {
                // A closed channel just means the watcher is shutting down
                let _ = sender.send(());
            }
            Err(error) => warn!(%error, "filesystem watch error"),
        })?;
    watcher.watch(path, RecursiveMode::NonRecursive)?;
    Ok(watcher)
}

/// Collapse change bursts into single reloads. A new notification restarts
/// the quiet period instead of queuing another reload; channel closure ends
/// the loop without scheduling anything further.
async fn debounce_loop(
    mut receiver: mpsc::UnboundedReceiver<()>,
    delay: Duration,
    loader: Arc<CommandLoader>,
    registry: Arc<CommandRegistry>,
) {
    while receiver.recv().await.is_some() {
        loop {
            tokio::select! {
                _ = tokio::time::sleep(delay) => break,
                event = receiver.recv() => {
                    if event.is_none() {
                        return;
                    }
                }
            }
        }

        debug!("change burst settled; reloading commands");
        match loader.load().await {
            Ok(snapshot) => registry.replace(snapshot),
            Err(error) => {
                warn!(%error, "command reload failed; previous registry remains authoritative");
            }
        }
    }
}
