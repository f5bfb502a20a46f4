//! Manifest file watcher for hot reload.

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::compiler::manifest::load_manifest;
use crate::compiler::CompileResult;

/// Watches the manifest and sends every successfully parsed version.
pub struct ManifestWatcher {
    path: PathBuf,
    update_tx: mpsc::UnboundedSender<CompileResult>,
}

impl ManifestWatcher {
    /// Returns the watcher and a receiver for manifest updates.
    pub fn new(path: &Path) -> (Self, mpsc::UnboundedReceiver<CompileResult>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();
        (
            Self {
                path: path.to_path_buf(),
                update_tx,
            },
            update_rx,
        )
    }

    /// Start watching. The returned handle must be kept alive.
    ///
    /// The parent directory is watched, since bundlers usually replace the
    /// manifest by rename rather than writing it in place.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let tx = self.update_tx.clone();
        let path = self.path.clone();
        let file_name = self.path.file_name().map(|n| n.to_os_string());

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    let touches_manifest = event
                        .paths
                        .iter()
                        .any(|p| p.file_name().map(|n| n.to_os_string()) == file_name);
                    if !touches_manifest || !(event.kind.is_modify() || event.kind.is_create()) {
                        return;
                    }
                    tracing::info!(manifest = ?path, "Manifest change detected, reloading");
                    match load_manifest(&path) {
                        Ok(result) => {
                            let _ = tx.send(result);
                        }
                        Err(e) => {
                            tracing::error!(error = %e, "Failed to reload manifest. Keeping current one.");
                        }
                    }
                }
                Err(e) => tracing::error!(error = ?e, "Watch error"),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        let watch_dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        watcher.watch(&watch_dir, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?self.path, "Manifest watcher started");
        Ok(watcher)
    }
}
