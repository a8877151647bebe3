// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! The JSON file adapter: loads a JSON array of records at start and on
//! every file-change notification, and writes the current store contents
//! back atomically (write-temp + rename) on outbound sync.

use crate::errors::Error;
use crate::record::{ListFilter, Record, StorageEvent};
use crate::storage::Storage;
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use super::SOURCE_FILE;

/// Parses a JSON array of records.
///
/// # Errors
/// Returns [`Error::Transient`] if `json` does not parse as a record array.
pub fn parse_records_file(json: &str) -> Result<Vec<Record>, Error> {
    serde_json::from_str(json).map_err(|err| Error::Transient(err.to_string()))
}

/// Serializes a record list to its JSON array form.
///
/// # Errors
/// Returns [`Error::Transient`] if serialization fails (not expected in practice).
pub fn render_records_file(records: &[Record]) -> Result<String, Error> {
    serde_json::to_string_pretty(records).map_err(|err| Error::Transient(err.to_string()))
}

/// Loads records from a JSON file at start and on every change, and
/// optionally writes the current store contents back to the same file.
pub struct FileAdapter {
    path: PathBuf,
    storage: Arc<dyn Storage>,
}

impl FileAdapter {
    /// Builds an adapter bound to `path` and `storage`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, storage: Arc<dyn Storage>) -> Self {
        Self {
            path: path.into(),
            storage,
        }
    }

    /// Performs the initial load. A missing file is not an error: it is
    /// created on the first outbound write.
    pub async fn load_initial(&self) {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => self.reload_from(&contents).await,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "records file does not exist yet; starting empty");
            }
            Err(err) => {
                warn!(error = %err, path = %self.path.display(), "failed to read records file");
            }
        }
    }

    async fn reload_from(&self, contents: &str) {
        let records = match parse_records_file(contents) {
            Ok(records) => records,
            Err(err) => {
                warn!(error = %err, path = %self.path.display(), "failed to parse records file; skipping reload");
                return;
            }
        };

        let changes = self.storage.calculate_changes(&records).await;
        if changes.is_empty() {
            return;
        }
        if let Err(err) = self.storage.partial_reload(changes, Some(SOURCE_FILE)).await {
            error!(error = %err, path = %self.path.display(), "partial reload from file failed");
        }
    }

    /// Runs the file-watch loop until `cancel` fires, reloading on every
    /// change notification for the watched path.
    pub async fn run_inbound(&self, cancel: CancellationToken) {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let watcher = match build_watcher(&self.path, tx) {
            Ok(w) => w,
            Err(err) => {
                error!(error = %err, path = %self.path.display(), "failed to start file watcher");
                return;
            }
        };
        // The watcher must stay alive for notifications to keep arriving.
        let _watcher = watcher;

        loop {
            tokio::select! {
                () = cancel.cancelled() => return,
                event = rx.recv() => {
                    match event {
                        Some(()) => {
                            match tokio::fs::read_to_string(&self.path).await {
                                Ok(contents) => self.reload_from(&contents).await,
                                Err(err) => warn!(error = %err, path = %self.path.display(), "failed to read records file after change notification"),
                            }
                        }
                        None => return,
                    }
                }
            }
        }
    }

    /// Runs the outbound sync loop until `cancel` fires: on every storage
    /// event not originating from this adapter, writes the full current
    /// record set back to the file atomically.
    pub async fn run_outbound(&self, mut events: broadcast::Receiver<StorageEvent>, cancel: CancellationToken) {
        loop {
            tokio::select! {
                () = cancel.cancelled() => return,
                event = events.recv() => {
                    match event {
                        Ok(event) if event.source != Some(SOURCE_FILE) => {
                            if let Err(err) = self.sync_outbound().await {
                                warn!(error = %err, path = %self.path.display(), "file outbound sync failed");
                            }
                        }
                        Ok(_) => {}
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            warn!(skipped, "file outbound sync lagged behind storage events");
                        }
                        Err(broadcast::error::RecvError::Closed) => return,
                    }
                }
            }
        }
    }

    async fn sync_outbound(&self) -> Result<(), Error> {
        let records = self.storage.list(&ListFilter::default()).await;
        let json = render_records_file(&records)?;
        write_atomic(&self.path, &json).await
    }
}

fn build_watcher(path: &Path, tx: mpsc::UnboundedSender<()>) -> Result<RecommendedWatcher, Error> {
    let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
        if res.is_ok() {
            let _ = tx.send(());
        }
    })
    .map_err(|err| Error::Fatal(format!("failed to create file watcher: {err}")))?;

    let watch_target = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or_else(|| Path::new("."));
    watcher
        .watch(watch_target, RecursiveMode::NonRecursive)
        .map_err(|err| Error::Fatal(format!("failed to watch {}: {err}", watch_target.display())))?;
    Ok(watcher)
}

async fn write_atomic(path: &Path, contents: &str) -> Result<(), Error> {
    let tmp_path = path.with_extension("tmp");
    tokio::fs::write(&tmp_path, contents)
        .await
        .map_err(|err| Error::Transient(format!("failed to write temp file {}: {err}", tmp_path.display())))?;
    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|err| Error::Transient(format!("failed to rename temp file into {}: {err}", path.display())))?;
    Ok(())
}

#[cfg(test)]
#[path = "file_tests.rs"]
mod file_tests;
