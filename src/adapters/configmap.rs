// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! The ConfigMap adapter: watches a named ConfigMap for inbound record
//! updates and, optionally, patches it back with the current store
//! contents on outbound sync.
//!
//! Built on `kube::runtime::watcher`, feeding each reload as a one-shot
//! trigger into Core Storage rather than a read-only reflector cache.

use crate::constants::INITIAL_BACKOFF_SECS;
use crate::errors::Error;
use crate::record::{ListFilter, Record};
use crate::storage::Storage;
use futures::StreamExt;
use k8s_openapi::api::core::v1::ConfigMap;
use kube::api::{Api, Patch, PatchParams};
use kube::runtime::{watcher, WatchStreamExt};
use kube::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use super::SOURCE_CONFIGMAP;

const FIELD_MANAGER: &str = "korenet-dns";

/// Identifies the ConfigMap this adapter watches and the data key holding
/// the YAML record document.
#[derive(Debug, Clone)]
pub struct ConfigMapSource {
    /// Namespace containing the ConfigMap
    pub namespace: String,
    /// ConfigMap name
    pub name: String,
    /// Data key holding the YAML record document (conventionally `config.yaml`)
    pub data_key: String,
}

#[derive(Debug, Deserialize, Serialize, Default)]
struct RecordsDocument {
    #[serde(default)]
    records: Vec<Record>,
}

/// Parses a ConfigMap's YAML record document into its record list.
///
/// # Errors
/// Returns [`Error::Transient`] if `yaml` does not parse; this is treated
/// as a skip-this-reload condition by the caller, not fatal.
pub fn parse_records_document(yaml: &str) -> Result<Vec<Record>, Error> {
    let doc: RecordsDocument = serde_yaml::from_str(yaml).map_err(|err| Error::Transient(err.to_string()))?;
    Ok(doc.records)
}

/// Renders a record list back into the YAML document format this adapter reads.
///
/// # Errors
/// Returns [`Error::Transient`] if serialization fails (not expected in practice).
pub fn render_records_document(records: Vec<Record>) -> Result<String, Error> {
    serde_yaml::to_string(&RecordsDocument { records }).map_err(|err| Error::Transient(err.to_string()))
}

/// Watches a ConfigMap for inbound reloads and patches it on outbound sync.
pub struct ConfigMapAdapter {
    client: Client,
    source: ConfigMapSource,
    storage: Arc<dyn Storage>,
}

impl ConfigMapAdapter {
    /// Builds an adapter bound to `source` and `storage`.
    #[must_use]
    pub fn new(client: Client, source: ConfigMapSource, storage: Arc<dyn Storage>) -> Self {
        Self { client, source, storage }
    }

    /// Runs the inbound watch loop until `cancel` fires. A missing ConfigMap
    /// is logged and the loop continues without inbound sync; watch errors
    /// back off and retry.
    pub async fn run_inbound(&self, cancel: CancellationToken) {
        let api: Api<ConfigMap> = Api::namespaced(self.client.clone(), &self.source.namespace);
        let config = watcher::Config::default().fields(&format!("metadata.name={}", self.source.name));
        let stream = watcher(api, config).applied_objects();
        tokio::pin!(stream);

        loop {
            tokio::select! {
                () = cancel.cancelled() => return,
                next = stream.next() => {
                    match next {
                        Some(Ok(cm)) => self.handle_configmap(&cm).await,
                        Some(Err(err)) => {
                            warn!(error = %err, configmap = %self.source.name, "configmap watch error, backing off");
                            tokio::time::sleep(Duration::from_secs(INITIAL_BACKOFF_SECS)).await;
                        }
                        None => return,
                    }
                }
            }
        }
    }

    async fn handle_configmap(&self, cm: &ConfigMap) {
        let Some(data) = cm.data.as_ref().and_then(|d| d.get(&self.source.data_key)) else {
            warn!(configmap = %self.source.name, key = %self.source.data_key, "configmap missing data key; skipping reload");
            return;
        };

        let records = match parse_records_document(data) {
            Ok(records) => records,
            Err(err) => {
                warn!(error = %err, configmap = %self.source.name, "failed to parse configmap records; skipping reload");
                return;
            }
        };

        let changes = self.storage.calculate_changes(&records).await;
        if changes.is_empty() {
            debug!(configmap = %self.source.name, "configmap reload produced no changes");
            return;
        }
        if let Err(err) = self.storage.partial_reload(changes, Some(SOURCE_CONFIGMAP)).await {
            error!(error = %err, configmap = %self.source.name, "partial reload from configmap failed");
        }
    }

    /// Runs the outbound sync loop until `cancel` fires: on every storage
    /// event not originating from this adapter, patches the ConfigMap with
    /// the full current record set.
    pub async fn run_outbound(&self, mut events: broadcast::Receiver<crate::record::StorageEvent>, cancel: CancellationToken) {
        loop {
            tokio::select! {
                () = cancel.cancelled() => return,
                event = events.recv() => {
                    match event {
                        Ok(event) if event.source != Some(SOURCE_CONFIGMAP) => {
                            if let Err(err) = self.sync_outbound().await {
                                warn!(error = %err, configmap = %self.source.name, "configmap outbound sync failed");
                            }
                        }
                        Ok(_) => {}
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            warn!(skipped, "configmap outbound sync lagged behind storage events");
                        }
                        Err(broadcast::error::RecvError::Closed) => return,
                    }
                }
            }
        }
    }

    async fn sync_outbound(&self) -> Result<(), Error> {
        let records = self.storage.list(&ListFilter::default()).await;
        let yaml = render_records_document(records)?;

        let mut data = serde_json::Map::new();
        data.insert(self.source.data_key.clone(), json!(yaml));
        let patch = json!({ "data": data });

        let api: Api<ConfigMap> = Api::namespaced(self.client.clone(), &self.source.namespace);
        api.patch(&self.source.name, &PatchParams::apply(FIELD_MANAGER).force(), &Patch::Apply(&patch))
            .await
            .map_err(|err| Error::Transient(format!("configmap patch failed: {err}")))?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "configmap_tests.rs"]
mod configmap_tests;
