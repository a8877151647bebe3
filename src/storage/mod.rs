// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Core Storage: the in-memory, concurrently-readable record set the DNS
//! backend resolves against.
//!
//! The design favours the same discipline the reflector cache gave the
//! operator's CRD controllers: many concurrent readers never block each
//! other or a query in flight, and every mutation is versioned and
//! broadcast so dependents (adapters doing outbound sync, metrics) can
//! observe exactly what changed without re-scanning the whole set.
//!
//! Unlike a reflector, this store is writable: adapters call `hot_reload`
//! or `partial_reload` to replace or merge record sets, and callers can
//! also `create`/`update`/`delete` individual records directly (used by
//! the ACME provider to publish and retract challenge TXT records).

use crate::constants::WATCH_CHANNEL_CAPACITY;
use crate::errors::{Error, StorageError};
use crate::metrics;
use crate::record::{ChangeSet, ListFilter, Record, RecordKey, RecordKind, StorageEvent, StorageEventKind};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};

/// The operations Core Storage exposes to the DNS backend, the external
/// source adapters, and the ACME provider.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Inserts a new record. Fails if the `(name, kind)` key already exists.
    async fn create(&self, record: Record) -> Result<(), Error>;

    /// Looks up all records for a `(name, kind)` key.
    async fn get(&self, key: &RecordKey) -> Option<Record>;

    /// Lists records matching an optional name-prefix / kind filter.
    async fn list(&self, filter: &ListFilter) -> Vec<Record>;

    /// Replaces an existing record's TTL and value. Fails if it does not exist.
    async fn update(&self, record: Record) -> Result<(), Error>;

    /// Removes a record by key. Fails if it does not exist.
    async fn delete(&self, key: &RecordKey) -> Result<(), Error>;

    /// Diffs a proposed record set against the current contents without
    /// mutating the store.
    async fn calculate_changes(&self, proposed: &[Record]) -> ChangeSet;

    /// Atomically replaces the entire record set with `records`, emitting a
    /// single `Reloaded` event tagged with `source`. Used by the file
    /// adapter and by a full ConfigMap resync.
    async fn hot_reload(&self, records: Vec<Record>, source: Option<&'static str>) -> ChangeSet;

    /// Applies only `changes` to the current record set, emitting a single
    /// `Reloaded` event tagged with `source`. Used by the ConfigMap watcher
    /// on incremental updates. `source` lets the originating adapter
    /// recognise and skip its own event on the outbound-sync path.
    async fn partial_reload(&self, changes: ChangeSet, source: Option<&'static str>) -> Result<(), Error>;

    /// Subscribes to the stream of storage events from this point forward.
    fn watch(&self) -> broadcast::Receiver<StorageEvent>;

    /// The current store version, incremented on every committed mutation.
    async fn version(&self) -> u64;
}

#[derive(Default)]
struct Inner {
    records: HashMap<RecordKey, Record>,
    version: u64,
}

/// A `RwLock`-guarded in-memory implementation of [`Storage`].
///
/// Reads (`get`, `list`, `calculate_changes`, `version`) take a shared read
/// lock and never contend with each other; mutations take the exclusive
/// write lock only for the duration of the in-memory update, not while
/// broadcasting (the broadcast channel is lock-free).
pub struct InMemoryStorage {
    inner: RwLock<Inner>,
    events: broadcast::Sender<StorageEvent>,
}

impl InMemoryStorage {
    /// Builds an empty store with the default watch-channel capacity.
    #[must_use]
    pub fn new() -> Arc<Self> {
        Self::with_capacity(WATCH_CHANNEL_CAPACITY)
    }

    /// Builds an empty store with a custom watch-channel capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Arc<Self> {
        let (tx, _rx) = broadcast::channel(capacity);
        Arc::new(Self {
            inner: RwLock::new(Inner::default()),
            events: tx,
        })
    }

    fn publish(&self, event: StorageEvent) {
        // A send error only means there are currently no subscribers; that's
        // fine, the store itself still holds the new state.
        let _ = self.events.send(event);
    }

    fn diff(current: &HashMap<RecordKey, Record>, proposed: &[Record]) -> ChangeSet {
        let mut changes = ChangeSet::default();
        let mut proposed_keys = std::collections::HashSet::with_capacity(proposed.len());

        for record in proposed {
            let key = record.key();
            proposed_keys.insert(key.clone());
            match current.get(&key) {
                None => changes.added.push(record.clone()),
                Some(existing) if !existing.content_equals(record) => {
                    changes.updated.push(record.clone());
                }
                Some(_) => {}
            }
        }

        for key in current.keys() {
            if !proposed_keys.contains(key) {
                changes.deleted.push(key.clone());
            }
        }

        changes
    }

    fn record_counts_by_kind(records: &HashMap<RecordKey, Record>) -> HashMap<RecordKind, usize> {
        let mut counts = HashMap::new();
        for record in records.values() {
            *counts.entry(record.kind).or_insert(0) += 1;
        }
        counts
    }
}

impl Default for InMemoryStorage {
    fn default() -> Self {
        let (tx, _rx) = broadcast::channel(WATCH_CHANNEL_CAPACITY);
        Self {
            inner: RwLock::new(Inner::default()),
            events: tx,
        }
    }
}

#[async_trait]
impl Storage for InMemoryStorage {
    async fn create(&self, record: Record) -> Result<(), Error> {
        let key = record.key();
        let mut guard = self.inner.write().await;
        if guard.records.contains_key(&key) {
            return Err(StorageError::RecordExists {
                name: key.name,
                kind: key.kind.to_string(),
            }
            .into());
        }
        guard.records.insert(key, record.clone());
        guard.version += 1;
        let version = guard.version;
        drop(guard);

        self.publish(StorageEvent {
            kind: StorageEventKind::Added,
            record: Some(record),
            key: None,
            version,
            source: None,
        });
        Ok(())
    }

    async fn get(&self, key: &RecordKey) -> Option<Record> {
        self.inner.read().await.records.get(key).cloned()
    }

    async fn list(&self, filter: &ListFilter) -> Vec<Record> {
        let guard = self.inner.read().await;
        guard
            .records
            .values()
            .filter(|r| {
                filter
                    .name_prefix
                    .as_ref()
                    .is_none_or(|prefix| r.name.starts_with(prefix.as_str()))
                    && filter.kind.is_none_or(|kind| r.kind == kind)
            })
            .cloned()
            .collect()
    }

    async fn update(&self, record: Record) -> Result<(), Error> {
        let key = record.key();
        let mut guard = self.inner.write().await;
        if !guard.records.contains_key(&key) {
            return Err(StorageError::RecordNotFound {
                name: key.name,
                kind: key.kind.to_string(),
            }
            .into());
        }
        guard.records.insert(key, record.clone());
        guard.version += 1;
        let version = guard.version;
        drop(guard);

        self.publish(StorageEvent {
            kind: StorageEventKind::Updated,
            record: Some(record),
            key: None,
            version,
            source: None,
        });
        Ok(())
    }

    async fn delete(&self, key: &RecordKey) -> Result<(), Error> {
        let mut guard = self.inner.write().await;
        if guard.records.remove(key).is_none() {
            return Err(StorageError::RecordNotFound {
                name: key.name.clone(),
                kind: key.kind.to_string(),
            }
            .into());
        }
        guard.version += 1;
        let version = guard.version;
        drop(guard);

        self.publish(StorageEvent {
            kind: StorageEventKind::Deleted,
            record: None,
            key: Some(key.clone()),
            version,
            source: None,
        });
        Ok(())
    }

    async fn calculate_changes(&self, proposed: &[Record]) -> ChangeSet {
        let guard = self.inner.read().await;
        Self::diff(&guard.records, proposed)
    }

    async fn hot_reload(&self, records: Vec<Record>, source: Option<&'static str>) -> ChangeSet {
        let mut guard = self.inner.write().await;
        let changes = Self::diff(&guard.records, &records);
        guard.records = records.into_iter().map(|r| (r.key(), r)).collect();
        guard.version += 1;
        let version = guard.version;
        let counts = Self::record_counts_by_kind(&guard.records);
        drop(guard);

        metrics::record_storage_reload(source.unwrap_or("unknown"), version);
        for (kind, count) in counts {
            metrics::set_storage_record_count(kind.as_str(), count);
        }

        self.publish(StorageEvent {
            kind: StorageEventKind::Reloaded,
            record: None,
            key: None,
            version,
            source,
        });
        changes
    }

    async fn partial_reload(&self, changes: ChangeSet, source: Option<&'static str>) -> Result<(), Error> {
        let mut guard = self.inner.write().await;
        for record in changes.added.into_iter().chain(changes.updated) {
            guard.records.insert(record.key(), record);
        }
        for key in &changes.deleted {
            guard.records.remove(key);
        }
        guard.version += 1;
        let version = guard.version;
        let counts = Self::record_counts_by_kind(&guard.records);
        drop(guard);

        metrics::record_storage_reload(source.unwrap_or("unknown"), version);
        for (kind, count) in counts {
            metrics::set_storage_record_count(kind.as_str(), count);
        }

        self.publish(StorageEvent {
            kind: StorageEventKind::Reloaded,
            record: None,
            key: None,
            version,
            source,
        });
        Ok(())
    }

    fn watch(&self) -> broadcast::Receiver<StorageEvent> {
        self.events.subscribe()
    }

    async fn version(&self) -> u64 {
        self.inner.read().await.version
    }
}
