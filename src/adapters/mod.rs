// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! External source adapters: a Kubernetes ConfigMap watcher and a JSON file
//! watcher, both driving Core Storage reload and (optionally) syncing
//! storage writes back out to their source.

pub mod configmap;
pub mod file;

pub use configmap::{ConfigMapAdapter, ConfigMapSource};
pub use file::FileAdapter;

/// The storage-event `source` tag each adapter stamps on events it
/// originates, so it never writes back a change it just applied.
pub const SOURCE_CONFIGMAP: &str = "configmap";
/// The storage-event `source` tag for the file adapter.
pub const SOURCE_FILE: &str = "file";
