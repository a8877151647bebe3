// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Application configuration: YAML-loaded, with secrets resolved indirectly
//! through `*_env` fields so bearer tokens and EAB credentials never appear
//! in a config file or its `Debug`/`Serialize` output beyond the variable
//! name that points to them.

use crate::constants::HTTP_SERVER_BIND_ADDRESS;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default path read when `CONFIG_PATH` is unset.
pub const DEFAULT_CONFIG_PATH: &str = "/app/config/app.yaml";

/// Top-level configuration surface, deserialized from YAML.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    /// DNS frontend settings
    #[serde(default)]
    pub dns: DnsConfig,
    /// GeoIP answer-ordering settings
    #[serde(default)]
    pub geoip: GeoIpConfig,
    /// Record storage backend settings
    #[serde(default)]
    pub storage: StorageConfig,
    /// HTTP management surface settings
    #[serde(default)]
    pub http: HttpConfig,
    /// ACME / DNS-01 certificate issuance settings
    #[serde(default)]
    pub acme: AcmeConfig,
    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Metrics server settings
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl AppConfig {
    /// Loads configuration from `path`.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or does not parse as valid YAML.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|err| anyhow::anyhow!("failed to read config file '{}': {err}", path.display()))?;
        let config: Self = serde_yaml::from_str(&contents)
            .map_err(|err| anyhow::anyhow!("failed to parse config file '{}': {err}", path.display()))?;
        Ok(config)
    }

    /// Resolves the config path from `CONFIG_PATH`, falling back to [`DEFAULT_CONFIG_PATH`].
    #[must_use]
    pub fn resolve_path() -> std::path::PathBuf {
        std::env::var("CONFIG_PATH").map(std::path::PathBuf::from).unwrap_or_else(|_| std::path::PathBuf::from(DEFAULT_CONFIG_PATH))
    }
}

/// DNS frontend and upstream-forwarding configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DnsConfig {
    /// Listener address, `host:port`
    #[serde(default = "default_dns_listen")]
    pub listen: String,
    /// Whether to accept queries over UDP
    #[serde(default = "default_true")]
    pub udp_enabled: bool,
    /// Whether to accept queries over TCP
    #[serde(default = "default_true")]
    pub tcp_enabled: bool,
    /// Recursive fall-through settings
    #[serde(default)]
    pub upstream: UpstreamConfig,
}

impl Default for DnsConfig {
    fn default() -> Self {
        Self {
            listen: default_dns_listen(),
            udp_enabled: true,
            tcp_enabled: true,
            upstream: UpstreamConfig::default(),
        }
    }
}

fn default_dns_listen() -> String {
    "0.0.0.0:53".to_string()
}

/// Upstream forwarding configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// Whether to forward unanswerable queries upstream
    #[serde(default)]
    pub enabled: bool,
    /// Upstream server addresses, tried in order
    #[serde(default = "default_upstream_servers")]
    pub servers: Vec<String>,
    /// Per-server timeout in seconds
    #[serde(default = "default_upstream_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            servers: default_upstream_servers(),
            timeout_secs: default_upstream_timeout_secs(),
        }
    }
}

fn default_upstream_servers() -> Vec<String> {
    crate::constants::DEFAULT_UPSTREAM_SERVERS.iter().map(|s| (*s).to_string()).collect()
}

fn default_upstream_timeout_secs() -> u64 {
    crate::constants::DEFAULT_UPSTREAM_TIMEOUT_SECS
}

/// GeoIP answer-ordering configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GeoIpConfig {
    /// Whether to reorder multi-value address answers by client proximity
    #[serde(default)]
    pub enabled: bool,
    /// Filesystem path to the MaxMind GeoIP2/GeoLite2 MMDB file
    #[serde(default)]
    pub mmdb_path: Option<String>,
}

/// Record storage backend selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Which backend supplies records
    #[serde(rename = "type", default)]
    pub kind: StorageKind,
    /// Settings for the `file` backend
    #[serde(default)]
    pub file: FileStorageConfig,
    /// Settings for the `configmap` backend
    #[serde(default)]
    pub configmap: ConfigMapStorageConfig,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            kind: StorageKind::default(),
            file: FileStorageConfig::default(),
            configmap: ConfigMapStorageConfig::default(),
        }
    }
}

/// Which storage backend supplies records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    /// A local JSON file, watched for changes
    #[default]
    File,
    /// A Kubernetes ConfigMap, watched via the cluster API
    ConfigMap,
}

/// Settings for the JSON file storage backend.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FileStorageConfig {
    /// Path to the JSON records file
    #[serde(default)]
    pub path: Option<String>,
}

/// Settings for the ConfigMap storage backend.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ConfigMapStorageConfig {
    /// Namespace holding the ConfigMap
    #[serde(default)]
    pub namespace: Option<String>,
    /// ConfigMap name
    #[serde(default)]
    pub name: Option<String>,
    /// Data key holding the YAML records document
    #[serde(default = "default_configmap_data_key")]
    pub data_key: String,
}

fn default_configmap_data_key() -> String {
    "config.yaml".to_string()
}

/// HTTP management surface configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Whether to run the HTTP management surface at all
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Listener address, `host:port`
    #[serde(default = "default_http_listen")]
    pub listen: String,
    /// Bearer-token auth settings
    #[serde(default)]
    pub auth: HttpAuthConfig,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            listen: default_http_listen(),
            auth: HttpAuthConfig::default(),
        }
    }
}

fn default_http_listen() -> String {
    HTTP_SERVER_BIND_ADDRESS.to_string()
}

/// Bearer-token authentication for the HTTP management surface.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct HttpAuthConfig {
    /// Whether to require a bearer token on every request
    #[serde(default)]
    pub enabled: bool,
    /// Name of the environment variable holding the expected token
    #[serde(default)]
    pub token_env: Option<String>,
}

impl HttpAuthConfig {
    /// Resolves the expected bearer token from `token_env`, if auth is enabled.
    ///
    /// # Errors
    /// Returns an error if auth is enabled but `token_env` is unset or the
    /// named environment variable is not present.
    pub fn resolve_token(&self) -> anyhow::Result<Option<String>> {
        if !self.enabled {
            return Ok(None);
        }
        let var_name = self.token_env.as_deref().ok_or_else(|| anyhow::anyhow!("http.auth.enabled is true but http.auth.token_env is unset"))?;
        let token = std::env::var(var_name).map_err(|_| anyhow::anyhow!("environment variable '{var_name}' referenced by http.auth.token_env is not set"))?;
        Ok(Some(token))
    }
}

/// ACME / DNS-01 certificate issuance configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AcmeConfig {
    /// Whether to run the ACME manager at all
    #[serde(default)]
    pub enabled: bool,
    /// `letsencrypt` or `zerossl`
    #[serde(default)]
    pub mode: Option<String>,
    /// Optional directory URL override, for staging environments or private CAs
    #[serde(default)]
    pub server: Option<String>,
    /// Contact email presented during account registration
    #[serde(default)]
    pub email: Option<String>,
    /// Whether the renewal ticker runs automatically
    #[serde(default = "default_true")]
    pub auto_renew: bool,
    /// External account binding credential resolution
    #[serde(default)]
    pub eab: AcmeEabConfig,
    /// Where issued certificates are persisted
    #[serde(default)]
    pub storage: AcmeStorageConfig,
}

/// External account binding credential environment-variable names.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AcmeEabConfig {
    /// Environment variable holding the EAB key identifier
    #[serde(default)]
    pub kid_env: Option<String>,
    /// Environment variable holding the EAB HMAC key
    #[serde(default)]
    pub hmac_env: Option<String>,
}

impl AcmeEabConfig {
    /// Resolves EAB credentials from the configured environment variables.
    ///
    /// Returns `Ok(None)` if neither variable is configured (plain registration).
    ///
    /// # Errors
    /// Returns an error if one variable is configured but the other is not,
    /// or if a configured variable is unset.
    pub fn resolve(&self) -> anyhow::Result<Option<(String, String)>> {
        match (&self.kid_env, &self.hmac_env) {
            (None, None) => Ok(None),
            (Some(kid_env), Some(hmac_env)) => {
                let kid = std::env::var(kid_env).map_err(|_| anyhow::anyhow!("environment variable '{kid_env}' referenced by acme.eab.kid_env is not set"))?;
                let hmac = std::env::var(hmac_env).map_err(|_| anyhow::anyhow!("environment variable '{hmac_env}' referenced by acme.eab.hmac_env is not set"))?;
                Ok(Some((kid, hmac)))
            }
            _ => Err(anyhow::anyhow!("acme.eab.kid_env and acme.eab.hmac_env must both be set or both be unset")),
        }
    }
}

/// Where issued certificates are persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcmeStorageConfig {
    /// `secret` is the only supported backend today
    #[serde(rename = "type", default = "default_acme_storage_kind")]
    pub kind: String,
    /// Namespace for the `secret` backend
    #[serde(default)]
    pub namespace: Option<String>,
    /// Unused by the `secret` backend; reserved for a future filesystem backend
    #[serde(default)]
    pub path: Option<String>,
}

impl Default for AcmeStorageConfig {
    fn default() -> Self {
        Self {
            kind: default_acme_storage_kind(),
            namespace: None,
            path: None,
        }
    }
}

fn default_acme_storage_kind() -> String {
    "secret".to_string()
}

/// Logging output configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `text` or `json`
    #[serde(default = "default_log_format")]
    pub format: String,
    /// `RUST_LOG`-style filter directive; falls back to the `RUST_LOG` env var, then `info`
    #[serde(default)]
    pub level: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: default_log_format(),
            level: None,
        }
    }
}

fn default_log_format() -> String {
    "text".to_string()
}

/// Prometheus metrics server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Whether to expose `/metrics`
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Listener address, `host:port`
    #[serde(default = "default_http_listen")]
    pub listen: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            listen: default_http_listen(),
        }
    }
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod config_tests;
