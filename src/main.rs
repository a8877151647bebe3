// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use korenet_dns::acme::manager::EabCredentials;
use korenet_dns::acme::{AcmeManager, AcmeMode, CertStore, SecretCertStore};
use korenet_dns::adapters::{ConfigMapAdapter, ConfigMapSource, FileAdapter};
use korenet_dns::config::{AppConfig, StorageKind};
use korenet_dns::constants::TOKIO_WORKER_THREADS;
use korenet_dns::dns::{Backend, Frontend, UpstreamClient};
use korenet_dns::geoip::{IpLookup, MaxMindLookup};
use korenet_dns::http::{self, HttpState};
use korenet_dns::storage::{InMemoryStorage, Storage};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[derive(Debug, Parser)]
#[command(name = "korenet-dns", about = "Authoritative DNS server with embedded ACME DNS-01 issuance")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run the DNS server (default when no subcommand is given)
    Serve,
    /// Check that a running instance's HTTP surface is healthy; exits non-zero otherwise
    Healthcheck,
    /// Print a shell completion script for this CLI
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "korenet-dns", &mut std::io::stdout());
            Ok(())
        }
        Commands::Healthcheck => {
            let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
            runtime.block_on(healthcheck())
        }
        Commands::Serve => {
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .worker_threads(TOKIO_WORKER_THREADS)
                .thread_name("korenet-dns")
                .enable_all()
                .build()?;
            runtime.block_on(async_main())
        }
    }
}

/// Minimal liveness probe: connects to the configured HTTP listener and
/// requests `/healthz`, exiting non-zero unless it sees a `200` status line.
async fn healthcheck() -> Result<()> {
    let config = AppConfig::load(&AppConfig::resolve_path()).unwrap_or_default();
    let addr: SocketAddr = config.http.listen.parse().context("invalid http.listen address")?;

    let mut stream = TcpStream::connect(addr).await.context("failed to connect to management HTTP surface")?;
    stream.write_all(b"GET /healthz HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n").await?;

    let mut response = String::new();
    stream.read_to_string(&mut response).await?;

    if response.starts_with("HTTP/1.1 200") {
        Ok(())
    } else {
        anyhow::bail!("healthcheck failed: {}", response.lines().next().unwrap_or("no response"));
    }
}

/// Respects `RUST_LOG` (or `logging.level`) for filtering and
/// `logging.format` (`text` or `json`) for output shape.
fn init_tracing(config: &korenet_dns::config::LoggingConfig) {
    let filter_directive = config.level.clone().or_else(|| std::env::var("RUST_LOG").ok()).unwrap_or_else(|| "info".to_string());
    let env_filter = tracing_subscriber::EnvFilter::try_new(&filter_directive).unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    match config.format.as_str() {
        "json" => {
            tracing_subscriber::fmt().with_env_filter(env_filter).with_file(true).with_line_number(true).with_target(false).json().init();
        }
        _ => {
            tracing_subscriber::fmt().with_env_filter(env_filter).with_file(true).with_line_number(true).with_target(false).compact().init();
        }
    }
}

async fn async_main() -> Result<()> {
    let config_path = AppConfig::resolve_path();
    let config = AppConfig::load(&config_path).with_context(|| format!("failed to load configuration from {}", config_path.display()))?;

    init_tracing(&config.logging);
    info!(path = %config_path.display(), "starting korenet-dns");

    let root_cancel = CancellationToken::new();
    let storage: Arc<dyn Storage> = InMemoryStorage::new();
    let mut background_tasks = Vec::new();

    let needs_kube_client = config.storage.kind == StorageKind::ConfigMap || config.acme.enabled;
    let kube_client = if needs_kube_client {
        Some(kube::Client::try_default().await.context("failed to build Kubernetes client")?)
    } else {
        None
    };

    spawn_storage_adapter(&config, storage.clone(), kube_client.clone(), &root_cancel, &mut background_tasks)?;

    let geoip: Option<Arc<dyn IpLookup>> = if config.geoip.enabled {
        let path = config.geoip.mmdb_path.clone().context("geoip.mmdb_path is required when geoip.enabled is true")?;
        Some(Arc::new(MaxMindLookup::open(&path).with_context(|| format!("failed to open GeoIP database at {path}"))?))
    } else {
        None
    };

    let upstream = if config.dns.upstream.enabled {
        let servers: Result<Vec<SocketAddr>> = config.dns.upstream.servers.iter().map(|s| s.parse().context("invalid dns.upstream.servers entry")).collect();
        Some(UpstreamClient::new(servers?, Duration::from_secs(config.dns.upstream.timeout_secs)))
    } else {
        None
    };

    let backend = Arc::new(Backend::new(storage.clone(), upstream, geoip));
    let frontend = Arc::new(Frontend::new(backend, config.dns.upstream.enabled));
    let dns_listen: SocketAddr = config.dns.listen.parse().context("invalid dns.listen address")?;

    if config.dns.udp_enabled {
        let frontend = frontend.clone();
        let cancel = root_cancel.clone();
        background_tasks.push(tokio::spawn(async move {
            if let Err(err) = frontend.run_udp(dns_listen, cancel).await {
                error!(error = %err, "UDP listener exited");
            }
        }));
    }
    if config.dns.tcp_enabled {
        let frontend = frontend.clone();
        let cancel = root_cancel.clone();
        background_tasks.push(tokio::spawn(async move {
            if let Err(err) = frontend.run_tcp(dns_listen, cancel).await {
                error!(error = %err, "TCP listener exited");
            }
        }));
    }

    let cert_store = spawn_acme_manager(&config, storage.clone(), kube_client.clone(), &root_cancel, &mut background_tasks).await?;

    if config.http.enabled {
        let bearer_token = config.http.auth.resolve_token().context("failed to resolve http.auth.token_env")?;
        let http_state = HttpState::new(cert_store, bearer_token);
        let http_listen: SocketAddr = config.http.listen.parse().context("invalid http.listen address")?;
        let cancel = root_cancel.clone();
        background_tasks.push(tokio::spawn(async move {
            let listener = match tokio::net::TcpListener::bind(http_listen).await {
                Ok(listener) => listener,
                Err(err) => {
                    error!(error = %err, addr = %http_listen, "failed to bind HTTP management surface");
                    return;
                }
            };
            info!(addr = %http_listen, "HTTP management surface listening");
            let router = http::router(http_state);
            if let Err(err) = axum::serve(listener, router).with_graceful_shutdown(cancel.cancelled_owned()).await {
                error!(error = %err, "HTTP management surface exited");
            }
        }));
    }

    wait_for_shutdown_signal().await;
    info!("shutdown signal received, stopping background tasks");
    root_cancel.cancel();

    for task in background_tasks {
        if let Err(err) = task.await {
            warn!(error = %err, "background task panicked during shutdown");
        }
    }

    info!("korenet-dns stopped");
    Ok(())
}

fn spawn_storage_adapter(
    config: &AppConfig,
    storage: Arc<dyn Storage>,
    kube_client: Option<kube::Client>,
    root_cancel: &CancellationToken,
    background_tasks: &mut Vec<tokio::task::JoinHandle<()>>,
) -> Result<()> {
    match config.storage.kind {
        StorageKind::File => {
            let path = config.storage.file.path.clone().context("storage.file.path is required when storage.type is 'file'")?;
            let adapter = Arc::new(FileAdapter::new(path, storage.clone()));
            let events = storage.watch();

            let load_adapter = adapter.clone();
            let inbound_cancel = root_cancel.clone();
            background_tasks.push(tokio::spawn(async move {
                load_adapter.load_initial().await;
                load_adapter.run_inbound(inbound_cancel).await;
            }));

            let outbound_cancel = root_cancel.clone();
            background_tasks.push(tokio::spawn(async move { adapter.run_outbound(events, outbound_cancel).await }));
        }
        StorageKind::ConfigMap => {
            let client = kube_client.context("internal error: kube client not built for configmap storage")?;
            let namespace = config.storage.configmap.namespace.clone().context("storage.configmap.namespace is required")?;
            let name = config.storage.configmap.name.clone().context("storage.configmap.name is required")?;
            let source = ConfigMapSource {
                namespace,
                name,
                data_key: config.storage.configmap.data_key.clone(),
            };
            let adapter = Arc::new(ConfigMapAdapter::new(client, source, storage.clone()));
            let events = storage.watch();

            let inbound = adapter.clone();
            let inbound_cancel = root_cancel.clone();
            background_tasks.push(tokio::spawn(async move { inbound.run_inbound(inbound_cancel).await }));

            let outbound_cancel = root_cancel.clone();
            background_tasks.push(tokio::spawn(async move { adapter.run_outbound(events, outbound_cancel).await }));
        }
    }
    Ok(())
}

async fn spawn_acme_manager(
    config: &AppConfig,
    storage: Arc<dyn Storage>,
    kube_client: Option<kube::Client>,
    root_cancel: &CancellationToken,
    background_tasks: &mut Vec<tokio::task::JoinHandle<()>>,
) -> Result<Option<Arc<dyn CertStore>>> {
    if !config.acme.enabled {
        return Ok(None);
    }

    let client = kube_client.context("internal error: kube client not built for acme storage")?;
    let namespace = config.acme.storage.namespace.clone().context("acme.storage.namespace is required when acme.enabled is true")?;
    let store: Arc<dyn CertStore> = Arc::new(SecretCertStore::new(client, namespace));

    let mode = AcmeMode::parse(config.acme.mode.as_deref().context("acme.mode is required when acme.enabled is true")?)?;
    let email = config.acme.email.clone().context("acme.email is required when acme.enabled is true")?;
    let eab = config.acme.eab.resolve()?.map(|(kid, hmac_key)| EabCredentials { kid, hmac_key });

    let manager = AcmeManager::register(mode, config.acme.server.as_deref(), &email, eab, storage, store.clone())
        .await
        .context("ACME account registration failed")?;

    if config.acme.auto_renew {
        let manager = Arc::new(manager);
        let cancel = root_cancel.clone();
        background_tasks.push(tokio::spawn(async move { manager.run_renewal_ticker(cancel).await }));
    }

    Ok(Some(store))
}

async fn wait_for_shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()).expect("failed to install SIGTERM handler").recv().await;
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
