//! # Initialization
//!
//! Agent startup: rustls, tracing, configuration, metrics, the probe server
//! and the hub/spoke Kubernetes clients.

use crate::config::{load_config, ControllerConfig, ServerConfig};
use crate::controller::reconciler::{Reconciler, TokenReconciler};
use crate::controller::server::{start_server, ServerState};
use crate::crd::ManagedServiceAccount;
use crate::observability;
use crate::provider::hub::{HubDeclarationStore, HubSecretStore};
use crate::provider::spoke::{pem_bundle, SpokeClient};
use anyhow::{Context, Result};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Api, Client, Config};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info};

/// Everything the watch loop needs
pub struct InitializationResult {
    /// ManagedServiceAccounts in this cluster's hub namespace
    pub declarations: Api<ManagedServiceAccount>,
    /// Reconciler context
    pub reconciler: Arc<Reconciler>,
    /// Server state for health checks
    pub server_state: Arc<ServerState>,
}

pub async fn initialize() -> Result<InitializationResult> {
    // Required for rustls 0.23+ before any TLS connection is made
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "managed_serviceaccount_agent=info".into()),
        )
        .init();

    info!(
        "Starting managed-serviceaccount agent v{}",
        env!("CARGO_PKG_VERSION")
    );

    let (controller_config, server_config) = load_config()?;
    info!(
        cluster = %controller_config.cluster_name,
        spoke_namespace = %controller_config.spoke_namespace,
        refresh_percent = controller_config.refresh_percent,
        "Loaded configuration"
    );

    observability::metrics::register_metrics().context("Failed to register metrics")?;

    let server_state = Arc::new(ServerState::default());
    let server_state_clone = Arc::clone(&server_state);
    let port = server_config.metrics_port;
    let server_handle = tokio::spawn(async move {
        if let Err(e) = start_server(port, server_state_clone).await {
            error!("HTTP server error: {}", e);
        }
    });
    wait_for_server_ready(&server_state, &server_handle, &server_config).await?;

    let hub_client = hub_client(&controller_config).await?;
    let (spoke_client, trust_anchor) = spoke_client(&controller_config).await?;

    let spoke = Arc::new(SpokeClient::new(
        spoke_client,
        trust_anchor,
        controller_config.token_audiences.clone(),
    ));
    let tokens = TokenReconciler::new(
        Arc::new(HubDeclarationStore::new(hub_client.clone())),
        spoke,
        Arc::new(HubSecretStore::new(hub_client.clone())),
        controller_config.spoke_namespace.clone(),
        controller_config.refresh_scheduler(),
    );
    let reconciler = Arc::new(Reconciler::new(
        tokens,
        controller_config.error_backoff_min_secs,
        controller_config.error_backoff_max_secs,
    ));

    let declarations = Api::namespaced(hub_client, &controller_config.cluster_name);

    info!("Agent initialized, starting watch loop...");
    Ok(InitializationResult {
        declarations,
        reconciler,
        server_state,
    })
}

/// Client for the hub cluster, built from the configured kubeconfig
async fn hub_client(config: &ControllerConfig) -> Result<Client> {
    let kubeconfig = Kubeconfig::read_from(&config.hub_kubeconfig).with_context(|| {
        format!(
            "Failed to read hub kubeconfig {}",
            config.hub_kubeconfig.display()
        )
    })?;
    let hub_config = Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
        .await
        .context("Failed to load hub kubeconfig")?;
    Client::try_from(hub_config).context("Failed to create hub client")
}

/// Client for the local (spoke) cluster plus the CA bundle written next to tokens
async fn spoke_client(config: &ControllerConfig) -> Result<(Client, Vec<u8>)> {
    let spoke_config = Config::infer()
        .await
        .context("Failed to infer spoke cluster configuration")?;

    let trust_anchor = match &config.spoke_ca_file {
        Some(path) => tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read spoke CA file {}", path.display()))?,
        None => pem_bundle(spoke_config.root_cert.as_deref().unwrap_or_default()),
    };
    if trust_anchor.is_empty() {
        anyhow::bail!("No spoke CA bundle available; set SPOKE_CA_FILE");
    }

    let client = Client::try_from(spoke_config).context("Failed to create spoke client")?;
    Ok((client, trust_anchor))
}

/// Wait for the HTTP server to become ready
async fn wait_for_server_ready(
    server_state: &Arc<ServerState>,
    server_handle: &tokio::task::JoinHandle<()>,
    server_config: &ServerConfig,
) -> Result<()> {
    let startup_timeout = Duration::from_secs(server_config.startup_timeout_secs);
    let poll_interval = Duration::from_millis(server_config.poll_interval_ms);
    let start_time = Instant::now();

    loop {
        if server_handle.is_finished() {
            return Err(anyhow::anyhow!("HTTP server failed to start"));
        }

        if server_state.is_ready.load(Ordering::Relaxed) {
            info!("HTTP server is ready and accepting connections");
            return Ok(());
        }

        if start_time.elapsed() > startup_timeout {
            return Err(anyhow::anyhow!(
                "HTTP server failed to become ready within {} seconds",
                startup_timeout.as_secs()
            ));
        }

        tokio::time::sleep(poll_interval).await;
    }
}
