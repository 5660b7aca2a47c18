//! scale-gate
//!
//! A TCP proxy in front of a single-replica StatefulSet that scales it to one
//! replica on the first client connection and back to zero after an idle
//! period with no connections.
//!
//! # Architecture Overview
//!
//! ```text
//!                    ┌──────────────────────────────────────────────────┐
//!                    │                   SCALE GATE                      │
//!                    │                                                   │
//!   Client ─────────▶│  ┌──────────┐   ┌─────────────┐   ┌──────────┐   │
//!                    │  │   net    │──▶│   scaling   │──▶│  proxy   │───┼──▶ <name>-0.<svc>.<ns>
//!                    │  │ listener │   │ controller  │   │  relay   │   │
//!                    │  └──────────┘   └──────┬──────┘   └──────────┘   │
//!                    │                        │                          │
//!                    │        ┌───────────────┼────────────────┐         │
//!                    │        ▼               ▼                ▼         │
//!                    │  ┌──────────┐   ┌─────────────┐  ┌────────────┐  │
//!                    │  │idle timer│   │  readiness  │  │orchestrator│──┼──▶ Kubernetes API
//!                    │  └──────────┘   │   poller    │  │   client   │  │
//!                    │                 └─────────────┘  └────────────┘  │
//!                    └──────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use clap::Parser;

use scale_gate::config::cli::CliArgs;
use scale_gate::config::loader;
use scale_gate::lifecycle::{reconcile, signals, DrainOutcome, Shutdown};
use scale_gate::net::{Listener, TcpConnector};
use scale_gate::observability::logging;
use scale_gate::orchestrator::KubernetesClient;
use scale_gate::{ProxyServer, ScaleController};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();
    let config = loader::resolve(&args)?;

    logging::init(&config.observability);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        listen_address = %config.listener.bind_address,
        namespace = %config.workload.namespace,
        workload = %config.workload.name,
        headless_service = %config.workload.headless_service,
        target_port = config.workload.port,
        idle_timeout = ?config.scaling.idle_timeout,
        ready_timeout = ?config.scaling.ready_timeout,
        shutdown_timeout = ?config.shutdown.timeout,
        "Configuration loaded"
    );

    let client = match KubernetesClient::from_config(&config.orchestrator) {
        Ok(client) => client,
        Err(e) => {
            tracing::error!(error = %e, "Failed to initialize Kubernetes client");
            return Err(e.into());
        }
    };
    tracing::info!(api_server = %client.base_url(), "Kubernetes client initialized");

    let controller = ScaleController::new(
        Arc::new(client),
        Arc::new(TcpConnector::new(config.scaling.dial_timeout)),
        config.workload.clone(),
        config.scaling.clone(),
    );

    reconcile(&controller).await;

    let listener = match Listener::bind(&config.listener).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(address = %config.listener.bind_address, error = %e, "Failed to bind listener");
            return Err(e.into());
        }
    };

    let shutdown = Shutdown::new();
    let server = ProxyServer::new(Arc::clone(&controller), config.shutdown.timeout);
    let server_task = tokio::spawn(server.run(listener, shutdown.subscribe()));

    signals::wait_for_signal().await;
    shutdown.trigger();

    match server_task.await {
        Ok(DrainOutcome::Drained) => tracing::info!("Shutdown complete"),
        Ok(DrainOutcome::TimedOut { remaining }) => {
            tracing::warn!(remaining_connections = remaining, "Shutdown complete with connections still open")
        }
        Err(e) => tracing::error!(error = %e, "Proxy server task failed"),
    }
    // Exit without waiting on blocking resolver threads left by abandoned dials.
    std::process::exit(0)
}
