//! Serve command implementation
//!
//! This module implements the `issue-relay serve` command: resolve the relay
//! configuration once, build the dispatcher and run the webhook receiver
//! until Ctrl+C or SIGTERM.

use anyhow::{Context, Result};
use issue_relay_adapters::{HttpServer, ServerConfig, WebhookRouter};
use issue_relay_dispatch::{RelayConfig, RelayDispatcher, RelaySettings};
use std::net::{IpAddr, SocketAddr};
use tokio::signal;
use tracing::{error, info, warn};

/// Arguments for the serve command
pub struct ServeArgs {
    /// Address to bind
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Raw relay settings
    pub relay: RelaySettings,
}

/// Execute the serve command
pub async fn execute_serve_command(args: ServeArgs) -> Result<()> {
    let listen_addr = parse_listen_addr(&args.host, args.port)?;

    let relay = RelayConfig::resolve(args.relay);
    log_relay_mode(&relay);

    let dispatcher = RelayDispatcher::new(relay).context("Failed to build relay HTTP client")?;
    let server = HttpServer::new(ServerConfig { listen_addr }, WebhookRouter::new(dispatcher));

    info!(addr = %listen_addr, "Starting GitLab webhook receiver");
    server
        .run(wait_for_shutdown())
        .await
        .context("Webhook receiver stopped with an error")?;

    info!("Shutdown complete");
    Ok(())
}

fn log_relay_mode(relay: &RelayConfig) {
    match relay {
        RelayConfig::Disabled => {
            info!("No relay configured; webhooks will only be acknowledged");
        }
        RelayConfig::Generic(generic) => {
            info!(target_url = generic.target_url.as_deref().unwrap_or(""), "Relaying issues as JSON");
        }
        RelayConfig::Pipeline(pipeline) => {
            match pipeline.target() {
                Ok(target) => info!(url = %target.url, ref_name = target.ref_name, "Relaying issues as pipeline triggers"),
                Err(reason) => warn!(reason = %reason, "Pipeline relay misconfigured; relays will be skipped"),
            }
            if pipeline.accept_invalid_certs {
                warn!("TLS certificate validation is disabled for pipeline trigger calls");
            }
        }
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn wait_for_shutdown() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}

/// Parse the bind address with helpful error messages
pub fn parse_listen_addr(host: &str, port: u16) -> Result<SocketAddr> {
    let ip: IpAddr = host.parse().with_context(|| {
        format!(
            "Invalid host '{}'. Expected an IP address (e.g., 0.0.0.0 or ::1)",
            host
        )
    })?;
    Ok(SocketAddr::new(ip, port))
}
