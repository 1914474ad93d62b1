//! # relay-gateway
//!
//! Binary entry point: loads settings, connects lazily to the responder and
//! serves the WebSocket routes until SIGINT/SIGTERM.

#![deny(unsafe_code)]

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Parser;
use relay_core::StreamingClient;
use relay_gateway::{GatewayConfig, GatewayServer};
use relay_settings::{GatewaySettings, LogFormat};
use tonic::transport::Endpoint;

/// WebSocket gateway for the `StreamingServer` gRPC service.
#[derive(Parser, Debug)]
#[command(name = "relay-gateway", about = "WebSocket to gRPC stream bridge")]
struct Cli {
    /// Settings file (defaults to `~/.relay/settings.json`).
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Host to bind (overrides settings).
    #[arg(long)]
    host: Option<String>,

    /// Port to bind (overrides settings).
    #[arg(long)]
    port: Option<u16>,

    /// Responder address as `host:port` (overrides settings).
    #[arg(long)]
    upstream: Option<String>,
}

impl Cli {
    fn apply(self, settings: &mut GatewaySettings) -> Result<()> {
        if let Some(host) = self.host {
            settings.http_host = host;
        }
        if let Some(port) = self.port {
            settings.http_port = port;
        }
        if let Some(upstream) = self.upstream {
            let (host, port) = upstream
                .rsplit_once(':')
                .with_context(|| format!("Upstream must be host:port, got {upstream}"))?;
            settings.grpc_server_host = host.to_string();
            settings.grpc_server_port = port
                .parse()
                .with_context(|| format!("Invalid upstream port: {port}"))?;
        }
        Ok(())
    }
}

fn upstream_client(settings: &GatewaySettings) -> Result<StreamingClient> {
    if settings.grpc_server_tls {
        bail!("GRPC_SERVER_TLS is set but TLS to the responder is not supported");
    }

    let uri = settings.upstream_uri();
    let mut endpoint = Endpoint::from_shared(uri.clone())
        .with_context(|| format!("Invalid responder address: {uri}"))?;
    if settings.grpc_keepalive {
        tracing::info!(
            time_secs = settings.grpc_keepalive_time_secs,
            timeout_secs = settings.grpc_keepalive_timeout_secs,
            "enabling gRPC keepalive"
        );
        endpoint = endpoint
            .http2_keep_alive_interval(Duration::from_secs(settings.grpc_keepalive_time_secs))
            .keep_alive_timeout(Duration::from_secs(settings.grpc_keepalive_timeout_secs))
            .keep_alive_while_idle(true);
    }

    tracing::info!(%uri, "responder endpoint configured");
    Ok(StreamingClient::new(endpoint.connect_lazy()))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    let path = args
        .settings
        .clone()
        .unwrap_or_else(relay_settings::settings_path);
    let mut settings = relay_settings::load_settings_from_path(&path)
        .with_context(|| format!("Failed to load settings from {}", path.display()))?;

    match settings.logging.format {
        LogFormat::Compact => relay_core::logging::init_subscriber(&settings.logging.level),
        LogFormat::Json => relay_core::logging::init_json_subscriber(&settings.logging.level),
    }

    args.apply(&mut settings.gateway)?;
    let client = upstream_client(&settings.gateway)?;

    let server = GatewayServer::new(GatewayConfig::from(&settings.gateway), client);
    let (addr, handle) = server.listen().await.context("Failed to bind gateway")?;
    tracing::info!("relay gateway listening on http://{addr}");

    server.shutdown().shutdown_on_signal().await;

    tracing::info!(
        active_sessions = server.sessions().count(),
        "shutting down"
    );
    let aborted = server.shutdown().graceful_shutdown(vec![handle], None).await;
    if aborted > 0 {
        tracing::warn!(aborted, "forced shutdown");
    }
    Ok(())
}
