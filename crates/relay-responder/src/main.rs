//! # relay-responder
//!
//! Binary entry point for the echo responder.

#![deny(unsafe_code)]

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use relay_core::shutdown::ShutdownCoordinator;
use relay_responder::StreamResponder;
use relay_settings::LogFormat;
use tokio::net::TcpListener;

/// Echo responder for the `StreamingServer` gRPC service.
#[derive(Parser, Debug)]
#[command(name = "relay-responder", about = "StreamingServer echo responder")]
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
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    let path = args
        .settings
        .unwrap_or_else(relay_settings::settings_path);
    let mut settings = relay_settings::load_settings_from_path(&path)
        .with_context(|| format!("Failed to load settings from {}", path.display()))?;

    match settings.logging.format {
        LogFormat::Compact => relay_core::logging::init_subscriber(&settings.logging.level),
        LogFormat::Json => relay_core::logging::init_json_subscriber(&settings.logging.level),
    }

    if let Some(host) = args.host {
        settings.responder.host = host;
    }
    if let Some(port) = args.port {
        settings.responder.port = port;
    }

    let responder_settings = &settings.responder;
    let bind_addr = responder_settings.bind_addr();
    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind {bind_addr}"))?;
    let responder = StreamResponder::with_pacing(
        responder_settings.server_stream_count,
        Duration::from_millis(responder_settings.server_stream_interval_ms),
    );

    let shutdown = ShutdownCoordinator::new();
    let signal = shutdown.clone();
    let _signal_task = tokio::spawn(async move { signal.shutdown_on_signal().await });

    relay_responder::serve(listener, responder, shutdown.token())
        .await
        .context("Responder failed")?;

    tracing::info!("responder stopped");
    Ok(())
}
