//! meterpush gateway binary.
//!
//! - Serves the instrumented demo API (`/api/fast`, `/api/slow`)
//! - Pushes request metrics to the configured collector on a fixed cadence
//! - Ctrl-C / SIGTERM runs the ordered shutdown (final flush, then exit)

use std::process::ExitCode;
use std::sync::Arc;

use tracing_subscriber::{fmt, EnvFilter};

use meterpush_core::error::{MeterError, Result};
use meterpush_gateway::{config, lifecycle, obs::HttpPushExporter};

#[tokio::main]
async fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(kind = e.kind().as_str(), error = %e, "meterpush-gateway failed");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<()> {
    let path = config::config_path();
    let cfg = config::load_from_file(&path)?;
    let listen = cfg.server.listen_addr()?;

    let exporter = HttpPushExporter::new(&cfg.export)?;
    tracing::info!(url = exporter.url(), interval = ?cfg.export.interval(), "metrics push target");

    let gateway = lifecycle::Gateway::new(cfg, Arc::new(exporter))?;

    tracing::info!(%listen, config = %path, "meterpush-gateway starting");
    let listener = tokio::net::TcpListener::bind(listen)
        .await
        .map_err(|e| MeterError::Configuration(format!("bind {listen} failed: {e}")))?;

    gateway.run(listener, lifecycle::shutdown_signal()).await
}
