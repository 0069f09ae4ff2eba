//! Lifecycle coordinator.
//!
//! Startup: provider + instruments, instrumented router, listener, export loop.
//! Shutdown, strictly in this order once the termination future resolves:
//! 1. stop consulting the termination source and mark the gateway draining
//! 2. `MeterProvider::shutdown(deadline)`, logging (not failing) on error
//! 3. cancel the root context, which stops the listener
//! 4. return
//!
//! In-flight requests are not drained before step 2. Their completions land
//! on a closed registry and are dropped.

use std::future::Future;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{error, info, warn};

use meterpush_core::error::{MeterError, Result};

use crate::app_state::AppState;
use crate::config::GatewayConfig;
use crate::obs::{Exporter, HttpMetrics, MeterProvider};
use crate::router;

pub struct Gateway {
    provider: MeterProvider,
    state: AppState,
}

impl Gateway {
    /// Build the provider, register request instruments, prepare app state.
    /// Fails fast on invalid configuration.
    pub fn new(cfg: GatewayConfig, exporter: Arc<dyn Exporter>) -> Result<Self> {
        cfg.validate()?;
        let provider = MeterProvider::builder()
            .with_interval(cfg.export.interval())
            .with_export_timeout(cfg.export.timeout())
            .with_exporter(exporter)
            .with_resource(cfg.resource.to_resource())
            .build()?;
        let http_metrics = HttpMetrics::register(&provider)?;

        Ok(Self {
            provider,
            state: AppState::new(cfg, http_metrics),
        })
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn provider(&self) -> &MeterProvider {
        &self.provider
    }

    /// Serve on `listener` until `shutdown` resolves, then run the ordered
    /// shutdown sequence.
    pub async fn run<F>(self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send,
    {
        let Gateway {
            mut provider,
            state,
        } = self;
        let export_deadline = state.cfg().export.shutdown_deadline();
        let drain_timeout = state.cfg().server.drain_timeout();

        let addr = listener
            .local_addr()
            .map_err(|e| MeterError::Configuration(format!("listener has no local addr: {e}")))?;
        let app = router::build_router(state.clone());

        // Root context: flipping it to `true` stops the listener.
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let mut server = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(cancelled(cancel_rx))
                .await
        });
        info!(%addr, "meterpush-gateway serving");

        provider.start();

        let mut server_failed = None;
        tokio::select! {
            _ = shutdown => info!("shutdown requested"),
            res = &mut server => {
                let msg = match res {
                    Ok(Ok(())) => "listener exited".to_string(),
                    Ok(Err(e)) => format!("listener failed: {e}"),
                    Err(e) => format!("listener task failed: {e}"),
                };
                error!(%msg, "server stopped before shutdown was requested");
                server_failed = Some(msg);
            }
        }

        // (1)
        state.set_draining();

        // (2)
        if let Err(e) = provider.shutdown(export_deadline).await {
            warn!(kind = e.kind().as_str(), error = %e, "metrics provider shutdown incomplete");
        }

        // (3)
        let _ = cancel_tx.send(true);
        if server_failed.is_none() {
            match tokio::time::timeout(drain_timeout, &mut server).await {
                Ok(Ok(Ok(()))) => info!("listener stopped"),
                Ok(Ok(Err(e))) => warn!(error = %e, "listener stopped with error"),
                Ok(Err(e)) => warn!(error = %e, "listener task failed"),
                Err(_) => {
                    server.abort();
                    warn!(?drain_timeout, "listener drain timed out; aborted");
                }
            }
        }

        // (4)
        info!("Done!");
        match server_failed {
            Some(msg) => Err(MeterError::Server(msg)),
            None => Ok(()),
        }
    }
}

async fn cancelled(mut rx: watch::Receiver<bool>) {
    // A dropped sender counts as cancellation too.
    let _ = rx.wait_for(|cancel| *cancel).await;
}

/// Resolves on Ctrl-C or (on unix) SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "ctrl-c handler unavailable");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "SIGTERM handler unavailable");
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
}
