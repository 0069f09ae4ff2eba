//! Shared application state for the meterpush gateway.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::config::GatewayConfig;
use crate::obs::HttpMetrics;

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    cfg: GatewayConfig,
    http_metrics: HttpMetrics,
    draining: AtomicBool,
}

impl AppState {
    pub fn new(cfg: GatewayConfig, http_metrics: HttpMetrics) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                cfg,
                http_metrics,
                draining: AtomicBool::new(false),
            }),
        }
    }

    pub fn cfg(&self) -> &GatewayConfig {
        &self.inner.cfg
    }

    pub fn http_metrics(&self) -> &HttpMetrics {
        &self.inner.http_metrics
    }

    /// Mark draining state (shutdown has begun).
    pub fn set_draining(&self) {
        self.inner.draining.store(true, Ordering::Relaxed);
    }

    pub fn is_draining(&self) -> bool {
        self.inner.draining.load(Ordering::Relaxed)
    }
}
