//! HTTP request instrumentation.
//!
//! Per request:
//! - `http_requests_total{path}`            +1 on entry
//! - `http_requests_active{path}`           +1 on entry, -1 on completion
//! - `http_request_duration_seconds{path}`  elapsed time on completion
//!
//! Completion is tied to [`InFlight`]'s `Drop`, so it runs exactly once whether
//! the inner handler returns, panics, or its future is dropped mid-flight.
//!
//! The path attribute is the raw request path. Distinct concrete paths that
//! hit the same route produce distinct series; there is no template
//! normalisation, so user-controlled paths grow cardinality without bound.

use axum::{
    extract::{Request, State},
    middleware::{self, Next},
    response::Response,
    Router,
};
use tokio::time::Instant;

use meterpush_core::error::Result;
use meterpush_core::{AttributeSet, Counter, Histogram, UpDownCounter};

use super::provider::MeterProvider;

pub const REQUESTS_TOTAL: &str = "http_requests_total";
pub const REQUESTS_ACTIVE: &str = "http_requests_active";
pub const REQUEST_DURATION: &str = "http_request_duration_seconds";

/// Handles to the three request instruments.
#[derive(Clone)]
pub struct HttpMetrics {
    requests: Counter,
    active: UpDownCounter,
    latency: Histogram,
}

impl HttpMetrics {
    /// Register the request instruments on `provider`.
    pub fn register(provider: &MeterProvider) -> Result<Self> {
        Ok(Self {
            requests: provider.register_counter(REQUESTS_TOTAL, "")?,
            active: provider.register_up_down_counter(REQUESTS_ACTIVE, "")?,
            latency: provider
                .register_histogram(REQUEST_DURATION, "The HTTP request latencies in seconds.")?,
        })
    }

    /// Enter `Started`: count the request and mark it active.
    pub fn begin(&self, path: &str) -> InFlight<'_> {
        let attrs = AttributeSet::path(path);
        if let Err(e) = self.requests.add(1, &attrs) {
            tracing::warn!(error = %e, "request counter update rejected");
        }
        if let Err(e) = self.active.add(1, &attrs) {
            tracing::warn!(error = %e, "active gauge update rejected");
        }
        InFlight {
            metrics: self,
            attrs,
            started: Instant::now(),
        }
    }

    pub fn requests(&self) -> &Counter {
        &self.requests
    }

    pub fn active(&self) -> &UpDownCounter {
        &self.active
    }

    pub fn latency(&self) -> &Histogram {
        &self.latency
    }
}

/// One request between `Started` and `Completed`.
pub struct InFlight<'a> {
    metrics: &'a HttpMetrics,
    attrs: AttributeSet,
    started: Instant,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let elapsed = self.started.elapsed().as_secs_f64();
        if let Err(e) = self.metrics.active.add(-1, &self.attrs) {
            tracing::warn!(error = %e, "active gauge update rejected");
        }
        if let Err(e) = self.metrics.latency.record(elapsed, &self.attrs) {
            tracing::warn!(error = %e, "latency record rejected");
        }
    }
}

/// Axum middleware: delegates to `next` untouched, measuring around it.
pub async fn track_requests(
    State(metrics): State<HttpMetrics>,
    request: Request,
    next: Next,
) -> Response {
    let _in_flight = metrics.begin(request.uri().path());
    next.run(request).await
}

/// Wrap every route of `router` with [`track_requests`].
pub fn instrument<S>(router: Router<S>, metrics: HttpMetrics) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router.layer(middleware::from_fn_with_state(metrics, track_requests))
}
