//! Axum router wiring.
//!
//! Every route, ops endpoints included, passes through the request
//! instrumentation layer.

use axum::{routing::get, Router};

use crate::{app_state::AppState, obs, ops, services};

pub fn build_router(state: AppState) -> Router {
    let routes = Router::new()
        .route("/api/fast", get(services::demo::fast))
        .route("/api/slow", get(services::demo::slow))
        .route("/healthz", get(ops::healthz))
        .route("/readyz", get(ops::readyz));

    obs::instrument(routes, state.http_metrics().clone()).with_state(state)
}
