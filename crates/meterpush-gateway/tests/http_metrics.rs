#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

mod common;

use std::time::Duration;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    routing::get,
    Router,
};
use tower::ServiceExt;

use common::{config_with_interval, RecordingExporter};
use meterpush_core::AttributeSet;
use meterpush_gateway::lifecycle::Gateway;
use meterpush_gateway::obs::{self, http::REQUESTS_TOTAL, HttpMetrics};
use meterpush_gateway::router;

fn gateway() -> Gateway {
    Gateway::new(config_with_interval(1000), RecordingExporter::new()).unwrap()
}

fn get_req(path: &str) -> Request<Body> {
    Request::builder().uri(path).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn response_passes_through_unchanged() {
    let gw = gateway();
    let app = router::build_router(gw.state().clone());

    let resp = app.oneshot(get_req("/api/fast")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&body[..], b"fast ok");

    let m = gw.state().http_metrics();
    let attrs = AttributeSet::path("/api/fast");
    assert_eq!(m.requests().value(&attrs), Some(1));
    assert_eq!(m.active().value(&attrs), Some(0));
    assert_eq!(m.latency().snapshot(&attrs).unwrap().count, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_fast_and_slow_requests() {
    let gw = gateway();
    let app = router::build_router(gw.state().clone());

    let (a, b, c) = tokio::join!(
        app.clone().oneshot(get_req("/api/fast")),
        app.clone().oneshot(get_req("/api/fast")),
        app.clone().oneshot(get_req("/api/slow")),
    );
    for resp in [a.unwrap(), b.unwrap(), c.unwrap()] {
        assert_eq!(resp.status(), StatusCode::OK);
    }

    let fast = AttributeSet::path("/api/fast");
    let slow = AttributeSet::path("/api/slow");
    let snap = gw.provider().registry().collect();

    assert_eq!(snap.point(REQUESTS_TOTAL, &fast).unwrap().as_counter(), Some(2));
    assert_eq!(snap.point(REQUESTS_TOTAL, &slow).unwrap().as_counter(), Some(1));
    assert_eq!(snap.point("http_requests_active", &fast).unwrap().as_up_down(), Some(0));
    assert_eq!(snap.point("http_requests_active", &slow).unwrap().as_up_down(), Some(0));

    let slow_latency = snap
        .point("http_request_duration_seconds", &slow)
        .unwrap()
        .as_histogram()
        .unwrap();
    assert_eq!(slow_latency.count, 1);
    assert!(slow_latency.sum >= 2.0, "slow latency {}", slow_latency.sum);

    let described = snap.metric("http_request_duration_seconds").unwrap();
    assert_eq!(
        described.description.as_deref(),
        Some("The HTTP request latencies in seconds.")
    );
}

#[tokio::test]
async fn active_gauge_tracks_request_in_flight() {
    let gw = gateway();
    let app = router::build_router(gw.state().clone());
    let slow = AttributeSet::path("/api/slow");
    let metrics = gw.state().http_metrics().clone();

    let pending = tokio::spawn(app.oneshot(get_req("/api/slow")));
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(metrics.active().value(&slow), Some(1));

    pending.await.unwrap().unwrap();
    assert_eq!(metrics.active().value(&slow), Some(0));
}

async fn boom() -> &'static str {
    panic!("handler blew up")
}

fn panicking_app(metrics: HttpMetrics) -> Router {
    obs::instrument(Router::new().route("/boom", get(boom)), metrics)
}

#[tokio::test]
async fn completion_runs_when_handler_panics() {
    let gw = gateway();
    let metrics = gw.state().http_metrics().clone();
    let app = panicking_app(metrics.clone());
    let attrs = AttributeSet::path("/boom");

    let res = tokio::spawn(app.oneshot(get_req("/boom"))).await;
    assert!(res.unwrap_err().is_panic());

    assert_eq!(metrics.requests().value(&attrs), Some(1));
    assert_eq!(metrics.active().value(&attrs), Some(0));
    assert_eq!(metrics.latency().snapshot(&attrs).unwrap().count, 1);
}

#[tokio::test]
async fn completion_runs_when_request_is_abandoned() {
    let gw = gateway();
    let app = router::build_router(gw.state().clone());
    let slow = AttributeSet::path("/api/slow");

    let res = tokio::time::timeout(Duration::from_millis(100), app.oneshot(get_req("/api/slow"))).await;
    assert!(res.is_err());

    let m = gw.state().http_metrics();
    assert_eq!(m.active().value(&slow), Some(0));
    assert_eq!(m.latency().snapshot(&slow).unwrap().count, 1);
}

#[tokio::test]
async fn raw_paths_create_distinct_series() {
    // Known cardinality risk: one route, one series per concrete path.
    let gw = gateway();
    let metrics = gw.state().http_metrics().clone();
    let app = obs::instrument(
        Router::new().route("/users/:id", get(|| async { "user" })),
        metrics.clone(),
    );

    for path in ["/users/1", "/users/2", "/users/2?verbose=1"] {
        let resp = app.clone().oneshot(get_req(path)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    assert_eq!(metrics.requests().value(&AttributeSet::path("/users/1")), Some(1));
    assert_eq!(metrics.requests().value(&AttributeSet::path("/users/2")), Some(2));
    assert_eq!(metrics.requests().value(&AttributeSet::path("/users/:id")), None);
}

#[tokio::test]
async fn readiness_flips_when_draining() {
    let gw = gateway();
    let app = router::build_router(gw.state().clone());

    let resp = app.clone().oneshot(get_req("/readyz")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    gw.state().set_draining();
    let resp = app.oneshot(get_req("/readyz")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);

    let attrs = AttributeSet::path("/readyz");
    assert_eq!(gw.state().http_metrics().requests().value(&attrs), Some(2));
}
