use std::time::Duration;

use axum::{http::StatusCode, response::IntoResponse};

/// How long `/api/slow` takes to answer.
pub const SLOW_DELAY: Duration = Duration::from_secs(2);

pub async fn fast() -> impl IntoResponse {
    (StatusCode::OK, "fast ok")
}

pub async fn slow() -> impl IntoResponse {
    tokio::time::sleep(SLOW_DELAY).await;
    (StatusCode::OK, "slow ok")
}
