use axum::{http::StatusCode, response::IntoResponse};

/// Liveness check: returns 200 if the process is running.
pub(super) async fn handler_healthz() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}
