//! # HTTP API
//!
//! axum router exposing the halaqah and pairing workflows. Every route except
//! `/healthz` needs a Supabase session token; see [`middleware_auth`].
//!
//! | Area | Routes |
//! |------|--------|
//! | Halaqah | `/halaqah`, `/halaqah/{id}/students`, `/halaqah/{id}/join`, `/halaqah/{id}/leave`, `/halaqah/{id}/promote-waitlist` |
//! | Pairing (admin) | `/pairing/create`, `/pairing/add-to-pair`, `/pairing/approve*`, `/pairing/reject`, `/pairing/change-partner-type`, `/pairing/delete`, `/pairing/statistics` |
//! | Student | `/user/pairing`, `/user/pairing/preference`, `/user/pairing/update` |

pub mod error;
pub mod middleware_auth;
mod routes_halaqah;
mod routes_health;
mod routes_pairing;
mod routes_user;

use crate::{
    config::{AppConfig, database},
    errors::{Error, Result},
};
use axum::{
    Json, Router,
    extract::{FromRequest, Request, rejection::JsonRejection},
    routing::{get, patch, post},
};
use sea_orm::DatabaseConnection;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{error, info};

/// Shared state handed to every handler.
pub struct AppState {
    /// Database connection pool
    pub db: DatabaseConnection,
    /// HS256 secret used to verify session tokens
    pub jwt_secret: String,
}

/// JSON body extractor that reports malformed payloads as validation errors.
pub struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request(req: Request, state: &S) -> std::result::Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(invalid_body(&rejection)),
        }
    }
}

fn invalid_body(rejection: &JsonRejection) -> Error {
    Error::validation(format!("Invalid request body: {}", rejection.body_text()))
}

/// Unwraps an optional body field, failing as a missing required field.
pub(crate) fn required<T>(value: Option<T>, field: &str) -> Result<T> {
    value.ok_or_else(|| Error::validation(format!("Missing required field: {field}")))
}

/// Builds the application router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(routes_health::handler_healthz))
        // Halaqah capacity and waitlist
        .route("/halaqah", post(routes_halaqah::handler_create))
        .route("/halaqah/{id}/students", get(routes_halaqah::handler_students))
        .route("/halaqah/{id}/join", post(routes_halaqah::handler_join))
        .route("/halaqah/{id}/leave", post(routes_halaqah::handler_leave))
        .route(
            "/halaqah/{id}/promote-waitlist",
            post(routes_halaqah::handler_promote_waitlist),
        )
        // Admin pairing
        .route("/pairing/create", post(routes_pairing::handler_create))
        .route("/pairing/add-to-pair", post(routes_pairing::handler_add_to_pair))
        .route(
            "/pairing/approve-family",
            post(routes_pairing::handler_approve_family),
        )
        .route(
            "/pairing/approve-tarteel",
            post(routes_pairing::handler_approve_tarteel),
        )
        .route("/pairing/approve", post(routes_pairing::handler_approve_self_match))
        .route("/pairing/reject", post(routes_pairing::handler_reject))
        .route(
            "/pairing/change-partner-type",
            post(routes_pairing::handler_change_partner_type),
        )
        .route(
            "/pairing/delete",
            get(routes_pairing::handler_details).delete(routes_pairing::handler_dissolve),
        )
        .route("/pairing/statistics", get(routes_pairing::handler_statistics))
        // Student self-service
        .route("/user/pairing", get(routes_user::handler_my_pairing))
        .route(
            "/user/pairing/preference",
            post(routes_user::handler_declare_preference),
        )
        .route(
            "/user/pairing/update",
            patch(routes_user::handler_update_partner_details),
        )
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Checks the session secret, prepares the database, then serves the API.
///
/// # Errors
/// Returns [`Error::Config`] before touching the database when no JWT secret
/// is configured.
pub async fn run(app_config: AppConfig) -> Result<()> {
    let jwt_secret = app_config
        .require_jwt_secret()
        .inspect_err(|e| error!("{}", e))?
        .to_string();

    let db = database::create_connection(&app_config.database.url)
        .await
        .inspect_err(|e| error!("Failed to connect to database: {}", e))?;
    database::create_tables(&db)
        .await
        .inspect(|()| info!("Database initialized successfully."))
        .inspect_err(|e| error!("Failed to initialize database: {}", e))?;

    let state = Arc::new(AppState { db, jwt_secret });
    serve(&app_config.server.bind_addr, state).await
}

/// Binds `addr` and serves the router until Ctrl-C or SIGTERM.
pub async fn serve(addr: &str, state: Arc<AppState>) -> Result<()> {
    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr, "HTTP API listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("HTTP API stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => info!("received SIGINT, shutting down"),
                    _ = sigterm.recv() => info!("received SIGTERM, shutting down"),
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "SIGTERM handler unavailable, waiting for Ctrl-C");
                ctrl_c.await.ok();
            }
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("received SIGINT, shutting down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_run_without_secret_fails_before_serving() {
        let mut app_config = AppConfig::default();
        app_config.database.url = "sqlite::memory:".to_string();
        app_config.server.bind_addr = "127.0.0.1:0".to_string();

        let result = run(app_config).await;
        assert!(matches!(result, Err(Error::Config { message: _ })));
    }

    #[tokio::test]
    async fn test_run_with_empty_secret_fails() {
        let mut app_config = AppConfig::default();
        app_config.database.url = "sqlite::memory:".to_string();
        app_config.auth.jwt_secret = Some(String::new());

        let result = run(app_config).await;
        assert!(matches!(result, Err(Error::Config { message: _ })));
    }
}
