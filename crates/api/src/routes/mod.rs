//! HTTP surface of the coordinator.
//!
//! `GET /` and `GET /health` bypass auth; every named service is a
//! `POST /{service}` whose body carries the credentials. CORS preflight is
//! answered for every path including unregistered ones, other requests to
//! unknown paths get a 404, and known paths hit with the wrong method get
//! a 405 naming the method.

mod dispatch;

use std::sync::Arc;

use axum::extract::State;
use axum::http::{header, HeaderValue, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;

use crate::context::AppContext;

/// Services reachable through `POST /{service}`.
pub const SERVICES: [&str; 13] = [
    "insights",
    "optimize",
    "preferences",
    "questions",
    "create-tide",
    "end-tide",
    "delete-tide",
    "add-session",
    "add-energy",
    "link-task",
    "report",
    "switch-context",
    "list-contexts",
];

/// Build the coordinator router over shared application state.
pub fn build_router(ctx: Arc<AppContext>) -> Router {
    Router::new()
        .route("/", get(status).options(preflight))
        .route("/health", get(health).options(preflight))
        .route("/{service}", post(dispatch::handle).options(preflight))
        .method_not_allowed_fallback(method_not_allowed)
        .fallback(unknown_route)
        .with_state(ctx)
}

/// Status payload: service list and version. No auth.
async fn status(State(ctx): State<Arc<AppContext>>) -> Response {
    Json(json!({
        "service": "tides",
        "version": env!("CARGO_PKG_VERSION"),
        "environment": ctx.config.storage.environment.as_str(),
        "services": SERVICES,
    }))
    .into_response()
}

/// Liveness probe. No auth.
async fn health(State(ctx): State<Arc<AppContext>>) -> Response {
    if ctx.healthy() {
        Json(json!({"status": "ok", "backend": ctx.backend_name})).into_response()
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({"status": "degraded", "backend": ctx.backend_name})),
        )
            .into_response()
    }
}

/// CORS preflight: 204 with permissive origin and the supported methods.
async fn preflight() -> Response {
    let mut response = StatusCode::NO_CONTENT.into_response();
    let headers = response.headers_mut();
    headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, POST, OPTIONS"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type"),
    );
    response
}

async fn unknown_route(method: Method, uri: Uri) -> Response {
    // preflight is answered for every path, registered or not
    if method == Method::OPTIONS {
        return preflight().await;
    }
    (
        StatusCode::NOT_FOUND,
        Json(json!({"error": format!("'{}' not found", uri.path())})),
    )
        .into_response()
}

async fn method_not_allowed(method: Method, uri: Uri) -> Response {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(json!({
            "error": format!("{method} is not supported on {}", uri.path()),
        })),
    )
        .into_response()
}
