pub mod routes;

use crate::errors::EngineError;
use crate::state::AppState;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

pub fn router(state: Arc<AppState>) -> Router {
    let cors = cors_layer(state.config.cors_origin.as_deref());

    Router::new()
        .route("/options-strategy-pnl", get(routes::get_strategy_pnl))
        .route("/options-strategy-pnl-custom", post(routes::post_strategy_pnl_custom))
        .route("/health", get(routes::health))
        .route("/api/counters", get(routes::get_counters))
        .layer(cors)
        .with_state(state)
}

/// `None` allows any origin. An origin that is not a valid header value
/// falls back to any, with a warning.
fn cors_layer(origin: Option<&str>) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    match origin {
        None => layer.allow_origin(Any),
        Some(origin) => match HeaderValue::from_str(origin) {
            Ok(value) => layer.allow_origin(AllowOrigin::exact(value)),
            Err(e) => {
                tracing::warn!(%origin, error = %e, "invalid CORS_ORIGIN, allowing any origin");
                layer.allow_origin(Any)
            }
        },
    }
}

impl IntoResponse for EngineError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            EngineError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            EngineError::Provider { .. } => (StatusCode::BAD_GATEWAY, format!("An error occurred: {self}")),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, format!("An error occurred: {self}")),
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}
