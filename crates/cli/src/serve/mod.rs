//! `molt serve` -- HTTP JSON API for the translator and validator.
//!
//! Endpoints:
//! - GET  /health                       - Server status
//! - POST /translate                    - Forward or reverse translation
//! - POST /validate                     - Score a translation
//! - GET  /vocabulary?token_type=<cat>  - List the token vocabulary
//!
//! Every response body is an envelope `{"success": bool, "data"?, "error"?}`
//! with Content-Type: application/json. CORS is permissive.

mod handlers;
mod state;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::{Method, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use molt_core::{TranslateOptions, Translator};
use molt_validate::Validator;
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use self::handlers::{
    handle_health, handle_not_found, handle_translate, handle_validate, handle_vocabulary,
};
use self::state::AppState;

/// Maximum request body size: 1 MB.
const MAX_BODY_SIZE: usize = 1024 * 1024;

/// Successful envelope carrying `data`.
fn json_ok(data: impl Serialize) -> impl IntoResponse {
    let data = match serde_json::to_value(data) {
        Ok(v) => v,
        Err(e) => {
            return json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                &format!("serialization error: {}", e),
            )
            .into_response()
        }
    };
    (
        StatusCode::OK,
        Json(serde_json::json!({"success": true, "data": data})),
    )
        .into_response()
}

/// Error envelope with the given status code and message.
fn json_error(status: StatusCode, message: &str) -> impl IntoResponse {
    (
        status,
        Json(serde_json::json!({"success": false, "error": message})),
    )
}

fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/translate", post(handle_translate))
        .route("/validate", post(handle_validate))
        .route("/vocabulary", get(handle_vocabulary))
        .fallback(handle_not_found)
        .layer(cors)
        .layer(DefaultBodyLimit::max(MAX_BODY_SIZE))
        .with_state(state)
}

/// Start the HTTP server on the given port and run until Ctrl+C.
pub async fn start_server(
    port: u16,
    translator: Translator,
    validator: Validator,
    options: TranslateOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    let state = Arc::new(AppState::new(translator, validator, options));
    let app = router(state.clone());

    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    eprintln!("Molt server listening on http://0.0.0.0:{}", port);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!(cached = state.translator.cache_len(), "server stopped");
    eprintln!("\nServer shut down.");
    Ok(())
}

/// Wait for a shutdown signal (Ctrl+C).
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        eprintln!("failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
    eprintln!("\nReceived shutdown signal...");
}
