//! HTTP route handlers: health, translate, validate, vocabulary.

use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use molt_core::{parse, Category, Token, TokenKind, TranslateOptions};
use serde::Deserialize;

use super::state::AppState;
use super::{json_error, json_ok};

/// Fallback handler for unmatched routes.
pub(crate) async fn handle_not_found() -> impl IntoResponse {
    json_error(StatusCode::NOT_FOUND, "not found")
}

/// GET /health
pub(crate) async fn handle_health() -> impl IntoResponse {
    json_ok(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "services": {
            "translator": "ok",
            "validator": "ok",
        },
    }))
}

fn default_to_molt() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub(crate) struct TranslateRequest {
    text: String,
    #[serde(default = "default_to_molt")]
    to_molt: bool,
    target_language: Option<String>,
}

/// POST /translate
pub(crate) async fn handle_translate(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<TranslateRequest>, JsonRejection>,
) -> impl IntoResponse {
    let Json(request) = match payload {
        Ok(p) => p,
        Err(rejection) => {
            return json_error(StatusCode::BAD_REQUEST, &rejection.body_text()).into_response()
        }
    };

    let options = match request.target_language {
        Some(language) => TranslateOptions {
            human_language: language,
            ..state.options.clone()
        },
        None => state.options.clone(),
    };

    let data = if request.to_molt {
        let result = state.translator.translate_forward(&request.text, &options);
        serde_json::json!({
            "moltlang": result.text(),
            "token_count": result.token_count(),
            "original_token_count": result.original_token_count(),
            "efficiency": result.token_efficiency(),
            "confidence": result.confidence(),
        })
    } else {
        let result = state.translator.translate_reverse(&request.text, &options);
        serde_json::json!({
            "translation": result.text(),
            "token_count": result.token_count(),
            "confidence": result.confidence(),
        })
    };
    json_ok(data).into_response()
}

#[derive(Debug, Deserialize)]
pub(crate) struct ValidateRequest {
    original: String,
    translated: String,
}

/// POST /validate
pub(crate) async fn handle_validate(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ValidateRequest>, JsonRejection>,
) -> impl IntoResponse {
    let Json(request) = match payload {
        Ok(p) => p,
        Err(rejection) => {
            return json_error(StatusCode::BAD_REQUEST, &rejection.body_text()).into_response()
        }
    };

    let tokens = parse(&request.translated);
    let quality =
        state
            .validator
            .validate_translation(&request.original, &request.translated, Some(&tokens));
    json_ok(quality).into_response()
}

#[derive(Debug, Deserialize)]
pub(crate) struct VocabularyQuery {
    token_type: Option<String>,
}

/// GET /vocabulary?token_type=<category>
pub(crate) async fn handle_vocabulary(
    query: Result<Query<VocabularyQuery>, QueryRejection>,
) -> impl IntoResponse {
    let Query(query) = match query {
        Ok(q) => q,
        Err(rejection) => {
            return json_error(StatusCode::BAD_REQUEST, &rejection.body_text()).into_response()
        }
    };
    let category = match query.token_type.as_deref().map(str::parse::<Category>) {
        None => None,
        Some(Ok(category)) => Some(category),
        Some(Err(e)) => return json_error(StatusCode::BAD_REQUEST, &e.to_string()).into_response(),
    };

    let tokens: Vec<serde_json::Value> = TokenKind::ALL
        .iter()
        .filter(|kind| category.map_or(true, |c| kind.category() == c))
        .map(|kind| {
            serde_json::json!({
                "name": kind.to_string(),
                "value": Token::new(*kind),
            })
        })
        .collect();

    json_ok(serde_json::json!({
        "count": tokens.len(),
        "tokens": tokens,
        "filtered_by": category.map(Category::as_str),
    }))
    .into_response()
}
