use crate::config::ProxyConfig;
use crate::error::{ProxyError, Result};
use crate::logging::{RequestLogger, SharedLogger};
use crate::proxy;
use crate::translate::response::ChatOutcome;
use crate::translate::types::{ChatReply, ChatRequest, ErrorBody, ForecastRequest};

use axum::extract::State;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

/// Response header carrying the id stamped on this request's log entries.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

const MISSING_KEY_MESSAGE: &str = "API key not configured on the server.";
const TRANSPORT_FAILURE_MESSAGE: &str = "Failed to communicate with the upstream API.";
const INTERNAL_ERROR_MESSAGE: &str = "An internal server error occurred.";

#[derive(Clone)]
pub struct AppState {
    pub config: ProxyConfig,
    pub client: reqwest::Client,
    pub logger: SharedLogger,
    /// Resolved once at startup. `None` makes every proxied request fail fast.
    pub api_key: Option<String>,
}

impl AppState {
    /// Build the upstream client and register the key for log scrubbing.
    pub fn new(config: ProxyConfig, api_key: Option<String>, logger: SharedLogger) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.request_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder.build()?;

        if let Some(ref key) = api_key {
            logger.redact(key.clone());
        }

        Ok(Self {
            config,
            client,
            logger,
            api_key,
        })
    }
}

pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let static_files =
        ServeDir::new(&state.config.static_dir).append_index_html_on_directories(true);

    Router::new()
        .route("/api/chat", post(handle_chat))
        .route("/api/forecast", post(handle_forecast))
        .route("/health", get(handle_health))
        .fallback_service(static_files)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn json_error(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(ErrorBody::new(message))).into_response()
}

/// Resolve the key or explain why the request cannot be proxied.
fn require_key<'a>(state: &'a AppState, log: &RequestLogger) -> Option<&'a str> {
    let key = state.api_key.as_deref();
    if key.is_none() {
        log.error(
            "server",
            format!(
                "Rejecting request: environment variable '{}' is not set",
                state.config.api_key_env()
            ),
        );
    }
    key
}

fn with_request_id(mut response: Response, log: &RequestLogger) -> Response {
    if let Ok(value) = HeaderValue::from_str(&log.request_id().to_string()) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

async fn handle_chat(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    let log = state.logger.for_request(Uuid::new_v4());
    let response = chat_response(&state, &body, &log).await;
    with_request_id(response, &log)
}

async fn chat_response(state: &AppState, body: &[u8], log: &RequestLogger) -> Response {
    let Some(api_key) = require_key(state, log) else {
        return json_error(StatusCode::INTERNAL_SERVER_ERROR, MISSING_KEY_MESSAGE);
    };

    let messages = match serde_json::from_slice::<ChatRequest>(body)
        .map_err(|e| ProxyError::validation(format!("Invalid request body: {e}")))
        .and_then(ChatRequest::into_messages)
    {
        Ok(messages) => messages,
        Err(e) => {
            log.warn("server", e.to_string());
            return json_error(StatusCode::BAD_REQUEST, e.detail());
        }
    };

    match proxy::proxy_chat(&messages, &state.config, api_key, &state.client, log).await {
        Ok(ChatOutcome::Rejected { message, status }) => {
            let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            json_error(status, message)
        }
        Ok(outcome) => {
            let text = outcome.reply_text().unwrap_or_default();
            Json(ChatReply::new(text)).into_response()
        }
        Err(e @ ProxyError::Validation { .. }) => {
            log.warn("server", e.to_string());
            json_error(StatusCode::BAD_REQUEST, e.detail())
        }
        Err(e) => {
            log.error("server", format!("Proxy error: {e}"));
            let message = if e.is_transport() {
                TRANSPORT_FAILURE_MESSAGE
            } else {
                INTERNAL_ERROR_MESSAGE
            };
            json_error(StatusCode::INTERNAL_SERVER_ERROR, message)
        }
    }
}

/// Single-prompt entry point. Answers in plain text, and any upstream failure
/// is reported as a bare 500.
async fn handle_forecast(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    let log = state.logger.for_request(Uuid::new_v4());
    let response = forecast_response(&state, &body, &log).await;
    with_request_id(response, &log)
}

async fn forecast_response(state: &AppState, body: &[u8], log: &RequestLogger) -> Response {
    let Some(api_key) = require_key(state, log) else {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            "API key is not configured on the server.",
        )
            .into_response();
    };

    let prompt = match serde_json::from_slice::<ForecastRequest>(body)
        .unwrap_or_default()
        .into_prompt()
    {
        Ok(prompt) => prompt,
        Err(e) => {
            log.warn("server", e.to_string());
            return (StatusCode::BAD_REQUEST, e.detail()).into_response();
        }
    };

    match proxy::proxy_forecast(&prompt, &state.config, api_key, &state.client, log).await {
        Ok(outcome) => match outcome.reply_text() {
            Some(text) => (StatusCode::OK, text.to_string()).into_response(),
            None => (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR_MESSAGE).into_response(),
        },
        Err(e) => {
            log.error("server", format!("Forecast proxy error: {e}"));
            (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR_MESSAGE).into_response()
        }
    }
}

async fn handle_health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
