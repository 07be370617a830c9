//! Chat relay server.
//!
//! Stateless HTTP front for an OpenAI-compatible completions endpoint:
//! - POST /api/chat - `{message}` in, `{success, response?, error?}` out
//!
//! Each request forwards the configured system prompt plus the one user
//! message. Nothing is stored.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tower_http::cors::CorsLayer;

use crate::backend::ChatReply;
use crate::config::RelayConfig;

/// Shared relay state.
pub struct RelayState {
    client: reqwest::Client,
    config: RelayConfig,
}

impl RelayState {
    pub fn new(config: RelayConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }
}

// === Request/Response Types ===

#[derive(Debug, Deserialize)]
pub struct RelayRequest {
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Serialize)]
struct UpstreamRequest<'a> {
    model: &'a str,
    messages: [UpstreamMessage<'a>; 2],
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct UpstreamMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct UpstreamResponse {
    #[serde(default)]
    choices: Vec<UpstreamChoice>,
}

#[derive(Debug, Deserialize)]
struct UpstreamChoice {
    message: UpstreamChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct UpstreamChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Failures reported to the client as `500 {success:false, error}`.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("API Error: {status} - {body}")]
    Upstream { status: u16, body: String },

    #[error("{0}")]
    Transport(#[from] reqwest::Error),

    #[error("Upstream returned no choices")]
    NoChoices,
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        tracing::error!(error = %self, "Relay request failed");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ChatReply::failed(self.to_string())),
        )
            .into_response()
    }
}

// === Server Lifecycle ===

/// Build the relay router.
pub fn router(state: Arc<RelayState>) -> Router {
    Router::new()
        .route("/api/chat", post(chat_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Run the relay on `127.0.0.1:<config.port>` until the process is stopped.
pub async fn start_server(config: RelayConfig) -> Result<()> {
    if config.api_key.is_none() {
        tracing::warn!("No upstream API key configured; requests are sent unauthenticated");
    }

    let addr = SocketAddr::from(([127, 0, 0, 1], config.port));
    let upstream = config.upstream_url.clone();
    let app = router(Arc::new(RelayState::new(config)));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    println!("chatline relay running at http://{addr}");
    tracing::info!(%addr, %upstream, "Relay listening");

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}

// === Handlers ===

async fn chat_handler(
    State(state): State<Arc<RelayState>>,
    body: Result<Json<RelayRequest>, JsonRejection>,
) -> Result<Json<ChatReply>, Response> {
    let message = match body {
        Ok(Json(RelayRequest {
            message: Some(message),
        })) if !message.is_empty() => message,
        _ => {
            tracing::info!("Rejected request without a message");
            return Err((
                StatusCode::BAD_REQUEST,
                Json(ChatReply::failed("Message is required")),
            )
                .into_response());
        }
    };

    tracing::info!(chars = message.chars().count(), "Relaying message");
    let content = complete_upstream(&state, &message)
        .await
        .map_err(IntoResponse::into_response)?;
    tracing::info!(chars = content.chars().count(), "Upstream replied");

    Ok(Json(ChatReply::ok(content)))
}

async fn complete_upstream(state: &RelayState, message: &str) -> Result<String, RelayError> {
    let config = &state.config;
    let body = UpstreamRequest {
        model: &config.model,
        messages: [
            UpstreamMessage {
                role: "system",
                content: &config.system_prompt,
            },
            UpstreamMessage {
                role: "user",
                content: message,
            },
        ],
        max_tokens: config.max_tokens,
        temperature: config.temperature,
    };

    let mut request = state.client.post(&config.upstream_url).json(&body);
    if let Some(key) = &config.api_key {
        request = request.bearer_auth(key);
    }

    let resp = request.send().await?;
    let status = resp.status();
    tracing::debug!(%status, "Upstream responded");

    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(RelayError::Upstream {
            status: status.as_u16(),
            body,
        });
    }

    let data: UpstreamResponse = resp.json().await?;
    data.choices
        .into_iter()
        .next()
        .map(|choice| choice.message.content.unwrap_or_default())
        .ok_or(RelayError::NoChoices)
}
