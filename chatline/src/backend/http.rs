//! HTTP implementation of the completion backend.

use std::time::Duration;

use async_trait::async_trait;

use super::{BackendError, ChatReply, ChatRequest, CompletionBackend};

/// Posts `{message}` to a chat endpoint such as the relay's `/api/chat`.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    url: String,
}

impl HttpBackend {
    pub fn new(url: impl Into<String>, timeout: Option<Duration>) -> Result<Self, BackendError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl CompletionBackend for HttpBackend {
    async fn complete(&self, message: &str) -> Result<String, BackendError> {
        let body = ChatRequest {
            message: message.to_string(),
        };

        let resp = self.client.post(&self.url).json(&body).send().await?;
        let status = resp.status();
        tracing::debug!(url = %self.url, %status, "Backend responded");

        if !status.is_success() {
            // The body may still carry the backend's own explanation.
            let reason = resp
                .json::<ChatReply>()
                .await
                .ok()
                .and_then(|reply| reply.error);
            return Err(reason.map_or(BackendError::Status(status.as_u16()), BackendError::Remote));
        }

        resp.json::<ChatReply>().await?.into_result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, routing::post, Json, Router};

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
        format!("http://{addr}/api/chat")
    }

    #[tokio::test]
    async fn returns_response_text() {
        let app = Router::new().route(
            "/api/chat",
            post(|Json(req): Json<ChatRequest>| async move {
                Json(ChatReply::ok(format!("echo: {}", req.message)))
            }),
        );
        let backend = HttpBackend::new(serve(app).await, None).unwrap();
        assert_eq!(backend.complete("hello").await.unwrap(), "echo: hello");
    }

    #[tokio::test]
    async fn non_success_status_uses_body_error() {
        let app = Router::new().route(
            "/api/chat",
            post(|| async {
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ChatReply::failed("upstream down")),
                )
            }),
        );
        let backend = HttpBackend::new(serve(app).await, None).unwrap();
        let err = backend.complete("hello").await.unwrap_err();
        assert_eq!(err.to_string(), "upstream down");
    }

    #[tokio::test]
    async fn non_success_status_uses_error_only_body() {
        let app = Router::new().route(
            "/api/chat",
            post(|| async {
                (
                    StatusCode::TOO_MANY_REQUESTS,
                    Json(serde_json::json!({"error": "rate limited"})),
                )
            }),
        );
        let backend = HttpBackend::new(serve(app).await, None).unwrap();
        let err = backend.complete("hello").await.unwrap_err();
        assert!(matches!(err, BackendError::Remote(ref r) if r == "rate limited"));
    }

    #[tokio::test]
    async fn non_success_status_without_body_reports_status() {
        let app = Router::new().route("/api/chat", post(|| async { StatusCode::BAD_GATEWAY }));
        let backend = HttpBackend::new(serve(app).await, None).unwrap();
        let err = backend.complete("hello").await.unwrap_err();
        assert!(matches!(err, BackendError::Status(502)));
    }

    #[tokio::test]
    async fn unsuccessful_reply_is_an_error() {
        let app = Router::new().route(
            "/api/chat",
            post(|| async { Json(ChatReply::failed("rate limited")) }),
        );
        let backend = HttpBackend::new(serve(app).await, None).unwrap();
        let err = backend.complete("hello").await.unwrap_err();
        assert!(matches!(err, BackendError::Remote(ref r) if r == "rate limited"));
    }

    #[tokio::test]
    async fn unreachable_backend_is_a_transport_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let backend = HttpBackend::new(format!("http://{addr}/api/chat"), None).unwrap();
        let err = backend.complete("hello").await.unwrap_err();
        assert!(matches!(err, BackendError::Transport(_)));
    }
}
