//! Completion backend contract.
//!
//! The backend receives one user message and answers with
//! `{success, response?, error?}`. Only the latest message is forwarded; no
//! earlier turns are sent.

mod http;

pub use http::HttpBackend;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Request body sent to the backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

/// Response body returned by the backend.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatReply {
    #[serde(default)]
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ChatReply {
    pub fn ok(response: impl Into<String>) -> Self {
        Self {
            success: true,
            response: Some(response.into()),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            response: None,
            error: Some(error.into()),
        }
    }

    /// Turn the reply into the assistant text or the failure reason.
    pub fn into_result(self) -> Result<String, BackendError> {
        if self.success {
            Ok(self.response.unwrap_or_default())
        } else {
            Err(BackendError::Remote(
                self.error
                    .unwrap_or_else(|| "No response received.".to_string()),
            ))
        }
    }
}

/// Why a completion attempt failed. The display form is shown to the user.
#[derive(Debug, Error)]
pub enum BackendError {
    /// The request never produced a readable response.
    #[error("{0}")]
    Transport(#[from] reqwest::Error),

    /// Non-2xx status without an error message in the body.
    #[error("HTTP error! status: {0}")]
    Status(u16),

    /// The backend reported a failure.
    #[error("{0}")]
    Remote(String),
}

/// Something that turns one user message into an assistant reply.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    async fn complete(&self, message: &str) -> Result<String, BackendError>;
}

#[cfg(test)]
pub mod testing {
    //! Scripted backends for pipeline tests.

    use std::collections::VecDeque;
    use std::sync::Mutex;

    use tokio::sync::Notify;

    use super::{async_trait, BackendError, ChatReply, CompletionBackend};

    /// Replays canned replies and records every message it was asked about.
    #[derive(Default)]
    pub struct ScriptedBackend {
        replies: Mutex<VecDeque<ChatReply>>,
        calls: Mutex<Vec<String>>,
        /// When set, each call waits for a notification before answering.
        pub gate: Option<Notify>,
        /// Notified once a call has been received.
        pub entered: Notify,
    }

    impl ScriptedBackend {
        pub fn replying(replies: impl IntoIterator<Item = ChatReply>) -> Self {
            Self {
                replies: Mutex::new(replies.into_iter().collect()),
                ..Self::default()
            }
        }

        pub fn gated(replies: impl IntoIterator<Item = ChatReply>) -> Self {
            Self {
                gate: Some(Notify::new()),
                ..Self::replying(replies)
            }
        }

        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CompletionBackend for ScriptedBackend {
        async fn complete(&self, message: &str) -> Result<String, BackendError> {
            self.calls.lock().unwrap().push(message.to_string());
            self.entered.notify_one();
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            let reply = self
                .replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| ChatReply::failed("script exhausted"));
            reply.into_result()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_without_response_is_empty_text() {
        let reply: ChatReply = serde_json::from_str(r#"{"success":true}"#).unwrap();
        assert_eq!(reply.into_result().unwrap(), "");
    }

    #[test]
    fn failure_carries_backend_reason() {
        let reply: ChatReply =
            serde_json::from_str(r#"{"success":false,"error":"rate limited"}"#).unwrap();
        let err = reply.into_result().unwrap_err();
        assert_eq!(err.to_string(), "rate limited");
    }

    #[test]
    fn failure_without_reason_has_default_text() {
        let err = ChatReply {
            success: false,
            ..ChatReply::default()
        }
        .into_result()
        .unwrap_err();
        assert_eq!(err.to_string(), "No response received.");
    }

    #[test]
    fn error_only_body_decodes_as_failure() {
        let reply: ChatReply = serde_json::from_str(r#"{"error":"rate limited"}"#).unwrap();
        assert!(!reply.success);
        assert_eq!(reply.into_result().unwrap_err().to_string(), "rate limited");
    }

    #[test]
    fn status_error_text() {
        assert_eq!(BackendError::Status(502).to_string(), "HTTP error! status: 502");
    }

    #[test]
    fn reply_omits_absent_fields() {
        let json = serde_json::to_string(&ChatReply::ok("hi")).unwrap();
        assert_eq!(json, r#"{"success":true,"response":"hi"}"#);
    }
}
