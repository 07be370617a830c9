//! Message pipeline: sends a user message and records the reply.
//!
//! One send may be in flight for the whole process. While it waits on the
//! backend the store stays unlocked, so switching, renaming, deleting and
//! creating sessions keep working; only a second send is turned away.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::backend::CompletionBackend;
use crate::models::MessageRole;
use crate::session::{derive_title, SharedStore};

/// Whether a send is currently in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Sending,
}

/// Why a send did nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// The message was blank after trimming.
    EmptyMessage,
    /// Another send has not resolved yet.
    Busy,
    /// The session to append to does not exist.
    NoSession,
}

/// Result of one send attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// Nothing was appended and the backend was not called.
    Rejected(RejectReason),
    /// The assistant reply was appended to `session_id`.
    Replied { session_id: String },
    /// An error message was appended to `session_id` instead of a reply.
    Failed { session_id: String, reason: String },
}

impl SendOutcome {
    /// The session the exchange was recorded in, if anything was recorded.
    pub fn session_id(&self) -> Option<&str> {
        match self {
            Self::Rejected(_) => None,
            Self::Replied { session_id } | Self::Failed { session_id, .. } => Some(session_id),
        }
    }
}

/// Text shown in the transcript when the backend call fails.
pub fn error_message(reason: &str) -> String {
    format!("Sorry, something went wrong: {reason}")
}

/// Drives sends against a shared store.
#[derive(Clone)]
pub struct MessagePipeline {
    store: SharedStore,
    backend: Arc<dyn CompletionBackend>,
    in_flight: Arc<AtomicBool>,
}

/// Clears the in-flight flag when the send finishes, however it finishes.
struct InFlightGuard(Arc<AtomicBool>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// A send that holds the in-flight flag but has not touched the store yet.
///
/// Dropping it without calling [`PendingSend::finish`] releases the flag.
pub struct PendingSend {
    pipeline: MessagePipeline,
    session_id: String,
    text: String,
    _guard: InFlightGuard,
}

impl MessagePipeline {
    pub fn new(store: SharedStore, backend: Arc<dyn CompletionBackend>) -> Self {
        Self {
            store,
            backend,
            in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    pub fn state(&self) -> PipelineState {
        if self.in_flight.load(Ordering::SeqCst) {
            PipelineState::Sending
        } else {
            PipelineState::Idle
        }
    }

    /// Send `text` from the current session and record the reply.
    pub async fn send(&self, text: &str) -> SendOutcome {
        let session_id = self.store.lock().await.current_id().to_string();
        self.send_to(&session_id, text).await
    }

    /// Send `text` in `session_id`, even if another session has become
    /// current since.
    pub async fn send_to(&self, session_id: &str, text: &str) -> SendOutcome {
        match self.begin(session_id, text) {
            Ok(pending) => pending.finish().await,
            Err(reason) => SendOutcome::Rejected(reason),
        }
    }

    /// Claim the in-flight flag for a send to `session_id`.
    ///
    /// The pipeline reads as [`PipelineState::Sending`] as soon as this
    /// returns `Ok`.
    pub fn begin(&self, session_id: &str, text: &str) -> Result<PendingSend, RejectReason> {
        let text = text.trim();
        if text.is_empty() {
            return Err(RejectReason::EmptyMessage);
        }
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            tracing::debug!("Send rejected, another send is in flight");
            return Err(RejectReason::Busy);
        }
        Ok(PendingSend {
            pipeline: self.clone(),
            session_id: session_id.to_string(),
            text: text.to_string(),
            _guard: InFlightGuard(Arc::clone(&self.in_flight)),
        })
    }
}

impl PendingSend {
    /// Record the user message, call the backend, record the reply.
    ///
    /// The first message of a session also names it. No retries: a failed
    /// call leaves exactly one error message in the transcript.
    pub async fn finish(self) -> SendOutcome {
        let Self {
            pipeline,
            session_id,
            text,
            _guard,
        } = self;

        {
            let mut store = pipeline.store.lock().await;
            let Some(session) = store.get(&session_id) else {
                return SendOutcome::Rejected(RejectReason::NoSession);
            };
            if session.is_empty() {
                store.rename_session(&session_id, &derive_title(&text));
            }
            store.append_message(&session_id, MessageRole::User, text.as_str());
        }

        tracing::debug!(session_id = %session_id, "Sending message to backend");
        let result = pipeline.backend.complete(&text).await;

        let mut store = pipeline.store.lock().await;
        match result {
            Ok(response) => {
                store.append_message(&session_id, MessageRole::Assistant, response);
                SendOutcome::Replied { session_id }
            }
            Err(e) => {
                let reason = e.to_string();
                tracing::warn!(session_id = %session_id, error = %reason, "Backend call failed");
                store.append_message(&session_id, MessageRole::Assistant, error_message(&reason));
                SendOutcome::Failed { session_id, reason }
            }
        }
    }
}
