//! Session store: the single source of truth for conversation state.

mod store;
mod title;

use std::sync::Arc;

use tokio::sync::Mutex;

pub use store::SessionStore;
pub use title::derive_title;

/// Store handle shared between the pipeline and the interface.
pub type SharedStore = Arc<Mutex<SessionStore>>;

impl SessionStore {
    /// Wrap the store in a shareable handle.
    pub fn into_shared(self) -> SharedStore {
        Arc::new(Mutex::new(self))
    }
}
