//! In-memory session collection with write-through persistence.

use std::collections::HashSet;

use chrono::Utc;
use uuid::Uuid;

use crate::models::{MessageRole, Session};
use crate::storage::SessionStorage;

/// Owns every session and the current-session pointer.
///
/// There is always at least one session and exactly one of them is current.
/// Each operation that changes session state writes the whole collection to
/// storage before returning; write failures are logged and swallowed.
pub struct SessionStore {
    /// Sessions in insertion order.
    sessions: Vec<Session>,
    current_id: String,
    storage: Box<dyn SessionStorage>,
}

impl SessionStore {
    /// Load the stored collection, resuming the most recently updated
    /// session. An empty or unreadable store starts with one fresh session.
    pub fn open(storage: Box<dyn SessionStorage>) -> Self {
        let mut sessions = storage.load_or_empty();
        let mut seen = HashSet::new();
        sessions.retain(|s| seen.insert(s.id.clone()));

        tracing::debug!(count = sessions.len(), "Loaded sessions");

        let mut store = Self {
            sessions,
            current_id: String::new(),
            storage,
        };
        match store.most_recent_id() {
            Some(id) => store.current_id = id,
            None => {
                store.create_session();
            }
        }
        store
    }

    /// Like [`SessionStore::open`], but lands on a new chat. An untouched
    /// empty session at the top of the list is reused instead of piling up
    /// another one.
    pub fn open_fresh(storage: Box<dyn SessionStorage>) -> Self {
        let mut store = Self::open(storage);
        if !store.current().is_some_and(Session::is_empty) {
            store.create_session();
        }
        store
    }

    /// Create an empty session and make it current.
    pub fn create_session(&mut self) -> &Session {
        let id = self.fresh_id();
        let index = self.sessions.len();
        self.sessions.push(Session::new(id.clone(), Utc::now()));
        self.current_id = id;
        tracing::debug!(session_id = %self.current_id, "Created session");
        self.persist();
        &self.sessions[index]
    }

    /// Point the current-session pointer at `id`.
    ///
    /// Returns false and does nothing if `id` is unknown or already current.
    pub fn switch_current(&mut self, id: &str) -> bool {
        if id == self.current_id || !self.contains(id) {
            return false;
        }
        self.current_id = id.to_string();
        true
    }

    /// Remove a session. Deleting the current session moves the pointer to
    /// the most recently updated survivor, or to a fresh session if none is
    /// left.
    pub fn delete_session(&mut self, id: &str) -> bool {
        let Some(index) = self.position(id) else {
            return false;
        };
        self.sessions.remove(index);
        tracing::debug!(session_id = %id, "Deleted session");

        if self.current_id == id {
            match self.most_recent_id() {
                Some(next) => self.current_id = next,
                None => {
                    self.create_session();
                }
            }
        }
        self.persist();
        true
    }

    /// Set a session's title. Blank titles are ignored.
    pub fn rename_session(&mut self, id: &str, title: &str) -> bool {
        let title = title.trim();
        if title.is_empty() {
            return false;
        }
        let Some(session) = self.get_mut(id) else {
            return false;
        };
        session.title = title.to_string();
        session.touch(Utc::now());
        self.persist();
        true
    }

    /// Append a message to a session.
    pub fn append_message(&mut self, id: &str, role: MessageRole, content: impl Into<String>) -> bool {
        let Some(session) = self.get_mut(id) else {
            return false;
        };
        session.push(role, content.into(), Utc::now());
        self.persist();
        true
    }

    /// Sessions ordered by `updated_at`, newest first. Ties keep insertion
    /// order.
    pub fn list_sorted(&self) -> Vec<&Session> {
        let mut sorted: Vec<&Session> = self.sessions.iter().collect();
        sorted.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        sorted
    }

    /// The session new messages go to.
    pub fn current(&self) -> Option<&Session> {
        self.get(&self.current_id)
    }

    pub fn current_id(&self) -> &str {
        &self.current_id
    }

    pub fn get(&self, id: &str) -> Option<&Session> {
        self.sessions.iter().find(|s| s.id == id)
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Resolve a user-supplied session reference to an id.
    ///
    /// Accepts, in order: an exact id, a 1-based position in
    /// [`SessionStore::list_sorted`], or a prefix matching exactly one id.
    pub fn resolve(&self, reference: &str) -> Option<String> {
        let reference = reference.trim();
        if reference.is_empty() {
            return None;
        }
        if self.contains(reference) {
            return Some(reference.to_string());
        }
        if let Ok(position) = reference.parse::<usize>() {
            if let Some(session) = position
                .checked_sub(1)
                .and_then(|i| self.list_sorted().get(i).copied())
            {
                return Some(session.id.clone());
            }
        }

        let mut matches = self.sessions.iter().filter(|s| s.id.starts_with(reference));
        match (matches.next(), matches.next()) {
            (Some(only), None) => Some(only.id.clone()),
            _ => None,
        }
    }

    fn contains(&self, id: &str) -> bool {
        self.position(id).is_some()
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.sessions.iter().position(|s| s.id == id)
    }

    fn get_mut(&mut self, id: &str) -> Option<&mut Session> {
        self.sessions.iter_mut().find(|s| s.id == id)
    }

    fn most_recent_id(&self) -> Option<String> {
        self.list_sorted().first().map(|s| s.id.clone())
    }

    /// Generate a UUIDv7 not already used in this store.
    fn fresh_id(&self) -> String {
        loop {
            let id = Uuid::now_v7().to_string();
            if !self.contains(&id) {
                return id;
            }
        }
    }

    fn persist(&self) {
        if let Err(e) = self.storage.save(&self.sessions) {
            tracing::warn!(error = %e, "Failed to save sessions");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PLACEHOLDER_TITLE;
    use crate::storage::{encode_sessions, MemoryStorage};
    use chrono::{Duration, TimeZone};

    fn empty_store() -> (SessionStore, MemoryStorage) {
        let storage = MemoryStorage::new();
        (SessionStore::open(Box::new(storage.clone())), storage)
    }

    fn store_with(sessions: &[Session]) -> (SessionStore, MemoryStorage) {
        let storage = MemoryStorage::with_payload(&encode_sessions(sessions).unwrap());
        (SessionStore::open(Box::new(storage.clone())), storage)
    }

    fn assert_one_current(store: &SessionStore) {
        assert!(!store.is_empty());
        assert!(store.current().is_some());
        let current = store
            .list_sorted()
            .iter()
            .filter(|s| s.id == store.current_id())
            .count();
        assert_eq!(current, 1);
    }

    #[test]
    fn empty_storage_opens_with_one_fresh_session() {
        let (store, storage) = empty_store();
        assert_eq!(store.len(), 1);
        let current = store.current().unwrap();
        assert_eq!(current.title, PLACEHOLDER_TITLE);
        assert!(current.is_empty());
        assert_eq!(current.created_at, current.updated_at);
        assert!(storage.payload().is_some());
    }

    #[test]
    fn corrupt_storage_opens_with_one_fresh_session() {
        let storage = MemoryStorage::with_payload("][");
        let store = SessionStore::open(Box::new(storage));
        assert_eq!(store.len(), 1);
        assert!(store.current().unwrap().is_empty());
    }

    #[test]
    fn open_resumes_most_recently_updated_session() {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let older = Session::new("older".into(), t0);
        let newer = Session::new("newer".into(), t0 + Duration::hours(1));
        let (store, _) = store_with(&[newer, older]);
        assert_eq!(store.current_id(), "newer");
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn open_drops_duplicate_ids() {
        let t0 = Utc::now();
        let (store, _) = store_with(&[Session::new("dup".into(), t0), Session::new("dup".into(), t0)]);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn open_fresh_reuses_untouched_session() {
        let (mut store, storage) = empty_store();
        let id = store.current_id().to_string();
        store.append_message(&id, MessageRole::User, "hi");
        drop(store);

        let store = SessionStore::open_fresh(Box::new(storage.clone()));
        assert_eq!(store.len(), 2);
        assert_ne!(store.current_id(), id);
        let fresh = store.current_id().to_string();
        drop(store);

        let store = SessionStore::open_fresh(Box::new(storage));
        assert_eq!(store.len(), 2);
        assert_eq!(store.current_id(), fresh);
    }

    #[test]
    fn create_session_becomes_current_with_unique_id() {
        let (mut store, _) = empty_store();
        let first = store.current_id().to_string();
        let created = store.create_session().id.clone();
        assert_ne!(first, created);
        assert_eq!(store.current_id(), created);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn switch_ignores_unknown_and_current_ids() {
        let (mut store, _) = empty_store();
        let first = store.current_id().to_string();
        let second = store.create_session().id.clone();

        assert!(!store.switch_current("missing"));
        assert_eq!(store.current_id(), second);
        assert!(!store.switch_current(&second));
        assert!(store.switch_current(&first));
        assert_eq!(store.current_id(), first);
        assert!(!store.switch_current(&first));
    }

    #[test]
    fn deleting_last_session_creates_a_fresh_one() {
        let (mut store, _) = empty_store();
        let id = store.current_id().to_string();
        store.append_message(&id, MessageRole::User, "hello");
        store.rename_session(&id, "Custom");

        assert!(store.delete_session(&id));
        assert_eq!(store.len(), 1);
        let current = store.current().unwrap();
        assert_ne!(current.id, id);
        assert!(current.is_empty());
        assert_eq!(current.title, PLACEHOLDER_TITLE);
    }

    #[test]
    fn deleting_current_moves_to_most_recently_updated() {
        let (mut store, _) = empty_store();
        let a = store.current_id().to_string();
        let b = store.create_session().id.clone();
        let c = store.create_session().id.clone();
        store.append_message(&a, MessageRole::User, "bump a");
        store.switch_current(&c);

        assert!(store.delete_session(&c));
        assert_eq!(store.current_id(), a);
        assert!(store.get(&b).is_some());
    }

    #[test]
    fn deleting_other_session_keeps_current() {
        let (mut store, _) = empty_store();
        let a = store.current_id().to_string();
        let b = store.create_session().id.clone();
        assert!(store.delete_session(&a));
        assert_eq!(store.current_id(), b);
        assert!(!store.delete_session("missing"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn one_current_session_after_any_create_delete_sequence() {
        let (mut store, _) = empty_store();
        let mut created = vec![store.current_id().to_string()];
        for step in 0..24 {
            if step % 3 == 0 {
                if let Some(id) = created.pop() {
                    store.delete_session(&id);
                }
            } else if step % 5 == 0 {
                let id = store.current_id().to_string();
                store.delete_session(&id);
            } else {
                created.push(store.create_session().id.clone());
            }
            assert_one_current(&store);
        }
    }

    #[test]
    fn blank_rename_is_ignored() {
        let (mut store, _) = empty_store();
        let id = store.current_id().to_string();
        let before = store.current().unwrap().clone();

        assert!(!store.rename_session(&id, ""));
        assert!(!store.rename_session(&id, "  \t "));
        assert_eq!(store.current().unwrap(), &before);

        assert!(store.rename_session(&id, "  Trip plans  "));
        assert_eq!(store.current().unwrap().title, "Trip plans");
        assert!(!store.rename_session("missing", "x"));
    }

    #[test]
    fn append_refreshes_updated_at() {
        let (mut store, _) = empty_store();
        let id = store.current_id().to_string();
        let mut previous = store.current().unwrap().updated_at;

        for text in ["one", "two", "three"] {
            assert!(store.append_message(&id, MessageRole::User, text));
            let session = store.get(&id).unwrap();
            assert!(session.updated_at >= previous);
            assert!(session.messages.iter().all(|m| m.timestamp <= session.updated_at));
            previous = session.updated_at;
        }
        let contents: Vec<_> = store
            .get(&id)
            .unwrap()
            .messages
            .iter()
            .map(|m| m.content.as_str())
            .collect();
        assert_eq!(contents, vec!["one", "two", "three"]);
        assert!(!store.append_message("missing", MessageRole::User, "lost"));
    }

    #[test]
    fn list_sorted_is_stable_on_ties() {
        let t0 = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let sessions = [
            Session::new("first".into(), t0),
            Session::new("newest".into(), t0 + Duration::minutes(5)),
            Session::new("second".into(), t0),
            Session::new("third".into(), t0),
        ];
        let (store, _) = store_with(&sessions);

        for _ in 0..3 {
            let ids: Vec<_> = store.list_sorted().iter().map(|s| s.id.as_str()).collect();
            assert_eq!(ids, vec!["newest", "first", "second", "third"]);
        }
    }

    #[test]
    fn mutations_write_through_to_storage() {
        let (mut store, storage) = empty_store();
        let id = store.current_id().to_string();
        store.append_message(&id, MessageRole::User, "persist me");
        store.rename_session(&id, "Saved");

        let reopened = SessionStore::open(Box::new(storage));
        let session = reopened.get(&id).unwrap();
        assert_eq!(session.title, "Saved");
        assert_eq!(session.messages[0].content, "persist me");
        assert_eq!(session, store.get(&id).unwrap());
    }

    #[test]
    fn failed_saves_do_not_block_mutations() {
        let (mut store, storage) = empty_store();
        let id = store.current_id().to_string();
        storage.set_fail_saves(true);

        assert!(store.append_message(&id, MessageRole::User, "kept in memory"));
        assert!(store.rename_session(&id, "Still renamed"));
        assert_eq!(store.current().unwrap().messages.len(), 1);
        assert_eq!(store.current().unwrap().title, "Still renamed");

        let on_disk = SessionStore::open(Box::new(storage.clone()));
        assert!(on_disk.get(&id).unwrap().is_empty());
    }

    #[test]
    fn resolve_accepts_ids_positions_and_prefixes() {
        let t0 = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let sessions = [
            Session::new("abc123".into(), t0),
            Session::new("abd456".into(), t0 + Duration::minutes(1)),
        ];
        let (store, _) = store_with(&sessions);

        assert_eq!(store.resolve("abc123").as_deref(), Some("abc123"));
        assert_eq!(store.resolve("1").as_deref(), Some("abd456"));
        assert_eq!(store.resolve("2").as_deref(), Some("abc123"));
        assert_eq!(store.resolve("abc").as_deref(), Some("abc123"));
        assert_eq!(store.resolve("ab"), None);
        assert_eq!(store.resolve("0"), None);
        assert_eq!(store.resolve(" "), None);
    }
}
