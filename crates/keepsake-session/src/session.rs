//! Session state and the handle callers mutate it through.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde_json::Value;
use tracing::trace;

use crate::error::Result;
use crate::store::SharedStore;

/// Key/value payload of a session.
pub type Payload = HashMap<String, Value>;

/// Server-side state of one session.
///
/// Owned by the backend; handles share it through an [`Arc`] so every
/// lookup of the same live identifier observes the same payload.
#[derive(Debug)]
pub struct SessionState {
    id: String,
    created_at: DateTime<Utc>,
    values: Mutex<Payload>,
}

impl SessionState {
    /// Create an empty session state.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            created_at: Utc::now(),
            values: Mutex::new(Payload::new()),
        }
    }

    /// Session identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Wall-clock creation time.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Handle to a live session.
///
/// Every accessor touches the session in its store, keeping it at the
/// head of the recency order. Payload access is serialized per session.
#[derive(Clone)]
pub struct Session {
    state: Arc<SessionState>,
    store: SharedStore,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.state.id)
            .field("store", &self.store.kind())
            .finish()
    }
}

impl Session {
    /// Wrap backend state in a handle bound to `store`.
    pub fn new(state: Arc<SessionState>, store: SharedStore) -> Self {
        Self { state, store }
    }

    /// Read-or-create `session_id` in `store` and return a handle to it.
    pub fn open(store: &SharedStore, session_id: &str) -> Result<Self> {
        let state = store.read(session_id)?;
        Ok(Self::new(state, Arc::clone(store)))
    }

    /// Session identifier.
    pub fn id(&self) -> &str {
        &self.state.id
    }

    /// Wall-clock creation time.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.state.created_at
    }

    /// Get a value.
    pub fn get(&self, key: &str) -> Option<Value> {
        let value = self.state.values.lock().get(key).cloned();
        self.touch();
        value
    }

    /// Set a value, returning the previous one.
    pub fn set(&self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        let previous = self.state.values.lock().insert(key.into(), value.into());
        self.touch();
        previous
    }

    /// Delete a value, returning it if present.
    pub fn delete(&self, key: &str) -> Option<Value> {
        let removed = self.state.values.lock().remove(key);
        self.touch();
        removed
    }

    /// Snapshot of the whole payload.
    pub fn values(&self) -> Payload {
        let values = self.state.values.lock().clone();
        self.touch();
        values
    }

    /// Whether the session is still live in its store.
    pub fn is_live(&self) -> bool {
        self.store.exists(&self.state.id)
    }

    /// Whether both handles share the same underlying state.
    pub fn same_state(&self, other: &Session) -> bool {
        Arc::ptr_eq(&self.state, &other.state)
    }

    fn touch(&self) {
        trace!(session_id = %self.state.id, "Touching session");
        self.store.touch(&self.state.id);
    }
}
