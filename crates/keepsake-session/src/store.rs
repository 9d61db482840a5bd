//! Capability trait for session storage backends.
//!
//! A backend owns every live session of one store instance together with
//! the recency order used for expiry. Managers hold a [`SharedStore`] and
//! never keep session state themselves.

use std::sync::Arc;
use std::time::Duration;

use crate::error::Result;
use crate::session::SessionState;

/// Trait for session storage backends.
///
/// All operations must be safe to call concurrently. Structural changes
/// (insert, remove, reorder) are atomic with respect to each other.
pub trait SessionStore: Send + Sync {
    /// Short name of the storage medium, e.g. `"memory"`.
    fn kind(&self) -> &'static str;

    /// Create a session with an empty payload.
    ///
    /// If `session_id` is already live, the existing session is returned
    /// unchanged.
    fn init(&self, session_id: &str) -> Result<Arc<SessionState>>;

    /// Look up a live session without updating its recency.
    ///
    /// Unknown or expired identifiers behave like [`init`](Self::init).
    fn read(&self, session_id: &str) -> Result<Arc<SessionState>>;

    /// Whether `session_id` currently names a live session.
    fn exists(&self, session_id: &str) -> bool;

    /// Mark the session as accessed now. No-op for non-live identifiers.
    fn touch(&self, session_id: &str);

    /// Read-or-create `session_id` and mark it accessed, as one step.
    ///
    /// Returns the state and whether the session was created by this call.
    /// No sweep can evict the session between the lookup and the touch.
    fn resume(&self, session_id: &str) -> Result<(Arc<SessionState>, bool)>;

    /// Remove a session. No-op for non-live identifiers.
    fn destroy(&self, session_id: &str) -> Result<()>;

    /// Evict sessions idle for at least `max_idle`, least recent first.
    ///
    /// Stops at the first session still within its lifetime.
    fn sweep(&self, max_idle: Duration) -> SweepReport;

    /// Number of live sessions.
    fn len(&self) -> usize;

    /// Check if there are no live sessions.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Shared handle to a backend.
pub type SharedStore = Arc<dyn SessionStore>;

/// Outcome of a single sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Number of recency entries examined.
    pub inspected: usize,

    /// Identifiers evicted, least recently touched first.
    pub evicted: Vec<String>,
}

impl SweepReport {
    /// Number of evicted sessions.
    pub fn evicted_count(&self) -> usize {
        self.evicted.len()
    }
}
