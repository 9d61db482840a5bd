//! Session manager: binds callers to sessions in a chosen backend.
//!
//! The manager holds no session state of its own. It picks a backend from a
//! [`StoreRegistry`] once, at construction, and delegates every lifecycle
//! operation to it.

use std::sync::Arc;
use std::time::Duration;

use axum::http::{HeaderMap, HeaderValue};
use keepsake_session::{Session, SharedStore, StoreConfig, StoreRegistry, SweepReport};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::cookie;
use crate::error::{Result, ServerError};
use crate::gc::GcTask;
use crate::id::{self, OsRngIdGenerator, SessionIdGenerator};

/// Session obtained by [`Manager::start_session`].
#[derive(Debug, Clone)]
pub struct StartedSession {
    /// Handle to the session.
    pub session: Session,

    /// Whether the backend created the session during this call.
    pub is_new: bool,
}

impl StartedSession {
    /// Session identifier.
    pub fn id(&self) -> &str {
        self.session.id()
    }
}

/// Mediates between callers and one session backend.
pub struct Manager {
    store: SharedStore,
    backend: String,
    cookie_name: String,
    config: StoreConfig,
    ids: Arc<dyn SessionIdGenerator>,
}

impl std::fmt::Debug for Manager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Manager")
            .field("backend", &self.backend)
            .field("cookie_name", &self.cookie_name)
            .field("config", &self.config)
            .finish()
    }
}

impl Manager {
    /// Create a manager over a backend from the process-wide registry.
    pub fn new(backend: &str, cookie_name: &str, max_lifetime: Duration) -> Result<Self> {
        let store = keepsake_session::lookup(backend)?;
        Ok(Self::with_store(
            backend,
            store,
            cookie_name,
            StoreConfig::new().with_max_idle(max_lifetime),
        ))
    }

    /// Create a manager over a backend from an explicit registry.
    pub fn from_registry(
        registry: &StoreRegistry,
        backend: &str,
        cookie_name: &str,
        config: StoreConfig,
    ) -> Result<Self> {
        let store = registry.get(backend)?;
        Ok(Self::with_store(backend, store, cookie_name, config))
    }

    /// Create a manager over an already resolved backend.
    pub fn with_store(
        backend: impl Into<String>,
        store: SharedStore,
        cookie_name: impl Into<String>,
        config: StoreConfig,
    ) -> Self {
        Self {
            store,
            backend: backend.into(),
            cookie_name: cookie_name.into(),
            config,
            ids: Arc::new(OsRngIdGenerator),
        }
    }

    /// Replace the identifier generator.
    pub fn with_id_generator(mut self, ids: impl SessionIdGenerator + 'static) -> Self {
        self.ids = Arc::new(ids);
        self
    }

    /// Name of the selected backend.
    pub fn backend(&self) -> &str {
        &self.backend
    }

    /// The selected backend.
    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    /// Cookie carrying the session identifier.
    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    /// Idle lifetime of sessions.
    pub fn max_lifetime(&self) -> Duration {
        self.config.max_idle
    }

    /// Expiry configuration.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Resume the session named by `existing`, or start a fresh one.
    ///
    /// A well-formed identifier is resumed in the backend, which creates it
    /// if it is not live and touches it in the same step. A missing or
    /// malformed identifier gets a freshly generated one.
    pub fn start_session(&self, existing: Option<&str>) -> Result<StartedSession> {
        match existing.filter(|sid| id::is_well_formed(sid)) {
            Some(sid) => {
                let (state, is_new) = self.store.resume(sid)?;
                debug!(session_id = %sid, is_new, "Session resumed");
                Ok(StartedSession {
                    session: Session::new(state, Arc::clone(&self.store)),
                    is_new,
                })
            }
            None => {
                let sid = self.ids.generate()?;
                let state = self.store.init(&sid)?;
                debug!(session_id = %sid, "Session started");
                Ok(StartedSession {
                    session: Session::new(state, Arc::clone(&self.store)),
                    is_new: true,
                })
            }
        }
    }

    /// Start or resume the session named by the request's cookie.
    pub fn start_from_headers(&self, headers: &HeaderMap) -> Result<StartedSession> {
        let existing = cookie::extract_session_id(headers, &self.cookie_name);
        self.start_session(existing.as_deref())
    }

    /// Destroy a session. Unknown identifiers are ignored.
    pub fn end_session(&self, session_id: &str) -> Result<()> {
        self.store.destroy(session_id)?;
        debug!(session_id = %session_id, "Session ended");
        Ok(())
    }

    /// Destroy the session named by the request's cookie, if any.
    ///
    /// Returns the identifier that was ended.
    pub fn end_from_headers(&self, headers: &HeaderMap) -> Result<Option<String>> {
        match cookie::extract_session_id(headers, &self.cookie_name) {
            Some(sid) => {
                self.end_session(&sid)?;
                Ok(Some(sid))
            }
            None => Ok(None),
        }
    }

    /// `Set-Cookie` value issuing `session_id`.
    pub fn session_cookie(&self, session_id: &str) -> Result<HeaderValue> {
        cookie::session_cookie(&self.cookie_name, session_id, self.config.max_idle)
            .map_err(|e| ServerError::Internal(format!("invalid session cookie: {}", e)))
    }

    /// `Set-Cookie` value dropping the session cookie.
    pub fn expired_cookie(&self) -> Result<HeaderValue> {
        cookie::expired_cookie(&self.cookie_name)
            .map_err(|e| ServerError::Internal(format!("invalid session cookie: {}", e)))
    }

    /// Run one sweep with the configured idle lifetime.
    pub fn run_gc(&self) -> SweepReport {
        self.store.sweep(self.config.max_idle)
    }

    /// Spawn the recurring sweep on the current runtime.
    pub fn spawn_gc(&self) -> GcTask {
        self.spawn_gc_with_token(CancellationToken::new())
    }

    /// Spawn the recurring sweep, stopped by `cancel`.
    pub fn spawn_gc_with_token(&self, cancel: CancellationToken) -> GcTask {
        GcTask::spawn_with_token(
            Arc::clone(&self.store),
            self.config.max_idle,
            self.config.gc_interval(),
            cancel,
        )
    }
}
