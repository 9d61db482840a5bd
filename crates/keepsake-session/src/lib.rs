//! Session store backends with recency-ordered expiry.
//!
//! This crate owns the server-side state of every live session:
//! - A [`SessionStore`] capability trait that backends implement
//! - [`MemoryStore`], an in-process backend keeping sessions in recency order
//! - A write-once [`StoreRegistry`] for selecting backends by name
//! - [`Session`] handles that touch the session on every access
//!
//! Sweeping walks the recency order from the least recently touched end and
//! stops at the first session that is still within its idle lifetime, so a
//! sweep costs O(expired) rather than O(live).
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use std::time::Duration;
//! use keepsake_session::{MemoryStore, Session, SharedStore};
//!
//! let store: SharedStore = Arc::new(MemoryStore::new());
//! let session = Session::open(&store, "some-session-id")?;
//! session.set("user", "alice");
//!
//! let report = store.sweep(Duration::from_secs(3600));
//! ```

mod clock;
mod config;
mod error;
mod memory;
mod registry;
mod session;
mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::StoreConfig;
pub use error::{Error, Result};
pub use memory::{MEMORY_BACKEND, MemoryStore, RecencyEntry};
pub use registry::{StoreRegistry, global_registry, lookup};
pub use session::{Payload, Session, SessionState};
pub use store::{SessionStore, SharedStore, SweepReport};
