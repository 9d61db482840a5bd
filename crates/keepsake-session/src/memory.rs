//! In-memory session store with recency-ordered expiry.

use std::sync::Arc;
use std::time::{Duration, Instant};

use lru::LruCache;
use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use crate::clock::{Clock, SystemClock};
use crate::error::Result;
use crate::session::SessionState;
use crate::store::{SessionStore, SweepReport};

/// Registry name of the in-memory backend.
pub const MEMORY_BACKEND: &str = "memory";

/// Entry stored in the recency list.
#[derive(Debug)]
struct Entry {
    state: Arc<SessionState>,
    last_accessed: Instant,
}

/// Snapshot of one recency entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecencyEntry {
    /// Session identifier.
    pub id: String,

    /// Last time the session was touched.
    pub last_accessed: Instant,
}

/// Inner state protected by the store mutex.
struct Inner {
    /// Sessions keyed by identifier, most recently touched first.
    sessions: LruCache<String, Entry>,

    /// Latest timestamp handed out. Stamps never go below it, which keeps
    /// the list in timestamp order even if the clock stalls.
    high_water: Option<Instant>,
}

impl Inner {
    fn stamp(&mut self, now: Instant) -> Instant {
        let stamp = match self.high_water {
            Some(high_water) if high_water > now => high_water,
            _ => now,
        };
        self.high_water = Some(stamp);
        stamp
    }

    fn get_or_insert(&mut self, session_id: &str, now: Instant) -> (Arc<SessionState>, bool) {
        if let Some(entry) = self.sessions.peek(session_id) {
            return (Arc::clone(&entry.state), false);
        }

        let state = Arc::new(SessionState::new(session_id));
        let last_accessed = self.stamp(now);
        self.sessions.put(
            session_id.to_string(),
            Entry {
                state: Arc::clone(&state),
                last_accessed,
            },
        );
        (state, true)
    }
}

/// Session store keeping all sessions in process memory.
///
/// A single mutex guards the identifier map and the recency list. The list
/// head is the most recently touched session and the tail the least, so
/// [`sweep`](SessionStore::sweep) pops from the tail until it meets a
/// session that is still fresh.
pub struct MemoryStore {
    inner: Mutex<Inner>,
    clock: Arc<dyn Clock>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Create an empty store using the system clock.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Create an empty store with a custom clock.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Mutex::new(Inner {
                sessions: LruCache::unbounded(),
                high_water: None,
            }),
            clock,
        }
    }

    /// Recency order, most recently touched first.
    pub fn recency(&self) -> Vec<RecencyEntry> {
        let inner = self.inner.lock();
        inner
            .sessions
            .iter()
            .map(|(id, entry)| RecencyEntry {
                id: id.clone(),
                last_accessed: entry.last_accessed,
            })
            .collect()
    }

    /// Last access time of a live session.
    pub fn last_accessed(&self, session_id: &str) -> Option<Instant> {
        let inner = self.inner.lock();
        inner.sessions.peek(session_id).map(|e| e.last_accessed)
    }
}

impl SessionStore for MemoryStore {
    fn kind(&self) -> &'static str {
        MEMORY_BACKEND
    }

    fn init(&self, session_id: &str) -> Result<Arc<SessionState>> {
        let mut inner = self.inner.lock();
        let (state, created) = inner.get_or_insert(session_id, self.clock.now());
        if created {
            debug!(
                session_id = %session_id,
                live = inner.sessions.len(),
                "Session created"
            );
        } else {
            warn!(session_id = %session_id, "Init on live session, reusing existing state");
        }
        Ok(state)
    }

    fn read(&self, session_id: &str) -> Result<Arc<SessionState>> {
        let mut inner = self.inner.lock();
        let (state, created) = inner.get_or_insert(session_id, self.clock.now());
        if created {
            debug!(
                session_id = %session_id,
                live = inner.sessions.len(),
                "Session not live, created on read"
            );
        } else {
            trace!(session_id = %session_id, "Session found");
        }
        Ok(state)
    }

    fn exists(&self, session_id: &str) -> bool {
        self.inner.lock().sessions.contains(session_id)
    }

    fn touch(&self, session_id: &str) {
        let mut inner = self.inner.lock();
        if !inner.sessions.contains(session_id) {
            return;
        }
        let stamp = inner.stamp(self.clock.now());
        if let Some(entry) = inner.sessions.get_mut(session_id) {
            entry.last_accessed = stamp;
        }
    }

    fn resume(&self, session_id: &str) -> Result<(Arc<SessionState>, bool)> {
        let mut inner = self.inner.lock();
        let now = self.clock.now();
        let (state, created) = inner.get_or_insert(session_id, now);
        if created {
            debug!(
                session_id = %session_id,
                live = inner.sessions.len(),
                "Session not live, created on resume"
            );
        } else {
            let stamp = inner.stamp(now);
            if let Some(entry) = inner.sessions.get_mut(session_id) {
                entry.last_accessed = stamp;
            }
        }
        Ok((state, created))
    }

    fn destroy(&self, session_id: &str) -> Result<()> {
        let mut inner = self.inner.lock();
        if inner.sessions.pop(session_id).is_some() {
            debug!(session_id = %session_id, "Session destroyed");
        }
        Ok(())
    }

    fn sweep(&self, max_idle: Duration) -> SweepReport {
        let mut inner = self.inner.lock();
        let now = self.clock.now();
        let mut report = SweepReport::default();

        while let Some((_, entry)) = inner.sessions.peek_lru() {
            report.inspected += 1;
            if now.saturating_duration_since(entry.last_accessed) < max_idle {
                break;
            }
            if let Some((session_id, _)) = inner.sessions.pop_lru() {
                trace!(session_id = %session_id, "Evicting idle session");
                report.evicted.push(session_id);
            }
        }

        if !report.evicted.is_empty() {
            debug!(
                evicted = report.evicted.len(),
                inspected = report.inspected,
                live = inner.sessions.len(),
                "Swept idle sessions"
            );
        }

        report
    }

    fn len(&self) -> usize {
        self.inner.lock().sessions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::clock::ManualClock;

    fn secs(n: u64) -> Duration {
        Duration::from_secs(n)
    }

    fn store() -> (MemoryStore, ManualClock) {
        let clock = ManualClock::new();
        (MemoryStore::with_clock(Arc::new(clock.clone())), clock)
    }

    fn assert_recency_ordered(store: &MemoryStore) {
        let recency = store.recency();
        for pair in recency.windows(2) {
            assert!(
                pair[0].last_accessed >= pair[1].last_accessed,
                "recency out of order: {:?}",
                recency
            );
        }
    }

    #[test]
    fn test_init_creates_empty_session() {
        let (store, _) = store();
        let state = store.init("session-1").unwrap();

        assert_eq!(state.id(), "session-1");
        assert!(store.exists("session-1"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_init_existing_returns_same_state() {
        let (store, clock) = store();
        let first = store.init("session-1").unwrap();
        let stamp = store.last_accessed("session-1");

        clock.advance(secs(5));
        let second = store.init("session-1").unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(store.last_accessed("session-1"), stamp);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_read_or_create() {
        let (store, _) = store();
        assert!(!store.exists("fresh"));

        let first = store.read("fresh").unwrap();
        assert!(store.exists("fresh"));

        let second = store.read("fresh").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_read_does_not_touch() {
        let (store, clock) = store();
        store.init("a").unwrap();
        clock.advance(secs(1));
        store.init("b").unwrap();

        clock.advance(secs(1));
        store.read("a").unwrap();

        let order: Vec<_> = store.recency().into_iter().map(|e| e.id).collect();
        assert_eq!(order, vec!["b", "a"]);
    }

    #[test]
    fn test_touch_moves_to_head() {
        let (store, clock) = store();
        for id in ["a", "b", "c"] {
            store.init(id).unwrap();
            clock.advance(secs(1));
        }

        store.touch("a");

        let order: Vec<_> = store.recency().into_iter().map(|e| e.id).collect();
        assert_eq!(order, vec!["a", "c", "b"]);
        assert_recency_ordered(&store);
    }

    #[test]
    fn test_resume_existing_touches() {
        let (store, clock) = store();
        store.init("a").unwrap();
        store.init("b").unwrap();
        clock.advance(secs(5));

        let (state, created) = store.resume("a").unwrap();

        assert!(!created);
        assert_eq!(state.id(), "a");
        assert_eq!(store.recency()[0].id, "a");
        assert_eq!(store.last_accessed("a"), Some(clock.now()));
    }

    #[test]
    fn test_resume_unknown_creates() {
        let (store, _) = store();
        let (state, created) = store.resume("gone").unwrap();

        assert!(created);
        assert_eq!(state.id(), "gone");
        assert!(store.exists("gone"));
    }

    #[test]
    fn test_touch_unknown_is_noop() {
        let (store, _) = store();
        store.touch("ghost");
        assert!(!store.exists("ghost"));
        assert!(store.is_empty());
    }

    #[test]
    fn test_recency_ordered_after_random_touches() {
        let (store, clock) = store();
        let ids: Vec<String> = (0..8).map(|i| format!("session-{}", i)).collect();
        for id in &ids {
            store.init(id).unwrap();
        }

        // Deterministic but scrambled touch sequence, with and without time passing.
        for step in 0..64usize {
            let id = &ids[(step * 5 + 3) % ids.len()];
            if step % 3 == 0 {
                clock.advance(Duration::from_millis(250));
            }
            store.touch(id);
            assert_recency_ordered(&store);
        }
        assert_eq!(store.recency().len(), ids.len());
    }

    #[test]
    fn test_timestamps_never_decrease() {
        let (store, clock) = store();
        store.init("a").unwrap();
        let mut last = store.last_accessed("a").unwrap();

        for _ in 0..10 {
            clock.advance(Duration::from_millis(10));
            store.touch("a");
            let now = store.last_accessed("a").unwrap();
            assert!(now >= last);
            last = now;
        }
    }

    #[test]
    fn test_destroy_is_idempotent() {
        let (store, _) = store();
        store.init("a").unwrap();
        store.init("b").unwrap();

        store.destroy("a").unwrap();
        let after_first = store.recency();
        store.destroy("a").unwrap();

        assert_eq!(store.recency(), after_first);
        assert!(!store.exists("a"));
        assert!(store.exists("b"));
    }

    #[test]
    fn test_sweep_evicts_exactly_expired() {
        let (store, clock) = store();
        // Created at t = 0, 10, 20, 30, 40.
        for i in 0..5 {
            store.init(&format!("s{}", i)).unwrap();
            clock.advance(secs(10));
        }
        // now = 50; with L = 25, idle times are 50, 40, 30, 20, 10.
        let report = store.sweep(secs(25));

        assert_eq!(report.evicted, vec!["s0", "s1", "s2"]);
        assert!(!store.exists("s0"));
        assert!(!store.exists("s2"));
        assert!(store.exists("s3"));
        assert!(store.exists("s4"));
        assert_eq!(store.recency().len(), 2);
    }

    #[test]
    fn test_sweep_threshold_is_inclusive() {
        let (store, clock) = store();
        store.init("a").unwrap();
        clock.advance(secs(60));

        let report = store.sweep(secs(60));
        assert_eq!(report.evicted, vec!["a"]);
    }

    #[test]
    fn test_sweep_stops_at_first_fresh_session() {
        let (store, clock) = store();
        for i in 0..10 {
            store.init(&format!("s{}", i)).unwrap();
            clock.advance(secs(1));
        }
        // now = 10; s0..s2 have idle >= 8.
        let report = store.sweep(secs(8));

        assert_eq!(report.evicted_count(), 3);
        assert_eq!(report.inspected, report.evicted_count() + 1);
    }

    #[test]
    fn test_sweep_all_expired_inspects_each_once() {
        let (store, clock) = store();
        for i in 0..4 {
            store.init(&format!("s{}", i)).unwrap();
        }
        clock.advance(secs(100));

        let report = store.sweep(secs(10));

        assert_eq!(report.evicted_count(), 4);
        assert_eq!(report.inspected, 4);
        assert!(store.is_empty());
    }

    #[test]
    fn test_sweep_empty_store() {
        let (store, _) = store();
        let report = store.sweep(secs(10));
        assert_eq!(report, SweepReport::default());
    }

    #[test]
    fn test_concurrent_touch_keeps_single_entry() {
        let (store, clock) = store();
        store.init("shared").unwrap();

        std::thread::scope(|scope| {
            for _ in 0..16 {
                scope.spawn(|| {
                    for _ in 0..100 {
                        store.touch("shared");
                    }
                });
            }
        });

        clock.advance(secs(1));
        let report = store.sweep(secs(60));

        assert!(report.evicted.is_empty());
        let recency = store.recency();
        assert_eq!(recency.len(), 1);
        assert_eq!(recency[0].id, "shared");
    }

    #[test]
    fn test_touch_rescues_older_session() {
        let (store, clock) = store();
        clock.set(secs(0));
        store.init("A").unwrap();
        clock.set(secs(10));
        store.init("B").unwrap();
        clock.set(secs(50));
        store.touch("A");
        clock.set(secs(65));

        let report = store.sweep(secs(60));

        assert_eq!(report.evicted, vec!["B"]);
        assert!(store.exists("A"));
        assert!(!store.exists("B"));
    }
}
