//! Deferred close: removed sessions linger for a grace period.
//!
//! When the server drops a session it usually has just queued a final
//! packet for it (an error code, a kick notice). Closing the socket right
//! away could cut that packet off. Instead the session and whatever
//! resource keeps its connection open go into a [`DeferredCloseSet`],
//! and the server's loop sweeps out entries whose grace period is over.
//!
//! The set is generic over the resource so this crate doesn't need to
//! know about readers, writers or sockets.

use std::time::{Duration, Instant};

use felt_transport::ConnectionId;

use crate::SessionData;

/// One session waiting to be released.
#[derive(Debug)]
pub struct DeferredClose<T> {
    /// When the session was removed from the registry.
    pub removed_at: Instant,
    pub session: SessionData,
    /// Keeps the connection open until the entry is swept.
    pub resource: T,
}

/// Sessions removed from the registry but not yet released.
///
/// Owned by the server core; no locking.
///
/// ## Timeline of one entry
///
/// ```text
///  insert()                          sweep() returns it
///     │                                     │
///     ▼                                     ▼
///  ───●──────────── grace ─────────────────●────────→ time
///     removed_at    (still held,           elapsed >= grace:
///                    queued writes flush)  caller releases resource
/// ```
///
/// A sweep before the grace period ends leaves the entry in place; the
/// resource is dropped only by the caller that received it.
#[derive(Debug)]
pub struct DeferredCloseSet<T> {
    grace: Duration,
    entries: Vec<DeferredClose<T>>,
}

impl<T> DeferredCloseSet<T> {
    /// Creates an empty set releasing entries `grace` after removal.
    pub fn new(grace: Duration) -> Self {
        Self {
            grace,
            entries: Vec::new(),
        }
    }

    /// The configured grace period.
    pub fn grace(&self) -> Duration {
        self.grace
    }

    /// Adds a session removed now.
    pub fn insert(&mut self, session: SessionData, resource: T) {
        self.insert_at(session, resource, Instant::now());
    }

    /// Adds a session removed at `removed_at`.
    pub fn insert_at(&mut self, session: SessionData, resource: T, removed_at: Instant) {
        tracing::debug!(conn_id = %session.conn_id, "session queued for deferred close");
        self.entries.push(DeferredClose {
            removed_at,
            session,
            resource,
        });
    }

    /// Removes and returns every entry whose grace period is over.
    pub fn sweep(&mut self) -> Vec<DeferredClose<T>> {
        self.sweep_at(Instant::now())
    }

    /// Like [`sweep`](Self::sweep), measured against `now`.
    ///
    /// An entry is due once at least `grace` has passed since removal.
    /// Entries stamped in the future are kept.
    pub fn sweep_at(&mut self, now: Instant) -> Vec<DeferredClose<T>> {
        let grace = self.grace;
        let (due, keep): (Vec<_>, Vec<_>) = std::mem::take(&mut self.entries)
            .into_iter()
            .partition(|entry| {
                now.checked_duration_since(entry.removed_at)
                    .is_some_and(|elapsed| elapsed >= grace)
            });
        self.entries = keep;

        for entry in &due {
            tracing::debug!(conn_id = %entry.session.conn_id, "deferred close released");
        }
        due
    }

    /// Returns `true` if a session with this handle is waiting.
    pub fn contains(&self, conn_id: ConnectionId) -> bool {
        self.entries.iter().any(|e| e.session.conn_id == conn_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drops every entry, releasing all resources immediately.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use felt_protocol::SessionId;

    const GRACE: Duration = Duration::from_secs(10);
    const EPSILON: Duration = Duration::from_millis(1);

    fn session(id: u64) -> SessionData {
        SessionData::new(ConnectionId::new(id), SessionId(id as u32))
    }

    #[test]
    fn test_sweep_before_grace_keeps_entry() {
        let mut set = DeferredCloseSet::new(GRACE);
        let t = Instant::now();
        set.insert_at(session(1), "reader", t);

        let released = set.sweep_at(t + GRACE - EPSILON);

        assert!(released.is_empty());
        assert!(set.contains(ConnectionId::new(1)));
    }

    #[test]
    fn test_sweep_after_grace_releases_entry() {
        let mut set = DeferredCloseSet::new(GRACE);
        let t = Instant::now();
        set.insert_at(session(1), "reader", t);

        let released = set.sweep_at(t + GRACE + EPSILON);

        assert_eq!(released.len(), 1);
        assert_eq!(released[0].session.conn_id, ConnectionId::new(1));
        assert_eq!(released[0].resource, "reader");
        assert!(set.is_empty());
    }

    #[test]
    fn test_sweep_at_exact_grace_releases_entry() {
        let mut set = DeferredCloseSet::new(GRACE);
        let t = Instant::now();
        set.insert_at(session(1), (), t);

        assert_eq!(set.sweep_at(t + GRACE).len(), 1);
    }

    #[test]
    fn test_sweep_releases_only_expired_entries() {
        let mut set = DeferredCloseSet::new(GRACE);
        let t = Instant::now();
        set.insert_at(session(1), (), t);
        set.insert_at(session(2), (), t + Duration::from_secs(5));
        set.insert_at(session(3), (), t + Duration::from_secs(1));

        let released: Vec<ConnectionId> = set
            .sweep_at(t + Duration::from_secs(11) + EPSILON)
            .into_iter()
            .map(|e| e.session.conn_id)
            .collect();

        assert_eq!(released, vec![ConnectionId::new(1), ConnectionId::new(3)]);
        assert_eq!(set.len(), 1);
        assert!(set.contains(ConnectionId::new(2)));
    }

    #[test]
    fn test_sweep_entry_from_the_future_is_kept() {
        let mut set = DeferredCloseSet::new(Duration::ZERO);
        let t = Instant::now();
        set.insert_at(session(1), (), t + Duration::from_secs(1));

        assert!(set.sweep_at(t).is_empty());
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_clear_drops_resources() {
        let resource = std::sync::Arc::new(());
        let mut set = DeferredCloseSet::new(GRACE);
        set.insert(session(1), resource.clone());
        assert_eq!(std::sync::Arc::strong_count(&resource), 2);

        set.clear();

        assert_eq!(std::sync::Arc::strong_count(&resource), 1);
        assert!(set.is_empty());
    }
}
