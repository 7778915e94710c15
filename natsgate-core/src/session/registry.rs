//! SessionRegistry: the multiply-indexed table of live sessions
//!
//! All three indexes (by id, by user, by device) sit behind a single
//! reader/writer lock so that login, eviction and removal always move
//! them together. The registry records which identity it bound for each
//! session and uses that record, not the session's own field, to decide
//! which indexes an entry lives in.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;
use tracing::debug;

use super::state::Session;
use super::types::{DeviceId, Identity, SessionId, UserId};
use crate::error::SessionError;

/// Counts reported by [`SessionRegistry::stats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RegistryStats {
    pub users: usize,
    pub devices: usize,
    pub unauthenticated: usize,
}

struct Entry {
    session: Arc<Session>,
    /// Identity as bound by the registry; None while unauthenticated
    bound: Option<Identity>,
}

#[derive(Default)]
struct Indexes {
    by_id: HashMap<SessionId, Entry>,
    by_user: HashMap<UserId, HashMap<DeviceId, Arc<Session>>>,
    by_device: HashMap<DeviceId, Arc<Session>>,
    unauthenticated: usize,
}

impl Indexes {
    /// Remove an entry from every index it occupies
    fn remove(&mut self, id: SessionId) -> Option<Entry> {
        let entry = self.by_id.remove(&id)?;

        match &entry.bound {
            None => self.unauthenticated -= 1,
            Some(identity) => {
                if let Some(devices) = self.by_user.get_mut(&identity.user_id) {
                    if devices
                        .get(&identity.device_id)
                        .is_some_and(|s| s.id() == id)
                    {
                        devices.remove(&identity.device_id);
                    }
                    if devices.is_empty() {
                        self.by_user.remove(&identity.user_id);
                    }
                }
                if self
                    .by_device
                    .get(&identity.device_id)
                    .is_some_and(|s| s.id() == id)
                {
                    self.by_device.remove(&identity.device_id);
                }
            }
        }

        Some(entry)
    }
}

/// Concurrency-safe store of every live session
#[derive(Default)]
pub struct SessionRegistry {
    indexes: RwLock<Indexes>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a freshly accepted, unauthenticated session
    pub fn register(&self, session: Arc<Session>) {
        let mut idx = self.indexes.write();
        let id = session.id();
        if idx.by_id.contains_key(&id) {
            debug!(session_id = %id, "session already registered");
            return;
        }
        idx.by_id.insert(
            id,
            Entry {
                session,
                bound: None,
            },
        );
        idx.unauthenticated += 1;
    }

    /// Move a session into the identity indexes after a successful login
    ///
    /// The session must already hold its resolved identity. Any other
    /// session on the same device is excised from every index and
    /// returned; closing it is the caller's job.
    pub fn bind_identity(
        &self,
        session: &Arc<Session>,
    ) -> Result<Option<Arc<Session>>, SessionError> {
        let id = session.id();
        // session lock first, registry lock second
        let identity = session
            .identity()
            .ok_or(SessionError::MissingIdentity(id))?;

        let mut idx = self.indexes.write();
        match idx.by_id.get_mut(&id) {
            None => return Err(SessionError::NotRegistered(id)),
            Some(entry) if entry.bound.is_some() => return Err(SessionError::AlreadyBound(id)),
            Some(entry) => entry.bound = Some(identity.clone()),
        }
        idx.unauthenticated -= 1;

        let previous_id = idx.by_device.get(&identity.device_id).map(|s| s.id());
        let previous = previous_id
            .and_then(|prev_id| idx.remove(prev_id))
            .map(|entry| entry.session);

        idx.by_device
            .insert(identity.device_id.clone(), Arc::clone(session));
        idx.by_user
            .entry(identity.user_id.clone())
            .or_default()
            .insert(identity.device_id, Arc::clone(session));

        Ok(previous)
    }

    /// Remove a session from every index; returns false if it was not present
    pub fn remove(&self, session: &Session) -> bool {
        self.remove_id(session.id())
    }

    /// Remove by id; idempotent
    pub fn remove_id(&self, id: SessionId) -> bool {
        self.indexes.write().remove(id).is_some()
    }

    pub fn lookup_by_id(&self, id: SessionId) -> Option<Arc<Session>> {
        self.indexes
            .read()
            .by_id
            .get(&id)
            .map(|entry| Arc::clone(&entry.session))
    }

    /// Snapshot of one user's sessions keyed by device
    pub fn lookup_by_user(&self, user_id: &UserId) -> HashMap<DeviceId, Arc<Session>> {
        self.indexes
            .read()
            .by_user
            .get(user_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn lookup_by_device(&self, device_id: &DeviceId) -> Option<Arc<Session>> {
        self.indexes.read().by_device.get(device_id).cloned()
    }

    pub fn stats(&self) -> RegistryStats {
        let idx = self.indexes.read();
        RegistryStats {
            users: idx.by_user.len(),
            devices: idx.by_device.len(),
            unauthenticated: idx.unauthenticated,
        }
    }

    /// Number of registered sessions
    pub fn len(&self) -> usize {
        self.indexes.read().by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of every registered session
    pub fn sessions(&self) -> Vec<Arc<Session>> {
        self.indexes
            .read()
            .by_id
            .values()
            .map(|entry| Arc::clone(&entry.session))
            .collect()
    }

    /// Remove every session matching `predicate`, then run `on_removed` for each
    ///
    /// Matching and removal happen under one exclusive lock. The callbacks
    /// run after the lock is released; ids are never reused, so no session
    /// can be re-registered under a removed id while they run. Returns the
    /// number of sessions removed.
    pub async fn sweep<P, F, Fut>(&self, predicate: P, on_removed: F) -> usize
    where
        P: Fn(&Session) -> bool,
        F: FnMut(Arc<Session>) -> Fut,
        Fut: Future<Output = ()>,
    {
        self.sweep_entries(|entry| predicate(&entry.session), on_removed)
            .await
    }

    /// Like [`sweep`](Self::sweep), restricted to sessions the registry
    /// has not bound to an identity
    ///
    /// Authentication state comes from the registry's own record, so the
    /// predicate only needs lock-free session fields such as the start time.
    pub async fn sweep_unauthenticated<P, F, Fut>(&self, predicate: P, on_removed: F) -> usize
    where
        P: Fn(&Session) -> bool,
        F: FnMut(Arc<Session>) -> Fut,
        Fut: Future<Output = ()>,
    {
        self.sweep_entries(
            |entry| entry.bound.is_none() && predicate(&entry.session),
            on_removed,
        )
        .await
    }

    async fn sweep_entries<P, F, Fut>(&self, matches: P, mut on_removed: F) -> usize
    where
        P: Fn(&Entry) -> bool,
        F: FnMut(Arc<Session>) -> Fut,
        Fut: Future<Output = ()>,
    {
        let removed: Vec<Arc<Session>> = {
            let mut idx = self.indexes.write();
            let matched: Vec<SessionId> = idx
                .by_id
                .iter()
                .filter(|(_, entry)| matches(entry))
                .map(|(id, _)| *id)
                .collect();
            matched
                .into_iter()
                .filter_map(|id| idx.remove(id))
                .map(|entry| entry.session)
                .collect()
        };

        let count = removed.len();
        for session in removed {
            on_removed(session).await;
        }
        count
    }

    /// Check the cross-index invariants
    ///
    /// Every bound entry occupies exactly its own device slot and user
    /// slot, the identity indexes hold nothing else, and the
    /// unauthenticated counter matches the unbound entries.
    pub fn is_consistent(&self) -> bool {
        let idx = self.indexes.read();

        let unbound = idx.by_id.values().filter(|e| e.bound.is_none()).count();
        if unbound != idx.unauthenticated {
            return false;
        }

        let bound: Vec<(&SessionId, &Identity)> = idx
            .by_id
            .iter()
            .filter_map(|(id, e)| e.bound.as_ref().map(|identity| (id, identity)))
            .collect();

        let user_slots: usize = idx.by_user.values().map(HashMap::len).sum();
        if bound.len() != idx.by_device.len() || bound.len() != user_slots {
            return false;
        }
        if idx.by_user.values().any(HashMap::is_empty) {
            return false;
        }

        bound.into_iter().all(|(id, identity)| {
            let in_device = idx
                .by_device
                .get(&identity.device_id)
                .is_some_and(|s| s.id() == *id);
            let in_user = idx
                .by_user
                .get(&identity.user_id)
                .and_then(|devices| devices.get(&identity.device_id))
                .is_some_and(|s| s.id() == *id);
            in_device && in_user
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;
    use crate::session::{CloseReason, RecordingSink, SentFrames};

    fn session(id: u64) -> (Arc<Session>, SentFrames) {
        let (sink, sent) = RecordingSink::new();
        (Arc::new(Session::new(SessionId(id), Box::new(sink))), sent)
    }

    fn login(
        registry: &SessionRegistry,
        session: &Arc<Session>,
        user: &str,
        device: &str,
    ) -> Option<Arc<Session>> {
        session.set_identity(Identity::new(user, device)).unwrap();
        registry.bind_identity(session).unwrap()
    }

    // ==================== Register / Remove ====================

    #[test]
    fn register_counts_unauthenticated() {
        let registry = SessionRegistry::new();
        let (s1, _) = session(1);
        let (s2, _) = session(2);

        registry.register(s1);
        registry.register(s2);

        assert_eq!(registry.stats().unauthenticated, 2);
        assert_eq!(registry.len(), 2);
        assert!(registry.is_consistent());
    }

    #[test]
    fn register_twice_is_ignored() {
        let registry = SessionRegistry::new();
        let (s1, _) = session(1);

        registry.register(Arc::clone(&s1));
        registry.register(s1);

        assert_eq!(registry.stats().unauthenticated, 1);
        assert!(registry.is_consistent());
    }

    #[test]
    fn remove_unauthenticated_decrements_counter() {
        let registry = SessionRegistry::new();
        let (s1, _) = session(1);
        registry.register(Arc::clone(&s1));

        assert!(registry.remove(&s1));

        assert_eq!(registry.stats(), RegistryStats::default());
        assert!(registry.lookup_by_id(SessionId(1)).is_none());
    }

    #[test]
    fn remove_is_idempotent() {
        let registry = SessionRegistry::new();
        let (s1, _) = session(1);
        registry.register(Arc::clone(&s1));

        assert!(registry.remove(&s1));
        assert!(!registry.remove(&s1));

        assert_eq!(registry.stats().unauthenticated, 0);
        assert!(registry.is_consistent());
    }

    // ==================== Bind Identity ====================

    #[test]
    fn bind_moves_session_into_identity_indexes() {
        let registry = SessionRegistry::new();
        let (s1, _) = session(1);
        registry.register(Arc::clone(&s1));

        let evicted = login(&registry, &s1, "min", "phone");

        assert!(evicted.is_none());
        assert_eq!(
            registry.stats(),
            RegistryStats {
                users: 1,
                devices: 1,
                unauthenticated: 0
            }
        );
        assert_eq!(
            registry.lookup_by_device(&"phone".into()).map(|s| s.id()),
            Some(SessionId(1))
        );
        assert_eq!(registry.lookup_by_user(&"min".into()).len(), 1);
        assert!(registry.is_consistent());
    }

    #[test]
    fn bind_same_device_evicts_previous_session() {
        let registry = SessionRegistry::new();
        let (s1, _) = session(1);
        let (s2, _) = session(2);
        registry.register(Arc::clone(&s1));
        registry.register(Arc::clone(&s2));

        login(&registry, &s1, "min", "phone");
        let evicted = login(&registry, &s2, "min", "phone");

        assert_eq!(evicted.map(|s| s.id()), Some(SessionId(1)));
        assert!(registry.lookup_by_id(SessionId(1)).is_none());
        assert_eq!(
            registry.lookup_by_device(&"phone".into()).map(|s| s.id()),
            Some(SessionId(2))
        );
        assert_eq!(registry.len(), 1);
        assert!(registry.is_consistent());
    }

    #[test]
    fn bind_other_user_on_same_device_drops_previous_user() {
        let registry = SessionRegistry::new();
        let (s1, _) = session(1);
        let (s2, _) = session(2);
        registry.register(Arc::clone(&s1));
        registry.register(Arc::clone(&s2));

        login(&registry, &s1, "alice", "kiosk");
        login(&registry, &s2, "bob", "kiosk");

        assert!(registry.lookup_by_user(&"alice".into()).is_empty());
        assert_eq!(registry.stats().users, 1);
        assert!(registry.is_consistent());
    }

    #[test]
    fn user_with_two_devices_keeps_both() {
        let registry = SessionRegistry::new();
        let (s1, _) = session(1);
        let (s2, _) = session(2);
        registry.register(Arc::clone(&s1));
        registry.register(Arc::clone(&s2));

        login(&registry, &s1, "min", "phone");
        login(&registry, &s2, "min", "laptop");

        let devices = registry.lookup_by_user(&"min".into());
        assert_eq!(devices.len(), 2);
        assert_eq!(registry.stats().devices, 2);

        registry.remove(&s1);
        assert_eq!(registry.lookup_by_user(&"min".into()).len(), 1);

        registry.remove(&s2);
        assert_eq!(registry.stats().users, 0);
        assert!(registry.is_consistent());
    }

    #[test]
    fn bind_without_identity_fails() {
        let registry = SessionRegistry::new();
        let (s1, _) = session(1);
        registry.register(Arc::clone(&s1));

        let result = registry.bind_identity(&s1);

        assert!(matches!(result, Err(SessionError::MissingIdentity(_))));
        assert_eq!(registry.stats().unauthenticated, 1);
    }

    #[test]
    fn bind_twice_fails_without_changing_counts() {
        let registry = SessionRegistry::new();
        let (s1, _) = session(1);
        registry.register(Arc::clone(&s1));
        login(&registry, &s1, "min", "phone");

        let result = registry.bind_identity(&s1);

        assert!(matches!(result, Err(SessionError::AlreadyBound(_))));
        assert_eq!(registry.stats().unauthenticated, 0);
        assert!(registry.is_consistent());
    }

    #[test]
    fn bind_after_concurrent_removal_fails() {
        let registry = SessionRegistry::new();
        let (s1, _) = session(1);
        registry.register(Arc::clone(&s1));
        s1.set_identity(Identity::new("min", "phone")).unwrap();

        // transport error won the race against the login
        registry.remove(&s1);
        let result = registry.bind_identity(&s1);

        assert!(matches!(result, Err(SessionError::NotRegistered(_))));
        assert_eq!(registry.stats(), RegistryStats::default());
        assert!(registry.is_consistent());
    }

    #[test]
    fn removing_evicted_session_again_is_noop() {
        let registry = SessionRegistry::new();
        let (s1, _) = session(1);
        let (s2, _) = session(2);
        registry.register(Arc::clone(&s1));
        registry.register(Arc::clone(&s2));
        login(&registry, &s1, "min", "phone");
        let evicted = login(&registry, &s2, "min", "phone").unwrap();

        assert!(!registry.remove(&evicted));

        assert_eq!(
            registry.lookup_by_device(&"phone".into()).map(|s| s.id()),
            Some(SessionId(2))
        );
        assert!(registry.is_consistent());
    }

    // ==================== Sweep ====================

    #[tokio::test]
    async fn sweep_removes_matching_and_runs_callback() {
        let registry = SessionRegistry::new();
        let mut sent = Vec::new();
        for id in 1..=4 {
            let (s, frames) = session(id);
            registry.register(s);
            sent.push(frames);
        }
        let closed = AtomicUsize::new(0);

        let removed = registry
            .sweep(
                |s| s.id().0 % 2 == 0,
                |s| {
                    closed.fetch_add(1, Ordering::SeqCst);
                    async move { s.close(CloseReason::Auth).await }
                },
            )
            .await;

        assert_eq!(removed, 2);
        assert_eq!(closed.load(Ordering::SeqCst), 2);
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.stats().unauthenticated, 2);
        assert_eq!(sent[1].next_close().await, Some(CloseReason::Auth));
        assert_eq!(sent[3].next_close().await, Some(CloseReason::Auth));
        assert!(sent[0].try_next().is_none());
        assert!(registry.is_consistent());
    }

    #[tokio::test]
    async fn sweep_clears_identity_indexes() {
        let registry = SessionRegistry::new();
        let (s1, _) = session(1);
        let (s2, _) = session(2);
        registry.register(Arc::clone(&s1));
        registry.register(Arc::clone(&s2));
        login(&registry, &s1, "min", "phone");

        let removed = registry.sweep(|_| true, |_| async {}).await;

        assert_eq!(removed, 2);
        assert_eq!(registry.stats(), RegistryStats::default());
        assert!(registry.lookup_by_user(&"min".into()).is_empty());
        assert!(registry.is_consistent());
    }

    #[tokio::test(start_paused = true)]
    async fn sweep_by_age_spares_young_sessions() {
        let registry = SessionRegistry::new();
        let (old, _) = session(1);
        registry.register(Arc::clone(&old));
        tokio::time::advance(Duration::from_secs(90)).await;
        let (young, _) = session(2);
        registry.register(Arc::clone(&young));

        let now = tokio::time::Instant::now();
        let removed = registry
            .sweep(|s| s.age(now) > Duration::from_secs(60), |_| async {})
            .await;

        assert_eq!(removed, 1);
        assert!(registry.lookup_by_id(SessionId(2)).is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn sweep_unauthenticated_skips_bound_sessions() {
        let registry = SessionRegistry::new();
        let (anon, _) = session(1);
        let (known, _) = session(2);
        registry.register(Arc::clone(&anon));
        registry.register(Arc::clone(&known));
        login(&registry, &known, "min", "phone");
        tokio::time::advance(Duration::from_secs(120)).await;

        let now = tokio::time::Instant::now();
        let removed = registry
            .sweep_unauthenticated(|s| s.age(now) > Duration::from_secs(60), |_| async {})
            .await;

        assert_eq!(removed, 1);
        assert!(registry.lookup_by_id(SessionId(1)).is_none());
        assert!(registry.lookup_by_id(SessionId(2)).is_some());
        assert_eq!(registry.stats().unauthenticated, 0);
        assert!(registry.is_consistent());
    }
}
