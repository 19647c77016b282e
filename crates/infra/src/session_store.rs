//! Server-side session storage.
//!
//! Sessions are keyed by an opaque [`SessionId`] carried in a cookie. Two
//! rules are enforced here rather than in handlers:
//!
//! - a principal has at most one live session; binding a principal to a new
//!   session expires the previous one
//! - a session untouched for longer than the idle timeout expires
//!
//! Expired ids are remembered for one idle period so the caller can tell
//! "your session expired" apart from "you never had one".

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

use uteexpress_auth::SessionContext;
use uteexpress_core::{PrincipalId, SessionId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionStoreError {
    #[error("session store lock poisoned")]
    Poisoned,
}

/// Result of resolving a session id.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionLookup {
    Active(SessionContext),
    /// Displaced by a newer login of the same principal, or idle too long.
    Expired,
    Missing,
}

pub trait SessionStore: Send + Sync {
    /// Open an anonymous session (no principal bound).
    fn create(&self, now: DateTime<Utc>) -> Result<SessionId, SessionStoreError>;

    /// Store `context` under a fresh id, dropping `previous` if given.
    ///
    /// If `context` carries a principal that already owns a live session,
    /// that session is expired.
    fn establish(
        &self,
        previous: Option<SessionId>,
        context: SessionContext,
        now: DateTime<Utc>,
    ) -> Result<SessionId, SessionStoreError>;

    /// Resolve `id` and mark it accessed at `now`.
    fn lookup(&self, id: SessionId, now: DateTime<Utc>) -> Result<SessionLookup, SessionStoreError>;

    /// Apply `f` to a live session. Returns `false` if there is none.
    ///
    /// Binding a principal here displaces that principal's other session,
    /// tombstoned at `now`.
    fn modify(
        &self,
        id: SessionId,
        now: DateTime<Utc>,
        f: &mut dyn FnMut(&mut SessionContext),
    ) -> Result<bool, SessionStoreError>;

    fn invalidate(&self, id: SessionId) -> Result<(), SessionStoreError>;

    /// Drop sessions idle past the timeout and tombstones older than one
    /// idle period. Returns how many entries were removed.
    fn sweep(&self, now: DateTime<Utc>) -> Result<usize, SessionStoreError>;

    fn active_count(&self) -> Result<usize, SessionStoreError>;
}

/// Anonymous sessions kept before the least recently used one is evicted.
pub const DEFAULT_MAX_ANONYMOUS_SESSIONS: usize = 10_000;

#[derive(Debug, Default)]
struct Sessions {
    live: HashMap<SessionId, SessionContext>,
    owner: HashMap<PrincipalId, SessionId>,
    expired: HashMap<SessionId, DateTime<Utc>>,
    last_sweep: Option<DateTime<Utc>>,
}

impl Sessions {
    fn remove_live(&mut self, id: SessionId) -> Option<SessionContext> {
        let ctx = self.live.remove(&id)?;
        if let Some(pid) = ctx.current_principal_id() {
            if self.owner.get(&pid) == Some(&id) {
                self.owner.remove(&pid);
            }
        }
        Some(ctx)
    }

    fn expire(&mut self, id: SessionId, at: DateTime<Utc>) {
        if self.remove_live(id).is_some() {
            self.expired.insert(id, at);
        }
    }

    /// Live sessions without a principal. Every owner entry points at a
    /// distinct logged-in session.
    fn anonymous_count(&self) -> usize {
        self.live.len().saturating_sub(self.owner.len())
    }

    fn sweep(&mut self, now: DateTime<Utc>, idle_timeout: Duration) -> usize {
        let idle: Vec<(SessionId, bool, DateTime<Utc>)> = self
            .live
            .iter()
            .filter(|(_, ctx)| now - ctx.last_accessed_at() > idle_timeout)
            .map(|(id, ctx)| (*id, ctx.is_logged_in(), ctx.last_accessed_at()))
            .collect();

        let mut removed = idle.len();
        for (id, logged_in, last_accessed) in idle {
            if logged_in {
                self.expire(id, last_accessed + idle_timeout);
            } else {
                self.remove_live(id);
            }
        }

        let before = self.expired.len();
        self.expired.retain(|_, at| now - *at <= idle_timeout);
        removed += before - self.expired.len();

        self.last_sweep = Some(now);
        removed
    }

    /// Evict least recently used anonymous sessions until one more fits.
    fn make_room_for_anonymous(&mut self, limit: usize) {
        while self.anonymous_count() >= limit {
            let oldest = self
                .live
                .iter()
                .filter(|(_, ctx)| !ctx.is_logged_in())
                .min_by_key(|(_, ctx)| ctx.last_accessed_at())
                .map(|(id, _)| *id);
            let Some(id) = oldest else {
                break;
            };
            tracing::debug!(session_id = %id, "anonymous session evicted at capacity");
            self.remove_live(id);
        }
    }
}

/// `RwLock`-guarded session map. Every operation takes the lock once, so
/// displacement and clearing are atomic to observers.
///
/// Writes sweep stale entries at most once per quarter idle period, and the
/// number of anonymous sessions is capped.
#[derive(Debug)]
pub struct InMemorySessionStore {
    idle_timeout: Duration,
    max_anonymous: usize,
    sessions: RwLock<Sessions>,
}

impl InMemorySessionStore {
    pub fn new(idle_timeout: Duration) -> Self {
        Self {
            idle_timeout,
            max_anonymous: DEFAULT_MAX_ANONYMOUS_SESSIONS,
            sessions: RwLock::new(Sessions::default()),
        }
    }

    pub fn with_anonymous_limit(mut self, limit: usize) -> Self {
        self.max_anonymous = limit.max(1);
        self
    }

    pub fn idle_timeout(&self) -> Duration {
        self.idle_timeout
    }

    fn sweep_due(&self, sessions: &Sessions, now: DateTime<Utc>) -> bool {
        sessions
            .last_sweep
            .is_none_or(|at| now - at >= self.idle_timeout / 4)
    }

    fn sweep_if_due(&self, sessions: &mut Sessions, now: DateTime<Utc>) {
        if self.sweep_due(sessions, now) {
            let removed = sessions.sweep(now, self.idle_timeout);
            if removed > 0 {
                tracing::debug!(removed, "stale sessions swept");
            }
        }
    }
}

impl Default for InMemorySessionStore {
    fn default() -> Self {
        Self::new(Duration::minutes(30))
    }
}

impl SessionStore for InMemorySessionStore {
    fn create(&self, now: DateTime<Utc>) -> Result<SessionId, SessionStoreError> {
        let mut sessions = self.sessions.write().map_err(|_| SessionStoreError::Poisoned)?;
        self.sweep_if_due(&mut sessions, now);
        sessions.make_room_for_anonymous(self.max_anonymous);

        let id = SessionId::new();
        sessions.live.insert(id, SessionContext::new(now));
        Ok(id)
    }

    fn establish(
        &self,
        previous: Option<SessionId>,
        context: SessionContext,
        now: DateTime<Utc>,
    ) -> Result<SessionId, SessionStoreError> {
        let mut sessions = self.sessions.write().map_err(|_| SessionStoreError::Poisoned)?;
        self.sweep_if_due(&mut sessions, now);

        if let Some(prev) = previous {
            sessions.remove_live(prev);
        }

        let id = SessionId::new();
        match context.current_principal_id() {
            Some(pid) => {
                if let Some(displaced) = sessions.owner.get(&pid).copied() {
                    tracing::info!(
                        principal_id = %pid,
                        session_id = %displaced,
                        "previous session displaced by new login"
                    );
                    sessions.expire(displaced, now);
                }
                sessions.owner.insert(pid, id);
            }
            None => sessions.make_room_for_anonymous(self.max_anonymous),
        }
        sessions.live.insert(id, context);
        Ok(id)
    }

    fn lookup(&self, id: SessionId, now: DateTime<Utc>) -> Result<SessionLookup, SessionStoreError> {
        let mut sessions = self.sessions.write().map_err(|_| SessionStoreError::Poisoned)?;

        if sessions.expired.contains_key(&id) {
            return Ok(SessionLookup::Expired);
        }

        let idle = match sessions.live.get(&id) {
            None => return Ok(SessionLookup::Missing),
            Some(ctx) => (now - ctx.last_accessed_at() > self.idle_timeout)
                .then(|| ctx.is_logged_in()),
        };

        match idle {
            Some(true) => {
                sessions.expire(id, now);
                return Ok(SessionLookup::Expired);
            }
            Some(false) => {
                // Anonymous sessions just vanish.
                sessions.remove_live(id);
                return Ok(SessionLookup::Missing);
            }
            None => {}
        }

        let Some(ctx) = sessions.live.get_mut(&id) else {
            return Ok(SessionLookup::Missing);
        };
        ctx.touch(now);
        Ok(SessionLookup::Active(ctx.clone()))
    }

    fn modify(
        &self,
        id: SessionId,
        now: DateTime<Utc>,
        f: &mut dyn FnMut(&mut SessionContext),
    ) -> Result<bool, SessionStoreError> {
        let mut sessions = self.sessions.write().map_err(|_| SessionStoreError::Poisoned)?;
        let Some(ctx) = sessions.live.get_mut(&id) else {
            return Ok(false);
        };

        let before = ctx.current_principal_id();
        f(ctx);
        let after = ctx.current_principal_id();

        if before != after {
            if let Some(pid) = before {
                if sessions.owner.get(&pid) == Some(&id) {
                    sessions.owner.remove(&pid);
                }
            }
            if let Some(pid) = after {
                let other = sessions.owner.get(&pid).copied().filter(|o| *o != id);
                if let Some(other) = other {
                    sessions.expire(other, now);
                }
                sessions.owner.insert(pid, id);
            }
        }
        Ok(true)
    }

    fn invalidate(&self, id: SessionId) -> Result<(), SessionStoreError> {
        let mut sessions = self.sessions.write().map_err(|_| SessionStoreError::Poisoned)?;
        sessions.remove_live(id);
        sessions.expired.remove(&id);
        Ok(())
    }

    fn sweep(&self, now: DateTime<Utc>) -> Result<usize, SessionStoreError> {
        let mut sessions = self.sessions.write().map_err(|_| SessionStoreError::Poisoned)?;
        Ok(sessions.sweep(now, self.idle_timeout))
    }

    fn active_count(&self) -> Result<usize, SessionStoreError> {
        let sessions = self.sessions.read().map_err(|_| SessionStoreError::Poisoned)?;
        Ok(sessions.live.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    use uteexpress_auth::{NewPrincipal, Principal, Role};

    fn principal(username: &str) -> Principal {
        Principal::create(
            PrincipalId::new(),
            NewPrincipal {
                username: username.to_string(),
                password_hash: "hash".to_string(),
                email: None,
                full_name: username.to_string(),
                roles: BTreeSet::from([Role::Shipper]),
            },
        )
        .unwrap()
    }

    fn logged_in(p: &Principal, now: DateTime<Utc>) -> SessionContext {
        let mut ctx = SessionContext::new(now);
        ctx.set_principal(p.clone());
        ctx
    }

    #[test]
    fn unknown_id_is_missing() {
        let store = InMemorySessionStore::default();
        assert_eq!(
            store.lookup(SessionId::new(), Utc::now()).unwrap(),
            SessionLookup::Missing
        );
    }

    #[test]
    fn establish_rotates_the_session_id() {
        let store = InMemorySessionStore::default();
        let now = Utc::now();
        let anon = store.create(now).unwrap();
        let p = principal("shipper");

        let id = store.establish(Some(anon), logged_in(&p, now), now).unwrap();

        assert_ne!(id, anon);
        assert_eq!(store.lookup(anon, now).unwrap(), SessionLookup::Missing);
        match store.lookup(id, now).unwrap() {
            SessionLookup::Active(ctx) => assert_eq!(ctx.current_username(), Some("shipper")),
            other => panic!("expected active session, got {other:?}"),
        }
    }

    #[test]
    fn second_login_displaces_first_session() {
        let store = InMemorySessionStore::default();
        let now = Utc::now();
        let p = principal("shipper");

        let first = store.establish(None, logged_in(&p, now), now).unwrap();
        let second = store.establish(None, logged_in(&p, now), now).unwrap();

        assert_eq!(store.lookup(first, now).unwrap(), SessionLookup::Expired);
        assert!(matches!(store.lookup(second, now).unwrap(), SessionLookup::Active(_)));
        assert_eq!(store.active_count().unwrap(), 1);
    }

    #[test]
    fn different_principals_do_not_displace_each_other() {
        let store = InMemorySessionStore::default();
        let now = Utc::now();
        let a = store.establish(None, logged_in(&principal("a"), now), now).unwrap();
        let b = store.establish(None, logged_in(&principal("b"), now), now).unwrap();

        assert!(matches!(store.lookup(a, now).unwrap(), SessionLookup::Active(_)));
        assert!(matches!(store.lookup(b, now).unwrap(), SessionLookup::Active(_)));
    }

    #[test]
    fn idle_session_expires_and_access_extends_it() {
        let store = InMemorySessionStore::new(Duration::minutes(30));
        let t0 = Utc::now();
        let id = store.establish(None, logged_in(&principal("w"), t0), t0).unwrap();

        let t1 = t0 + Duration::minutes(20);
        assert!(matches!(store.lookup(id, t1).unwrap(), SessionLookup::Active(_)));

        // 20 + 20 minutes since start, but only 20 since last access.
        let t2 = t1 + Duration::minutes(20);
        assert!(matches!(store.lookup(id, t2).unwrap(), SessionLookup::Active(_)));

        let t3 = t2 + Duration::minutes(31);
        assert_eq!(store.lookup(id, t3).unwrap(), SessionLookup::Expired);
    }

    #[test]
    fn idle_anonymous_session_is_just_gone() {
        let store = InMemorySessionStore::new(Duration::minutes(30));
        let t0 = Utc::now();
        let id = store.create(t0).unwrap();
        assert_eq!(
            store.lookup(id, t0 + Duration::hours(1)).unwrap(),
            SessionLookup::Missing
        );
    }

    #[test]
    fn modify_and_invalidate() {
        let store = InMemorySessionStore::default();
        let now = Utc::now();
        let id = store.create(now).unwrap();

        let changed = store
            .modify(id, now, &mut |ctx| ctx.record_login_failure("Invalid username or password"))
            .unwrap();
        assert!(changed);

        let mut flash = None;
        store.modify(id, now, &mut |ctx| flash = ctx.take_login_error()).unwrap();
        assert_eq!(flash.as_deref(), Some("Invalid username or password"));

        store.invalidate(id).unwrap();
        assert_eq!(store.lookup(id, now).unwrap(), SessionLookup::Missing);
        assert!(!store.modify(id, now, &mut |_| {}).unwrap());
    }

    #[test]
    fn clearing_a_session_releases_its_principal() {
        let store = InMemorySessionStore::default();
        let now = Utc::now();
        let p = principal("shipper");
        let first = store.establish(None, logged_in(&p, now), now).unwrap();

        store.modify(first, now, &mut SessionContext::clear).unwrap();
        let second = store.establish(None, logged_in(&p, now), now).unwrap();

        // `first` was already anonymous, so it is not expired by the new login.
        match store.lookup(first, now).unwrap() {
            SessionLookup::Active(ctx) => assert!(!ctx.is_logged_in()),
            other => panic!("expected anonymous session, got {other:?}"),
        }
        assert!(matches!(store.lookup(second, now).unwrap(), SessionLookup::Active(_)));
    }

    #[test]
    fn binding_a_principal_in_place_tombstones_at_the_given_time() {
        let store = InMemorySessionStore::new(Duration::minutes(30));
        let t0 = Utc::now() - Duration::days(2);
        let p = principal("shipper");

        let first = store.establish(None, logged_in(&p, t0), t0).unwrap();
        let anon = store.create(t0).unwrap();
        store
            .modify(anon, t0, &mut |ctx| ctx.set_principal(p.clone()))
            .unwrap();

        // The tombstone is dated t0, so one idle period later it is gone.
        assert_eq!(store.lookup(first, t0).unwrap(), SessionLookup::Expired);
        store.sweep(t0 + Duration::minutes(31)).unwrap();
        assert_eq!(
            store.lookup(first, t0 + Duration::minutes(31)).unwrap(),
            SessionLookup::Missing
        );
    }

    #[test]
    fn idle_sessions_are_swept_without_being_looked_up() {
        let store = InMemorySessionStore::new(Duration::minutes(30));
        let t0 = Utc::now();

        let mut logged = Vec::new();
        for i in 0..1000 {
            let p = principal(&format!("user{i}"));
            logged.push(store.establish(None, logged_in(&p, t0), t0).unwrap());
            store.create(t0).unwrap();
        }
        assert_eq!(store.active_count().unwrap(), 2000);

        let later = t0 + Duration::days(1);
        let fresh = store
            .establish(None, logged_in(&principal("late"), later), later)
            .unwrap();

        assert_eq!(store.active_count().unwrap(), 1);
        {
            let sessions = store.sessions.read().unwrap();
            assert_eq!(sessions.owner.len(), 1);
            assert!(sessions.expired.is_empty());
        }
        assert!(matches!(store.lookup(fresh, later).unwrap(), SessionLookup::Active(_)));
        assert_eq!(store.lookup(logged[0], later).unwrap(), SessionLookup::Missing);
    }

    #[test]
    fn recently_idle_login_is_still_reported_expired_after_a_sweep() {
        let store = InMemorySessionStore::new(Duration::minutes(30));
        let t0 = Utc::now();
        let id = store.establish(None, logged_in(&principal("w"), t0), t0).unwrap();

        let t1 = t0 + Duration::minutes(45);
        store.sweep(t1).unwrap();

        assert_eq!(store.active_count().unwrap(), 0);
        assert_eq!(store.lookup(id, t1).unwrap(), SessionLookup::Expired);
    }

    #[test]
    fn anonymous_sessions_are_capped() {
        let store = InMemorySessionStore::new(Duration::minutes(30)).with_anonymous_limit(50);
        let t0 = Utc::now();
        let p = principal("shipper");
        let logged = store.establish(None, logged_in(&p, t0), t0).unwrap();

        let first_anon = store.create(t0).unwrap();
        for i in 1..200 {
            store.create(t0 + Duration::seconds(i)).unwrap();
        }

        assert_eq!(store.active_count().unwrap(), 51);
        let now = t0 + Duration::seconds(200);
        assert_eq!(store.lookup(first_anon, now).unwrap(), SessionLookup::Missing);
        assert!(matches!(store.lookup(logged, now).unwrap(), SessionLookup::Active(_)));
    }
}
