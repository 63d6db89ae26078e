//! In-memory holder for the session, environment and location snapshots.
//!
//! `StateStore` itself does no locking. It is only reachable through
//! [`SharedState`], which hands out read or write access after the matching
//! side of the [`AsyncLock`] has been acquired.
//!
//! The store is intentionally not persisted: it lives as long as the
//! synchronizer that owns it.

use std::sync::Arc;

use parking_lot::RwLock;
use url::Url;

use super::lock::{AsyncLock, LockStatus, Releaser};
use super::types::{EnvironmentSnapshot, Location, SessionSnapshot};

#[derive(Debug, Default)]
pub struct StateStore {
    session: Option<Arc<SessionSnapshot>>,
    environment: Option<Arc<EnvironmentSnapshot>>,
    location: Location,
}

impl StateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn session(&self) -> Option<Arc<SessionSnapshot>> {
        self.session.clone()
    }

    pub fn environment(&self) -> Option<Arc<EnvironmentSnapshot>> {
        self.environment.clone()
    }

    pub fn location(&self) -> &Location {
        &self.location
    }

    pub fn replace_session(&mut self, session: SessionSnapshot) {
        self.session = Some(Arc::new(session));
    }

    pub fn clear_session(&mut self) {
        self.session = None;
    }

    pub fn replace_environment(&mut self, environment: EnvironmentSnapshot) {
        self.environment = Some(Arc::new(environment));
    }

    pub fn advance_location(&mut self, next: Url) -> &Location {
        self.location.advance(next);
        &self.location
    }

    /// Test helper: put the visitor somewhere without going through a view report.
    #[cfg(any(test, feature = "test-helpers"))]
    pub fn set_location_for_test(&mut self, current: Option<Url>, referrer: Option<Url>) {
        self.location = Location { current, referrer };
    }
}

/// A [`StateStore`] that can only be touched while holding the [`AsyncLock`].
///
/// The inner `RwLock` is never contended: the async lock already serializes
/// writers against everyone else. It exists so the store can be mutated
/// through a shared reference, and its guard never outlives a closure, so it
/// is never held across an `.await`.
#[derive(Debug, Default)]
pub struct SharedState {
    lock: AsyncLock,
    store: RwLock<StateStore>,
}

impl SharedState {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn read(&self) -> ReadAccess<'_> {
        let releaser = self.lock.acquire_reader().await;
        ReadAccess {
            _releaser: releaser,
            store: &self.store,
        }
    }

    pub async fn write(&self) -> WriteAccess<'_> {
        let releaser = self.lock.acquire_writer().await;
        WriteAccess {
            _releaser: releaser,
            store: &self.store,
        }
    }

    pub fn lock_status(&self) -> LockStatus {
        self.lock.status()
    }
}

/// Shared access to the store. Released when dropped.
pub struct ReadAccess<'a> {
    _releaser: Releaser,
    store: &'a RwLock<StateStore>,
}

impl ReadAccess<'_> {
    pub fn with<R>(&self, f: impl FnOnce(&StateStore) -> R) -> R {
        f(&*self.store.read())
    }
}

/// Exclusive access to the store. Released when dropped.
pub struct WriteAccess<'a> {
    _releaser: Releaser,
    store: &'a RwLock<StateStore>,
}

impl WriteAccess<'_> {
    pub fn with<R>(&self, f: impl FnOnce(&StateStore) -> R) -> R {
        f(&*self.store.read())
    }

    pub fn with_mut<R>(&self, f: impl FnOnce(&mut StateStore) -> R) -> R {
        f(&mut *self.store.write())
    }
}
