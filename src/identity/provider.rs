use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use parking_lot::{Mutex, RwLock};
use thiserror::Error;
use crate::tprintln;

use super::principal::{Identity, UserIdentity};
use super::session::{Session, SessionManager};

/// The provider could not resolve the auth state.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("identity provider unavailable: {0}")]
pub struct ProviderFailure(pub String);

/// What a listener receives: the signed-in user, `None` when signed out, or a provider error.
pub type AuthState = Result<Option<UserIdentity>, ProviderFailure>;

/// Listeners run on the provider's notification path and must not call back into the provider.
pub type IdentityListener = Box<dyn FnMut(AuthState) + Send + 'static>;

/// Handle to a registered listener. Released exactly once, either through
/// [`Subscription::unsubscribe`] or when dropped.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    release: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn new<F: FnOnce() + Send + 'static>(release: F) -> Self { Self { release: Some(Box::new(release)) } }

    pub fn unsubscribe(mut self) { self.release_now(); }

    fn release_now(&mut self) {
        if let Some(f) = self.release.take() { f(); }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) { self.release_now(); }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("active", &self.release.is_some()).finish()
    }
}

/// Source of the current auth state. Delivers the state on subscription and
/// again on every sign-in or sign-out.
pub trait IdentityProvider: Send + Sync {
    fn subscribe(&self, listener: IdentityListener) -> Result<Subscription, ProviderFailure>;
}

impl<T: IdentityProvider + ?Sized> IdentityProvider for Arc<T> {
    fn subscribe(&self, listener: IdentityListener) -> Result<Subscription, ProviderFailure> {
        (**self).subscribe(listener)
    }
}

struct Inner {
    sessions: SessionManager,
    current: RwLock<Option<Session>>,
    listeners: Mutex<HashMap<u64, IdentityListener>>,
    next_listener: AtomicU64,
    outage: RwLock<Option<String>>,
}

/// In-process identity provider backed by a [`SessionManager`].
#[derive(Clone)]
pub struct LocalIdentityProvider {
    inner: Arc<Inner>,
}

impl Default for LocalIdentityProvider {
    fn default() -> Self { Self::new(SessionManager::default()) }
}

impl LocalIdentityProvider {
    pub fn new(sessions: SessionManager) -> Self {
        Self {
            inner: Arc::new(Inner {
                sessions,
                current: RwLock::new(None),
                listeners: Mutex::new(HashMap::new()),
                next_listener: AtomicU64::new(1),
                outage: RwLock::new(None),
            }),
        }
    }

    /// Issue a session for `user` and notify every listener.
    pub fn sign_in(&self, user: UserIdentity) -> Result<Session, ProviderFailure> {
        let session = self.inner.sessions.issue(user.clone()).map_err(|e| ProviderFailure(e.to_string()))?;
        let previous = self.inner.current.write().replace(session.clone());
        if let Some(prev) = previous { self.inner.sessions.logout(&prev.token); }
        tracing::info!(user_id = %user.user_id, sid = %session.session_id, "identity.sign_in");
        self.notify(Ok(Some(user)));
        Ok(session)
    }

    /// Revoke the live session, if any, and notify every listener.
    pub fn sign_out(&self) -> bool {
        let Some(prev) = self.inner.current.write().take() else { return false; };
        self.inner.sessions.logout(&prev.token);
        tracing::info!(user_id = %prev.user.user_id, sid = %prev.session_id, "identity.sign_out");
        self.notify(Ok(None));
        true
    }

    /// The live session, if the signed-in user's token is still valid.
    pub fn current_session(&self) -> Option<Session> {
        let sess = self.inner.current.read().clone()?;
        self.inner.sessions.validate(&sess.token).map(|_| sess)
    }

    pub fn current_identity(&self) -> Identity {
        self.current_session().map(|s| s.user).into()
    }

    /// Put the provider into an outage: new subscribers receive an error as their first state.
    pub fn fail_with<S: Into<String>>(&self, reason: S) {
        let reason = reason.into();
        tracing::warn!(reason = %reason, "identity.outage");
        *self.inner.outage.write() = Some(reason);
    }

    pub fn recover(&self) { *self.inner.outage.write() = None; }

    pub fn listener_count(&self) -> usize { self.inner.listeners.lock().len() }

    fn snapshot(&self) -> AuthState {
        if let Some(reason) = self.inner.outage.read().clone() {
            return Err(ProviderFailure(reason));
        }
        Ok(self.current_session().map(|s| s.user))
    }

    fn notify(&self, state: AuthState) {
        let mut listeners = self.inner.listeners.lock();
        tprintln!("identity.notify listeners={}", listeners.len());
        for listener in listeners.values_mut() {
            listener(state.clone());
        }
    }
}

impl IdentityProvider for LocalIdentityProvider {
    fn subscribe(&self, mut listener: IdentityListener) -> Result<Subscription, ProviderFailure> {
        let id = self.inner.next_listener.fetch_add(1, Ordering::Relaxed);
        {
            // Initial delivery and registration happen under the same lock so no change is missed.
            let mut listeners = self.inner.listeners.lock();
            listener(self.snapshot());
            listeners.insert(id, listener);
        }
        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        Ok(Subscription::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.listeners.lock().remove(&id);
            }
        }))
    }
}

#[cfg(test)]
#[path = "provider_tests.rs"]
mod tests;
