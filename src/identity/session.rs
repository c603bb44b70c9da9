use std::collections::HashMap;
use std::time::{Duration, Instant};
use parking_lot::RwLock;
use base64::Engine;
use thiserror::Error;
use crate::tprintln;

use super::principal::UserIdentity;

pub type SessionToken = String;

#[derive(Debug, Clone)]
pub struct Session {
    pub session_id: String,
    pub token: SessionToken,
    pub user: UserIdentity,
    pub issued_at: Instant,
    pub expires_at: Instant,
}

impl Session {
    pub fn is_live(&self, now: Instant) -> bool { self.expires_at > now }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("session token generation failed: {0}")]
    TokenGeneration(String),
}

fn gen_id() -> Result<String, SessionError> {
    // 256-bit random token, base64url without padding
    let mut buf = [0u8; 32];
    getrandom::getrandom(&mut buf).map_err(|e| SessionError::TokenGeneration(e.to_string()))?;
    Ok(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(buf))
}

/// Token -> session registry owned by one identity provider instance.
/// Expired sessions are pruned whenever a session is issued or looked up.
pub struct SessionManager {
    pub ttl: Duration,
    sessions: RwLock<HashMap<SessionToken, Session>>,
}

impl Default for SessionManager {
    fn default() -> Self { Self::with_ttl(Duration::from_secs(60 * 60)) }
}

impl SessionManager {
    pub fn with_ttl(ttl: Duration) -> Self { Self { ttl, sessions: RwLock::new(HashMap::new()) } }

    pub fn issue(&self, user: UserIdentity) -> Result<Session, SessionError> {
        let now = Instant::now();
        let sess = Session { session_id: gen_id()?, token: gen_id()?, user, issued_at: now, expires_at: now + self.ttl };
        let mut map = self.sessions.write();
        map.retain(|_, s| s.is_live(now));
        map.insert(sess.token.clone(), sess.clone());
        tprintln!("session.issue user={} sid={} ttl_secs={}", sess.user.user_id, sess.session_id, self.ttl.as_secs());
        Ok(sess)
    }

    /// Return the user bound to a live token. An expired token is dropped on read.
    pub fn validate(&self, token: &str) -> Option<UserIdentity> {
        let now = Instant::now();
        let expired = match self.sessions.read().get(token) {
            Some(s) if s.is_live(now) => return Some(s.user.clone()),
            Some(_) => true,
            None => false,
        };
        if expired { self.sessions.write().remove(token); }
        None
    }

    /// End a session. Returns false when the token was unknown or already ended.
    pub fn logout(&self, token: &str) -> bool { self.sessions.write().remove(token).is_some() }

    /// Sessions still live, after dropping expired ones.
    pub fn active_count(&self) -> usize {
        let now = Instant::now();
        let mut map = self.sessions.write();
        map.retain(|_, s| s.is_live(now));
        map.len()
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
