//! # Session Registry
//!
//! Maps front-end session ids to the authorization context established at login.
//! The lock is held only for the map operation itself; callers receive clones.

use super::permissions::AuthorizationContext;
use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

#[derive(Debug, Clone)]
struct SessionEntry {
    context: AuthorizationContext,
    last_seen: DateTime<Utc>,
}

/// Shared registry of authenticated sessions
#[derive(Debug, Clone)]
pub struct SessionRegistry {
    sessions: Arc<RwLock<HashMap<Uuid, SessionEntry>>>,
    idle_timeout: Duration,
}

impl SessionRegistry {
    pub fn new(idle_timeout: Duration) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            idle_timeout,
        }
    }

    /// Register a context and return its new session id.
    pub fn register(&self, context: AuthorizationContext) -> Uuid {
        let session_id = Uuid::new_v4();
        debug!(
            session_id = %session_id,
            user_login = %context.user_login,
            "Registering session"
        );
        self.sessions.write().insert(
            session_id,
            SessionEntry {
                context,
                last_seen: Utc::now(),
            },
        );
        session_id
    }

    /// Look up a live session's context. Expired sessions are treated as absent.
    pub fn get(&self, session_id: &Uuid) -> Option<AuthorizationContext> {
        let sessions = self.sessions.read();
        let entry = sessions.get(session_id)?;
        if self.is_expired(entry, Utc::now()) {
            return None;
        }
        Some(entry.context.clone())
    }

    /// Refresh a session's idle timer. Returns false for unknown sessions.
    pub fn touch(&self, session_id: &Uuid) -> bool {
        match self.sessions.write().get_mut(session_id) {
            Some(entry) => {
                entry.last_seen = Utc::now();
                true
            }
            None => false,
        }
    }

    pub fn remove(&self, session_id: &Uuid) -> Option<AuthorizationContext> {
        self.sessions
            .write()
            .remove(session_id)
            .map(|entry| entry.context)
    }

    /// Drop every session idle for longer than the timeout; returns how many were dropped.
    pub fn prune_expired(&self) -> usize {
        let now = Utc::now();
        let mut sessions = self.sessions.write();
        let before = sessions.len();
        sessions.retain(|_, entry| !self.is_expired(entry, now));
        let pruned = before - sessions.len();
        drop(sessions);

        if pruned > 0 {
            info!(pruned = pruned, "Pruned idle sessions");
        }
        pruned
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }

    fn is_expired(&self, entry: &SessionEntry, now: DateTime<Utc>) -> bool {
        now - entry.last_seen > self.idle_timeout
    }
}
