use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::clock::Clock;
use super::state::{Session, SessionState};
use crate::gateway::UserId;

/// Concurrent map of live sessions keyed by user id.
///
/// A user with no entry is `Idle`. Entries are only written by the session
/// machine and removed by it or by the idle sweep.
pub struct SessionStore {
    sessions: RwLock<HashMap<UserId, Session>>,
    clock: Arc<dyn Clock>,
}

impl SessionStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            clock,
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub async fn get(&self, user_id: UserId) -> Option<Session> {
        self.sessions.read().await.get(&user_id).cloned()
    }

    pub async fn state_of(&self, user_id: UserId) -> SessionState {
        self.sessions
            .read()
            .await
            .get(&user_id)
            .map_or(SessionState::Idle, |s| s.state)
    }

    /// Insert or replace, stamping the activity time
    pub async fn save(&self, mut session: Session) {
        session.last_activity_at = self.clock.now();
        self.sessions.write().await.insert(session.user_id, session);
    }

    pub async fn remove(&self, user_id: UserId) -> Option<Session> {
        self.sessions.write().await.remove(&user_id)
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    /// Drop every session idle for at least `window`, returning their users
    pub async fn expire_idle(&self, window: Duration) -> Vec<UserId> {
        let cutoff = self.clock.now() - window;
        let mut sessions = self.sessions.write().await;

        let expired: Vec<UserId> = sessions
            .values()
            .filter(|s| s.last_activity_at <= cutoff)
            .map(|s| s.user_id)
            .collect();

        for user_id in &expired {
            sessions.remove(user_id);
        }
        expired
    }
}
