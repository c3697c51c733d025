//! Session store: in-memory session table with idle expiry.
//!
//! Each session sits behind its own async mutex so different conversations
//! progress in parallel. The table itself is an async `RwLock`. The table
//! lock is never held while waiting on a session lock (sweeps only
//! `try_lock`), so a task holding a session may still consult the table.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::SessionConfig;
use crate::error::SessionError;
use crate::model::{Message, Session, SessionStatus, SessionSummary};

/// Shared, lockable session.
pub type SessionHandle = Arc<Mutex<Session>>;

/// In-memory store of live sessions.
pub struct SessionStore {
    config: SessionConfig,
    sessions: RwLock<HashMap<String, SessionHandle>>,
}

impl SessionStore {
    pub fn new(config: SessionConfig) -> Arc<Self> {
        Arc::new(Self {
            config,
            sessions: RwLock::new(HashMap::new()),
        })
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Create a session, generating an id when none is given.
    ///
    /// An expired session under the same id is replaced. When the table is
    /// full, idle sessions are swept first; if it is still full the call
    /// fails with `CapacityExceeded`.
    pub async fn create(&self, session_id: Option<&str>) -> Result<Session, SessionError> {
        let id = match session_id {
            Some(id) => id.to_string(),
            None => Uuid::new_v4().to_string(),
        };
        let handle = self.insert_new(id).await?;
        let snapshot = handle.lock().await.clone();
        Ok(snapshot)
    }

    /// Snapshot of a live session. Expired sessions are evicted on access.
    pub async fn get(&self, session_id: &str) -> Result<Session, SessionError> {
        let handle = self.live_handle(session_id).await?;
        let snapshot = handle.lock().await.clone();
        Ok(snapshot)
    }

    /// Append a message. Returns `false` if the message id was already present.
    pub async fn add_message(
        &self,
        session_id: &str,
        message: Message,
    ) -> Result<bool, SessionError> {
        let handle = self.live_handle(session_id).await?;
        let mut session = handle.lock().await;
        let message_id = message.message_id.clone();
        let added = session.add_message(message);
        if !added {
            debug!(session_id, message_id = %message_id, "Duplicate message ignored");
        }
        Ok(added)
    }

    /// Whether `provided` is an id-for-id prefix of the stored history.
    ///
    /// Unknown or expired sessions never validate.
    pub async fn validate_history(&self, session_id: &str, provided: &[Message]) -> bool {
        let Ok(handle) = self.live_handle(session_id).await else {
            return false;
        };
        let session = handle.lock().await;
        let valid = history_matches(&session.messages, provided);
        if !valid {
            warn!(
                session_id,
                stored = session.messages.len(),
                provided = provided.len(),
                "Provided history does not match stored history"
            );
        }
        valid
    }

    /// Set a final status, evict the session and return its last state.
    pub async fn terminate(
        &self,
        session_id: &str,
        status: SessionStatus,
    ) -> Result<Session, SessionError> {
        let handle = self
            .sessions
            .write()
            .await
            .remove(session_id)
            .ok_or_else(|| SessionError::NotFound {
                id: session_id.to_string(),
            })?;

        let mut session = handle.lock().await;
        session.status = status;
        info!(session_id, status = %status, summary = ?session.summary(), "Session terminated");
        Ok(session.clone())
    }

    /// Remove a session. Returns whether it existed.
    pub async fn delete(&self, session_id: &str) -> bool {
        let removed = self.sessions.write().await.remove(session_id).is_some();
        if removed {
            info!(session_id, "Session deleted");
        }
        removed
    }

    /// Summaries of all active, non-idle sessions.
    pub async fn list_active(&self) -> Vec<SessionSummary> {
        let handles: Vec<SessionHandle> = self.sessions.read().await.values().cloned().collect();
        let now = Utc::now();
        let mut active = Vec::new();
        for handle in &handles {
            let session = handle.lock().await;
            if session.status == SessionStatus::Active
                && !session.is_idle(self.config.idle_timeout, now)
            {
                active.push(session.summary());
            }
        }
        active
    }

    /// Evict every idle session. Returns the number evicted.
    pub async fn expire_idle(&self) -> usize {
        let mut sessions = self.sessions.write().await;
        let count = evict_idle(&mut sessions, self.config.idle_timeout, Utc::now());
        if count > 0 {
            info!(count, remaining = sessions.len(), "Expired idle sessions");
        }
        count
    }

    /// Number of sessions held, including idle ones not yet swept.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    /// Live handle for `session_id`, creating the session if needed.
    pub(crate) async fn load_or_create(
        &self,
        session_id: &str,
    ) -> Result<SessionHandle, SessionError> {
        match self.live_handle(session_id).await {
            Ok(handle) => Ok(handle),
            Err(SessionError::NotFound { .. }) => {
                match self.insert_new(session_id.to_string()).await {
                    // Lost a creation race: use the winner's session.
                    Err(SessionError::AlreadyExists { .. }) => self.live_handle(session_id).await,
                    other => other,
                }
            }
            Err(e) => Err(e),
        }
    }

    /// Lock the live session for `session_id`, creating it if needed.
    ///
    /// The guard always belongs to the session currently in the table. A
    /// handle evicted between lookup and lock is dropped and the lookup
    /// retried. While the guard is held the session cannot expire.
    pub(crate) async fn lock_live(
        &self,
        session_id: &str,
    ) -> Result<(SessionHandle, OwnedMutexGuard<Session>), SessionError> {
        loop {
            let handle = self.load_or_create(session_id).await?;
            let guard = handle.clone().lock_owned().await;
            if self.is_current(session_id, &handle).await {
                return Ok((handle, guard));
            }
            debug!(session_id, "Session evicted before it was locked, retrying");
        }
    }

    /// Whether `handle` is the session stored under `session_id`.
    pub(crate) async fn is_current(&self, session_id: &str, handle: &SessionHandle) -> bool {
        self.sessions
            .read()
            .await
            .get(session_id)
            .is_some_and(|current| Arc::ptr_eq(current, handle))
    }

    /// Live handle, evicting the session if it has gone idle.
    pub(crate) async fn live_handle(&self, session_id: &str) -> Result<SessionHandle, SessionError> {
        let not_found = || SessionError::NotFound {
            id: session_id.to_string(),
        };

        let handle = self
            .sessions
            .read()
            .await
            .get(session_id)
            .cloned()
            .ok_or_else(not_found)?;

        let idle = handle
            .lock()
            .await
            .is_idle(self.config.idle_timeout, Utc::now());
        if !idle {
            return Ok(handle);
        }

        // Re-check under the write lock; the session may have been touched
        // or replaced since.
        let mut sessions = self.sessions.write().await;
        match sessions.get(session_id) {
            Some(current) if !is_expired(current, self.config.idle_timeout, Utc::now()) => {
                Ok(current.clone())
            }
            Some(_) => {
                sessions.remove(session_id);
                info!(session_id, "Session expired");
                Err(not_found())
            }
            None => Err(not_found()),
        }
    }

    async fn insert_new(&self, session_id: String) -> Result<SessionHandle, SessionError> {
        let now = Utc::now();
        let timeout = self.config.idle_timeout;
        let mut sessions = self.sessions.write().await;

        if let Some(existing) = sessions.get(&session_id) {
            if !is_expired(existing, timeout, now) {
                return Err(SessionError::AlreadyExists { id: session_id });
            }
            sessions.remove(&session_id);
            debug!(session_id = %session_id, "Replacing expired session");
        }

        if sessions.len() >= self.config.max_sessions {
            evict_idle(&mut sessions, timeout, now);
            if sessions.len() >= self.config.max_sessions {
                warn!(
                    max_sessions = self.config.max_sessions,
                    "Session capacity exceeded"
                );
                return Err(SessionError::CapacityExceeded {
                    max: self.config.max_sessions,
                });
            }
        }

        let handle = Arc::new(Mutex::new(Session::with_created_at(session_id.clone(), now)));
        sessions.insert(session_id.clone(), handle.clone());
        info!(session_id = %session_id, active = sessions.len(), "Session created");
        Ok(handle)
    }
}

/// Whether `provided` is an id-for-id prefix of `stored`.
pub fn history_matches(stored: &[Message], provided: &[Message]) -> bool {
    provided.len() <= stored.len()
        && stored
            .iter()
            .zip(provided)
            .all(|(s, p)| s.message_id == p.message_id)
}

/// A session is expired when idle past the timeout. A session whose lock is
/// held is in use and therefore not idle.
fn is_expired(handle: &SessionHandle, timeout: Duration, now: DateTime<Utc>) -> bool {
    match handle.try_lock() {
        Ok(session) => session.is_idle(timeout, now),
        Err(_) => false,
    }
}

fn evict_idle(
    sessions: &mut HashMap<String, SessionHandle>,
    timeout: Duration,
    now: DateTime<Utc>,
) -> usize {
    let before = sessions.len();
    sessions.retain(|id, handle| {
        let expired = is_expired(handle, timeout, now);
        if expired {
            debug!(session_id = %id, "Evicting idle session");
        }
        !expired
    });
    before - sessions.len()
}

/// Spawn a background task that periodically evicts idle sessions.
pub fn spawn_expiry_task(store: Arc<SessionStore>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(store.config.sweep_interval);
        loop {
            interval.tick().await;
            store.expire_idle().await;
        }
    })
}
