pub mod controller;

use std::{collections::HashMap, time::Duration};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

pub use controller::{DemoController, FeedbackOutcome, PredictOutcome};

/// Chat id of the conversation owning the session.
pub type SessionId = i64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingPrediction {
    pub text: String,
    pub label: String,
}

#[derive(Debug, Clone)]
pub struct Session {
    pub started_at: DateTime<Utc>,
    pub last_active: DateTime<Utc>,
    pub input: String,
    pub last_prediction: Option<PendingPrediction>,
}

impl Session {
    fn new(now: DateTime<Utc>) -> Self {
        Self {
            started_at: now,
            last_active: now,
            input: String::new(),
            last_prediction: None,
        }
    }

    fn is_idle(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        // A clock going backwards yields an error here; keep the session then.
        (now - self.last_active)
            .to_std()
            .map(|idle| idle > ttl)
            .unwrap_or(false)
    }
}

/// Per-chat sessions. Every access counts as activity; sessions idle for
/// longer than `idle_ttl` are dropped on the next access to the store.
#[derive(Debug)]
pub struct SessionStore {
    sessions: Mutex<HashMap<SessionId, Session>>,
    idle_ttl: Duration,
}

impl SessionStore {
    pub fn new(idle_ttl: Duration) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            idle_ttl,
        }
    }

    /// Returns `true` when a fresh session was opened.
    pub fn start(&self, id: SessionId) -> bool {
        self.start_at(id, Utc::now())
    }

    pub fn end(&self, id: SessionId) -> bool {
        let removed = self.sessions.lock().remove(&id).is_some();
        if removed {
            tracing::info!(target: "session", session = id, "session ended");
        }
        removed
    }

    /// Runs `f` on the session, opening one first if needed.
    ///
    /// The lock is held for the duration of `f`; keep it short.
    pub fn with_session<R>(&self, id: SessionId, f: impl FnOnce(&mut Session) -> R) -> R {
        self.with_session_at(id, Utc::now(), f)
    }

    pub fn get(&self, id: SessionId) -> Option<Session> {
        self.get_at(id, Utc::now())
    }

    pub fn active_count(&self) -> usize {
        self.sessions.lock().len()
    }

    fn start_at(&self, id: SessionId, now: DateTime<Utc>) -> bool {
        let mut sessions = self.sessions.lock();
        self.evict_idle(&mut sessions, now);
        if let Some(session) = sessions.get_mut(&id) {
            session.last_active = now;
            return false;
        }
        sessions.insert(id, Session::new(now));
        tracing::info!(target: "session", session = id, "session started");
        true
    }

    fn with_session_at<R>(
        &self,
        id: SessionId,
        now: DateTime<Utc>,
        f: impl FnOnce(&mut Session) -> R,
    ) -> R {
        let mut sessions = self.sessions.lock();
        self.evict_idle(&mut sessions, now);
        let session = sessions.entry(id).or_insert_with(|| {
            tracing::info!(target: "session", session = id, "session started");
            Session::new(now)
        });
        session.last_active = now;
        f(session)
    }

    fn get_at(&self, id: SessionId, now: DateTime<Utc>) -> Option<Session> {
        let mut sessions = self.sessions.lock();
        self.evict_idle(&mut sessions, now);
        sessions.get_mut(&id).map(|session| {
            session.last_active = now;
            session.clone()
        })
    }

    fn evict_idle(&self, sessions: &mut HashMap<SessionId, Session>, now: DateTime<Utc>) {
        let before = sessions.len();
        sessions.retain(|_, session| !session.is_idle(now, self.idle_ttl));
        let evicted = before - sessions.len();
        if evicted > 0 {
            tracing::info!(
                target: "session",
                evicted,
                remaining = sessions.len(),
                "idle sessions dropped"
            );
        }
    }
}
