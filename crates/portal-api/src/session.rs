//! Cookie sessions with flash messages, kept in memory for the process lifetime.

use axum::http::header::COOKIE;
use axum::http::HeaderMap;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use uuid::Uuid;

pub const SESSION_COOKIE: &str = "portal_session";

/// Session id attached to every request by the session middleware.
#[derive(Debug, Clone)]
pub struct SessionId(pub String);

/// Logged-in interface user, attached to requests on protected routes.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub String);

struct Session {
    username: Option<String>,
    flashes: Vec<String>,
    last_seen: Instant,
}

impl Session {
    fn new() -> Self {
        Self {
            username: None,
            flashes: Vec::new(),
            last_seen: Instant::now(),
        }
    }
}

/// Default upper bound on stored sessions.
pub const DEFAULT_MAX_SESSIONS: usize = 10_000;

/// Session table.
///
/// An id handed out by [`SessionStore::new_id`] is only stored once something is written to it
/// (a flash or a login). Sessions idle longer than `idle_timeout` are dropped whenever a new one
/// is stored; at `max_sessions` the least recently seen session is evicted.
#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<String, Session>>>,
    idle_timeout: Duration,
    max_sessions: usize,
}

impl SessionStore {
    pub fn new(idle_timeout: Duration) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            idle_timeout,
            max_sessions: DEFAULT_MAX_SESSIONS,
        }
    }

    pub fn with_max_sessions(mut self, max_sessions: usize) -> Self {
        self.max_sessions = max_sessions.max(1);
        self
    }

    /// Fresh unguessable id; nothing is stored yet.
    pub fn new_id() -> String {
        Uuid::new_v4().simple().to_string()
    }

    fn admit(&self, sessions: &mut HashMap<String, Session>, id: String, session: Session) {
        let timeout = self.idle_timeout;
        sessions.retain(|_, s| s.last_seen.elapsed() < timeout);
        while sessions.len() >= self.max_sessions {
            let Some(oldest) = sessions
                .iter()
                .min_by_key(|(_, s)| s.last_seen)
                .map(|(k, _)| k.clone())
            else {
                break;
            };
            sessions.remove(&oldest);
            tracing::warn!(max_sessions = self.max_sessions, "session table full, evicted oldest session");
        }
        sessions.insert(id, session);
    }

    /// Whether `id` is stored.
    pub async fn contains(&self, id: &str) -> bool {
        self.sessions.read().await.contains_key(id)
    }

    /// Whether `id` is a live session; refreshes its idle timer.
    pub async fn touch(&self, id: &str) -> bool {
        let mut guard = self.sessions.write().await;
        let Some(session) = guard.get_mut(id) else {
            return false;
        };
        if session.last_seen.elapsed() < self.idle_timeout {
            session.last_seen = Instant::now();
            return true;
        }
        guard.remove(id);
        false
    }

    pub async fn username(&self, id: &str) -> Option<String> {
        self.sessions
            .read()
            .await
            .get(id)
            .and_then(|s| s.username.clone())
    }

    /// Log `username` in. The session gets a fresh id (pending flashes carry over); the old id
    /// stops working.
    pub async fn login(&self, id: &str, username: &str) -> String {
        let new_id = Self::new_id();
        let mut guard = self.sessions.write().await;
        let mut session = guard.remove(id).unwrap_or_else(Session::new);
        session.username = Some(username.to_string());
        session.last_seen = Instant::now();
        self.admit(&mut guard, new_id.clone(), session);
        new_id
    }

    /// Clear the user; the session itself stays so a flash can be shown on the login page.
    pub async fn logout(&self, id: &str) -> Option<String> {
        self.sessions
            .write()
            .await
            .get_mut(id)
            .and_then(|s| s.username.take())
    }

    /// Queue a message for the next page shown to `id`, storing the session if needed.
    pub async fn flash(&self, id: &str, message: impl Into<String>) {
        let mut guard = self.sessions.write().await;
        if let Some(s) = guard.get_mut(id) {
            s.flashes.push(message.into());
            return;
        }
        let mut session = Session::new();
        session.flashes.push(message.into());
        self.admit(&mut guard, id.to_string(), session);
    }

    /// Pending flash messages, oldest first. They are shown once.
    pub async fn take_flashes(&self, id: &str) -> Vec<String> {
        self.sessions
            .write()
            .await
            .get_mut(id)
            .map(|s| std::mem::take(&mut s.flashes))
            .unwrap_or_default()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}

/// Session id from the request's `Cookie` headers.
pub fn session_id_from_headers(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.to_string())
        .filter(|v| !v.is_empty())
}

/// `Set-Cookie` value for a session id.
pub fn session_cookie(id: &str) -> String {
    format!("{}={}; Path=/; HttpOnly; SameSite=Lax", SESSION_COOKIE, id)
}
