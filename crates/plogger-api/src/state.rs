//! Application state shared across all route handlers.
//!
//! AppState holds the orchestrator and the session registry. It is passed
//! to handlers via axum's State extractor.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use plogger_chat::{ConversationState, PloggingOrchestrator};
use plogger_core::config::PloggerConfig;

/// Session used by requests that carry no `session_id`. Never evicted.
pub const DEFAULT_SESSION: &str = "default";

/// Handle to one conversation. Flows hold the lock for their whole duration.
pub type SessionHandle = Arc<tokio::sync::Mutex<ConversationState>>;

struct SessionEntry {
    state: SessionHandle,
    last_used: DateTime<Utc>,
}

impl SessionEntry {
    fn new(now: DateTime<Utc>) -> Self {
        Self {
            state: Arc::new(tokio::sync::Mutex::new(ConversationState::new())),
            last_used: now,
        }
    }
}

/// Session id to conversation map with idle-timeout eviction.
///
/// Eviction is lazy: every lookup first drops sessions idle longer than the
/// timeout. Clients choose their own ids, so the map is also capped: opening
/// a session past `max_sessions` evicts the least recently used one. A flow
/// already holding an evicted session's handle finishes on it undisturbed.
pub struct SessionRegistry {
    sessions: Mutex<HashMap<String, SessionEntry>>,
    timeout: Option<Duration>,
    max_sessions: Option<usize>,
}

impl SessionRegistry {
    /// `timeout_minutes == 0` disables eviction.
    pub fn new(timeout_minutes: u32) -> Self {
        let timeout = (timeout_minutes > 0).then(|| Duration::minutes(i64::from(timeout_minutes)));
        let mut sessions = HashMap::new();
        sessions.insert(DEFAULT_SESSION.to_string(), SessionEntry::new(Utc::now()));
        Self {
            sessions: Mutex::new(sessions),
            timeout,
            max_sessions: None,
        }
    }

    /// Cap the number of live sessions, `default` included. 0 disables the cap.
    pub fn with_max_sessions(mut self, max_sessions: usize) -> Self {
        self.max_sessions = (max_sessions > 0).then_some(max_sessions);
        self
    }

    /// The session's handle, creating the session if it does not exist.
    pub fn get_or_create(&self, id: &str) -> SessionHandle {
        self.get_or_create_at(id, Utc::now())
    }

    /// The session's handle, or `None` for an unknown (or expired) id.
    pub fn get(&self, id: &str) -> Option<SessionHandle> {
        self.get_at(id, Utc::now())
    }

    /// Register a new session under a fresh UUID.
    pub fn create(&self) -> String {
        let id = Uuid::new_v4().to_string();
        self.get_or_create(&id);
        info!(session_id = %id, "Session created");
        id
    }

    /// Handle of the `default` session.
    pub fn default_session(&self) -> SessionHandle {
        self.get_or_create(DEFAULT_SESSION)
    }

    /// Resolve an optional request `session_id`; `None` means `default`.
    pub fn resolve(&self, id: Option<&str>) -> SessionHandle {
        self.get_or_create(id.unwrap_or(DEFAULT_SESSION))
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, SessionEntry>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn get_or_create_at(&self, id: &str, now: DateTime<Utc>) -> SessionHandle {
        let mut sessions = self.lock();
        self.evict_expired(&mut sessions, now);
        if !sessions.contains_key(id) {
            self.evict_least_recent(&mut sessions);
        }
        let entry = sessions.entry(id.to_string()).or_insert_with(|| {
            debug!(session_id = %id, "Session opened");
            SessionEntry::new(now)
        });
        entry.last_used = now;
        Arc::clone(&entry.state)
    }

    fn get_at(&self, id: &str, now: DateTime<Utc>) -> Option<SessionHandle> {
        let mut sessions = self.lock();
        self.evict_expired(&mut sessions, now);
        sessions.get_mut(id).map(|entry| {
            entry.last_used = now;
            Arc::clone(&entry.state)
        })
    }

    fn evict_expired(&self, sessions: &mut HashMap<String, SessionEntry>, now: DateTime<Utc>) {
        let Some(timeout) = self.timeout else {
            return;
        };
        let before = sessions.len();
        sessions.retain(|id, entry| id == DEFAULT_SESSION || now - entry.last_used <= timeout);
        let evicted = before - sessions.len();
        if evicted > 0 {
            info!(evicted, "Expired sessions evicted");
        }
    }

    /// Make room for one more session under the cap.
    fn evict_least_recent(&self, sessions: &mut HashMap<String, SessionEntry>) {
        let Some(max) = self.max_sessions else {
            return;
        };
        while sessions.len() >= max {
            let Some(victim) = sessions
                .iter()
                .filter(|(id, _)| id.as_str() != DEFAULT_SESSION)
                .min_by_key(|(_, entry)| entry.last_used)
                .map(|(id, _)| id.clone())
            else {
                return;
            };
            sessions.remove(&victim);
            warn!(session_id = %victim, max, "Session cap reached, evicted least recently used");
        }
    }
}

/// Shared application state.
///
/// All fields use `Arc` for cheap cloning across handler tasks.
#[derive(Clone)]
pub struct AppState {
    /// Effective configuration.
    pub config: Arc<PloggerConfig>,
    /// Flow implementations.
    pub orchestrator: Arc<PloggingOrchestrator>,
    /// Conversations by session id.
    pub sessions: Arc<SessionRegistry>,
    /// Server start time for uptime calculation.
    pub start_time: Instant,
}

impl AppState {
    pub fn new(config: PloggerConfig, orchestrator: PloggingOrchestrator) -> Self {
        let sessions = SessionRegistry::new(config.session.timeout_minutes)
            .with_max_sessions(config.session.max_sessions);
        Self {
            config: Arc::new(config),
            orchestrator: Arc::new(orchestrator),
            sessions: Arc::new(sessions),
            start_time: Instant::now(),
        }
    }
}
