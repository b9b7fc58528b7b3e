use std::{
    path::PathBuf,
    sync::{Arc, Mutex, PoisonError},
};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use shared::domain::Role;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::error::SessionError;

pub const DEFAULT_SESSION_TTL_HOURS: i64 = 24;

/// Signed-in staff identity plus the bearer token the service issued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub username: String,
    pub role: Role,
    pub token: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogoutReason {
    UserRequested,
    Unauthorized,
    Expired,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    SignedOut { reason: Option<LogoutReason> },
    SignedIn(Session),
}

impl SessionState {
    pub fn session(&self) -> Option<&Session> {
        match self {
            SessionState::SignedIn(session) => Some(session),
            SessionState::SignedOut { .. } => None,
        }
    }
}

#[derive(Serialize, Deserialize)]
struct PersistedSession {
    #[serde(flatten)]
    session: Session,
    saved_at: DateTime<Utc>,
}

/// Raw persistence for the serialized session record.
pub trait SessionStore: Send + Sync {
    fn load(&self) -> Result<Option<String>, SessionError>;
    fn save(&self, raw: &str) -> Result<(), SessionError>;
    fn clear(&self) -> Result<(), SessionError>;
}

pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SessionStore for FileSessionStore {
    fn load(&self) -> Result<Option<String>, SessionError> {
        match std::fs::read_to_string(&self.path) {
            Ok(raw) => Ok(Some(raw)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn save(&self, raw: &str) -> Result<(), SessionError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, raw)?;
        Ok(())
    }

    fn clear(&self) -> Result<(), SessionError> {
        match std::fs::remove_file(&self.path) {
            Err(err) if err.kind() != std::io::ErrorKind::NotFound => Err(err.into()),
            _ => Ok(()),
        }
    }
}

#[derive(Default)]
pub struct MemorySessionStore {
    raw: Mutex<Option<String>>,
}

impl MemorySessionStore {
    pub fn with_raw(raw: impl Into<String>) -> Self {
        Self {
            raw: Mutex::new(Some(raw.into())),
        }
    }
}

impl SessionStore for MemorySessionStore {
    fn load(&self) -> Result<Option<String>, SessionError> {
        Ok(self
            .raw
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    fn save(&self, raw: &str) -> Result<(), SessionError> {
        *self.raw.lock().unwrap_or_else(PoisonError::into_inner) = Some(raw.to_owned());
        Ok(())
    }

    fn clear(&self) -> Result<(), SessionError> {
        self.raw.lock().unwrap_or_else(PoisonError::into_inner).take();
        Ok(())
    }
}

/// Owns the signed-in identity for every view of one console instance.
///
/// Restored once through [`SessionProvider::init`]; every later transition is
/// published on a watch channel so views can fall back to the login screen
/// when the session is torn down.
pub struct SessionProvider {
    store: Arc<dyn SessionStore>,
    ttl: Duration,
    state: watch::Sender<SessionState>,
}

impl SessionProvider {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self::with_ttl(store, Duration::hours(DEFAULT_SESSION_TTL_HOURS))
    }

    pub fn with_ttl(store: Arc<dyn SessionStore>, ttl: Duration) -> Self {
        let (state, _) = watch::channel(SessionState::SignedOut { reason: None });
        Self { store, ttl, state }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemorySessionStore::default()))
    }

    /// Reads the persisted session. Expired or unreadable records are
    /// discarded and leave the provider signed out.
    pub fn init(&self) -> Option<Session> {
        let raw = match self.store.load() {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(err) => {
                warn!("session: failed to read persisted session: {err}");
                return None;
            }
        };

        let persisted: PersistedSession = match serde_json::from_str(&raw) {
            Ok(persisted) => persisted,
            Err(err) => {
                warn!("session: discarding corrupted session record: {err}");
                self.clear_store();
                return None;
            }
        };

        if persisted.saved_at + self.ttl < Utc::now() {
            info!(username = %persisted.session.username, "session: persisted session expired");
            self.clear_store();
            self.state.send_replace(SessionState::SignedOut {
                reason: Some(LogoutReason::Expired),
            });
            return None;
        }

        info!(
            username = %persisted.session.username,
            role = %persisted.session.role,
            "session: restored"
        );
        self.state
            .send_replace(SessionState::SignedIn(persisted.session.clone()));
        Some(persisted.session)
    }

    pub fn sign_in(&self, session: Session) -> Result<(), SessionError> {
        let record = PersistedSession {
            session: session.clone(),
            saved_at: Utc::now(),
        };
        self.store.save(&serde_json::to_string(&record)?)?;
        info!(username = %session.username, role = %session.role, "session: signed in");
        self.state.send_replace(SessionState::SignedIn(session));
        Ok(())
    }

    pub fn logout(&self) {
        self.teardown(LogoutReason::UserRequested);
    }

    /// Clears the persisted record and broadcasts the signed-out state.
    /// Calling it while already signed out changes nothing.
    pub fn teardown(&self, reason: LogoutReason) {
        let changed = self.state.send_if_modified(|state| match state {
            SessionState::SignedIn(_) => {
                *state = SessionState::SignedOut {
                    reason: Some(reason),
                };
                true
            }
            SessionState::SignedOut { .. } => false,
        });
        self.clear_store();
        if changed {
            info!(?reason, "session: signed out");
        }
    }

    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn current(&self) -> Option<Session> {
        self.state.borrow().session().cloned()
    }

    pub fn token(&self) -> Option<String> {
        self.state.borrow().session().map(|s| s.token.clone())
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    fn clear_store(&self) {
        if let Err(err) = self.store.clear() {
            warn!("session: failed to clear persisted session: {err}");
        }
    }
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
