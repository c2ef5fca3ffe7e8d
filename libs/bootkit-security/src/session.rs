use dashmap::DashMap;
use uuid::Uuid;

use crate::authentication::Authentication;

pub const SESSION_COOKIE: &str = "SESSION";

/// Session id of the current request, stored in request extensions when a
/// live session was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionId(pub String);

/// Authentication to persist once the response is produced. Filters put
/// this in response extensions; the persistence filter consumes it.
#[derive(Debug, Clone)]
pub struct SaveContext(pub Option<Authentication>);

/// In-memory server-side sessions.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: DashMap<String, Option<Authentication>>,
}

impl SessionRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a new session and return its id.
    #[must_use]
    pub fn create(&self, auth: Option<Authentication>) -> String {
        let id = Uuid::new_v4().simple().to_string();
        self.sessions.insert(id.clone(), auth);
        tracing::debug!(session = %id, "session created");
        id
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.sessions.contains_key(id)
    }

    /// `None` for unknown sessions, `Some(None)` for sessions without a
    /// principal.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<Option<Authentication>> {
        self.sessions.get(id).map(|entry| entry.value().clone())
    }

    /// Replace the authentication of an existing session; unknown ids are
    /// ignored.
    pub fn store(&self, id: &str, auth: Option<Authentication>) {
        if let Some(mut entry) = self.sessions.get_mut(id) {
            *entry = auth;
        }
    }

    pub fn invalidate(&self, id: &str) {
        if self.sessions.remove(id).is_some() {
            tracing::debug!(session = %id, "session invalidated");
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
