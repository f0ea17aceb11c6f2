use chrono::Utc;
use tracing::debug;

use super::json::JsonStorage;
use super::keys;
use crate::models::{Session, User};

/// The current-session record plus the one-shot login message.
///
/// `local` survives restarts; `scoped` only lives as long as the process,
/// like a browser tab's session storage.
#[derive(Clone)]
pub struct SessionStore {
    local: JsonStorage,
    scoped: JsonStorage,
}

impl SessionStore {
    pub fn new(local: JsonStorage, scoped: JsonStorage) -> Self {
        SessionStore { local, scoped }
    }

    /// The stored session, if it is marked authenticated.
    pub fn current(&self) -> Option<Session> {
        self.local
            .get_opt::<Session>(keys::SESSION)
            .filter(|s| s.is_authenticated)
    }

    /// Overwrites any existing session with one for `user`.
    pub fn start(&self, user: &User) -> Option<Session> {
        let session = Session {
            id: uuid::Uuid::new_v4().to_string(),
            username: user.name.clone(),
            user_id: Some(user.id.clone()),
            role: user.role,
            is_authenticated: true,
            login_time: Utc::now(),
        };
        self.local.set(keys::SESSION, &session).then_some(session)
    }

    pub fn clear(&self) -> bool {
        self.local.remove(keys::SESSION)
    }

    pub fn set_auth_message(&self, message: &str) -> bool {
        debug!(message, "queued login message");
        self.scoped.set(keys::AUTH_MESSAGE, message)
    }

    /// Returns the pending login message and removes it.
    pub fn take_auth_message(&self) -> Option<String> {
        let message = self.scoped.get_opt::<String>(keys::AUTH_MESSAGE)?;
        self.scoped.remove(keys::AUTH_MESSAGE);
        Some(message)
    }
}
