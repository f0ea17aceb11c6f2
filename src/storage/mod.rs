//! Persistence. Everything lives in a flat string-to-string store, one JSON
//! document per key, read and written as a whole.

pub mod backend;
pub mod kv;
pub mod json;
pub mod projects;
pub mod session;
pub mod users;

pub use self::backend::{DisabledBackend, FileBackend, KeyValueBackend, MemoryBackend};
pub use self::kv::StorageCore;
pub use self::json::JsonStorage;
pub use self::projects::ProjectStore;
pub use self::session::SessionStore;
pub use self::users::UserStore;

/// Storage key names.
pub mod keys {
    pub const USERS: &str = "users";
    pub const PROJECTS: &str = "projects";
    /// The current session record.
    pub const SESSION: &str = "user";
    /// One-shot message for the next login screen (session-scoped store).
    pub const AUTH_MESSAGE: &str = "auth_message";
    pub const DATABASE_TESTS: &str = "database_tests";
    pub const CLOUD_USERS_BACKUP: &str = "cloud_users_backup";
    pub const CLOUD_PROJECTS_BACKUP: &str = "cloud_projects_backup";

    /// Keys that may be dropped to make room when the quota is hit.
    pub const EVICTABLE: &[&str] = &[DATABASE_TESTS, CLOUD_USERS_BACKUP, CLOUD_PROJECTS_BACKUP];
}
