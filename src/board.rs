use crate::auth::{AuthService, UserService};
use crate::config::Config;
use crate::storage::{FileBackend, JsonStorage, KeyValueBackend, MemoryBackend, ProjectStore, SessionStore, StorageCore, UserStore};
use crate::tasks::TaskService;

/// All stores wired to one local backend and one session-scoped backend.
pub struct Board {
    local: StorageCore,
    users: UserStore,
    projects: ProjectStore,
    session: SessionStore,
}

impl Board {
    pub fn with_backends(local: impl KeyValueBackend + 'static, scoped: impl KeyValueBackend + 'static) -> Self {
        let local = StorageCore::new(local);
        let json = JsonStorage::new(local.clone());
        let scoped = JsonStorage::new(StorageCore::new(scoped));
        Board {
            users: UserStore::new(json.clone()),
            projects: ProjectStore::new(json.clone()),
            session: SessionStore::new(json, scoped),
            local,
        }
    }

    /// File-backed local storage; session-scoped values last for the process.
    pub fn open(config: &Config) -> Self {
        Self::with_backends(
            FileBackend::new(&config.data_dir, config.quota_bytes),
            MemoryBackend::new(),
        )
    }

    pub fn in_memory() -> Self {
        Self::with_backends(MemoryBackend::new(), MemoryBackend::new())
    }

    pub fn storage(&self) -> &StorageCore {
        &self.local
    }

    pub fn json(&self) -> JsonStorage {
        JsonStorage::new(self.local.clone())
    }

    pub fn users(&self) -> &UserStore {
        &self.users
    }

    pub fn projects(&self) -> &ProjectStore {
        &self.projects
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    pub fn auth(&self) -> AuthService<'_> {
        AuthService::new(&self.users, &self.session)
    }

    pub fn accounts(&self) -> UserService<'_> {
        UserService::new(&self.users)
    }

    pub fn tasks(&self) -> TaskService<'_> {
        TaskService::new(&self.projects, &self.users)
    }
}
