use super::json::JsonStorage;
use super::keys;
use crate::models::{same_text, User};

/// The `users` collection.
#[derive(Clone)]
pub struct UserStore {
    json: JsonStorage,
}

impl UserStore {
    pub fn new(json: JsonStorage) -> Self {
        UserStore { json }
    }

    pub fn all(&self) -> Vec<User> {
        self.json.get(keys::USERS, Vec::new())
    }

    pub fn save_all(&self, users: &[User]) -> bool {
        self.json.set(keys::USERS, users)
    }

    pub fn find_by_id(&self, id: &str) -> Option<User> {
        self.all().into_iter().find(|u| u.id == id)
    }

    pub fn find_by_email(&self, email: &str) -> Option<User> {
        self.all()
            .into_iter()
            .find(|u| same_text(&u.email, email.trim()))
    }

    /// Replaces the user with the same id, or appends it.
    pub fn upsert(&self, user: &User) -> bool {
        let mut users = self.all();
        match users.iter_mut().find(|u| u.id == user.id) {
            Some(existing) => *existing = user.clone(),
            None => users.push(user.clone()),
        }
        self.save_all(&users)
    }

    /// Returns `false` when no such user exists or the write fails.
    pub fn remove(&self, id: &str) -> bool {
        let mut users = self.all();
        let len_before = users.len();
        users.retain(|u| u.id != id);
        users.len() != len_before && self.save_all(&users)
    }
}
