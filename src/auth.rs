//! Sign-in, sessions and account management.

use tracing::{info, warn};

use crate::error::{AuthError, Error, Result};
use crate::models::{same_text, NewUser, Role, Session, User, UserPatch};
use crate::storage::{SessionStore, UserStore};

/// Built-in accounts. Signing in with one of these always works and adds the
/// account to storage if it is missing.
pub struct DefaultAccount {
    pub id: &'static str,
    pub username: &'static str,
    pub email: &'static str,
    pub password: &'static str,
    pub role: Role,
}

pub const DEFAULT_ACCOUNTS: [DefaultAccount; 2] = [
    DefaultAccount {
        id: "default-manager",
        username: "manager",
        email: "manager@example.com",
        password: "manager123",
        role: Role::Manager,
    },
    DefaultAccount {
        id: "default-employee",
        username: "employee",
        email: "employee@example.com",
        password: "employee123",
        role: Role::Employee,
    },
];

impl DefaultAccount {
    fn to_user(&self) -> User {
        User {
            id: self.id.to_string(),
            name: self.username.to_string(),
            email: self.email.to_string(),
            password: self.password.to_string(),
            role: self.role,
        }
    }
}

/// True when `login` names `user` by email or display name, ignoring case.
fn login_matches(user: &User, login: &str) -> bool {
    same_text(&user.email, login) || same_text(&user.name, login)
}

pub struct AuthService<'a> {
    users: &'a UserStore,
    session: &'a SessionStore,
}

impl<'a> AuthService<'a> {
    pub fn new(users: &'a UserStore, session: &'a SessionStore) -> Self {
        AuthService { users, session }
    }

    /// Adds any missing default account. Safe to call repeatedly.
    ///
    /// Returns how many accounts were added.
    pub fn ensure_default_users(&self) -> usize {
        let mut users = self.users.all();
        let mut added = 0;
        for account in &DEFAULT_ACCOUNTS {
            let present = users
                .iter()
                .any(|u| u.id == account.id || same_text(&u.email, account.email));
            if !present {
                users.push(account.to_user());
                added += 1;
            }
        }
        if added > 0 && !self.users.save_all(&users) {
            warn!("could not store default accounts");
            return 0;
        }
        added
    }

    /// Checks the credentials and, on success, replaces the current session.
    ///
    /// Correct credentials used with the wrong role fail with
    /// [`AuthError::RoleMismatch`] naming the account's real role.
    pub fn login(&self, username: &str, password: &str, role: Role) -> std::result::Result<Session, AuthError> {
        let username = username.trim();
        if username.is_empty() || password.is_empty() {
            return Err(AuthError::InvalidCredentials);
        }

        if let Some(account) = DEFAULT_ACCOUNTS
            .iter()
            .find(|a| same_text(a.username, username) && a.password == password)
        {
            if account.role != role {
                return Err(AuthError::RoleMismatch { actual: account.role });
            }
            self.ensure_default_users();
            let user = self
                .users
                .find_by_id(account.id)
                .unwrap_or_else(|| account.to_user());
            return self.start(&user);
        }

        let candidates: Vec<User> = self
            .users
            .all()
            .into_iter()
            .filter(|u| login_matches(u, username) && u.password == password)
            .collect();
        match candidates.iter().find(|u| u.role == role) {
            Some(user) => self.start(user),
            None => match candidates.first() {
                Some(other) => Err(AuthError::RoleMismatch { actual: other.role }),
                None => Err(AuthError::InvalidCredentials),
            },
        }
    }

    fn start(&self, user: &User) -> std::result::Result<Session, AuthError> {
        let session = self.session.start(user).ok_or(AuthError::SessionNotSaved)?;
        info!(user = %user.name, role = %user.role, "signed in");
        Ok(session)
    }

    pub fn logout(&self) -> bool {
        if let Some(session) = self.session.current() {
            info!(user = %session.username, "signed out");
        }
        self.session.clear()
    }

    pub fn current_session(&self) -> Option<Session> {
        self.session.current()
    }

    /// The stored account behind the current session.
    pub fn current_user(&self) -> Option<User> {
        let session = self.session.current()?;
        let users = self.users.all();
        session
            .user_id
            .as_deref()
            .and_then(|id| users.iter().find(|u| u.id == id))
            .or_else(|| users.iter().find(|u| u.name == session.username && u.role == session.role))
            .cloned()
    }

    /// The current session, if it belongs to `role`.
    pub fn require_role(&self, role: Role) -> std::result::Result<Session, AuthError> {
        let session = self.session.current().ok_or(AuthError::NotAuthenticated)?;
        if session.role != role {
            return Err(AuthError::Forbidden { required: role });
        }
        Ok(session)
    }
}

/// Account management on the `users` collection.
pub struct UserService<'a> {
    users: &'a UserStore,
}

impl<'a> UserService<'a> {
    pub fn new(users: &'a UserStore) -> Self {
        UserService { users }
    }

    pub fn list(&self) -> Vec<User> {
        self.users.all()
    }

    pub fn employees(&self) -> Vec<User> {
        self.users
            .all()
            .into_iter()
            .filter(|u| u.role == Role::Employee)
            .collect()
    }

    pub fn get(&self, id: &str) -> Result<User> {
        self.users.find_by_id(id).ok_or_else(|| Error::not_found("user", id))
    }

    /// Creates an account. Emails are unique, compared without case.
    pub fn create(&self, new: NewUser) -> Result<User> {
        let name = new.name.trim().to_string();
        let email = new.email.trim().to_string();
        validate_account(&name, &email)?;
        validate_password(&new.password)?;
        if self.users.find_by_email(&email).is_some() {
            return Err(Error::Validation(format!("a user with email {email} already exists")));
        }
        let user = User {
            id: uuid::Uuid::new_v4().to_string(),
            name,
            email,
            password: new.password,
            role: new.role,
        };
        if !self.users.upsert(&user) {
            return Err(Error::NotSaved { what: "users" });
        }
        info!(user = %user.name, role = %user.role, "user created");
        Ok(user)
    }

    pub fn update(&self, id: &str, patch: UserPatch) -> Result<User> {
        let mut user = self.get(id)?;
        if let Some(name) = patch.name {
            user.name = name.trim().to_string();
        }
        if let Some(email) = patch.email {
            let email = email.trim().to_string();
            if let Some(other) = self.users.find_by_email(&email) {
                if other.id != user.id {
                    return Err(Error::Validation(format!("a user with email {email} already exists")));
                }
            }
            user.email = email;
        }
        if let Some(password) = patch.password {
            validate_password(&password)?;
            user.password = password;
        }
        if let Some(role) = patch.role {
            user.role = role;
        }
        validate_account(&user.name, &user.email)?;
        if !self.users.upsert(&user) {
            return Err(Error::NotSaved { what: "users" });
        }
        Ok(user)
    }

    /// Removes the account. Tasks keep whatever references they had.
    pub fn delete(&self, id: &str) -> Result<User> {
        let user = self.get(id)?;
        if !self.users.remove(id) {
            return Err(Error::NotSaved { what: "users" });
        }
        info!(user = %user.name, "user deleted");
        Ok(user)
    }
}

fn validate_account(name: &str, email: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::Validation("name must not be empty".into()));
    }
    if !email.contains('@') {
        return Err(Error::Validation(format!("`{email}` is not an email address")));
    }
    Ok(())
}

fn validate_password(password: &str) -> Result<()> {
    if password.is_empty() {
        return Err(Error::Validation("password must not be empty".into()));
    }
    Ok(())
}
