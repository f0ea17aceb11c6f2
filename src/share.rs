//! Share links: a collection serialized into a URL query parameter.
//!
//! Payload pipeline: JSON, then percent-encoding of the UTF-8 text, then
//! standard base64. Decoding runs the same steps backwards.

use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{info, warn};
use url::Url;

use crate::error::{Error, Result, ShareError};
use crate::models::{Project, User};
use crate::storage::{ProjectStore, UserStore};

pub const USERS_PARAM: &str = "users";
pub const PROJECTS_PARAM: &str = "projects";

/// Records that are merged by their identifier.
pub trait Identified {
    fn ident(&self) -> &str;
}

impl Identified for User {
    fn ident(&self) -> &str {
        &self.id
    }
}

impl Identified for Project {
    fn ident(&self) -> &str {
        &self.id
    }
}

/// Result of merging an incoming batch into an existing collection.
#[derive(Debug, Clone)]
pub struct MergeOutcome<T> {
    pub merged: Vec<T>,
    pub added: usize,
    /// Incoming records dropped because their id was already present.
    pub skipped: usize,
}

/// Union by id. On a collision the existing record wins unchanged, and
/// duplicate ids inside `incoming` keep only their first occurrence.
pub fn merge_by_id<T: Identified>(existing: Vec<T>, incoming: Vec<T>) -> MergeOutcome<T> {
    let mut merged = existing;
    let mut added = 0;
    let mut skipped = 0;
    for item in incoming {
        if item.ident().is_empty() || merged.iter().any(|e| e.ident() == item.ident()) {
            skipped += 1;
            continue;
        }
        merged.push(item);
        added += 1;
    }
    MergeOutcome { merged, added, skipped }
}

pub fn encode_payload<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    let json = serde_json::to_string(value)?;
    Ok(B64.encode(urlencoding::encode(&json).as_bytes()))
}

pub fn decode_payload<T: DeserializeOwned>(payload: &str) -> std::result::Result<T, ShareError> {
    // a '+' that went through a form decoder comes back as a space
    let cleaned: String = payload.trim().replace(' ', "+");
    let bytes = B64.decode(cleaned.as_bytes())?;
    let encoded = String::from_utf8(bytes)?;
    let json = urlencoding::decode(&encoded)?;
    Ok(serde_json::from_str(&json)?)
}

/// Copy of `users` fit for sharing; passwords are blanked unless asked for.
pub fn shareable_users(users: &[User], include_passwords: bool) -> Vec<User> {
    users
        .iter()
        .cloned()
        .map(|mut u| {
            if !include_passwords {
                u.password.clear();
            }
            u
        })
        .collect()
}

fn link_with(base_url: &str, param: &str, payload: &str) -> Result<String> {
    let mut url = Url::parse(base_url).map_err(ShareError::from)?;
    url.query_pairs_mut().append_pair(param, payload);
    Ok(url.into())
}

pub fn share_users_link(base_url: &str, users: &[User], include_passwords: bool) -> Result<String> {
    let payload = encode_payload(&shareable_users(users, include_passwords))?;
    link_with(base_url, USERS_PARAM, &payload)
}

pub fn share_projects_link(base_url: &str, projects: &[Project]) -> Result<String> {
    let payload = encode_payload(projects)?;
    link_with(base_url, PROJECTS_PARAM, &payload)
}

/// Value of query parameter `name`, already percent-decoded.
pub fn extract_param(link: &str, name: &str) -> std::result::Result<Option<String>, ShareError> {
    let url = Url::parse(link)?;
    Ok(url
        .query_pairs()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.into_owned()))
}

/// The link with every `name` parameter removed, as after a one-time read.
pub fn strip_param(link: &str, name: &str) -> std::result::Result<String, ShareError> {
    let mut url = Url::parse(link)?;
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| k != name)
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    if kept.is_empty() {
        url.set_query(None);
    } else {
        url.query_pairs_mut().clear().extend_pairs(kept);
    }
    Ok(url.into())
}

/// Outcome of reading a share link into local storage.
#[derive(Debug, Clone)]
pub struct ImportReport {
    pub added: usize,
    pub skipped: usize,
    /// The link with the consumed parameter removed.
    pub cleaned_link: String,
}

fn import_from_link<T>(link: &str, param: &str, existing: Vec<T>, save: impl FnOnce(&[T]) -> bool) -> Result<ImportReport>
where
    T: Identified + DeserializeOwned,
{
    let payload = extract_param(link, param)?.ok_or_else(|| ShareError::MissingParam(param.to_string()))?;
    let incoming: Vec<T> = decode_payload(&payload)?;
    let outcome = merge_by_id(existing, incoming);
    if outcome.added > 0 && !save(&outcome.merged) {
        warn!(param, "imported records could not be stored");
        return Err(Error::NotSaved { what: "imported records" });
    }
    info!(param, added = outcome.added, skipped = outcome.skipped, "imported shared records");
    Ok(ImportReport {
        added: outcome.added,
        skipped: outcome.skipped,
        cleaned_link: strip_param(link, param)?,
    })
}

pub fn import_users_from_link(store: &UserStore, link: &str) -> Result<ImportReport> {
    import_from_link(link, USERS_PARAM, store.all(), |merged| store.save_all(merged))
}

pub fn import_projects_from_link(store: &ProjectStore, link: &str) -> Result<ImportReport> {
    import_from_link(link, PROJECTS_PARAM, store.all(), |merged| store.save_all(merged))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;

    fn user(id: &str, name: &str) -> User {
        User {
            id: id.into(),
            name: name.into(),
            email: format!("{name}@example.com"),
            password: "secret".into(),
            role: Role::Employee,
        }
    }

    #[test]
    fn payload_survives_non_ascii_names() {
        let users = vec![user("1", "Ольга"), user("2", "José")];
        let payload = encode_payload(&users).unwrap();
        assert!(payload.is_ascii());
        let back: Vec<User> = decode_payload(&payload).unwrap();
        assert_eq!(back, users);
    }

    #[test]
    fn existing_entry_wins_on_collision() {
        let existing = vec![user("1", "old")];
        let incoming = vec![user("1", "new"), user("2", "b"), user("2", "dup")];
        let out = merge_by_id(existing, incoming);
        assert_eq!(out.added, 1);
        assert_eq!(out.skipped, 2);
        assert_eq!(out.merged.len(), 2);
        assert_eq!(out.merged[0].name, "old");
        assert_eq!(out.merged[1].name, "b");
    }

    #[test]
    fn strip_keeps_other_params() {
        let cleaned = strip_param("https://app.test/login?users=abc&lang=ru", "users").unwrap();
        assert_eq!(cleaned, "https://app.test/login?lang=ru");
        let cleaned = strip_param("https://app.test/login?users=abc", "users").unwrap();
        assert_eq!(cleaned, "https://app.test/login");
    }

    #[test]
    fn garbage_payload_is_an_error() {
        assert!(decode_payload::<Vec<User>>("%%%not base64").is_err());
        let not_json = B64.encode("hello");
        assert!(matches!(
            decode_payload::<Vec<User>>(&not_json),
            Err(ShareError::Json(_))
        ));
    }
}
