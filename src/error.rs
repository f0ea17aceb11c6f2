//! Error types shared by the storage, auth and share layers.

use thiserror::Error;

use crate::models::Role;

/// Failures raised by a key-value backend.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("storage is not available")]
    Unavailable,

    #[error("storage quota exceeded: {needed} bytes needed, {quota} allowed")]
    QuotaExceeded { needed: usize, quota: usize },

    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Login and access-control failures.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum AuthError {
    #[error("invalid username or password")]
    InvalidCredentials,

    #[error("this account is registered as {actual}, sign in as {actual} instead")]
    RoleMismatch { actual: Role },

    #[error("not signed in")]
    NotAuthenticated,

    #[error("access restricted to {required} accounts")]
    Forbidden { required: Role },

    #[error("could not persist the session")]
    SessionNotSaved,
}

/// Failures decoding a shared payload or link.
#[derive(Error, Debug)]
pub enum ShareError {
    #[error("payload is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("payload is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("payload is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid link: {0}")]
    Url(#[from] url::ParseError),

    #[error("link has no `{0}` parameter")]
    MissingParam(String),
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Share(#[from] ShareError),

    #[error("{entity} `{id}` not found")]
    NotFound { entity: &'static str, id: String },

    #[error("{0}")]
    Validation(String),

    #[error("could not write {what}")]
    NotSaved { what: &'static str },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Error::NotFound {
            entity,
            id: id.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
