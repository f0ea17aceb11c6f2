//! # Taskboard
//!
//! A small project and task tracker for two kinds of accounts. Managers
//! create projects and tasks, assign employees and move data in and out;
//! employees see their tasks, claim unassigned ones, report progress and
//! leave comments.
//!
//! All data lives in a local key-value store (one JSON document per key),
//! the same model a browser's `localStorage` offers:
//!
//! | key        | contents                     |
//! |------------|------------------------------|
//! | `users`    | every account                |
//! | `projects` | every project with its tasks |
//! | `user`     | the current session          |
//!
//! Collections are read and written whole. There is no locking; two
//! processes writing at once means the last write wins.

pub mod auth;
pub mod board;
pub mod commands;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod export;
pub mod models;
pub mod progress;
pub mod routes;
pub mod share;
pub mod storage;
pub mod tasks;
pub mod tui;

pub use board::Board;
pub use error::{Error, Result};
