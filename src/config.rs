use std::path::PathBuf;

use tracing::warn;

/// Runtime settings, read from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding one JSON file per storage key.
    pub data_dir: PathBuf,
    /// Optional cap on the total bytes stored.
    pub quota_bytes: Option<usize>,
}

impl Config {
    /// Resolves the data directory in this order:
    /// 1. `TASKBOARD_DIR` environment variable.
    /// 2. `~/.local/share/taskboard` (on Linux).
    /// 3. `./taskboard` (fallback).
    ///
    /// `TASKBOARD_QUOTA` sets a byte quota; unparseable values are ignored.
    pub fn from_env() -> Self {
        let data_dir = std::env::var("TASKBOARD_DIR").map(PathBuf::from).unwrap_or_else(|_| {
            let mut p = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
            p.push("taskboard");
            p
        });
        let quota_bytes = match std::env::var("TASKBOARD_QUOTA") {
            Ok(raw) => match raw.trim().parse::<usize>() {
                Ok(q) => Some(q),
                Err(e) => {
                    warn!(value = %raw, error = %e, "ignoring invalid TASKBOARD_QUOTA");
                    None
                }
            },
            Err(_) => None,
        };
        Config { data_dir, quota_bytes }
    }

    pub fn with_dir(data_dir: impl Into<PathBuf>) -> Self {
        Config {
            data_dir: data_dir.into(),
            quota_bytes: None,
        }
    }
}
