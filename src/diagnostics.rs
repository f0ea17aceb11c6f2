use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::storage::{keys, JsonStorage, StorageCore};

const SCRATCH_KEY: &str = "__diagnostics_scratch__";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CheckResult {
    pub name: String,
    pub passed: bool,
    pub detail: String,
    pub ran_at: DateTime<Utc>,
}

impl CheckResult {
    fn new(name: &str, outcome: Result<(), String>) -> Self {
        let (passed, detail) = match outcome {
            Ok(()) => (true, "ok".to_string()),
            Err(detail) => (false, detail),
        };
        CheckResult {
            name: name.to_string(),
            passed,
            detail,
            ran_at: Utc::now(),
        }
    }
}

/// Exercises the store with scratch keys and records the results under
/// `database_tests`.
pub fn run_storage_self_test(core: &StorageCore) -> Vec<CheckResult> {
    let json = JsonStorage::new(core.clone());
    let mut results = vec![CheckResult::new(
        "availability",
        if core.is_available() { Ok(()) } else { Err("storage is not available".into()) },
    )];

    let round_trip = core
        .try_set(SCRATCH_KEY, "ping")
        .map_err(|e| e.to_string())
        .and_then(|_| match core.try_get(SCRATCH_KEY) {
            Ok(Some(v)) if v == "ping" => Ok(()),
            Ok(other) => Err(format!("read back {other:?}")),
            Err(e) => Err(e.to_string()),
        });
    results.push(CheckResult::new("write and read", round_trip));

    let json_trip = json
        .try_set(SCRATCH_KEY, &vec![1, 2, 3])
        .map_err(|e| e.to_string())
        .and_then(|_| match json.get_opt::<Vec<i32>>(SCRATCH_KEY) {
            Some(v) if v == [1, 2, 3] => Ok(()),
            other => Err(format!("read back {other:?}")),
        });
    results.push(CheckResult::new("json round trip", json_trip));

    let removed = core
        .try_remove(SCRATCH_KEY)
        .map_err(|e| e.to_string())
        .and_then(|_| match core.try_get(SCRATCH_KEY) {
            Ok(None) => Ok(()),
            Ok(Some(_)) => Err("value still present".into()),
            Err(e) => Err(e.to_string()),
        });
    results.push(CheckResult::new("remove", removed));

    for key in [keys::USERS, keys::PROJECTS] {
        let outcome = match core.get(key) {
            None => Ok(()),
            Some(raw) => serde_json::from_str::<serde_json::Value>(&raw)
                .map(|_| ())
                .map_err(|e| format!("corrupt JSON: {e}")),
        };
        results.push(CheckResult::new(&format!("`{key}` parses"), outcome));
    }

    json.set(keys::DATABASE_TESTS, &results);
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{DisabledBackend, MemoryBackend};

    #[test]
    fn healthy_store_passes_and_records() {
        let core = StorageCore::new(MemoryBackend::new());
        let results = run_storage_self_test(&core);
        assert!(results.iter().all(|r| r.passed), "{results:?}");
        assert!(core.get(keys::DATABASE_TESTS).is_some());
        assert!(core.get(SCRATCH_KEY).is_none());
    }

    #[test]
    fn corrupt_collection_is_flagged() {
        let core = StorageCore::new(MemoryBackend::new());
        core.set(keys::PROJECTS, "[{");
        let results = run_storage_self_test(&core);
        let failed: Vec<_> = results.iter().filter(|r| !r.passed).collect();
        assert_eq!(failed.len(), 1);
        assert!(failed[0].name.contains("projects"));
    }

    #[test]
    fn unavailable_store_fails_every_io_check() {
        let core = StorageCore::new(DisabledBackend);
        let results = run_storage_self_test(&core);
        assert!(!results[0].passed);
        assert!(!results[1].passed);
    }
}
