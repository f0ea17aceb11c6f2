//! CSV reports, JSON backup files and the simulated cloud copy.

use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{Error, Result};
use crate::models::{Project, User};
use crate::share::merge_by_id;
use crate::storage::{keys, JsonStorage, ProjectStore, UserStore};

const UTF8_BOM: &str = "\u{feff}";

pub const CSV_HEADER: [&str; 9] = [
    "Проект",
    "Задача",
    "Описание",
    "Стоимость",
    "Время",
    "Прогресс",
    "Исполнитель",
    "Дата начала",
    "Дата окончания",
];

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

/// One row per task: semicolon separated, every value quoted, BOM first so
/// spreadsheet programs pick UTF-8. The header row is written bare.
pub fn projects_to_csv(projects: &[Project]) -> Result<String> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b';')
        .quote_style(csv::QuoteStyle::Always)
        .from_writer(Vec::new());
    for project in projects {
        for task in &project.tasks {
            let date = |d: Option<chrono::NaiveDate>| d.map(|d| d.to_string()).unwrap_or_default();
            writer.write_record([
                project.name.clone(),
                task.name.clone(),
                task.description.clone(),
                format_number(task.price),
                format_number(task.estimated_time),
                task.progress.to_string(),
                task.assigned_to_names.join(", "),
                date(task.start_date),
                date(task.end_date),
            ])?;
        }
    }
    let bytes = writer.into_inner().map_err(|e| Error::Io(e.into_error()))?;
    let body = String::from_utf8(bytes).map_err(|e| Error::Validation(e.to_string()))?;
    Ok(format!("{UTF8_BOM}{}\n{body}", CSV_HEADER.join(";")))
}

pub fn write_csv(projects: &[Project], path: &Path) -> Result<()> {
    fs::write(path, projects_to_csv(projects)?)?;
    Ok(())
}

/// Full dump of both collections.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Backup {
    #[serde(default = "backup_version")]
    pub version: u32,
    pub exported_at: DateTime<Utc>,
    #[serde(default)]
    pub users: Vec<User>,
    #[serde(default)]
    pub projects: Vec<Project>,
}

fn backup_version() -> u32 {
    1
}

impl Backup {
    pub fn capture(users: &UserStore, projects: &ProjectStore) -> Self {
        Backup {
            version: backup_version(),
            exported_at: Utc::now(),
            users: users.all(),
            projects: projects.all(),
        }
    }
}

/// Counts from merging a backup into storage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestoreReport {
    pub users_added: usize,
    pub projects_added: usize,
    pub skipped: usize,
}

/// Merges a backup into storage. Existing ids win.
pub fn restore(backup: Backup, users: &UserStore, projects: &ProjectStore) -> Result<RestoreReport> {
    let u = merge_by_id(users.all(), backup.users);
    let p = merge_by_id(projects.all(), backup.projects);
    if u.added > 0 && !users.save_all(&u.merged) {
        return Err(Error::NotSaved { what: "users" });
    }
    if p.added > 0 && !projects.save_all(&p.merged) {
        return Err(Error::NotSaved { what: "projects" });
    }
    Ok(RestoreReport {
        users_added: u.added,
        projects_added: p.added,
        skipped: u.skipped + p.skipped,
    })
}

pub fn export_backup(users: &UserStore, projects: &ProjectStore, path: &Path) -> Result<Backup> {
    let backup = Backup::capture(users, projects);
    fs::write(path, serde_json::to_string_pretty(&backup)?)?;
    info!(path = %path.display(), users = backup.users.len(), projects = backup.projects.len(), "backup written");
    Ok(backup)
}

pub fn import_backup(users: &UserStore, projects: &ProjectStore, path: &Path) -> Result<RestoreReport> {
    let backup: Backup = serde_json::from_str(&fs::read_to_string(path)?)?;
    let report = restore(backup, users, projects)?;
    info!(path = %path.display(), ?report, "backup imported");
    Ok(report)
}

/// Copies both collections to the cloud backup keys.
pub fn backup_to_cloud(json: &JsonStorage, users: &UserStore, projects: &ProjectStore) -> Result<()> {
    json.try_set(keys::CLOUD_USERS_BACKUP, &users.all())?;
    json.try_set(keys::CLOUD_PROJECTS_BACKUP, &projects.all())?;
    info!("cloud backup updated");
    Ok(())
}

/// Merges the cloud backup keys back into storage.
pub fn restore_from_cloud(json: &JsonStorage, users: &UserStore, projects: &ProjectStore) -> Result<RestoreReport> {
    let cloud_users = json.get_opt::<Vec<User>>(keys::CLOUD_USERS_BACKUP);
    let cloud_projects = json.get_opt::<Vec<Project>>(keys::CLOUD_PROJECTS_BACKUP);
    if cloud_users.is_none() && cloud_projects.is_none() {
        return Err(Error::not_found("cloud backup", keys::CLOUD_USERS_BACKUP));
    }
    let backup = Backup {
        version: backup_version(),
        exported_at: Utc::now(),
        users: cloud_users.unwrap_or_default(),
        projects: cloud_projects.unwrap_or_default(),
    };
    restore(backup, users, projects)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn csv_has_bom_bare_header_and_doubled_quotes() {
        let project: Project = serde_json::from_value(json!({
            "id": "p1",
            "name": "Сайт",
            "tasks": [{
                "id": "t1",
                "name": "Верстка \"главной\"",
                "description": "a;b",
                "price": 1500,
                "estimatedTime": 2.5,
                "progress": 40,
                "assignedToNames": ["Anna", "Ivan"],
                "startDate": "2024-03-01"
            }]
        }))
        .unwrap();
        let csv = projects_to_csv(&[project]).unwrap();
        assert!(csv.starts_with('\u{feff}'));
        let mut lines = csv.trim_start_matches('\u{feff}').lines();
        assert_eq!(
            lines.next().unwrap(),
            "Проект;Задача;Описание;Стоимость;Время;Прогресс;Исполнитель;Дата начала;Дата окончания"
        );
        assert_eq!(
            lines.next().unwrap(),
            "\"Сайт\";\"Верстка \"\"главной\"\"\";\"a;b\";\"1500\";\"2.5\";\"40\";\"Anna, Ivan\";\"2024-03-01\";\"\""
        );
    }
}
