use chrono::Utc;

use super::json::JsonStorage;
use super::keys;
use crate::models::Project;

/// The `projects` collection. Tasks are nested inside their project, so any
/// task change rewrites the whole collection.
#[derive(Clone)]
pub struct ProjectStore {
    json: JsonStorage,
}

impl ProjectStore {
    pub fn new(json: JsonStorage) -> Self {
        ProjectStore { json }
    }

    pub fn all(&self) -> Vec<Project> {
        self.json.get(keys::PROJECTS, Vec::new())
    }

    pub fn save_all(&self, projects: &[Project]) -> bool {
        self.json.set(keys::PROJECTS, projects)
    }

    pub fn get(&self, id: &str) -> Option<Project> {
        self.all().into_iter().find(|p| p.id == id)
    }

    /// Replaces the project with the same id, or appends it. Stamps
    /// `updatedAt`.
    pub fn upsert(&self, project: &Project) -> bool {
        let mut project = project.clone();
        project.updated_at = Utc::now();
        let mut projects = self.all();
        match projects.iter_mut().find(|p| p.id == project.id) {
            Some(existing) => *existing = project,
            None => projects.push(project),
        }
        self.save_all(&projects)
    }

    pub fn remove(&self, id: &str) -> bool {
        let mut projects = self.all();
        let len_before = projects.len();
        projects.retain(|p| p.id != id);
        projects.len() != len_before && self.save_all(&projects)
    }

    /// Applies `f` to the project with `id` and writes the collection back.
    ///
    /// Returns `None` if the project does not exist, otherwise `f`'s result
    /// and whether the write succeeded.
    pub fn modify<R>(&self, id: &str, f: impl FnOnce(&mut Project) -> R) -> Option<(R, bool)> {
        let mut projects = self.all();
        let project = projects.iter_mut().find(|p| p.id == id)?;
        let out = f(project);
        project.updated_at = Utc::now();
        let saved = self.save_all(&projects);
        Some((out, saved))
    }
}
