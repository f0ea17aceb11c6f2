//! Project and task mutations. Each operation reads the whole `projects`
//! collection, changes it in memory and writes it back.

use chrono::Utc;
use tracing::info;

use crate::error::{Error, Result};
use crate::models::{NewProject, NewTask, Project, ProjectPatch, Task, TaskComment, TaskPatch, User};
use crate::progress::apply_progress;
use crate::storage::{ProjectStore, UserStore};

/// A task together with the project it belongs to.
#[derive(Debug, Clone)]
pub struct TaskRef {
    pub project_id: String,
    pub project_name: String,
    pub task: Task,
}

pub struct TaskService<'a> {
    projects: &'a ProjectStore,
    users: &'a UserStore,
}

impl<'a> TaskService<'a> {
    pub fn new(projects: &'a ProjectStore, users: &'a UserStore) -> Self {
        TaskService { projects, users }
    }

    pub fn list_projects(&self) -> Vec<Project> {
        self.projects.all()
    }

    pub fn get_project(&self, id: &str) -> Result<Project> {
        self.projects.get(id).ok_or_else(|| Error::not_found("project", id))
    }

    pub fn create_project(&self, new: NewProject, created_by: &str) -> Result<Project> {
        let name = new.name.trim().to_string();
        if name.is_empty() {
            return Err(Error::Validation("project name must not be empty".into()));
        }
        check_dates(new.start_date, new.end_date)?;
        let now = Utc::now();
        let project = Project {
            id: uuid::Uuid::new_v4().to_string(),
            name,
            description: new.description,
            start_date: new.start_date,
            end_date: new.end_date,
            tasks: Vec::new(),
            created_at: now,
            updated_at: now,
            created_by: created_by.to_string(),
        };
        if !self.projects.upsert(&project) {
            return Err(Error::NotSaved { what: "projects" });
        }
        info!(project = %project.name, "project created");
        Ok(project)
    }

    pub fn update_project(&self, id: &str, patch: ProjectPatch) -> Result<Project> {
        let mut project = self.get_project(id)?;
        if let Some(name) = patch.name {
            let name = name.trim().to_string();
            if name.is_empty() {
                return Err(Error::Validation("project name must not be empty".into()));
            }
            project.name = name;
        }
        if let Some(description) = patch.description {
            project.description = description;
        }
        if patch.start_date.is_some() {
            project.start_date = patch.start_date;
        }
        if patch.end_date.is_some() {
            project.end_date = patch.end_date;
        }
        check_dates(project.start_date, project.end_date)?;
        if !self.projects.upsert(&project) {
            return Err(Error::NotSaved { what: "projects" });
        }
        self.get_project(id)
    }

    pub fn delete_project(&self, id: &str) -> Result<Project> {
        let project = self.get_project(id)?;
        if !self.projects.remove(id) {
            return Err(Error::NotSaved { what: "projects" });
        }
        info!(project = %project.name, "project deleted");
        Ok(project)
    }

    /// Adds a task to a project. Uses the supplied id or generates one;
    /// progress defaults to 0.
    pub fn add_task(&self, project_id: &str, new: NewTask) -> Result<Task> {
        let name = new.name.trim().to_string();
        if name.is_empty() {
            return Err(Error::Validation("task name must not be empty".into()));
        }
        check_dates(new.start_date, new.end_date)?;
        let mut task = Task {
            id: new
                .id
                .filter(|id| !id.trim().is_empty())
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
            name,
            description: new.description,
            price: new.price.max(0.0),
            estimated_time: new.estimated_time.max(0.0),
            start_date: new.start_date,
            end_date: new.end_date,
            assigned_to_names: self.names_for(&new.assigned_to),
            assigned_to: new.assigned_to,
            progress: 0,
            actual_start_date: None,
            actual_end_date: None,
            comments: Vec::new(),
        };
        apply_progress(&mut task, new.progress.unwrap_or(0), Utc::now());

        let stored = task.clone();
        let (duplicate, saved) = self
            .projects
            .modify(project_id, move |p| {
                if p.tasks.iter().any(|t| t.id == stored.id) {
                    return true;
                }
                p.tasks.push(stored);
                false
            })
            .ok_or_else(|| Error::not_found("project", project_id))?;
        if duplicate {
            return Err(Error::Validation(format!("task id {} is already used in this project", task.id)));
        }
        if !saved {
            return Err(Error::NotSaved { what: "projects" });
        }
        Ok(task)
    }

    pub fn update_task(&self, project_id: &str, task_id: &str, patch: TaskPatch) -> Result<Task> {
        let names = patch.assigned_to.as_ref().map(|a| self.names_for(a));
        self.with_task(project_id, task_id, |task| {
            if let Some(name) = patch.name {
                let name = name.trim().to_string();
                if name.is_empty() {
                    return Err(Error::Validation("task name must not be empty".into()));
                }
                task.name = name;
            }
            if let Some(description) = patch.description {
                task.description = description;
            }
            if let Some(price) = patch.price {
                task.price = price.max(0.0);
            }
            if let Some(hours) = patch.estimated_time {
                task.estimated_time = hours.max(0.0);
            }
            if patch.start_date.is_some() {
                task.start_date = patch.start_date;
            }
            if patch.end_date.is_some() {
                task.end_date = patch.end_date;
            }
            check_dates(task.start_date, task.end_date)?;
            if let (Some(assigned), Some(names)) = (patch.assigned_to, names) {
                task.assigned_to = assigned;
                task.assigned_to_names = names;
            }
            if let Some(progress) = patch.progress {
                apply_progress(task, progress, Utc::now());
            }
            Ok(())
        })
    }

    pub fn delete_task(&self, project_id: &str, task_id: &str) -> Result<Task> {
        let (removed, saved) = self
            .projects
            .modify(project_id, |p| {
                let idx = p.tasks.iter().position(|t| t.id == task_id)?;
                Some(p.tasks.remove(idx))
            })
            .ok_or_else(|| Error::not_found("project", project_id))?;
        let removed = removed.ok_or_else(|| Error::not_found("task", task_id))?;
        if !saved {
            return Err(Error::NotSaved { what: "projects" });
        }
        Ok(removed)
    }

    pub fn set_progress(&self, project_id: &str, task_id: &str, progress: u8) -> Result<Task> {
        if progress > 100 {
            return Err(Error::Validation(format!("progress must be between 0 and 100, got {progress}")));
        }
        self.with_task(project_id, task_id, |task| {
            apply_progress(task, progress, Utc::now());
            Ok(())
        })
    }

    pub fn add_comment(&self, project_id: &str, task_id: &str, author: &str, text: &str) -> Result<TaskComment> {
        let text = text.trim();
        if text.is_empty() {
            return Err(Error::Validation("comment must not be empty".into()));
        }
        let comment = TaskComment::new(author, text);
        let stored = comment.clone();
        self.with_task(project_id, task_id, move |task| {
            task.comments.push(stored);
            Ok(())
        })?;
        Ok(comment)
    }

    /// Assigns an unassigned task to `user` and stamps its actual start.
    pub fn claim_task(&self, project_id: &str, task_id: &str, user: &User) -> Result<Task> {
        self.with_task(project_id, task_id, |task| {
            if !task.is_available() {
                if task.is_assigned_to(user) {
                    return Ok(());
                }
                return Err(Error::Validation(format!("task `{}` is already assigned", task.name)));
            }
            task.assigned_to.insert(user.id.clone());
            if !task.assigned_to_names.iter().any(|n| n == &user.name) {
                task.assigned_to_names.push(user.name.clone());
            }
            if task.actual_start_date.is_none() {
                task.actual_start_date = Some(Utc::now());
            }
            info!(task = %task.name, user = %user.name, "task claimed");
            Ok(())
        })
    }

    /// Every task nobody is assigned to.
    pub fn available_tasks(&self) -> Vec<TaskRef> {
        self.all_tasks().into_iter().filter(|r| r.task.is_available()).collect()
    }

    /// Tasks assigned to `user`, by id or by name.
    pub fn tasks_for_user(&self, user: &User) -> Vec<TaskRef> {
        self.all_tasks()
            .into_iter()
            .filter(|r| r.task.is_assigned_to(user))
            .collect()
    }

    pub fn all_tasks(&self) -> Vec<TaskRef> {
        self.projects
            .all()
            .into_iter()
            .flat_map(|p| {
                let (project_id, project_name) = (p.id, p.name);
                p.tasks.into_iter().map(move |task| TaskRef {
                    project_id: project_id.clone(),
                    project_name: project_name.clone(),
                    task,
                })
            })
            .collect()
    }

    /// Looks a task up by id across all projects.
    pub fn find_task(&self, task_id: &str) -> Option<TaskRef> {
        self.all_tasks().into_iter().find(|r| r.task.id == task_id)
    }

    /// Runs `f` on one task, saves, and returns the task as stored.
    fn with_task<F>(&self, project_id: &str, task_id: &str, f: F) -> Result<Task>
    where
        F: FnOnce(&mut Task) -> Result<()>,
    {
        let mut projects = self.projects.all();
        let project = projects
            .iter_mut()
            .find(|p| p.id == project_id)
            .ok_or_else(|| Error::not_found("project", project_id))?;
        let task = project
            .tasks
            .iter_mut()
            .find(|t| t.id == task_id)
            .ok_or_else(|| Error::not_found("task", task_id))?;
        f(task)?;
        let out = task.clone();
        project.updated_at = Utc::now();
        if !self.projects.save_all(&projects) {
            return Err(Error::NotSaved { what: "projects" });
        }
        Ok(out)
    }

    fn names_for(&self, ids: &crate::models::Assignees) -> Vec<String> {
        if ids.is_empty() {
            return Vec::new();
        }
        let users = self.users.all();
        ids.iter()
            .filter_map(|id| users.iter().find(|u| &u.id == id).map(|u| u.name.clone()))
            .collect()
    }
}

fn check_dates(start: Option<chrono::NaiveDate>, end: Option<chrono::NaiveDate>) -> Result<()> {
    if let (Some(start), Some(end)) = (start, end) {
        if end < start {
            return Err(Error::Validation(format!("end date {end} is before start date {start}")));
        }
    }
    Ok(())
}
