use std::io::{self, Write};
use std::path::Path;

use chrono::NaiveDate;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, Color, ContentArrangement, Table};

use crate::board::Board;
use crate::diagnostics::run_storage_self_test;
use crate::error::{AuthError, Error, Result};
use crate::export;
use crate::models::{parse_date, same_text, Assignees, NewProject, NewTask, NewUser, Project, ProjectPatch, Role, Session, TaskPatch, User};
use crate::share;
use crate::tasks::TaskRef;

fn parse_opt_date(raw: Option<String>) -> Result<Option<NaiveDate>> {
    match raw {
        None => Ok(None),
        Some(s) => parse_date(&s)
            .map(Some)
            .ok_or_else(|| Error::Validation(format!("invalid date '{s}', use YYYY-MM-DD"))),
    }
}

fn require(board: &Board, role: Role) -> Result<Session> {
    Ok(board.auth().require_role(role)?)
}

fn signed_in(board: &Board) -> Result<(Session, User)> {
    let auth = board.auth();
    let session = auth.current_session().ok_or(AuthError::NotAuthenticated)?;
    let user = auth.current_user().ok_or(AuthError::NotAuthenticated)?;
    Ok((session, user))
}

/// Finds a project by id, unique id prefix, or name (ignoring case).
pub fn resolve_project(board: &Board, key: &str) -> Result<Project> {
    let projects = board.tasks().list_projects();
    if let Some(p) = projects.iter().find(|p| p.id == key) {
        return Ok(p.clone());
    }
    let matches: Vec<&Project> = projects
        .iter()
        .filter(|p| p.id.starts_with(key) || same_text(&p.name, key))
        .collect();
    match matches.as_slice() {
        [one] => Ok((*one).clone()),
        [] => Err(Error::not_found("project", key)),
        _ => Err(Error::Validation(format!("'{key}' matches several projects, use the full id"))),
    }
}

/// Finds a task across projects by id or unique id prefix.
pub fn resolve_task(board: &Board, key: &str) -> Result<TaskRef> {
    let tasks = board.tasks().all_tasks();
    if let Some(t) = tasks.iter().find(|r| r.task.id == key) {
        return Ok(t.clone());
    }
    let matches: Vec<&TaskRef> = tasks.iter().filter(|r| r.task.id.starts_with(key)).collect();
    match matches.as_slice() {
        [one] => Ok((*one).clone()),
        [] => Err(Error::not_found("task", key)),
        _ => Err(Error::Validation(format!("'{key}' matches several tasks, use the full id"))),
    }
}

/// Maps each of `keys` (id, email or name) to a user id.
fn resolve_assignees(board: &Board, keys: &[String]) -> Result<Assignees> {
    let users = board.accounts().list();
    keys.iter()
        .map(|key| {
            users
                .iter()
                .find(|u| u.id == *key || same_text(&u.email, key) || same_text(&u.name, key))
                .map(|u| u.id.clone())
                .ok_or_else(|| Error::not_found("user", key.as_str()))
        })
        .collect()
}

fn short(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

fn progress_color(progress: u8) -> Color {
    if progress >= 100 {
        Color::Green
    } else if progress >= 50 {
        Color::Yellow
    } else if progress > 0 {
        Color::Cyan
    } else {
        Color::Reset
    }
}

fn header(table: &mut Table, titles: &[&str]) {
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(titles.iter().map(|t| Cell::new(t).add_attribute(Attribute::Bold)));
}

fn print_task_table(tasks: &[TaskRef]) {
    if tasks.is_empty() {
        println!("No tasks found.");
        return;
    }
    let mut table = Table::new();
    header(&mut table, &["ID", "Project", "Task", "Assignees", "Price", "Hours", "Due", "Progress", "Comments"]);
    for r in tasks {
        let t = &r.task;
        table.add_row(vec![
            Cell::new(short(&t.id)),
            Cell::new(&r.project_name),
            Cell::new(&t.name),
            Cell::new(if t.assigned_to_names.is_empty() { "-".to_string() } else { t.assigned_to_names.join(", ") }),
            Cell::new(format!("{:.2}", t.price)),
            Cell::new(format!("{:.1}", t.estimated_time)),
            Cell::new(t.end_date.map(|d| d.to_string()).unwrap_or_default()),
            Cell::new(format!("{}%", t.progress)).fg(progress_color(t.progress)),
            Cell::new(t.comments.len()),
        ]);
    }
    println!("{table}");
}

pub fn cmd_login(board: &Board, username: &str, password: &str, role: Role, silent: bool) -> Result<Session> {
    let session = board.auth().login(username, password, role)?;
    if !silent {
        println!("Signed in as {} ({}).", session.username, session.role);
    }
    Ok(session)
}

pub fn cmd_logout(board: &Board, silent: bool) -> Result<()> {
    if !board.auth().logout() {
        return Err(Error::NotSaved { what: "session" });
    }
    if !silent {
        println!("Signed out.");
    }
    Ok(())
}

pub fn cmd_whoami(board: &Board) -> Result<()> {
    match board.auth().current_session() {
        Some(s) => println!(
            "{} ({}) signed in at {}",
            s.username,
            s.role,
            s.login_time.format("%Y-%m-%d %H:%M")
        ),
        None => println!("Not signed in."),
    }
    Ok(())
}

pub fn cmd_user_add(board: &Board, name: String, email: String, password: String, role: Role, silent: bool) -> Result<User> {
    require(board, Role::Manager)?;
    let user = board.accounts().create(NewUser { name, email, password, role })?;
    if !silent {
        println!("User added (id = {}).", user.id);
    }
    Ok(user)
}

pub fn cmd_user_list(board: &Board) -> Result<()> {
    require(board, Role::Manager)?;
    let users = board.accounts().list();
    if users.is_empty() {
        println!("No users found.");
        return Ok(());
    }
    let mut table = Table::new();
    header(&mut table, &["ID", "Name", "Email", "Role"]);
    for u in users {
        let role_color = match u.role {
            Role::Manager => Color::Magenta,
            Role::Employee => Color::Blue,
        };
        table.add_row(vec![
            Cell::new(u.id),
            Cell::new(u.name),
            Cell::new(u.email),
            Cell::new(u.role).fg(role_color),
        ]);
    }
    println!("{table}");
    Ok(())
}

pub fn cmd_user_remove(board: &Board, id: &str, silent: bool) -> Result<()> {
    let session = require(board, Role::Manager)?;
    if session.user_id.as_deref() == Some(id) {
        return Err(Error::Validation("you cannot remove the account you are signed in with".into()));
    }
    let user = board.accounts().delete(id)?;
    if !silent {
        println!("User {} removed.", user.name);
    }
    Ok(())
}

pub fn cmd_user_share(board: &Board, base_url: &str, include_passwords: bool) -> Result<String> {
    require(board, Role::Manager)?;
    let link = share::share_users_link(base_url, &board.accounts().list(), include_passwords)?;
    println!("{link}");
    Ok(link)
}

pub fn cmd_user_import(board: &Board, link: &str, silent: bool) -> Result<share::ImportReport> {
    let report = share::import_users_from_link(board.users(), link)?;
    if !silent {
        println!("Imported {} user(s), {} already present.", report.added, report.skipped);
    }
    Ok(report)
}

pub fn cmd_project_add(
    board: &Board,
    name: String,
    description: Option<String>,
    start: Option<String>,
    end: Option<String>,
    silent: bool,
) -> Result<Project> {
    let session = require(board, Role::Manager)?;
    let project = board.tasks().create_project(
        NewProject {
            name,
            description: description.unwrap_or_default(),
            start_date: parse_opt_date(start)?,
            end_date: parse_opt_date(end)?,
        },
        &session.username,
    )?;
    if !silent {
        println!("Project added (id = {}).", project.id);
    }
    Ok(project)
}

pub fn cmd_project_list(board: &Board) -> Result<()> {
    require(board, Role::Manager)?;
    let projects = board.tasks().list_projects();
    if projects.is_empty() {
        println!("No projects found.");
        return Ok(());
    }
    let mut table = Table::new();
    header(&mut table, &["ID", "Name", "Start", "End", "Tasks", "Budget", "Progress", "Created by"]);
    for p in projects {
        let overall = crate::progress::overall_progress(&p.tasks);
        let budget: f64 = p.tasks.iter().map(|t| t.price).sum();
        table.add_row(vec![
            Cell::new(short(&p.id)),
            Cell::new(&p.name),
            Cell::new(p.start_date.map(|d| d.to_string()).unwrap_or_default()),
            Cell::new(p.end_date.map(|d| d.to_string()).unwrap_or_default()),
            Cell::new(p.tasks.len()),
            Cell::new(format!("{budget:.2}")),
            Cell::new(format!("{overall}%")).fg(progress_color(overall)),
            Cell::new(&p.created_by),
        ]);
    }
    println!("{table}");
    Ok(())
}

pub fn cmd_project_edit(
    board: &Board,
    key: &str,
    name: Option<String>,
    description: Option<String>,
    start: Option<String>,
    end: Option<String>,
    silent: bool,
) -> Result<Project> {
    require(board, Role::Manager)?;
    let project = resolve_project(board, key)?;
    let project = board.tasks().update_project(
        &project.id,
        ProjectPatch {
            name,
            description,
            start_date: parse_opt_date(start)?,
            end_date: parse_opt_date(end)?,
        },
    )?;
    if !silent {
        println!("Project {} updated.", project.name);
    }
    Ok(project)
}

pub fn cmd_project_remove(board: &Board, key: &str, silent: bool) -> Result<()> {
    require(board, Role::Manager)?;
    let project = resolve_project(board, key)?;
    board.tasks().delete_project(&project.id)?;
    if !silent {
        println!("Project {} removed with {} task(s).", project.name, project.tasks.len());
    }
    Ok(())
}

pub fn cmd_project_share(board: &Board, base_url: &str) -> Result<String> {
    require(board, Role::Manager)?;
    let link = share::share_projects_link(base_url, &board.tasks().list_projects())?;
    println!("{link}");
    Ok(link)
}

pub fn cmd_project_import(board: &Board, link: &str, silent: bool) -> Result<share::ImportReport> {
    require(board, Role::Manager)?;
    let report = share::import_projects_from_link(board.projects(), link)?;
    if !silent {
        println!("Imported {} project(s), {} already present.", report.added, report.skipped);
    }
    Ok(report)
}

pub struct TaskArgs {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub hours: Option<f64>,
    pub start: Option<String>,
    pub end: Option<String>,
    pub assignees: Vec<String>,
    pub progress: Option<u8>,
}

pub fn cmd_task_add(board: &Board, project_key: &str, id: Option<String>, args: TaskArgs, silent: bool) -> Result<crate::models::Task> {
    require(board, Role::Manager)?;
    let project = resolve_project(board, project_key)?;
    let task = board.tasks().add_task(
        &project.id,
        NewTask {
            id,
            name: args.name.unwrap_or_default(),
            description: args.description.unwrap_or_default(),
            price: args.price.unwrap_or(0.0),
            estimated_time: args.hours.unwrap_or(0.0),
            start_date: parse_opt_date(args.start)?,
            end_date: parse_opt_date(args.end)?,
            assigned_to: resolve_assignees(board, &args.assignees)?,
            progress: args.progress,
        },
    )?;
    if !silent {
        println!("Task added to {} (id = {}).", project.name, task.id);
    }
    Ok(task)
}

pub fn cmd_task_edit(board: &Board, key: &str, args: TaskArgs, silent: bool) -> Result<crate::models::Task> {
    require(board, Role::Manager)?;
    let found = resolve_task(board, key)?;
    let assigned_to = if args.assignees.is_empty() {
        None
    } else {
        Some(resolve_assignees(board, &args.assignees)?)
    };
    let task = board.tasks().update_task(
        &found.project_id,
        &found.task.id,
        TaskPatch {
            name: args.name,
            description: args.description,
            price: args.price,
            estimated_time: args.hours,
            start_date: parse_opt_date(args.start)?,
            end_date: parse_opt_date(args.end)?,
            assigned_to,
            progress: args.progress,
        },
    )?;
    if !silent {
        println!("Task {} updated.", task.name);
    }
    Ok(task)
}

pub fn cmd_task_remove(board: &Board, key: &str, silent: bool) -> Result<()> {
    require(board, Role::Manager)?;
    let found = resolve_task(board, key)?;
    board.tasks().delete_task(&found.project_id, &found.task.id)?;
    if !silent {
        println!("Task {} removed.", found.task.name);
    }
    Ok(())
}

/// Lists tasks, optionally for one project. Managers only.
pub fn cmd_task_list(board: &Board, project_key: Option<String>) -> Result<()> {
    require(board, Role::Manager)?;
    let mut tasks = board.tasks().all_tasks();
    if let Some(key) = project_key {
        let project = resolve_project(board, &key)?;
        tasks.retain(|r| r.project_id == project.id);
    }
    print_task_table(&tasks);
    Ok(())
}

pub fn cmd_task_mine(board: &Board) -> Result<()> {
    let (_, user) = signed_in(board)?;
    print_task_table(&board.tasks().tasks_for_user(&user));
    Ok(())
}

pub fn cmd_task_available(board: &Board) -> Result<()> {
    signed_in(board)?;
    print_task_table(&board.tasks().available_tasks());
    Ok(())
}

pub fn cmd_task_claim(board: &Board, key: &str, silent: bool) -> Result<crate::models::Task> {
    let (session, user) = signed_in(board)?;
    if session.role != Role::Employee {
        return Err(AuthError::Forbidden { required: Role::Employee }.into());
    }
    let found = resolve_task(board, key)?;
    let task = board.tasks().claim_task(&found.project_id, &found.task.id, &user)?;
    if !silent {
        println!("Task {} is now yours.", task.name);
    }
    Ok(task)
}

/// Employees may only report progress on their own tasks.
pub fn cmd_task_progress(board: &Board, key: &str, progress: u8, silent: bool) -> Result<crate::models::Task> {
    let (session, user) = signed_in(board)?;
    let found = resolve_task(board, key)?;
    if session.role == Role::Employee && !found.task.is_assigned_to(&user) {
        return Err(Error::Validation(format!("task {} is not assigned to you", found.task.name)));
    }
    let task = board.tasks().set_progress(&found.project_id, &found.task.id, progress)?;
    if !silent {
        match task.actual_end_date {
            Some(done) if task.is_done() => println!("Task {} completed on {}.", task.name, done.format("%Y-%m-%d")),
            _ => println!("Task {} at {}%.", task.name, task.progress),
        }
    }
    Ok(task)
}

pub fn cmd_task_comment(board: &Board, key: &str, text: &str, silent: bool) -> Result<()> {
    let (_, user) = signed_in(board)?;
    let found = resolve_task(board, key)?;
    board.tasks().add_comment(&found.project_id, &found.task.id, &user.name, text)?;
    if !silent {
        println!("Comment added to {}.", found.task.name);
    }
    Ok(())
}

pub fn cmd_task_show(board: &Board, key: &str) -> Result<()> {
    signed_in(board)?;
    let found = resolve_task(board, key)?;
    let t = &found.task;
    println!("{} / {}", found.project_name, t.name);
    println!("  id:        {}", t.id);
    if !t.description.is_empty() {
        println!("  about:     {}", t.description);
    }
    println!("  progress:  {}%", t.progress);
    if let Some(start) = t.actual_start_date {
        println!("  started:   {}", start.format("%Y-%m-%d"));
    }
    if let Some(end) = t.actual_end_date {
        println!("  finished:  {}", end.format("%Y-%m-%d"));
    }
    for c in &t.comments {
        let when = c.date.map(|d| d.format("%Y-%m-%d %H:%M").to_string()).unwrap_or_default();
        let author = if c.author.is_empty() { "-" } else { c.author.as_str() };
        println!("  [{when}] {author}: {}", c.text);
    }
    Ok(())
}

pub fn cmd_export_csv(board: &Board, path: &Path, silent: bool) -> Result<()> {
    require(board, Role::Manager)?;
    export::write_csv(&board.tasks().list_projects(), path)?;
    if !silent {
        println!("CSV written to {}.", path.display());
    }
    Ok(())
}

pub fn cmd_export_backup(board: &Board, path: &Path, silent: bool) -> Result<()> {
    require(board, Role::Manager)?;
    let backup = export::export_backup(board.users(), board.projects(), path)?;
    if !silent {
        println!(
            "Backup with {} user(s) and {} project(s) written to {}.",
            backup.users.len(),
            backup.projects.len(),
            path.display()
        );
    }
    Ok(())
}

pub fn cmd_import_backup(board: &Board, path: &Path, silent: bool) -> Result<export::RestoreReport> {
    require(board, Role::Manager)?;
    let report = export::import_backup(board.users(), board.projects(), path)?;
    if !silent {
        println!(
            "Imported {} user(s) and {} project(s); {} already present.",
            report.users_added, report.projects_added, report.skipped
        );
    }
    Ok(report)
}

pub fn cmd_cloud_backup(board: &Board, silent: bool) -> Result<()> {
    require(board, Role::Manager)?;
    export::backup_to_cloud(&board.json(), board.users(), board.projects())?;
    if !silent {
        println!("Cloud backup updated.");
    }
    Ok(())
}

pub fn cmd_cloud_restore(board: &Board, silent: bool) -> Result<export::RestoreReport> {
    require(board, Role::Manager)?;
    let report = export::restore_from_cloud(&board.json(), board.users(), board.projects())?;
    if !silent {
        println!(
            "Restored {} user(s) and {} project(s) from the cloud backup.",
            report.users_added, report.projects_added
        );
    }
    Ok(report)
}

pub fn cmd_check(board: &Board) -> Result<bool> {
    let results = run_storage_self_test(board.storage());
    let mut table = Table::new();
    header(&mut table, &["Check", "Result", "Detail"]);
    for r in &results {
        table.add_row(vec![
            Cell::new(&r.name),
            Cell::new(if r.passed { "pass" } else { "FAIL" }).fg(if r.passed { Color::Green } else { Color::Red }),
            Cell::new(&r.detail),
        ]);
    }
    println!("{table}");
    Ok(results.iter().all(|r| r.passed))
}

/// Deletes every stored key, after confirmation unless `force`.
pub fn cmd_reset(board: &Board, force: bool) -> Result<()> {
    if !force {
        print!("Are you sure you want to delete all users, projects and the session? This cannot be undone. [y/N] ");
        io::stdout().flush()?;
        let mut input = String::new();
        io::stdin().read_line(&mut input)?;
        if input.trim().to_lowercase() != "y" {
            println!("Aborted.");
            return Ok(());
        }
    }
    let removed = board.storage().clear();
    println!("Storage reset ({removed} key(s) removed).");
    Ok(())
}
