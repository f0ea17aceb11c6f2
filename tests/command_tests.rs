use taskboard::commands::*;
use taskboard::config::Config;
use taskboard::models::Role;
use taskboard::storage::keys;
use taskboard::Board;
use tempfile::TempDir;

fn with_test_board<F>(f: F)
where
    F: FnOnce(&Board, &TempDir),
{
    let dir = TempDir::new().unwrap();
    let board = Board::open(&Config::with_dir(dir.path().join("data")));
    f(&board, &dir);
}

fn task_args(name: &str) -> TaskArgs {
    TaskArgs {
        name: Some(name.into()),
        description: None,
        price: Some(100.0),
        hours: Some(4.0),
        start: None,
        end: None,
        assignees: Vec::new(),
        progress: None,
    }
}

fn as_manager(board: &Board) {
    cmd_login(board, "manager", "manager123", Role::Manager, true).unwrap();
}

#[test]
fn test_manager_commands_need_a_manager_session() {
    with_test_board(|board, _| {
        assert!(cmd_project_add(board, "Site".into(), None, None, None, true).is_err());

        cmd_login(board, "employee", "employee123", Role::Employee, true).unwrap();
        assert!(cmd_project_add(board, "Site".into(), None, None, None, true).is_err());

        as_manager(board);
        let project = cmd_project_add(board, "Site".into(), None, None, None, true).unwrap();
        assert_eq!(project.created_by, "manager");
    });
}

#[test]
fn test_add_task_and_resolve_by_name() {
    with_test_board(|board, _| {
        as_manager(board);
        cmd_project_add(board, "Website".into(), None, Some("2025-01-01".into()), Some("2025-03-01".into()), true).unwrap();
        let task = cmd_task_add(board, "website", None, task_args("Landing page"), true).unwrap();

        let projects = board.projects().all();
        assert_eq!(projects.len(), 1);
        assert_eq!(projects[0].tasks.len(), 1);
        assert_eq!(projects[0].tasks[0].id, task.id);
        assert_eq!(projects[0].tasks[0].progress, 0);
    });
}

#[test]
fn test_invalid_date_is_rejected() {
    with_test_board(|board, _| {
        as_manager(board);
        let err = cmd_project_add(board, "Website".into(), None, Some("01.02.2025".into()), None, true).unwrap_err();
        assert!(err.to_string().contains("YYYY-MM-DD"));
    });
}

#[test]
fn test_employee_claims_and_completes() {
    with_test_board(|board, _| {
        as_manager(board);
        cmd_user_add(board, "Anna".into(), "anna@example.com".into(), "pw".into(), Role::Employee, true).unwrap();
        cmd_project_add(board, "Website".into(), None, None, None, true).unwrap();
        let task = cmd_task_add(board, "Website", Some("t-1".into()), task_args("Footer"), true).unwrap();

        cmd_login(board, "anna@example.com", "pw", Role::Employee, true).unwrap();
        // not hers yet
        assert!(cmd_task_progress(board, &task.id, 50, true).is_err());

        let claimed = cmd_task_claim(board, "t-1", true).unwrap();
        assert_eq!(claimed.assigned_to_names, vec!["Anna"]);
        assert!(claimed.actual_start_date.is_some());

        let done = cmd_task_progress(board, "t-1", 100, true).unwrap();
        assert!(done.actual_end_date.is_some());

        let reopened = cmd_task_progress(board, "t-1", 80, true).unwrap();
        assert!(reopened.actual_end_date.is_none());

        cmd_task_comment(board, "t-1", "footer links fixed", true).unwrap();
        let stored = board.tasks().find_task("t-1").unwrap().task;
        assert_eq!(stored.comments.len(), 1);
        assert_eq!(stored.comments[0].author, "Anna");
    });
}

#[test]
fn test_remove_project_and_task() {
    with_test_board(|board, _| {
        as_manager(board);
        cmd_project_add(board, "A".into(), None, None, None, true).unwrap();
        cmd_project_add(board, "B".into(), None, None, None, true).unwrap();
        cmd_task_add(board, "A", Some("x1".into()), task_args("one"), true).unwrap();
        cmd_task_add(board, "A", Some("x2".into()), task_args("two"), true).unwrap();

        cmd_task_remove(board, "x1", true).unwrap();
        assert!(board.tasks().find_task("x1").is_none());
        assert!(board.tasks().find_task("x2").is_some());

        cmd_project_remove(board, "B", true).unwrap();
        let names: Vec<String> = board.projects().all().into_iter().map(|p| p.name).collect();
        assert_eq!(names, vec!["A"]);
    });
}

#[test]
fn test_backup_export_and_import_into_fresh_board() {
    with_test_board(|board, dir| {
        as_manager(board);
        cmd_user_add(board, "Anna".into(), "anna@example.com".into(), "pw".into(), Role::Employee, true).unwrap();
        cmd_project_add(board, "Website".into(), None, None, None, true).unwrap();
        let path = dir.path().join("backup.json");
        cmd_export_backup(board, &path, true).unwrap();

        let other = Board::open(&Config::with_dir(dir.path().join("other")));
        cmd_login(&other, "manager", "manager123", Role::Manager, true).unwrap();
        let report = cmd_import_backup(&other, &path, true).unwrap();
        assert_eq!(report.projects_added, 1);
        // both default accounts already exist on the other board
        assert_eq!(report.users_added, 1);

        let again = cmd_import_backup(&other, &path, true).unwrap();
        assert_eq!(again.users_added + again.projects_added, 0);
    });
}

#[test]
fn test_csv_export_writes_file() {
    with_test_board(|board, dir| {
        as_manager(board);
        cmd_project_add(board, "Website".into(), None, None, None, true).unwrap();
        cmd_task_add(board, "Website", None, task_args("Footer"), true).unwrap();
        let path = dir.path().join("report.csv");
        cmd_export_csv(board, &path, true).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with('\u{feff}'));
        assert_eq!(text.lines().count(), 2);
        assert!(text.contains("\"Footer\""));
    });
}

#[test]
fn test_cloud_backup_round_trip() {
    with_test_board(|board, _| {
        as_manager(board);
        cmd_project_add(board, "Website".into(), None, None, None, true).unwrap();
        cmd_cloud_backup(board, true).unwrap();
        assert!(board.storage().get(keys::CLOUD_PROJECTS_BACKUP).is_some());

        let id = board.projects().all()[0].id.clone();
        board.tasks().delete_project(&id).unwrap();
        let report = cmd_cloud_restore(board, true).unwrap();
        assert_eq!(report.projects_added, 1);
        assert_eq!(board.projects().all().len(), 1);
    });
}

#[test]
fn test_reset_clears_storage() {
    with_test_board(|board, _| {
        as_manager(board);
        cmd_project_add(board, "Website".into(), None, None, None, true).unwrap();
        cmd_reset(board, true).unwrap();
        assert!(board.projects().all().is_empty());
        assert!(board.auth().current_session().is_none());
    });
}

#[test]
fn test_session_survives_reopening_storage() {
    with_test_board(|board, dir| {
        as_manager(board);
        let reopened = Board::open(&Config::with_dir(dir.path().join("data")));
        let session = reopened.auth().current_session().unwrap();
        assert_eq!(session.role, Role::Manager);
        cmd_logout(&reopened, true).unwrap();
        assert!(board.auth().current_session().is_none());
    });
}

#[test]
fn test_self_check_passes_on_fresh_storage() {
    with_test_board(|board, _| {
        assert!(cmd_check(board).unwrap());
        assert!(board.storage().get(keys::DATABASE_TESTS).is_some());
    });
}

#[test]
fn test_self_check_reports_corrupt_collection() {
    with_test_board(|board, dir| {
        std::fs::write(dir.path().join("data").join("projects.json"), "[{").unwrap();
        assert!(!cmd_check(board).unwrap());
    });
}

#[test]
fn test_csv_header_is_bare() {
    with_test_board(|board, dir| {
        as_manager(board);
        let path = dir.path().join("report.csv");
        cmd_export_csv(board, &path, true).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        let header = text.trim_start_matches('\u{feff}').lines().next().unwrap();
        assert!(header.starts_with("Проект;Задача;"));
        assert!(!header.contains('"'));
    });
}
