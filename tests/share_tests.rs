use taskboard::models::{NewProject, NewTask, NewUser, Role};
use taskboard::share::*;
use taskboard::Board;

const BASE: &str = "https://board.example.com/login";

fn board_with_users() -> Board {
    let board = Board::in_memory();
    board.auth().ensure_default_users();
    board
        .accounts()
        .create(NewUser {
            name: "Ольга".into(),
            email: "olga@example.com".into(),
            password: "pw".into(),
            role: Role::Employee,
        })
        .unwrap();
    board
}

#[test]
fn test_users_link_imports_into_empty_board() {
    let source = board_with_users();
    let link = share_users_link(BASE, &source.users().all(), true).unwrap();
    assert!(link.starts_with(BASE));
    assert!(link.contains("users="));

    let target = Board::in_memory();
    let report = import_users_from_link(target.users(), &link).unwrap();
    assert_eq!(report.added, 3);
    assert_eq!(report.skipped, 0);
    assert_eq!(report.cleaned_link, BASE);
    assert_eq!(target.users().all(), source.users().all());

    // the shared copy is enough to sign in
    target.auth().login("olga@example.com", "pw", Role::Employee).unwrap();
}

#[test]
fn test_importing_twice_adds_nothing() {
    let source = board_with_users();
    let link = share_users_link(BASE, &source.users().all(), true).unwrap();
    let target = Board::in_memory();
    import_users_from_link(target.users(), &link).unwrap();

    let again = import_users_from_link(target.users(), &link).unwrap();
    assert_eq!(again.added, 0);
    assert_eq!(again.skipped, 3);
    assert_eq!(target.users().all().len(), 3);
}

#[test]
fn test_existing_user_wins_on_id_collision() {
    let source = board_with_users();
    let mut shared = source.users().all();
    for user in &mut shared {
        user.name = format!("{} (shared)", user.name);
    }
    let link = share_users_link(BASE, &shared, false).unwrap();

    let report = import_users_from_link(source.users(), &link).unwrap();
    assert_eq!(report.added, 0);
    assert!(source.users().all().iter().all(|u| !u.name.ends_with("(shared)")));
}

#[test]
fn test_passwords_are_left_out_unless_requested() {
    let source = board_with_users();
    let link = share_users_link(BASE, &source.users().all(), false).unwrap();
    let payload = extract_param(&link, USERS_PARAM).unwrap().unwrap();
    let users: Vec<taskboard::models::User> = decode_payload(&payload).unwrap();
    assert_eq!(users.len(), 3);
    assert!(users.iter().all(|u| u.password.is_empty()));

    let link = share_users_link(BASE, &source.users().all(), true).unwrap();
    let payload = extract_param(&link, USERS_PARAM).unwrap().unwrap();
    let users: Vec<taskboard::models::User> = decode_payload(&payload).unwrap();
    assert!(users.iter().all(|u| !u.password.is_empty()));
}

#[test]
fn test_projects_link_carries_tasks() {
    let source = Board::in_memory();
    let project = source
        .tasks()
        .create_project(
            NewProject {
                name: "Website".into(),
                ..Default::default()
            },
            "manager",
        )
        .unwrap();
    source
        .tasks()
        .add_task(
            &project.id,
            NewTask {
                name: "Header".into(),
                progress: Some(40),
                ..Default::default()
            },
        )
        .unwrap();

    let link = share_projects_link("https://board.example.com/dashboard?lang=ru", &source.projects().all()).unwrap();
    let target = Board::in_memory();
    let report = import_projects_from_link(target.projects(), &link).unwrap();
    assert_eq!(report.added, 1);
    assert_eq!(report.cleaned_link, "https://board.example.com/dashboard?lang=ru");

    let imported = target.projects().all();
    assert_eq!(imported[0].id, project.id);
    assert_eq!(imported[0].tasks.len(), 1);
    assert_eq!(imported[0].tasks[0].progress, 40);
}

#[test]
fn test_link_without_payload_is_an_error() {
    let board = Board::in_memory();
    assert!(import_users_from_link(board.users(), BASE).is_err());
    assert!(import_projects_from_link(board.projects(), "not a url").is_err());
    assert!(board.users().all().is_empty());
}

#[test]
fn test_payload_with_spaces_for_plus_still_decodes() {
    let source = board_with_users();
    let payload = encode_payload(&source.users().all()).unwrap();
    let mangled = payload.replace('+', " ");
    let users: Vec<taskboard::models::User> = decode_payload(&mangled).unwrap();
    assert_eq!(users.len(), 3);
}
