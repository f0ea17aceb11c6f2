use taskboard::error::{AuthError, Error};
use taskboard::models::{NewUser, Role, UserPatch};
use taskboard::routes::{navigate, Route, RouteDecision};
use taskboard::storage::{keys, DisabledBackend, MemoryBackend};
use taskboard::Board;

fn new_user(name: &str, email: &str, role: Role) -> NewUser {
    NewUser {
        name: name.into(),
        email: email.into(),
        password: "secret".into(),
        role,
    }
}

#[test]
fn test_default_manager_works_on_empty_storage() {
    let board = Board::in_memory();
    assert!(board.users().all().is_empty());

    let session = board.auth().login("manager", "manager123", Role::Manager).unwrap();
    assert!(session.is_authenticated);
    assert_eq!(session.role.home_route(), "/dashboard");
    // both default accounts are provisioned
    assert_eq!(board.users().all().len(), 2);
    assert_eq!(navigate("/", board.session()), RouteDecision::Render(Route::Dashboard));
}

#[test]
fn test_default_users_are_seeded_once() {
    let board = Board::in_memory();
    assert_eq!(board.auth().ensure_default_users(), 2);
    assert_eq!(board.auth().ensure_default_users(), 0);
    board.auth().login("employee", "employee123", Role::Employee).unwrap();
    board.auth().login("manager", "manager123", Role::Manager).unwrap();
    assert_eq!(board.users().all().len(), 2);
}

#[test]
fn test_role_mismatch_names_the_real_role() {
    let board = Board::in_memory();
    let err = board.auth().login("manager", "manager123", Role::Employee).unwrap_err();
    assert_eq!(err, AuthError::RoleMismatch { actual: Role::Manager });
    assert!(err.to_string().contains("manager"));

    board
        .accounts()
        .create(new_user("Olga", "olga@example.com", Role::Employee))
        .unwrap();
    let err = board.auth().login("olga@example.com", "secret", Role::Manager).unwrap_err();
    assert_eq!(err, AuthError::RoleMismatch { actual: Role::Employee });
    assert!(board.auth().current_session().is_none());
}

#[test]
fn test_login_matches_email_or_name_ignoring_case() {
    let board = Board::in_memory();
    board
        .accounts()
        .create(new_user("Olga", "olga@example.com", Role::Employee))
        .unwrap();
    assert!(board.auth().login("OLGA@example.com", "secret", Role::Employee).is_ok());
    assert!(board.auth().login("olga", "secret", Role::Employee).is_ok());
    assert_eq!(
        board.auth().login("olga", "Secret", Role::Employee).unwrap_err(),
        AuthError::InvalidCredentials
    );
    assert_eq!(
        board.auth().login("", "secret", Role::Employee).unwrap_err(),
        AuthError::InvalidCredentials
    );
}

#[test]
fn test_one_session_at_a_time() {
    let board = Board::in_memory();
    board.auth().login("manager", "manager123", Role::Manager).unwrap();
    board.auth().login("employee", "employee123", Role::Employee).unwrap();
    let current = board.auth().current_session().unwrap();
    assert_eq!(current.username, "employee");
    assert_eq!(board.auth().current_user().unwrap().id, "default-employee");

    assert!(board.auth().logout());
    assert!(board.auth().current_session().is_none());
    assert_eq!(board.auth().require_role(Role::Employee).unwrap_err(), AuthError::NotAuthenticated);
}

#[test]
fn test_guarded_route_queues_one_shot_message() {
    let board = Board::in_memory();
    let decision = navigate("/employee", board.session());
    assert!(matches!(decision, RouteDecision::Redirect { to: Route::Login, .. }));
    assert!(board.session().take_auth_message().is_some());
    assert!(board.session().take_auth_message().is_none());
}

#[test]
fn test_unauthenticated_session_record_is_ignored() {
    let board = Board::in_memory();
    board.storage().set(
        keys::SESSION,
        r#"{"id":"x","username":"manager","role":"manager","isAuthenticated":false,"loginTime":"2024-01-01T00:00:00Z"}"#,
    );
    assert!(board.auth().current_session().is_none());
}

#[test]
fn test_email_must_be_unique() {
    let board = Board::in_memory();
    board
        .accounts()
        .create(new_user("Olga", "olga@example.com", Role::Employee))
        .unwrap();
    let err = board
        .accounts()
        .create(new_user("Other Olga", "Olga@Example.com", Role::Manager))
        .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
    assert_eq!(board.users().all().len(), 1);
}

#[test]
fn test_update_and_delete_user() {
    let board = Board::in_memory();
    let olga = board
        .accounts()
        .create(new_user("Olga", "olga@example.com", Role::Employee))
        .unwrap();
    let updated = board
        .accounts()
        .update(
            &olga.id,
            UserPatch {
                role: Some(Role::Manager),
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(updated.role, Role::Manager);
    assert!(board.accounts().employees().is_empty());

    board.accounts().delete(&olga.id).unwrap();
    assert!(matches!(board.accounts().get(&olga.id), Err(Error::NotFound { .. })));
    assert!(matches!(board.accounts().delete(&olga.id), Err(Error::NotFound { .. })));
}

#[test]
fn test_login_fails_cleanly_without_storage() {
    let board = Board::with_backends(DisabledBackend, MemoryBackend::new());
    assert_eq!(
        board.auth().login("manager", "manager123", Role::Manager).unwrap_err(),
        AuthError::SessionNotSaved
    );
}

#[test]
fn test_login_ignores_case_of_cyrillic_names() {
    let board = Board::in_memory();
    board
        .accounts()
        .create(new_user("Ольга", "ОЛЬГА@example.com", Role::Employee))
        .unwrap();
    let session = board.auth().login("ольга", "secret", Role::Employee).unwrap();
    assert_eq!(session.username, "Ольга");
    assert!(board.auth().login("ольга@EXAMPLE.com", "secret", Role::Employee).is_ok());

    let err = board
        .accounts()
        .create(new_user("Другая", "ольга@example.com", Role::Employee))
        .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
}
