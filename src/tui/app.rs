use ratatui::widgets::TableState;

use crate::board::Board;
use crate::models::{Role, Session, User};
use crate::progress::step_progress;
use crate::routes::{navigate, Route, RouteDecision};
use crate::tasks::TaskRef;

#[derive(PartialEq)]
pub enum InputMode {
    Normal,
    Editing,
}

#[derive(PartialEq, Clone, Copy)]
pub enum Screen {
    Login,
    Dashboard,
    Employee,
}

/// Which list the employee view shows.
#[derive(PartialEq, Clone, Copy)]
pub enum TaskTab {
    Mine,
    Available,
}

#[derive(PartialEq, Clone, Copy)]
pub enum LoginField {
    Username,
    Password,
    Role,
}

pub struct LoginForm {
    pub username: String,
    pub password: String,
    pub role: Role,
    pub field: LoginField,
}

impl Default for LoginForm {
    fn default() -> Self {
        LoginForm {
            username: String::new(),
            password: String::new(),
            role: Role::Employee,
            field: LoginField::Username,
        }
    }
}

pub struct App<'a> {
    board: &'a Board,
    pub screen: Screen,
    pub login: LoginForm,
    pub session: Option<Session>,
    pub user: Option<User>,
    pub tasks: Vec<TaskRef>,
    pub state: TableState,
    pub tab: TaskTab,
    pub input_mode: InputMode,
    pub input_buffer: String,
    /// One-line feedback shown above the help bar.
    pub status: Option<String>,
    pub error: Option<String>,
}

impl<'a> App<'a> {
    pub fn new(board: &'a Board) -> App<'a> {
        let mut app = App {
            board,
            screen: Screen::Login,
            login: LoginForm::default(),
            session: None,
            user: None,
            tasks: Vec::new(),
            state: TableState::default(),
            tab: TaskTab::Mine,
            input_mode: InputMode::Normal,
            input_buffer: String::new(),
            status: None,
            error: None,
        };
        app.go("/");
        app
    }

    /// Follows redirects until a screen can be rendered.
    pub fn go(&mut self, path: &str) {
        let mut path = path.to_string();
        for _ in 0..3 {
            match navigate(&path, self.board.session()) {
                RouteDecision::Render(route) => {
                    self.show(route);
                    return;
                }
                RouteDecision::Redirect { to, message } => {
                    if to != Route::Login {
                        self.error = message;
                    }
                    path = to.path().to_string();
                }
            }
        }
        self.show(Route::Login);
    }

    fn show(&mut self, route: Route) {
        self.session = self.board.auth().current_session();
        self.user = self.board.auth().current_user();
        match route {
            Route::Login => {
                self.screen = Screen::Login;
                if let Some(message) = self.board.session().take_auth_message() {
                    self.error = Some(message);
                }
            }
            Route::Dashboard => self.screen = Screen::Dashboard,
            Route::Employee => self.screen = Screen::Employee,
            Route::NotFound => {
                self.error = Some("Page not found".to_string());
                let home = self.session.as_ref().map_or("/login", |s| s.role.home_route());
                self.go(home);
                return;
            }
        }
        self.reload();
    }

    /// Re-reads the task list for the current screen.
    pub fn reload(&mut self) {
        let tasks = self.board.tasks();
        self.tasks = match (self.screen, self.tab, &self.user) {
            (Screen::Dashboard, _, _) => tasks.all_tasks(),
            (Screen::Employee, TaskTab::Available, _) => tasks.available_tasks(),
            (Screen::Employee, TaskTab::Mine, Some(user)) => tasks.tasks_for_user(user),
            _ => Vec::new(),
        };
        let selected = match self.state.selected() {
            _ if self.tasks.is_empty() => None,
            Some(i) => Some(i.min(self.tasks.len() - 1)),
            None => Some(0),
        };
        self.state.select(selected);
    }

    pub fn next(&mut self) {
        if self.tasks.is_empty() {
            return;
        }
        let i = match self.state.selected() {
            Some(i) if i + 1 < self.tasks.len() => i + 1,
            _ => 0,
        };
        self.state.select(Some(i));
    }

    pub fn previous(&mut self) {
        if self.tasks.is_empty() {
            return;
        }
        let i = match self.state.selected() {
            Some(0) | None => self.tasks.len() - 1,
            Some(i) => i - 1,
        };
        self.state.select(Some(i));
    }

    pub fn selected_task(&self) -> Option<&TaskRef> {
        self.state.selected().and_then(|i| self.tasks.get(i))
    }

    pub fn toggle_tab(&mut self) {
        if self.screen != Screen::Employee {
            return;
        }
        self.tab = match self.tab {
            TaskTab::Mine => TaskTab::Available,
            TaskTab::Available => TaskTab::Mine,
        };
        self.state.select(None);
        self.reload();
    }

    pub fn next_login_field(&mut self) {
        self.login.field = match self.login.field {
            LoginField::Username => LoginField::Password,
            LoginField::Password => LoginField::Role,
            LoginField::Role => LoginField::Username,
        };
    }

    pub fn toggle_login_role(&mut self) {
        self.login.role = match self.login.role {
            Role::Manager => Role::Employee,
            Role::Employee => Role::Manager,
        };
    }

    pub fn login_input(&mut self, c: char) {
        match self.login.field {
            LoginField::Username => self.login.username.push(c),
            LoginField::Password => self.login.password.push(c),
            LoginField::Role => {
                if c == ' ' {
                    self.toggle_login_role();
                }
            }
        }
    }

    pub fn login_backspace(&mut self) {
        match self.login.field {
            LoginField::Username => {
                self.login.username.pop();
            }
            LoginField::Password => {
                self.login.password.pop();
            }
            LoginField::Role => {}
        }
    }

    pub fn submit_login(&mut self) {
        let result = self
            .board
            .auth()
            .login(&self.login.username, &self.login.password, self.login.role);
        match result {
            Ok(session) => {
                self.error = None;
                self.status = Some(format!("Welcome, {}", session.username));
                self.login.password.clear();
                self.go(session.role.home_route());
            }
            Err(e) => {
                self.login.password.clear();
                self.error = Some(e.to_string());
            }
        }
    }

    pub fn logout(&mut self) {
        self.board.auth().logout();
        self.status = None;
        self.error = None;
        self.tab = TaskTab::Mine;
        self.go("/login");
    }

    pub fn claim_selected(&mut self) {
        if self.screen != Screen::Employee {
            return;
        }
        let (Some(task), Some(user)) = (self.selected_task().cloned(), self.user.clone()) else {
            return;
        };
        match self.board.tasks().claim_task(&task.project_id, &task.task.id, &user) {
            Ok(t) => self.status = Some(format!("Claimed {}", t.name)),
            Err(e) => self.error = Some(e.to_string()),
        }
        self.reload();
    }

    /// Moves the selected task's progress by `delta` points.
    pub fn step_selected(&mut self, delta: i16) {
        let Some(selected) = self.selected_task().cloned() else {
            return;
        };
        if self.screen == Screen::Employee {
            let mine = self.user.as_ref().is_some_and(|u| selected.task.is_assigned_to(u));
            if !mine {
                self.error = Some("Claim the task before reporting progress".to_string());
                return;
            }
        }
        let mut preview = selected.task.clone();
        step_progress(&mut preview, delta, chrono::Utc::now());
        match self
            .board
            .tasks()
            .set_progress(&selected.project_id, &selected.task.id, preview.progress)
        {
            Ok(t) => {
                self.error = None;
                self.status = Some(format!("{}: {}%", t.name, t.progress));
            }
            Err(e) => self.error = Some(e.to_string()),
        }
        self.reload();
    }

    pub fn start_comment(&mut self) {
        if self.selected_task().is_some() {
            self.input_mode = InputMode::Editing;
            self.input_buffer.clear();
        }
    }

    pub fn cancel_input(&mut self) {
        self.input_mode = InputMode::Normal;
        self.input_buffer.clear();
    }

    pub fn handle_input(&mut self) {
        let text = std::mem::take(&mut self.input_buffer);
        self.input_mode = InputMode::Normal;
        let (Some(task), Some(user)) = (self.selected_task().cloned(), self.user.clone()) else {
            return;
        };
        match self
            .board
            .tasks()
            .add_comment(&task.project_id, &task.task.id, &user.name, &text)
        {
            Ok(_) => self.status = Some(format!("Comment added to {}", task.task.name)),
            Err(e) => self.error = Some(e.to_string()),
        }
        self.reload();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_on_login_and_routes_by_role() {
        let board = Board::in_memory();
        let mut app = App::new(&board);
        assert!(app.screen == Screen::Login);

        app.login.username = "employee".into();
        app.login.password = "employee123".into();
        app.login.role = Role::Employee;
        app.submit_login();
        assert!(app.screen == Screen::Employee);

        app.go("/dashboard");
        assert!(app.screen == Screen::Employee);
        assert!(app.error.as_deref().unwrap_or_default().contains("manager"));

        app.logout();
        assert!(app.screen == Screen::Login);
    }

    #[test]
    fn wrong_role_keeps_login_screen() {
        let board = Board::in_memory();
        let mut app = App::new(&board);
        app.login.username = "manager".into();
        app.login.password = "manager123".into();
        app.login.role = Role::Employee;
        app.submit_login();
        assert!(app.screen == Screen::Login);
        assert!(app.error.as_deref().unwrap_or_default().contains("manager"));
    }
}
