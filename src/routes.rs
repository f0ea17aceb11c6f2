//! Role-gated navigation between the login screen and the two dashboards.

use crate::models::{Role, Session};
use crate::storage::SessionStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Login,
    /// Manager dashboard.
    Dashboard,
    /// Employee task view.
    Employee,
    NotFound,
}

impl Route {
    /// Maps a path to a route. `/` goes to the signed-in user's home, or to
    /// the login screen.
    pub fn parse(path: &str, session: Option<&Session>) -> Route {
        let path = path.split(['?', '#']).next().unwrap_or("");
        match path.trim_end_matches('/') {
            "" => session.map_or(Route::Login, |s| Route::home(s.role)),
            "/login" => Route::Login,
            "/dashboard" => Route::Dashboard,
            "/employee" => Route::Employee,
            _ => Route::NotFound,
        }
    }

    pub fn home(role: Role) -> Route {
        match role {
            Role::Manager => Route::Dashboard,
            Role::Employee => Route::Employee,
        }
    }

    pub fn path(self) -> &'static str {
        match self {
            Route::Login => "/login",
            Route::Dashboard => "/dashboard",
            Route::Employee => "/employee",
            Route::NotFound => "/404",
        }
    }

    /// The role a route is restricted to, if any.
    pub fn required_role(self) -> Option<Role> {
        match self {
            Route::Dashboard => Some(Role::Manager),
            Route::Employee => Some(Role::Employee),
            Route::Login | Route::NotFound => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteDecision {
    Render(Route),
    Redirect { to: Route, message: Option<String> },
}

/// Decides whether `route` may be shown for `session`.
pub fn guard(route: Route, session: Option<&Session>) -> RouteDecision {
    match (route.required_role(), session) {
        (None, Some(s)) if route == Route::Login => RouteDecision::Redirect {
            to: Route::home(s.role),
            message: None,
        },
        (None, _) => RouteDecision::Render(route),
        (Some(_), None) => RouteDecision::Redirect {
            to: Route::Login,
            message: Some("Please sign in to continue".to_string()),
        },
        (Some(required), Some(s)) if s.role != required => RouteDecision::Redirect {
            to: Route::home(s.role),
            message: Some(format!("This page is only available to {required} accounts")),
        },
        (Some(_), Some(_)) => RouteDecision::Render(route),
    }
}

/// Resolves `path` against the stored session. Redirect messages bound for
/// the login screen are queued as the one-shot auth message.
pub fn navigate(path: &str, sessions: &SessionStore) -> RouteDecision {
    let session = sessions.current();
    let decision = guard(Route::parse(path, session.as_ref()), session.as_ref());
    if let RouteDecision::Redirect {
        to: Route::Login,
        message: Some(message),
    } = &decision
    {
        sessions.set_auth_message(message);
    }
    decision
}
