//! Navigation targets and the navigator capability.
//!
//! The client never renders pages itself; it only decides where the host
//! should go next and hands that decision to a [`Navigator`].

use crate::net::types::UserSummary;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Route {
    Login,
    LoginError,
    CompleteProfile,
    Dashboard,
    Profile(String),
}

impl Route {
    #[must_use]
    pub fn path(&self) -> String {
        match self {
            Self::Login => "/login".to_owned(),
            Self::LoginError => "/login-error".to_owned(),
            Self::CompleteProfile => "/complete-profile".to_owned(),
            Self::Dashboard => "/dashboard".to_owned(),
            Self::Profile(username) => format!("/profile/{username}"),
        }
    }
}

/// Where to send the user after a successful sign-in.
///
/// Users still carrying a server-assigned default username finish their
/// profile first; everyone else lands on the dashboard.
#[must_use]
pub fn post_login_route(user: &UserSummary) -> Route {
    if user.username_is_default {
        Route::CompleteProfile
    } else {
        Route::Dashboard
    }
}

/// Outcome of guarding a protected page.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GuardDecision {
    /// Session recovery still running; render a placeholder.
    Wait,
    Allow,
    Redirect(Route),
}

/// Host capability for changing the current page.
pub trait Navigator: Send + Sync {
    fn navigate(&self, route: Route);
}

/// Navigator for hosts without pages: records the decision in the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNavigator;

impl Navigator for LogNavigator {
    fn navigate(&self, route: Route) {
        tracing::info!(path = %route.path(), "navigate");
    }
}

#[cfg(test)]
#[path = "routes_test.rs"]
mod tests;
