use shared::domain::Role;
use thiserror::Error;

use crate::session::SessionState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Screen {
    Login,
    Dashboard,
    Members,
    Accounts,
    Statistics,
    Enforcement,
    StaffManagement,
}

impl Screen {
    pub fn title(self) -> &'static str {
        match self {
            Screen::Login => "Login",
            Screen::Dashboard => "Dashboard",
            Screen::Members => "Member Management",
            Screen::Accounts => "Account Management",
            Screen::Statistics => "Statistics",
            Screen::Enforcement => "Enforcement",
            Screen::StaffManagement => "Staff Management",
        }
    }

    pub fn allows(self, role: Role) -> bool {
        match self {
            Screen::Login | Screen::Dashboard | Screen::Members | Screen::Accounts => true,
            Screen::Statistics => matches!(role, Role::Manager | Role::Admin),
            Screen::Enforcement => role == Role::Manager,
            Screen::StaffManagement => role == Role::Admin,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AccessDenied {
    #[error("please sign in to open {}", .0.title())]
    SignedOut(Screen),
    #[error("{} is not available to the {role} role", .screen.title())]
    Forbidden { screen: Screen, role: Role },
}

impl AccessDenied {
    /// Where the front end should send the user instead.
    pub fn redirect(self) -> Screen {
        match self {
            AccessDenied::SignedOut(_) => Screen::Login,
            AccessDenied::Forbidden { .. } => Screen::Dashboard,
        }
    }
}

pub fn guard(state: &SessionState, screen: Screen) -> Result<Role, AccessDenied> {
    let session = state
        .session()
        .ok_or(AccessDenied::SignedOut(screen))?;
    if screen.allows(session.role) {
        Ok(session.role)
    } else {
        Err(AccessDenied::Forbidden {
            screen,
            role: session.role,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Session;

    fn signed_in(role: Role) -> SessionState {
        SessionState::SignedIn(Session {
            username: "someone".into(),
            role,
            token: "t".into(),
        })
    }

    #[test]
    fn role_matrix_gates_screens() {
        assert!(guard(&signed_in(Role::Assistant), Screen::Members).is_ok());
        assert!(guard(&signed_in(Role::Assistant), Screen::Statistics).is_err());
        assert!(guard(&signed_in(Role::Admin), Screen::Statistics).is_ok());
        assert!(guard(&signed_in(Role::Manager), Screen::Enforcement).is_ok());
        assert!(guard(&signed_in(Role::Admin), Screen::Enforcement).is_err());
        assert!(guard(&signed_in(Role::Manager), Screen::StaffManagement).is_err());
        assert!(guard(&signed_in(Role::Admin), Screen::StaffManagement).is_ok());
    }

    #[test]
    fn signed_out_redirects_to_login() {
        let denied = guard(&SessionState::SignedOut { reason: None }, Screen::Accounts)
            .expect_err("signed out");
        assert_eq!(denied.redirect(), Screen::Login);
        assert_eq!(denied.to_string(), "please sign in to open Account Management");

        let forbidden = guard(&signed_in(Role::Assistant), Screen::StaffManagement)
            .expect_err("forbidden");
        assert_eq!(forbidden.redirect(), Screen::Dashboard);
    }
}
