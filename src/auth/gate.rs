//! Route gating for the UI layer.
//!
//! The store only reports identity; whether a screen is reachable is decided
//! here from the session's role. This is UI-level gating, not authorization.
//!
//! Some controls are gated inside a public screen rather than by route:
//! `/report/:id` is open to everyone, but only auditors get the verify
//! control ([`Action::VerifyReport`], checked with [`check_action`]).

use super::types::{PublicAccount, Role};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Home,
    Login,
    Signup,
    Dashboard,
    Project(String),
    Report(String),
    DonationFlow,
    SubmitReport,
}

/// Outcome of [`check_access`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Access {
    Granted,
    /// Route needs a role and nobody is signed in.
    LoginRequired,
    Forbidden { required: Role, actual: Role },
}

/// A navigation entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavLink {
    pub path: &'static str,
    pub label: &'static str,
}

impl Route {
    /// Parse a path such as `/project/42`. Unknown paths return `None`.
    pub fn parse(path: &str) -> Option<Self> {
        let trimmed = path.trim().trim_end_matches('/');
        let segments: Vec<&str> = trimmed
            .trim_start_matches('/')
            .split('/')
            .filter(|s| !s.is_empty())
            .collect();

        match segments.as_slice() {
            [] => Some(Self::Home),
            ["login"] => Some(Self::Login),
            ["signup"] => Some(Self::Signup),
            ["dashboard"] => Some(Self::Dashboard),
            ["project", id] => Some(Self::Project((*id).to_string())),
            ["report", id] => Some(Self::Report((*id).to_string())),
            ["donation-flow"] => Some(Self::DonationFlow),
            ["submit-report"] => Some(Self::SubmitReport),
            _ => None,
        }
    }

    pub fn path(&self) -> String {
        match self {
            Self::Home => "/".into(),
            Self::Login => "/login".into(),
            Self::Signup => "/signup".into(),
            Self::Dashboard => "/dashboard".into(),
            Self::Project(id) => format!("/project/{id}"),
            Self::Report(id) => format!("/report/{id}"),
            Self::DonationFlow => "/donation-flow".into(),
            Self::SubmitReport => "/submit-report".into(),
        }
    }

    /// Role needed to open this route; `None` means public.
    pub fn required_role(&self) -> Option<Role> {
        match self {
            Self::DonationFlow => Some(Role::Donor),
            Self::SubmitReport => Some(Role::Ngo),
            _ => None,
        }
    }
}

/// A role-gated control shown within a screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Mark a pending report on `/report/:id` as verified.
    VerifyReport,
}

impl Action {
    pub fn required_role(self) -> Role {
        match self {
            Self::VerifyReport => Role::Auditor,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::VerifyReport => "Verify report",
        }
    }
}

pub fn check_access(route: &Route, session: Option<&PublicAccount>) -> Access {
    match route.required_role() {
        Some(required) => check_role(required, session),
        None => Access::Granted,
    }
}

pub fn check_action(action: Action, session: Option<&PublicAccount>) -> Access {
    check_role(action.required_role(), session)
}

fn check_role(required: Role, session: Option<&PublicAccount>) -> Access {
    match session {
        None => Access::LoginRequired,
        Some(account) if account.role == required => Access::Granted,
        Some(account) => Access::Forbidden {
            required,
            actual: account.role,
        },
    }
}

/// Navigation entries shown for the current session.
pub fn nav_links(session: Option<&PublicAccount>) -> Vec<NavLink> {
    let mut links = vec![
        NavLink {
            path: "/",
            label: "Home",
        },
        NavLink {
            path: "/dashboard",
            label: "Dashboard",
        },
    ];
    match session.map(|s| s.role) {
        Some(Role::Donor) => links.push(NavLink {
            path: "/donation-flow",
            label: "Donate",
        }),
        Some(Role::Ngo) => links.push(NavLink {
            path: "/submit-report",
            label: "Submit Report",
        }),
        Some(Role::Auditor) | None => {}
    }
    links
}
