//! Caller roles
//!
//! Identity is established elsewhere; the engine only receives the
//! authenticated user id and role and checks role membership per action.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Authorization tier, ordered from least to most privileged
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Read-only access
    Viewer,
    /// May edit lot scope and advance work status
    Editor,
    /// May approve or reject submitted lots
    Approver,
    /// Full control
    Admin,
}

impl Role {
    /// Every role, least privileged first
    pub const ALL: [Role; 4] = [Role::Viewer, Role::Editor, Role::Approver, Role::Admin];

    /// Roles at or above `self`
    #[must_use]
    pub fn and_above(self) -> Vec<Role> {
        Role::ALL.into_iter().filter(|r| *r >= self).collect()
    }

    /// Wire name
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Role::Viewer => "viewer",
            Role::Editor => "editor",
            Role::Approver => "approver",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|role| role.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown role: '{s}'"))
    }
}

/// Authenticated caller of a lifecycle operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Caller {
    /// User id recorded in audit entries
    pub user_id: String,
    /// Role used for authorization
    pub role: Role,
}

impl Caller {
    /// Create caller
    #[inline]
    #[must_use]
    pub fn new(user_id: impl Into<String>, role: Role) -> Self {
        Self {
            user_id: user_id.into(),
            role,
        }
    }
}
