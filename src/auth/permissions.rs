//! Permission levels and the route permission table

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Authorization tier carried in every token
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
#[repr(u8)]
#[derive(Default)]
pub enum PermissionLevel {
    /// Read-only access to own accounts and operations
    #[default]
    Viewer = 0,
    /// May record new operations
    Operator = 1,
    /// Full access
    Admin = 2,
}

impl fmt::Display for PermissionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PermissionLevel::Viewer => write!(f, "VIEWER"),
            PermissionLevel::Operator => write!(f, "OPERATOR"),
            PermissionLevel::Admin => write!(f, "ADMIN"),
        }
    }
}

impl FromStr for PermissionLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "VIEWER" => Ok(PermissionLevel::Viewer),
            "OPERATOR" => Ok(PermissionLevel::Operator),
            "ADMIN" => Ok(PermissionLevel::Admin),
            other => Err(format!("Unknown permission level: {other}")),
        }
    }
}

/// Authenticated actions exposed over HTTP
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    ListAccountOperations,
    ListUserAccounts,
    AddOperation,
}

/// Get the minimum permission level required for an action
pub fn get_required_permission(action: Action) -> PermissionLevel {
    match action {
        Action::ListAccountOperations | Action::ListUserAccounts => PermissionLevel::Viewer,
        Action::AddOperation => PermissionLevel::Operator,
    }
}

/// Check if an action is allowed for the given permission level
pub fn is_action_allowed(action: Action, level: PermissionLevel) -> bool {
    level >= get_required_permission(action)
}
