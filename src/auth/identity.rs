//! Identity and token claims

use serde::{Deserialize, Serialize};

use crate::auth::PermissionLevel;

/// A verified user, built at login and rebuilt from a verified token
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    pub id: String,
    pub username: String,
    pub permission: PermissionLevel,
    /// Unix seconds
    pub issued_at: u64,
}

impl Identity {
    pub fn new(
        id: impl Into<String>,
        username: impl Into<String>,
        permission: PermissionLevel,
        issued_at: u64,
    ) -> Self {
        Self {
            id: id.into(),
            username: username.into(),
            permission,
            issued_at,
        }
    }
}

/// Payload stored in the signed token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: String,
    pub username: String,
    pub permission: PermissionLevel,
    /// Issued at (Unix timestamp)
    pub iat: u64,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
}

impl Claims {
    pub fn for_identity(identity: &Identity, expires_at: u64) -> Self {
        Self {
            sub: identity.id.clone(),
            username: identity.username.clone(),
            permission: identity.permission,
            iat: identity.issued_at,
            exp: expires_at,
        }
    }

    pub fn identity(&self) -> Identity {
        Identity {
            id: self.sub.clone(),
            username: self.username.clone(),
            permission: self.permission,
            issued_at: self.iat,
        }
    }
}
