//! Credential store adapter
//!
//! The gateway only needs one lookup: id -> stored hash and profile. Real
//! deployments put a database behind [`CredentialStore`]; the in-memory
//! store here is seeded from a JSON file at startup.

use dashmap::DashMap;
use serde::Deserialize;
use std::path::Path;
use tracing::info;

use crate::auth::{PasswordVerifier, PermissionLevel};
use crate::types::ServiceError;

/// A user record as held by the credential store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredUser {
    pub id: String,
    pub username: String,
    /// Argon2 PHC string
    pub password_hash: String,
    pub permission: PermissionLevel,
}

/// Lookup failures. Absence is `Ok(None)`, not an error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("credential store unavailable: {0}")]
    Unavailable(String),
}

/// Read-only access to stored credentials
#[async_trait::async_trait]
pub trait CredentialStore: Send + Sync {
    /// Find a user by id
    async fn find_user(&self, id: &str) -> Result<Option<StoredUser>, StoreError>;
}

/// Seed file entry. Exactly one of `password_hash` / `password` is expected.
#[derive(Debug, Deserialize)]
struct SeedUser {
    id: String,
    username: String,
    permission: PermissionLevel,
    #[serde(default)]
    password_hash: Option<String>,
    #[serde(default)]
    password: Option<String>,
}

/// In-memory credential store
#[derive(Default)]
pub struct InMemoryCredentialStore {
    users: DashMap<String, StoredUser>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a user record
    pub fn insert(&self, user: StoredUser) {
        self.users.insert(user.id.clone(), user);
    }

    /// Hash `password` and store the resulting record
    pub fn register(
        &self,
        id: &str,
        username: &str,
        password: &str,
        permission: PermissionLevel,
    ) -> Result<(), ServiceError> {
        let password_hash = PasswordVerifier::new().hash(password)?;
        self.insert(StoredUser {
            id: id.to_string(),
            username: username.to_string(),
            password_hash,
            permission,
        });
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    /// Parse a JSON array of seed users
    pub fn from_json(json: &str) -> Result<Self, ServiceError> {
        let seeds: Vec<SeedUser> = serde_json::from_str(json)
            .map_err(|e| ServiceError::Config(format!("Invalid users file: {}", e)))?;

        let store = Self::new();
        for seed in seeds {
            if seed.id.is_empty() {
                return Err(ServiceError::Config("Users file entry with empty id".into()));
            }
            match (seed.password_hash, seed.password) {
                (Some(password_hash), _) => store.insert(StoredUser {
                    id: seed.id,
                    username: seed.username,
                    password_hash,
                    permission: seed.permission,
                }),
                (None, Some(password)) => {
                    store.register(&seed.id, &seed.username, &password, seed.permission)?
                }
                (None, None) => {
                    return Err(ServiceError::Config(format!(
                        "Users file entry '{}' has neither password_hash nor password",
                        seed.id
                    )))
                }
            }
        }

        Ok(store)
    }

    /// Load seed users from a JSON file
    pub fn from_file(path: &Path) -> Result<Self, ServiceError> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            ServiceError::Config(format!("Cannot read users file {}: {}", path.display(), e))
        })?;
        let store = Self::from_json(&json)?;
        info!("Loaded {} user(s) from {}", store.len(), path.display());
        Ok(store)
    }
}

#[async_trait::async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn find_user(&self, id: &str) -> Result<Option<StoredUser>, StoreError> {
        Ok(self.users.get(id).map(|entry| entry.value().clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_register_and_find() {
        let store = InMemoryCredentialStore::new();
        store
            .register("alice", "Alice", "correct", PermissionLevel::Operator)
            .unwrap();

        let user = store.find_user("alice").await.unwrap().unwrap();
        assert_eq!(user.username, "Alice");
        assert_eq!(user.permission, PermissionLevel::Operator);
        assert!(user.password_hash.starts_with("$argon2"));

        assert_eq!(store.find_user("nobody").await.unwrap(), None);
    }

    #[test]
    fn test_from_json_with_hash_and_plaintext() {
        let json = r#"[
            {"id": "u1", "username": "One", "permission": "ADMIN", "password_hash": "$argon2id$v=19$m=19456,t=2,p=1$c2FsdHNhbHQ$aGFzaA"},
            {"id": "u2", "username": "Two", "permission": "VIEWER", "password": "plain-secret"}
        ]"#;

        let store = InMemoryCredentialStore::from_json(json).unwrap();
        assert_eq!(store.len(), 2);

        let one = tokio_test::block_on(store.find_user("u1")).unwrap().unwrap();
        assert_eq!(one.permission, PermissionLevel::Admin);
        assert!(one.password_hash.starts_with("$argon2id$"));

        let two = tokio_test::block_on(store.find_user("u2")).unwrap().unwrap();
        assert_ne!(two.password_hash, "plain-secret");
    }

    #[test]
    fn test_from_json_rejects_bad_entries() {
        let missing = r#"[{"id": "u1", "username": "One", "permission": "ADMIN"}]"#;
        assert!(matches!(
            InMemoryCredentialStore::from_json(missing),
            Err(ServiceError::Config(_))
        ));

        let bad_level = r#"[{"id": "u1", "username": "One", "permission": "ROOT", "password": "x"}]"#;
        assert!(InMemoryCredentialStore::from_json(bad_level).is_err());

        let empty_id = r#"[{"id": "", "username": "One", "permission": "ADMIN", "password": "x"}]"#;
        assert!(InMemoryCredentialStore::from_json(empty_id).is_err());
    }

    #[test]
    fn test_from_file_missing() {
        let result = InMemoryCredentialStore::from_file(Path::new("/nonexistent/users.json"));
        assert!(matches!(result, Err(ServiceError::Config(_))));
    }
}
