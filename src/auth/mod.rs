//! Authentication and authorization for turnstile
//!
//! Provides:
//! - Password hashing and verification with Argon2
//! - Signed session tokens (issue / verify)
//! - Permission levels for route authorization
//! - The credential store seam and the gateway that ties it all together

pub mod gateway;
pub mod identity;
pub mod jwt;
pub mod password;
pub mod permissions;
pub mod store;

pub use gateway::{AuthFailure, AuthGateway, Session};
pub use identity::{Claims, Identity};
pub use jwt::{
    extract_token_from_header, unix_now, SigningKey, TokenEncodingError, TokenIssuer,
    TokenVerifier, VerifyFailure,
};
pub use password::PasswordVerifier;
pub use permissions::{get_required_permission, is_action_allowed, Action, PermissionLevel};
pub use store::{CredentialStore, InMemoryCredentialStore, StoreError, StoredUser};
