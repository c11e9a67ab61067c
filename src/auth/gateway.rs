//! Authentication gateway
//!
//! Two entry points:
//! - login: id + password -> verified [`Identity`] (and a signed token)
//! - authenticate: presented token -> [`Identity`]
//!
//! Every failure leaves here as one [`AuthFailure`] variant. Unknown user and
//! wrong password are both reported as `BadCredentials`, and a missing user
//! still costs one Argon2 verification so the two cannot be told apart by
//! timing.

use hyper::StatusCode;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::auth::jwt::{unix_now, TokenEncodingError, TokenIssuer, TokenVerifier, VerifyFailure};
use crate::auth::store::{CredentialStore, StoreError};
use crate::auth::{Identity, PasswordVerifier};
use crate::types::ServiceError;

const DECOY_PASSWORD: &str = "turnstile-decoy-password-never-matches";

/// Caller-visible classification of an authentication failure
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthFailure {
    /// Unknown id or wrong password; deliberately indistinguishable
    #[error("wrong credentials")]
    BadCredentials,
    #[error("permission token could not be encoded: {0}")]
    TokenEncoding(String),
    /// No token presented
    #[error("not logged in")]
    NotLoggedIn,
    /// Token malformed or signature invalid
    #[error("token not recognized")]
    Unauthenticated,
    #[error("session expired")]
    SessionExpired,
    #[error("credential store unavailable")]
    Unavailable,
    /// Anything unclassified; details stay in the server log
    #[error("internal authentication error")]
    Internal,
}

impl AuthFailure {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadCredentials => StatusCode::FORBIDDEN,
            Self::TokenEncoding(_) => StatusCode::BAD_REQUEST,
            Self::NotLoggedIn => StatusCode::FORBIDDEN,
            Self::Unauthenticated => StatusCode::BAD_REQUEST,
            Self::SessionExpired => StatusCode::UNAUTHORIZED,
            Self::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Human-readable message for the response envelope
    pub fn message(&self) -> &'static str {
        match self {
            Self::BadCredentials => "Login failed! Wrong credentials.",
            Self::TokenEncoding(_) => "Login failed! Encoding permission token error.",
            Self::NotLoggedIn => "Error! You must login first.",
            Self::Unauthenticated => "Error! Token not recognized.",
            Self::SessionExpired => "Error! Session Expired.",
            Self::Unavailable => "Error! Credential store unavailable.",
            Self::Internal => "Error! Internal error.",
        }
    }
}

impl From<VerifyFailure> for AuthFailure {
    fn from(failure: VerifyFailure) -> Self {
        match failure {
            VerifyFailure::Malformed => Self::Unauthenticated,
            VerifyFailure::Expired => Self::SessionExpired,
        }
    }
}

impl From<StoreError> for AuthFailure {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable(_) => Self::Unavailable,
        }
    }
}

impl From<TokenEncodingError> for AuthFailure {
    fn from(err: TokenEncodingError) -> Self {
        Self::TokenEncoding(err.0)
    }
}

/// Why a login was rejected. Logged, never returned.
#[derive(Debug, Clone, Copy)]
enum LoginRejection {
    NoSuchUser,
    WrongPassword,
}

/// A successful login: who, the token, and when it stops working
#[derive(Debug, Clone)]
pub struct Session {
    pub identity: Identity,
    pub token: String,
    /// Unix seconds
    pub expires_at: u64,
}

/// Orchestrates credential checks and token handling
pub struct AuthGateway {
    store: Arc<dyn CredentialStore>,
    passwords: PasswordVerifier,
    issuer: TokenIssuer,
    verifier: TokenVerifier,
    decoy_hash: String,
}

impl AuthGateway {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        passwords: PasswordVerifier,
        issuer: TokenIssuer,
        verifier: TokenVerifier,
    ) -> Result<Self, ServiceError> {
        let decoy_hash = passwords.hash(DECOY_PASSWORD)?;
        Ok(Self {
            store,
            passwords,
            issuer,
            verifier,
            decoy_hash,
        })
    }

    /// Verify credentials, stamping the identity with the current time
    pub async fn login(&self, id: &str, password: &str) -> Result<Identity, AuthFailure> {
        self.login_at(id, password, unix_now()).await
    }

    /// Verify credentials, stamping the identity with `now`
    pub async fn login_at(
        &self,
        id: &str,
        password: &str,
        now: u64,
    ) -> Result<Identity, AuthFailure> {
        let user = match self.store.find_user(id).await {
            Ok(user) => user,
            Err(e) => {
                error!(user_id = %id, "Credential lookup failed: {}", e);
                return Err(e.into());
            }
        };

        let Some(user) = user else {
            // Same hashing cost as a real check
            let _ = self.check_password(password, &self.decoy_hash).await;
            return Err(reject(id, LoginRejection::NoSuchUser));
        };

        match self.check_password(password, &user.password_hash).await {
            Ok(true) => {}
            Ok(false) => return Err(reject(id, LoginRejection::WrongPassword)),
            Err(e) => {
                error!(user_id = %id, "Stored credential unusable: {}", e);
                return Err(AuthFailure::Internal);
            }
        }

        info!(user_id = %id, permission = %user.permission, "Login successful");

        Ok(Identity::new(user.id, user.username, user.permission, now))
    }

    /// Run the Argon2 comparison on the blocking pool
    async fn check_password(&self, password: &str, stored_hash: &str) -> Result<bool, ServiceError> {
        let passwords = self.passwords.clone();
        let password = password.to_string();
        let stored_hash = stored_hash.to_string();

        tokio::task::spawn_blocking(move || passwords.verify(&password, &stored_hash))
            .await
            .map_err(|e| ServiceError::Internal(format!("Password check task failed: {e}")))?
    }

    /// Sign a token for an already verified identity
    pub fn issue(&self, identity: &Identity) -> Result<Session, AuthFailure> {
        match self.issuer.issue(identity) {
            Ok((token, expires_at)) => Ok(Session {
                identity: identity.clone(),
                token,
                expires_at,
            }),
            Err(e) => {
                warn!(user_id = %identity.id, "Token issuance failed: {}", e);
                Err(e.into())
            }
        }
    }

    /// Login followed by issuance
    pub async fn login_and_issue(&self, id: &str, password: &str) -> Result<Session, AuthFailure> {
        let identity = self.login(id, password).await?;
        self.issue(&identity)
    }

    /// Resolve the presented token against the current wall clock
    pub fn authenticate(&self, token: Option<&str>) -> Result<Identity, AuthFailure> {
        self.authenticate_at(token, unix_now())
    }

    /// Resolve the presented token as of `now`.
    ///
    /// `None` or a blank value is `NotLoggedIn`; anything else is handed to
    /// the verifier.
    pub fn authenticate_at(&self, token: Option<&str>, now: u64) -> Result<Identity, AuthFailure> {
        let token = match token.map(str::trim) {
            Some(t) if !t.is_empty() => t,
            _ => return Err(AuthFailure::NotLoggedIn),
        };

        self.verifier
            .verify_at(token, now)
            .map(|claims| claims.identity())
            .map_err(|failure| {
                debug!("Token rejected: {}", failure);
                failure.into()
            })
    }
}

fn reject(id: &str, reason: LoginRejection) -> AuthFailure {
    match reason {
        LoginRejection::NoSuchUser => warn!(user_id = %id, "Login failed - user not found"),
        LoginRejection::WrongPassword => warn!(user_id = %id, "Login failed - invalid password"),
    }
    AuthFailure::BadCredentials
}
