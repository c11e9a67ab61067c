//! Session token issuance and verification
//!
//! Tokens are JWTs signed with HS256 (HMAC-SHA256) using one process-wide
//! secret. Verification needs nothing but the token, the secret and the
//! current time, so any process holding the secret can verify any token.
//!
//! Expiry is checked here rather than by `jsonwebtoken`: a token is valid
//! strictly before `exp`, with no leeway. At `now == exp` it is expired.

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use std::fmt;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::auth::{Claims, Identity};
use crate::types::ServiceError;

/// Minimum accepted secret length
pub const MIN_SECRET_LEN: usize = 32;

const DEV_SECRET: &str = "dev-mode-secret-not-for-production-use-123456";

/// Current wall-clock time in Unix seconds
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// The process-wide signing secret, in both key forms.
///
/// Built once at startup and shared read-only (`Arc<SigningKey>`) by the
/// issuer and the verifier.
#[derive(Clone)]
pub struct SigningKey {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl SigningKey {
    /// Returns an error if the secret is empty or too short
    pub fn new(secret: &str) -> Result<Self, ServiceError> {
        if secret.is_empty() {
            return Err(ServiceError::Config(
                "JWT_SECRET is required in production mode".into(),
            ));
        }

        if secret.len() < MIN_SECRET_LEN {
            return Err(ServiceError::Config(format!(
                "JWT_SECRET must be at least {MIN_SECRET_LEN} characters"
            )));
        }

        Ok(Self::from_bytes(secret.as_bytes()))
    }

    /// Fixed, publicly known key for dev mode
    pub fn new_dev() -> Self {
        Self::from_bytes(DEV_SECRET.as_bytes())
    }

    fn from_bytes(secret: &[u8]) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
        }
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SigningKey(<redacted>)")
    }
}

/// An identity that cannot be carried in a token
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("cannot encode token: {0}")]
pub struct TokenEncodingError(pub String);

/// Why a token was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum VerifyFailure {
    /// Unparsable, wrong algorithm, missing claims, or signature mismatch
    #[error("token is malformed or its signature is invalid")]
    Malformed,
    /// Signature valid but `now >= exp`
    #[error("token has expired")]
    Expired,
}

/// Produces signed tokens for verified identities
#[derive(Debug, Clone)]
pub struct TokenIssuer {
    key: Arc<SigningKey>,
    ttl_seconds: u64,
}

impl TokenIssuer {
    pub fn new(key: Arc<SigningKey>, ttl_seconds: u64) -> Self {
        Self { key, ttl_seconds }
    }

    /// Sign a token for `identity`, valid for the configured TTL from its
    /// `issued_at`. Returns the token and its expiry.
    pub fn issue(&self, identity: &Identity) -> Result<(String, u64), TokenEncodingError> {
        ensure_encodable("subject", &identity.id)?;
        ensure_encodable("username", &identity.username)?;
        if identity.id.is_empty() {
            return Err(TokenEncodingError("subject is empty".into()));
        }

        let expires_at = identity
            .issued_at
            .checked_add(self.ttl_seconds)
            .ok_or_else(|| TokenEncodingError("expiry overflows".into()))?;

        let claims = Claims::for_identity(identity, expires_at);

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.key.encoding)
            .map_err(|e| TokenEncodingError(e.to_string()))?;

        Ok((token, expires_at))
    }
}

/// Control characters have no place in a header-carried identity
fn ensure_encodable(field: &str, value: &str) -> Result<(), TokenEncodingError> {
    if value.chars().any(char::is_control) {
        return Err(TokenEncodingError(format!(
            "{field} contains unsupported characters"
        )));
    }
    Ok(())
}

/// Validates tokens and extracts their claims
#[derive(Clone)]
pub struct TokenVerifier {
    key: Arc<SigningKey>,
    validation: Validation,
}

impl TokenVerifier {
    pub fn new(key: Arc<SigningKey>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub", "iat"]);

        Self { key, validation }
    }

    /// Verify against the current wall clock
    pub fn verify(&self, token: &str) -> Result<Claims, VerifyFailure> {
        self.verify_at(token, unix_now())
    }

    /// Verify as of `now` (Unix seconds). Signature first, then expiry.
    pub fn verify_at(&self, token: &str, now: u64) -> Result<Claims, VerifyFailure> {
        let claims = decode::<Claims>(token, &self.key.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|_| VerifyFailure::Malformed)?;

        if now >= claims.exp {
            return Err(VerifyFailure::Expired);
        }

        Ok(claims)
    }
}

impl fmt::Debug for TokenVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenVerifier")
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

/// Extract token from Authorization header.
/// Supports "Bearer <token>" format and raw tokens.
pub fn extract_token_from_header(auth_header: Option<&str>) -> Option<&str> {
    let header = auth_header?;

    if let Some(token) = header.strip_prefix("Bearer ") {
        let token = token.trim();
        if !token.is_empty() {
            return Some(token);
        }
    }

    if !header.contains(' ') {
        let token = header.trim();
        if !token.is_empty() {
            return Some(token);
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::PermissionLevel;

    const NOW: u64 = 1_700_000_000;
    const TTL: u64 = 3600;

    fn test_key() -> Arc<SigningKey> {
        Arc::new(SigningKey::new("test-secret-that-is-at-least-32-characters-long").unwrap())
    }

    fn pair() -> (TokenIssuer, TokenVerifier) {
        let key = test_key();
        (TokenIssuer::new(key.clone(), TTL), TokenVerifier::new(key))
    }

    fn alice() -> Identity {
        Identity::new("alice", "Alice Liddell", PermissionLevel::Operator, NOW)
    }

    #[test]
    fn test_issue_and_verify_round_trip() {
        let (issuer, verifier) = pair();

        let (token, expires_at) = issuer.issue(&alice()).unwrap();
        assert!(!token.is_empty());
        assert_eq!(expires_at, NOW + TTL);

        let claims = verifier.verify_at(&token, NOW).unwrap();
        assert_eq!(claims.sub, "alice");
        assert_eq!(claims.username, "Alice Liddell");
        assert_eq!(claims.permission, PermissionLevel::Operator);
        assert_eq!(claims.iat, NOW);
        assert_eq!(claims.exp, NOW + TTL);
        assert_eq!(claims.identity(), alice());
    }

    #[test]
    fn test_round_trip_every_permission_level() {
        let (issuer, verifier) = pair();

        for permission in [
            PermissionLevel::Viewer,
            PermissionLevel::Operator,
            PermissionLevel::Admin,
        ] {
            let identity = Identity::new("u-1", "Zoë Ångström", permission, NOW);
            let (token, _) = issuer.issue(&identity).unwrap();
            let claims = verifier.verify_at(&token, NOW + 1).unwrap();
            assert_eq!(claims.identity(), identity);
        }
    }

    #[test]
    fn test_corrupted_last_byte_is_malformed() {
        let (issuer, verifier) = pair();
        let (token, _) = issuer.issue(&alice()).unwrap();

        let mut corrupted = token.clone();
        let last = corrupted.pop().unwrap();
        corrupted.push(if last == 'A' { 'Q' } else { 'A' });

        assert_eq!(
            verifier.verify_at(&corrupted, NOW),
            Err(VerifyFailure::Malformed)
        );
        // Even long after expiry, a bad signature reports Malformed
        assert_eq!(
            verifier.verify_at(&corrupted, NOW + 10 * TTL),
            Err(VerifyFailure::Malformed)
        );
    }

    #[test]
    fn test_garbage_is_malformed() {
        let (_, verifier) = pair();

        assert_eq!(verifier.verify_at("invalid-token", NOW), Err(VerifyFailure::Malformed));
        assert_eq!(verifier.verify_at("", NOW), Err(VerifyFailure::Malformed));
        assert_eq!(verifier.verify_at("a.b.c", NOW), Err(VerifyFailure::Malformed));
    }

    #[test]
    fn test_wrong_secret_is_malformed() {
        let (issuer, _) = pair();
        let other = TokenVerifier::new(Arc::new(
            SigningKey::new("different-secret-that-is-at-least-32-characters").unwrap(),
        ));

        let (token, _) = issuer.issue(&alice()).unwrap();
        assert_eq!(other.verify_at(&token, NOW), Err(VerifyFailure::Malformed));
    }

    #[test]
    fn test_other_algorithms_are_malformed() {
        let (issuer, verifier) = pair();
        let claims = Claims::for_identity(&alice(), NOW + TTL);

        // Same secret, HS512 instead of HS256
        let hs512 = encode(
            &Header::new(Algorithm::HS512),
            &claims,
            &EncodingKey::from_secret(b"test-secret-that-is-at-least-32-characters-long"),
        )
        .unwrap();
        assert_eq!(verifier.verify_at(&hs512, NOW), Err(VerifyFailure::Malformed));

        // Unsigned: {"alg":"none","typ":"JWT"} over a genuine payload
        let (token, _) = issuer.issue(&alice()).unwrap();
        let payload = token.split('.').nth(1).unwrap();
        let unsigned = format!("eyJhbGciOiJub25lIiwidHlwIjoiSldUIn0.{payload}.");
        assert_eq!(verifier.verify_at(&unsigned, NOW), Err(VerifyFailure::Malformed));
    }

    #[test]
    fn test_expiry_boundary() {
        let (issuer, verifier) = pair();
        let (token, _) = issuer.issue(&alice()).unwrap();

        assert!(verifier.verify_at(&token, NOW + TTL - 1).is_ok());
        // The expiry instant itself is already expired
        assert_eq!(
            verifier.verify_at(&token, NOW + TTL),
            Err(VerifyFailure::Expired)
        );
        assert_eq!(
            verifier.verify_at(&token, NOW + TTL + 1),
            Err(VerifyFailure::Expired)
        );
    }

    #[test]
    fn test_verify_uses_wall_clock() {
        let (issuer, verifier) = pair();

        let fresh = Identity::new("alice", "Alice", PermissionLevel::Viewer, unix_now());
        let (token, _) = issuer.issue(&fresh).unwrap();
        assert!(verifier.verify(&token).is_ok());

        let stale = Identity::new("alice", "Alice", PermissionLevel::Viewer, NOW - 2 * TTL);
        let (token, _) = issuer.issue(&stale).unwrap();
        assert_eq!(verifier.verify(&token), Err(VerifyFailure::Expired));
    }

    #[test]
    fn test_unencodable_identity_rejected() {
        let (issuer, _) = pair();

        let bad_name = Identity::new("alice", "Alice\u{0}", PermissionLevel::Viewer, NOW);
        let err = issuer.issue(&bad_name).unwrap_err();
        assert!(err.0.contains("username"));

        let bad_id = Identity::new("ali\nce", "Alice", PermissionLevel::Viewer, NOW);
        let err = issuer.issue(&bad_id).unwrap_err();
        assert!(err.0.contains("subject"));

        let empty_id = Identity::new("", "Alice", PermissionLevel::Viewer, NOW);
        assert!(issuer.issue(&empty_id).is_err());
    }

    #[test]
    fn test_expiry_overflow_rejected() {
        let issuer = TokenIssuer::new(test_key(), TTL);
        let identity = Identity::new("alice", "Alice", PermissionLevel::Viewer, u64::MAX - 1);
        assert!(issuer.issue(&identity).is_err());
    }

    #[test]
    fn test_secret_validation() {
        assert!(SigningKey::new("short").is_err());
        assert!(SigningKey::new("").is_err());
        assert!(SigningKey::new("this-secret-is-at-least-32-chars-long").is_ok());
    }

    #[test]
    fn test_dev_key_round_trip() {
        let key = Arc::new(SigningKey::new_dev());
        let issuer = TokenIssuer::new(key.clone(), TTL);
        let verifier = TokenVerifier::new(key);

        let (token, _) = issuer.issue(&alice()).unwrap();
        assert!(verifier.verify_at(&token, NOW).is_ok());
    }

    #[test]
    fn test_debug_redacts_secret() {
        let rendered = format!("{:?}", test_key());
        assert!(!rendered.contains("test-secret"));
    }

    #[test]
    fn test_extract_token_from_header() {
        assert_eq!(
            extract_token_from_header(Some("Bearer abc123")),
            Some("abc123")
        );

        // Raw token
        assert_eq!(extract_token_from_header(Some("abc123")), Some("abc123"));

        assert_eq!(extract_token_from_header(None), None);
        assert_eq!(extract_token_from_header(Some("")), None);
        assert_eq!(extract_token_from_header(Some("Bearer ")), None);

        assert_eq!(extract_token_from_header(Some("Basic abc123")), None);
    }
}
