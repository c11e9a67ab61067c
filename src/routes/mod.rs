//! HTTP routes for turnstile
//!
//! Every response body is the envelope `{"server": <status>, "response": ...}`
//! where `response` is domain data or a human-readable message.

pub mod health;
pub mod login;
pub mod operations;

use bytes::Bytes;
use http_body_util::Full;
use hyper::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use hyper::{Response, StatusCode};
use serde::Serialize;
use tracing::error;

use crate::auth::extract_token_from_header;
use crate::types::ServiceError;

pub use health::health_check;
pub use login::handle_login;
pub use operations::{handle_account_operations, handle_add_operation, handle_user_accounts};

/// Header carrying the session token, on login responses and authenticated requests
pub const TOKEN_HEADER: &str = "jwt";

/// Stand-in for header bytes that are not valid UTF-8; never verifies
const UNREADABLE_TOKEN: &str = "\u{FFFD}";

/// Response envelope
#[derive(Debug, Serialize)]
pub struct JsonResponseBody<T: Serialize> {
    pub server: u16,
    pub response: T,
}

/// Wrap `response` in the envelope and serialize it
pub fn json_response<T: Serialize>(status: StatusCode, response: T) -> Response<Full<Bytes>> {
    let body = JsonResponseBody {
        server: status.as_u16(),
        response,
    };
    let json = serde_json::to_string(&body).unwrap_or_else(|_| "{}".to_string());

    let mut resp = Response::new(Full::new(Bytes::from(json)));
    *resp.status_mut() = status;
    resp.headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    resp
}

/// Same as [`json_response`] with an extra response header
pub fn json_response_with_header<T: Serialize>(
    status: StatusCode,
    response: T,
    name: &'static str,
    value: &str,
) -> Result<Response<Full<Bytes>>, ServiceError> {
    let value = HeaderValue::from_str(value)
        .map_err(|e| ServiceError::Internal(format!("Invalid {name} header value: {e}")))?;

    let mut resp = json_response(status, response);
    resp.headers_mut()
        .insert(HeaderName::from_static(name), value);
    Ok(resp)
}

/// Map a non-auth service error to an envelope, hiding server-side detail
pub fn service_error_response(err: ServiceError) -> Response<Full<Bytes>> {
    let status = err.status_code();
    if status.is_server_error() {
        error!("Request failed: {}", err);
        json_response(status, "Error! Internal error.")
    } else {
        json_response(status, format!("Error! {}", err))
    }
}

/// Find the presented session token.
///
/// The `jwt` header wins; otherwise `Authorization: Bearer <token>`. A present
/// but empty `jwt` header is returned as-is and treated as no token.
pub fn token_from_headers(headers: &HeaderMap) -> Option<&str> {
    if let Some(value) = headers.get(TOKEN_HEADER) {
        return Some(std::str::from_utf8(value.as_bytes()).unwrap_or(UNREADABLE_TOKEN));
    }

    extract_token_from_header(headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok()))
}

#[cfg(test)]
pub(crate) mod test_support {
    use http_body_util::BodyExt;
    use std::sync::Arc;

    use super::*;
    use crate::auth::{
        AuthGateway, InMemoryCredentialStore, PasswordVerifier, PermissionLevel, SigningKey,
        TokenIssuer, TokenVerifier,
    };
    use crate::config::Args;
    use crate::ledger::InMemoryLedger;
    use crate::server::AppState;
    use clap::Parser;

    pub const TTL: u64 = 900;

    /// State with alice (operator), vera (viewer) and two accounts for alice
    pub fn test_state() -> AppState {
        let store = InMemoryCredentialStore::new();
        store
            .register("alice", "Alice", "correct", PermissionLevel::Operator)
            .unwrap();
        store
            .register("vera", "Vera", "viewer-pass", PermissionLevel::Viewer)
            .unwrap();

        let key = Arc::new(SigningKey::new("routes-test-secret-with-32-plus-characters").unwrap());
        let gateway = AuthGateway::new(
            Arc::new(store),
            PasswordVerifier::new(),
            TokenIssuer::new(key.clone(), TTL),
            TokenVerifier::new(key),
        )
        .unwrap();

        let ledger = InMemoryLedger::new();
        ledger.open_account("acc-1", "alice", "Checking");
        ledger.open_account("acc-2", "alice", "Savings");
        ledger.open_account("acc-3", "vera", "Checking");

        let args = Args::try_parse_from(["turnstile", "--dev-mode"]).unwrap();
        AppState::new(args, gateway, Arc::new(ledger))
    }

    pub async fn body_json(resp: Response<Full<Bytes>>) -> serde_json::Value {
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }
}
