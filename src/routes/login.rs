//! POST /login
//!
//! Form fields `id` and `password`. On success the token is returned in the
//! `jwt` response header and in the body.

use bytes::Bytes;
use http_body_util::Full;
use hyper::{Response, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::auth::Session;
use crate::routes::{json_response, json_response_with_header, service_error_response, TOKEN_HEADER};
use crate::server::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub id: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub message: &'static str,
    pub token: String,
    pub id: String,
    pub username: String,
    pub permission: String,
    pub expires_at: u64,
}

impl From<Session> for LoginResponse {
    fn from(session: Session) -> Self {
        Self {
            message: "Success! User logged in.",
            token: session.token,
            id: session.identity.id,
            username: session.identity.username,
            permission: session.identity.permission.to_string(),
            expires_at: session.expires_at,
        }
    }
}

pub async fn handle_login(state: &AppState, body: Bytes) -> Response<Full<Bytes>> {
    let form: LoginForm = match serde_urlencoded::from_bytes(&body) {
        Ok(f) => f,
        Err(e) => {
            warn!("Login form rejected: {}", e);
            return json_response(
                StatusCode::BAD_REQUEST,
                "Login failed! Missing id or password.",
            );
        }
    };

    if form.id.is_empty() || form.password.is_empty() {
        return json_response(
            StatusCode::BAD_REQUEST,
            "Login failed! Missing id or password.",
        );
    }

    let session = match state.gateway.login_and_issue(&form.id, &form.password).await {
        Ok(s) => s,
        Err(failure) => return json_response(failure.status_code(), failure.message()),
    };

    let token = session.token.clone();
    json_response_with_header(StatusCode::OK, LoginResponse::from(session), TOKEN_HEADER, &token)
        .unwrap_or_else(service_error_response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::test_support::{body_json, test_state};

    fn form(id: &str, password: &str) -> Bytes {
        Bytes::from(
            serde_urlencoded::to_string([("id", id), ("password", password)]).unwrap(),
        )
    }

    #[tokio::test]
    async fn test_login_success_sets_jwt_header() {
        let state = test_state();

        let resp = handle_login(&state, form("alice", "correct")).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let header_token = resp.headers()[TOKEN_HEADER].to_str().unwrap().to_string();
        let json = body_json(resp).await;

        assert_eq!(json["server"], 200);
        assert_eq!(json["response"]["message"], "Success! User logged in.");
        assert_eq!(json["response"]["token"], header_token.as_str());
        assert_eq!(json["response"]["id"], "alice");
        assert_eq!(json["response"]["permission"], "OPERATOR");

        let identity = state.gateway.authenticate(Some(header_token.as_str())).unwrap();
        assert_eq!(identity.id, "alice");
    }

    #[tokio::test]
    async fn test_bad_credentials_are_generic() {
        let state = test_state();

        let wrong = handle_login(&state, form("alice", "nope")).await;
        let unknown = handle_login(&state, form("mallory", "correct")).await;

        assert_eq!(wrong.status(), StatusCode::FORBIDDEN);
        assert_eq!(unknown.status(), StatusCode::FORBIDDEN);
        assert!(wrong.headers().get(TOKEN_HEADER).is_none());

        let wrong = body_json(wrong).await;
        let unknown = body_json(unknown).await;
        assert_eq!(wrong, unknown);
        assert_eq!(wrong["response"], "Login failed! Wrong credentials.");
    }

    #[tokio::test]
    async fn test_missing_fields() {
        let state = test_state();

        let resp = handle_login(&state, Bytes::from_static(b"id=alice")).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let resp = handle_login(&state, form("", "correct")).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
