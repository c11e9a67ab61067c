//! Authenticated account and operation routes
//!
//! - GET|POST /operations/account/{account} - operations of one account
//! - POST /accounts/user                     - accounts of the caller
//! - POST /operations/add                    - record an operation (form body)

use bytes::Bytes;
use http_body_util::Full;
use hyper::header::HeaderMap;
use hyper::{Response, StatusCode};
use tracing::{debug, warn};

use crate::auth::{is_action_allowed, Action, Identity};
use crate::ledger::NewOperation;
use crate::routes::{json_response, service_error_response, token_from_headers};
use crate::server::AppState;

/// Resolve the caller and check it may perform `action`
fn authorize(
    state: &AppState,
    headers: &HeaderMap,
    action: Action,
) -> Result<Identity, Response<Full<Bytes>>> {
    let identity = state
        .gateway
        .authenticate(token_from_headers(headers))
        .map_err(|failure| json_response(failure.status_code(), failure.message()))?;

    if !is_action_allowed(action, identity.permission) {
        warn!(
            user_id = %identity.id,
            permission = %identity.permission,
            ?action,
            "Permission denied"
        );
        return Err(json_response(
            StatusCode::FORBIDDEN,
            "Error! Insufficient permission.",
        ));
    }

    Ok(identity)
}

pub async fn handle_account_operations(
    state: &AppState,
    headers: &HeaderMap,
    account: &str,
) -> Response<Full<Bytes>> {
    let identity = match authorize(state, headers, Action::ListAccountOperations) {
        Ok(i) => i,
        Err(resp) => return resp,
    };

    debug!(user_id = %identity.id, account, "Listing operations");

    match state.ledger.operations_for_account(account).await {
        Ok(ops) => json_response(StatusCode::OK, ops),
        Err(e) => service_error_response(e),
    }
}

pub async fn handle_user_accounts(state: &AppState, headers: &HeaderMap) -> Response<Full<Bytes>> {
    let identity = match authorize(state, headers, Action::ListUserAccounts) {
        Ok(i) => i,
        Err(resp) => return resp,
    };

    match state.ledger.accounts_for_user(&identity.id).await {
        Ok(accounts) => json_response(StatusCode::OK, accounts),
        Err(e) => service_error_response(e),
    }
}

/// The form is validated before the token is looked at
pub async fn handle_add_operation(
    state: &AppState,
    headers: &HeaderMap,
    body: Bytes,
) -> Response<Full<Bytes>> {
    let operation = match serde_urlencoded::from_bytes::<NewOperation>(&body) {
        Ok(op) if op.validate().is_ok() => op,
        _ => {
            return json_response(StatusCode::BAD_REQUEST, "Error! Invalid format of data.");
        }
    };

    let identity = match authorize(state, headers, Action::AddOperation) {
        Ok(i) => i,
        Err(resp) => return resp,
    };

    match state.ledger.save_operation(operation).await {
        Ok(saved) => {
            debug!(user_id = %identity.id, operation_id = %saved.id, "Operation saved");
            json_response(StatusCode::ACCEPTED, saved)
        }
        Err(e) => service_error_response(e),
    }
}
