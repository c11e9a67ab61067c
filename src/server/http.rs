//! HTTP server implementation
//!
//! Uses hyper http1 with TokioIo, one task per connection.

use bytes::Bytes;
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::{Body, Incoming};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::auth::AuthGateway;
use crate::config::Args;
use crate::ledger::OperationService;
use crate::routes::{self, json_response};
use crate::types::ServiceError;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Largest accepted request body
pub const MAX_BODY_BYTES: usize = 10240;

/// Shared application state
pub struct AppState {
    pub args: Args,
    pub gateway: AuthGateway,
    pub ledger: Arc<dyn OperationService>,
}

impl AppState {
    pub fn new(args: Args, gateway: AuthGateway, ledger: Arc<dyn OperationService>) -> Self {
        Self {
            args,
            gateway,
            ledger,
        }
    }
}

/// Start the HTTP server
pub async fn run(state: Arc<AppState>) -> Result<(), ServiceError> {
    let listener = TcpListener::bind(state.args.listen).await?;

    info!("turnstile listening on {}", state.args.listen);

    if state.args.dev_mode {
        warn!("Development mode enabled - tokens may be signed with the built-in secret");
    }

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    let io = TokioIo::new(stream);

                    let service = service_fn(move |req| {
                        let state = Arc::clone(&state);
                        async move { handle_request(state, addr, req).await }
                    });

                    if let Err(err) = http1::Builder::new()
                        .serve_connection(io, service)
                        .await
                    {
                        error!("Error serving connection from {}: {:?}", addr, err);
                    }
                });
            }
            Err(e) => {
                error!("Error accepting connection: {:?}", e);
            }
        }
    }
}

/// Route incoming HTTP requests
async fn handle_request(
    state: Arc<AppState>,
    addr: SocketAddr,
    req: Request<Incoming>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    info!("[{}] {} {}", addr, req.method(), req.uri().path());
    Ok(route(&state, req).await)
}

/// Dispatch on method and path. Generic over the body so tests can drive it.
pub async fn route<B>(state: &AppState, req: Request<B>) -> Response<Full<Bytes>>
where
    B: Body,
    B::Error: Into<BoxError>,
{
    let (parts, body) = req.into_parts();
    let path = parts.uri.path();

    match (&parts.method, path) {
        (&Method::GET, "/health") | (&Method::GET, "/healthz") => routes::health_check(&state.args),

        (&Method::POST, "/login") => match read_body(body).await {
            Ok(bytes) => routes::handle_login(state, bytes).await,
            Err(e) => routes::service_error_response(e),
        },

        (&Method::GET, p) | (&Method::POST, p) if p.starts_with("/operations/account/") => {
            let account = p.trim_start_matches("/operations/account/");
            if account.is_empty() || account.contains('/') {
                return not_found_response(p);
            }
            routes::handle_account_operations(state, &parts.headers, account).await
        }

        (&Method::POST, "/accounts/user") => routes::handle_user_accounts(state, &parts.headers).await,

        (&Method::POST, "/operations/add") => match read_body(body).await {
            Ok(bytes) => routes::handle_add_operation(state, &parts.headers, bytes).await,
            Err(e) => routes::service_error_response(e),
        },

        (_, "/login") | (_, "/accounts/user") | (_, "/operations/add") => {
            json_response(StatusCode::METHOD_NOT_ALLOWED, "Error! Method not allowed.")
        }

        _ => not_found_response(path),
    }
}

/// Collect a request body, stopping once it exceeds [`MAX_BODY_BYTES`]
pub async fn read_body<B>(body: B) -> Result<Bytes, ServiceError>
where
    B: Body,
    B::Error: Into<BoxError>,
{
    match Limited::new(body, MAX_BODY_BYTES).collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(e) if e.is::<LengthLimitError>() => {
            Err(ServiceError::BadRequest("Request body too large".into()))
        }
        Err(e) => Err(ServiceError::Http(format!("Failed to read body: {}", e))),
    }
}

/// Not found response
fn not_found_response(path: &str) -> Response<Full<Bytes>> {
    json_response(StatusCode::NOT_FOUND, format!("Error! Not found: {path}"))
}
