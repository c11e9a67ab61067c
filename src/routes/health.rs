//! Liveness endpoint

use bytes::Bytes;
use http_body_util::Full;
use hyper::{Response, StatusCode};
use serde::Serialize;

use crate::config::Args;
use crate::routes::json_response;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub healthy: bool,
    pub version: &'static str,
    pub commit: &'static str,
    pub built_at: &'static str,
    pub mode: &'static str,
    pub token_ttl_seconds: u64,
}

/// GET /health
pub fn health_check(args: &Args) -> Response<Full<Bytes>> {
    json_response(
        StatusCode::OK,
        HealthResponse {
            healthy: true,
            version: env!("CARGO_PKG_VERSION"),
            commit: env!("GIT_COMMIT_SHORT"),
            built_at: env!("BUILD_TIMESTAMP"),
            mode: if args.dev_mode { "development" } else { "production" },
            token_ttl_seconds: args.jwt_expiry_seconds,
        },
    )
}
