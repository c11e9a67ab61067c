//! Configuration for turnstile
//!
//! CLI arguments and environment variable handling using clap.

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;

use crate::auth::jwt::{SigningKey, MIN_SECRET_LEN};
use crate::types::ServiceError;

/// turnstile - password login and stateless session tokens
#[derive(Parser, Debug, Clone)]
#[command(name = "turnstile")]
#[command(about = "Issues signed session tokens and gates requests on them")]
pub struct Args {
    /// Address to listen on
    #[arg(long, env = "LISTEN", default_value = "0.0.0.0:8080")]
    pub listen: SocketAddr,

    /// Enable development mode (built-in signing secret, demo account)
    #[arg(long, env = "DEV_MODE", default_value = "false")]
    pub dev_mode: bool,

    /// JWT secret for token signing (required in production)
    #[arg(long, env = "JWT_SECRET", hide_env_values = true)]
    pub jwt_secret: Option<String>,

    /// JWT token expiry in seconds
    #[arg(long, env = "JWT_EXPIRY_SECONDS", default_value = "3600")]
    pub jwt_expiry_seconds: u64,

    /// JSON file with the users to load into the credential store
    #[arg(long, env = "USERS_FILE")]
    pub users_file: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Emit logs as JSON lines
    #[arg(long, env = "LOG_JSON", default_value = "false")]
    pub log_json: bool,
}

impl Args {
    /// Build the process-wide signing key.
    ///
    /// Dev mode without a configured secret falls back to the built-in key.
    pub fn signing_key(&self) -> Result<SigningKey, ServiceError> {
        match (&self.jwt_secret, self.dev_mode) {
            (Some(secret), _) => SigningKey::new(secret),
            (None, true) => Ok(SigningKey::new_dev()),
            (None, false) => Err(ServiceError::Config(
                "JWT_SECRET is required in production mode".into(),
            )),
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        match &self.jwt_secret {
            None if !self.dev_mode => {
                return Err("JWT_SECRET is required in production mode".to_string());
            }
            Some(secret) if secret.len() < MIN_SECRET_LEN => {
                return Err(format!(
                    "JWT_SECRET must be at least {MIN_SECRET_LEN} characters"
                ));
            }
            _ => {}
        }

        if self.jwt_expiry_seconds == 0 {
            return Err("JWT_EXPIRY_SECONDS must be greater than zero".to_string());
        }

        Ok(())
    }
}
