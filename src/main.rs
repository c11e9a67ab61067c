//! turnstile - password login and stateless session tokens

use clap::Parser;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use turnstile::{
    auth::{
        AuthGateway, InMemoryCredentialStore, PasswordVerifier, PermissionLevel, TokenIssuer,
        TokenVerifier,
    },
    config::Args,
    ledger::InMemoryLedger,
    server, AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("turnstile={},info", args.log_level).into());
    if args.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    info!("======================================");
    info!("  turnstile v{}", env!("CARGO_PKG_VERSION"));
    info!("======================================");
    info!("Listen: {}", args.listen);
    info!("Mode: {}", if args.dev_mode { "DEVELOPMENT" } else { "PRODUCTION" });
    info!("Token TTL: {}s", args.jwt_expiry_seconds);
    info!("======================================");

    // Read once; shared read-only by issuer and verifier from here on
    let key = Arc::new(args.signing_key()?);
    if args.dev_mode && args.jwt_secret.is_none() {
        warn!("Using built-in dev signing secret - tokens are forgeable");
    }

    let store = match &args.users_file {
        Some(path) => InMemoryCredentialStore::from_file(path)?,
        None => InMemoryCredentialStore::new(),
    };
    if store.is_empty() {
        if args.dev_mode {
            store.register("dev", "Developer", "dev-password", PermissionLevel::Admin)?;
            warn!("No users configured - seeded dev account 'dev' / 'dev-password'");
        } else {
            warn!("Credential store is empty - every login will fail");
        }
    }

    let gateway = AuthGateway::new(
        Arc::new(store),
        PasswordVerifier::new(),
        TokenIssuer::new(Arc::clone(&key), args.jwt_expiry_seconds),
        TokenVerifier::new(key),
    )?;

    let ledger = InMemoryLedger::new();
    if args.dev_mode {
        ledger.open_account("dev-checking", "dev", "Checking");
    }

    let state = Arc::new(AppState::new(args, gateway, Arc::new(ledger)));
    server::run(state).await?;

    Ok(())
}
