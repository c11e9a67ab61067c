//! turnstile - password login and stateless session tokens
//!
//! A caller logs in with an id and password and receives a signed token that
//! carries its identity and permission level. Every later request presents
//! the token, which is verified locally (signature and expiry) with no
//! session store.
//!
//! ## Services
//!
//! - **Auth**: password verification, token issuance/verification, gateway
//! - **Ledger**: accounts and operations behind the authenticated routes
//! - **Server**: hyper HTTP front end with a `{server, response}` envelope

pub mod auth;
pub mod config;
pub mod ledger;
pub mod routes;
pub mod server;
pub mod types;

pub use config::Args;
pub use server::{run, AppState};
pub use types::ServiceError;
