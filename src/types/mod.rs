//! Shared types for turnstile

pub mod error;

pub use error::ServiceError;
