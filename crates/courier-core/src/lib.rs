//! Courier Core Library
//!
//! Shared functionality for Courier components:
//! - Environment-backed configuration
//! - Service-level error taxonomy
//! - SQLite pool helpers
//! - Messaging-channel address normalization
//! - Meta signed-request verification

pub mod channel;
pub mod config;
pub mod db;
pub mod error;
pub mod signed_request;
pub mod tracing_init;

pub use channel::Channel;
pub use config::Config;
pub use error::{Error, Result};
