//! Outbound provider clients for Courier.
//!
//! - [`twilio::TwilioClient`] for the Twilio REST API (sub-accounts, number
//!   inventory, message send)
//! - [`meta::GraphClient`] for the Meta Graph API (OAuth code exchange, page
//!   enumeration, Instagram lookups)
//!
//! Both clients take an injectable base URL so tests can point them at a
//! local mock server.

pub mod meta;
pub mod twilio;

pub use meta::GraphClient;
pub use twilio::TwilioClient;

/// Errors from a remote provider call.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// The HTTP request itself failed (DNS, connect, timeout).
    #[error("provider request error: {0}")]
    Request(String),

    /// The provider rejected the call; carries its own message when the
    /// response body had one.
    #[error("provider API error (status {status}): {message}")]
    Api {
        /// HTTP status code returned by the provider.
        status: u16,
        /// Provider-supplied error message, or the raw body.
        message: String,
    },
}

impl ProviderError {
    /// The human-readable message suitable for surfacing to a caller.
    pub fn message(&self) -> String {
        match self {
            Self::Request(m) => m.clone(),
            Self::Api { message, .. } => message.clone(),
        }
    }
}
