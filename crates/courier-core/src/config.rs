//! Runtime configuration for Courier.
//!
//! All secrets and credential pairs are read from the environment once at
//! startup and injected into components. Components never read the process
//! environment ad hoc; a missing credential pair degrades the flow that
//! needs it to a `ServerConfig` error instead of crashing the server.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Master Twilio account credentials (sub-accounts are created under these).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TwilioCredentials {
    pub account_sid: String,
    pub auth_token: String,
}

/// Meta app credentials for the OAuth and signed-request flows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaCredentials {
    pub app_id: String,
    pub app_secret: String,
}

/// Complete Courier configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Public base URL of this deployment (used for webhook and OAuth
    /// redirect URLs). May omit the scheme; `https://` is assumed.
    pub public_base_url: Option<String>,
    /// SQLite database file path. `None` means the CLI default applies.
    pub database_path: Option<PathBuf>,
    /// Shared secret for validating session tokens issued by the identity
    /// provider.
    pub session_secret: Option<String>,
    /// Master Twilio credentials.
    pub twilio: Option<TwilioCredentials>,
    /// Meta app id/secret pair.
    pub meta: Option<MetaCredentials>,
    /// Shared token for the Meta webhook verification handshake.
    pub meta_verify_token: Option<String>,
}

impl Config {
    /// Build the configuration from process environment variables.
    pub fn from_env() -> Self {
        let env = |name: &str| std::env::var(name).ok().filter(|v| !v.is_empty());

        let twilio = match (env("TWILIO_ACCOUNT_SID"), env("TWILIO_AUTH_TOKEN")) {
            (Some(account_sid), Some(auth_token)) => Some(TwilioCredentials {
                account_sid,
                auth_token,
            }),
            _ => None,
        };

        let meta = match (env("META_APP_ID"), env("META_APP_SECRET")) {
            (Some(app_id), Some(app_secret)) => Some(MetaCredentials { app_id, app_secret }),
            _ => None,
        };

        Self {
            public_base_url: env("COURIER_PUBLIC_URL"),
            database_path: env("COURIER_DB_PATH").map(PathBuf::from),
            session_secret: env("COURIER_SESSION_SECRET"),
            twilio,
            meta,
            meta_verify_token: env("META_WEBHOOK_VERIFY_TOKEN"),
        }
    }

    /// Master Twilio credentials, or `ServerConfig` if unset.
    pub fn twilio(&self) -> Result<&TwilioCredentials> {
        self.twilio
            .as_ref()
            .ok_or_else(|| Error::ServerConfig("TWILIO_ACCOUNT_SID / TWILIO_AUTH_TOKEN".into()))
    }

    /// Meta app credentials, or `ServerConfig` if unset.
    pub fn meta(&self) -> Result<&MetaCredentials> {
        self.meta
            .as_ref()
            .ok_or_else(|| Error::ServerConfig("META_APP_ID / META_APP_SECRET".into()))
    }

    /// The public base URL with a scheme, or `ServerConfig` if unset.
    pub fn app_url(&self) -> Result<String> {
        self.public_base_url
            .as_deref()
            .map(ensure_scheme)
            .ok_or_else(|| Error::ServerConfig("COURIER_PUBLIC_URL".into()))
    }

    /// The inbound Twilio webhook URL for a given base, defaulting to the
    /// configured public base URL. `None` when no base is known: numbers are
    /// then purchased without inbound routing until reconfigured.
    pub fn twilio_webhook_url(&self, base_override: Option<&str>) -> Option<String> {
        base_override
            .or(self.public_base_url.as_deref())
            .map(|base| format!("{}/api/twilio/webhook", ensure_scheme(base)))
    }
}

fn ensure_scheme(base: &str) -> String {
    if base.starts_with("http://") || base.starts_with("https://") {
        base.trim_end_matches('/').to_string()
    } else {
        format!("https://{}", base.trim_end_matches('/'))
    }
}
