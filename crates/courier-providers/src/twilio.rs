//! Twilio REST API client.
//!
//! Form-encoded requests with HTTP basic auth against the 2010-04-01 API.
//! A master client (platform credentials) creates sub-accounts; all other
//! calls run under a sub-account's own credentials via [`TwilioClient::subaccount`].

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::ProviderError;

const API_VERSION: &str = "2010-04-01";

/// A created or fetched Twilio (sub-)account.
#[derive(Debug, Clone, Deserialize)]
pub struct Subaccount {
    pub sid: String,
    pub auth_token: String,
    pub friendly_name: String,
}

/// A purchasable number returned by the availability search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailableNumber {
    pub phone_number: String,
    #[serde(default)]
    pub friendly_name: String,
    #[serde(default)]
    pub locality: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AvailableNumbersPage {
    #[serde(default)]
    available_phone_numbers: Vec<AvailableNumber>,
}

/// Capability flags on a provisioned number.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct Capabilities {
    #[serde(default)]
    pub sms: bool,
    #[serde(default)]
    pub voice: bool,
    #[serde(default)]
    pub mms: bool,
}

/// A number provisioned on a sub-account.
#[derive(Debug, Clone, Deserialize)]
pub struct IncomingNumber {
    pub sid: String,
    pub phone_number: String,
    #[serde(default)]
    pub friendly_name: String,
    #[serde(default)]
    pub capabilities: Capabilities,
}

/// An accepted outbound message.
#[derive(Debug, Clone, Deserialize)]
pub struct OutboundMessage {
    pub sid: String,
    pub status: String,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: Option<String>,
}

/// Client for the Twilio REST API, bound to one account's credentials.
#[derive(Debug, Clone)]
pub struct TwilioClient {
    http: reqwest::Client,
    base_url: String,
    account_sid: String,
    auth_token: String,
}

impl TwilioClient {
    /// Construct against an API host (production passes the real one, tests
    /// point this at a mock).
    pub fn with_base_url(
        base_url: impl Into<String>,
        account_sid: impl Into<String>,
        auth_token: impl Into<String>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            account_sid: account_sid.into(),
            auth_token: auth_token.into(),
        }
    }

    /// A client bound to a sub-account's credentials, on the same host.
    pub fn subaccount(&self, sid: impl Into<String>, auth_token: impl Into<String>) -> Self {
        Self {
            http: self.http.clone(),
            base_url: self.base_url.clone(),
            account_sid: sid.into(),
            auth_token: auth_token.into(),
        }
    }

    /// Create a sub-account under this (master) account.
    pub async fn create_subaccount(
        &self,
        friendly_name: &str,
    ) -> Result<Subaccount, ProviderError> {
        let url = format!("{}/{}/Accounts.json", self.base_url, API_VERSION);
        self.post_form(&url, &[("FriendlyName", friendly_name)])
            .await
    }

    /// Search purchasable local numbers in a country, optionally filtered by
    /// area code. SMS and voice capability are always required.
    pub async fn search_local_numbers(
        &self,
        country: &str,
        area_code: Option<&str>,
    ) -> Result<Vec<AvailableNumber>, ProviderError> {
        let url = format!(
            "{}/{}/Accounts/{}/AvailablePhoneNumbers/{}/Local.json",
            self.base_url, API_VERSION, self.account_sid, country
        );

        let mut query = vec![("SmsEnabled", "true"), ("VoiceEnabled", "true")];
        if let Some(area) = area_code {
            query.push(("AreaCode", area));
        }

        let response = self
            .http
            .get(&url)
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .query(&query)
            .send()
            .await
            .map_err(|e| ProviderError::Request(e.to_string()))?;

        let page: AvailableNumbersPage = Self::decode(response).await?;
        debug!(count = page.available_phone_numbers.len(), country, "Number search complete");
        Ok(page.available_phone_numbers)
    }

    /// Purchase a number, attaching the inbound SMS webhook when a URL is
    /// supplied. Twilio remembers the URL for all future deliveries.
    pub async fn purchase_number(
        &self,
        phone_number: &str,
        sms_url: Option<&str>,
    ) -> Result<IncomingNumber, ProviderError> {
        let url = format!(
            "{}/{}/Accounts/{}/IncomingPhoneNumbers.json",
            self.base_url, API_VERSION, self.account_sid
        );

        let mut form = vec![("PhoneNumber", phone_number)];
        if let Some(webhook) = sms_url {
            form.push(("SmsUrl", webhook));
            form.push(("SmsMethod", "POST"));
        }

        self.post_form(&url, &form).await
    }

    /// Point an already-purchased number's inbound SMS webhook elsewhere.
    pub async fn update_sms_url(
        &self,
        phone_sid: &str,
        sms_url: &str,
    ) -> Result<IncomingNumber, ProviderError> {
        let url = format!(
            "{}/{}/Accounts/{}/IncomingPhoneNumbers/{}.json",
            self.base_url, API_VERSION, self.account_sid, phone_sid
        );

        self.post_form(&url, &[("SmsUrl", sms_url), ("SmsMethod", "POST")])
            .await
    }

    /// Send a message. Addresses must already carry any channel tag.
    pub async fn send_message(
        &self,
        from: &str,
        to: &str,
        body: &str,
    ) -> Result<OutboundMessage, ProviderError> {
        let url = format!(
            "{}/{}/Accounts/{}/Messages.json",
            self.base_url, API_VERSION, self.account_sid
        );

        self.post_form(&url, &[("From", from), ("To", to), ("Body", body)])
            .await
    }

    async fn post_form<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        form: &[(&str, &str)],
    ) -> Result<T, ProviderError> {
        let response = self
            .http
            .post(url)
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(form)
            .send()
            .await
            .map_err(|e| ProviderError::Request(e.to_string()))?;

        Self::decode(response).await
    }

    /// Decode a success body, or surface Twilio's `message` field on error.
    async fn decode<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ProviderError> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::Request(e.to_string()))?;

        if !status.is_success() {
            let message = serde_json::from_str::<ApiErrorBody>(&body)
                .ok()
                .and_then(|e| e.message)
                .unwrap_or(body);
            return Err(ProviderError::Api {
                status: status.as_u16(),
                message,
            });
        }

        serde_json::from_str(&body).map_err(|e| ProviderError::Request(format!(
            "unexpected response body: {e}"
        )))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use httpmock::prelude::*;

    use super::*;

    fn client(server: &MockServer) -> TwilioClient {
        TwilioClient::with_base_url(server.base_url(), "ACmaster", "master-token")
    }

    #[tokio::test]
    async fn create_subaccount_posts_friendly_name() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/2010-04-01/Accounts.json")
                    .body_includes("FriendlyName=User-abc12345");
                then.status(201).json_body(serde_json::json!({
                    "sid": "ACsub",
                    "auth_token": "sub-token",
                    "friendly_name": "User-abc12345",
                }));
            })
            .await;

        let account = client(&server)
            .create_subaccount("User-abc12345")
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(account.sid, "ACsub");
        assert_eq!(account.auth_token, "sub-token");
    }

    #[tokio::test]
    async fn search_sends_capability_filters() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/2010-04-01/Accounts/ACmaster/AvailablePhoneNumbers/US/Local.json")
                    .query_param("SmsEnabled", "true")
                    .query_param("VoiceEnabled", "true")
                    .query_param("AreaCode", "415");
                then.status(200).json_body(serde_json::json!({
                    "available_phone_numbers": [
                        { "phone_number": "+14155550100", "friendly_name": "(415) 555-0100" },
                        { "phone_number": "+14155550101", "friendly_name": "(415) 555-0101" },
                    ]
                }));
            })
            .await;

        let numbers = client(&server)
            .search_local_numbers("US", Some("415"))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(numbers.len(), 2);
        assert_eq!(numbers[0].phone_number, "+14155550100");
    }

    #[tokio::test]
    async fn purchase_attaches_webhook_when_present() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/2010-04-01/Accounts/ACmaster/IncomingPhoneNumbers.json")
                    .body_includes("SmsMethod=POST");
                then.status(201).json_body(serde_json::json!({
                    "sid": "PN123",
                    "phone_number": "+15551234567",
                    "friendly_name": "(555) 123-4567",
                    "capabilities": { "sms": true, "voice": true, "mms": false },
                }));
            })
            .await;

        let number = client(&server)
            .purchase_number(
                "+15551234567",
                Some("https://app.example.com/api/twilio/webhook"),
            )
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(number.sid, "PN123");
        assert!(number.capabilities.sms);
        assert!(!number.capabilities.mms);
    }

    #[tokio::test]
    async fn send_message_returns_sid_and_status() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/2010-04-01/Accounts/ACsub/Messages.json")
                    .body_includes("Body=hello");
                then.status(201).json_body(serde_json::json!({
                    "sid": "SM900",
                    "status": "queued",
                }));
            })
            .await;

        let sub = client(&server).subaccount("ACsub", "sub-token");
        let message = sub
            .send_message("+15551234567", "+15559876543", "hello")
            .await
            .unwrap();

        assert_eq!(message.sid, "SM900");
        assert_eq!(message.status, "queued");
    }

    #[tokio::test]
    async fn provider_message_surfaces_on_rejection() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST);
                then.status(400).json_body(serde_json::json!({
                    "code": 21608,
                    "message": "The number is unverified",
                }));
            })
            .await;

        let err = client(&server)
            .send_message("+1555", "+1556", "hi")
            .await
            .unwrap_err();

        match err {
            ProviderError::Api { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "The number is unverified");
            }
            other => panic!("expected Api error, got {other}"),
        }
    }
}
