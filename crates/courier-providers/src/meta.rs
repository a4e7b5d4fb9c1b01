//! Meta Graph API client.
//!
//! Covers the page-linking OAuth flow: the authorization dialog URL, the
//! code-for-token exchange, page enumeration, and the best-effort Instagram
//! business-account probes.

use serde::Deserialize;
use tracing::debug;

use crate::ProviderError;

const DEFAULT_GRAPH_URL: &str = "https://graph.facebook.com";
const DEFAULT_DIALOG_URL: &str = "https://www.facebook.com";
const GRAPH_VERSION: &str = "v22.0";

/// OAuth scopes requested when linking pages.
const OAUTH_SCOPES: &[&str] = &[
    "pages_show_list",
    "pages_messaging",
    "pages_manage_metadata",
    "instagram_business_manage_messages",
    "instagram_business_basic",
];

/// A Facebook Page the user administers.
#[derive(Debug, Clone, Deserialize)]
pub struct Page {
    pub id: String,
    pub name: String,
    pub access_token: String,
    /// Tasks the user may perform on the page; messaging support requires
    /// `MESSAGING`.
    #[serde(default)]
    pub tasks: Vec<String>,
}

impl Page {
    pub fn can_message(&self) -> bool {
        self.tasks.iter().any(|t| t == "MESSAGING")
    }
}

#[derive(Debug, Deserialize)]
struct GraphErrorBody {
    error: GraphErrorDetail,
}

#[derive(Debug, Deserialize)]
struct GraphErrorDetail {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct MeResponse {
    id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PagesResponse {
    #[serde(default)]
    data: Vec<Page>,
}

#[derive(Debug, Deserialize)]
struct InstagramAccountField {
    instagram_business_account: Option<IdObject>,
}

#[derive(Debug, Deserialize)]
struct IdObject {
    id: String,
}

#[derive(Debug, Deserialize)]
struct UsernameField {
    username: Option<String>,
}

/// Client for the Meta Graph API.
#[derive(Debug, Clone)]
pub struct GraphClient {
    http: reqwest::Client,
    graph_url: String,
    dialog_url: String,
}

impl Default for GraphClient {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphClient {
    pub fn new() -> Self {
        Self::with_base_urls(DEFAULT_GRAPH_URL, DEFAULT_DIALOG_URL)
    }

    /// Construct against non-default hosts (tests point these at a mock).
    pub fn with_base_urls(graph_url: impl Into<String>, dialog_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            graph_url: graph_url.into().trim_end_matches('/').to_string(),
            dialog_url: dialog_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// The OAuth dialog URL the browser is redirected to when linking starts.
    pub fn authorize_url(&self, app_id: &str, redirect_uri: &str) -> String {
        let base = format!("{}/{}/dialog/oauth", self.dialog_url, GRAPH_VERSION);
        let url = reqwest::Url::parse_with_params(
            &base,
            &[
                ("client_id", app_id),
                ("redirect_uri", redirect_uri),
                ("scope", &OAUTH_SCOPES.join(",")),
                ("response_type", "code"),
            ],
        );
        // The base is a constant; parsing cannot fail on it.
        url.map_or_else(|_| base, |u| u.to_string())
    }

    /// Exchange an authorization code for a user access token.
    pub async fn exchange_code(
        &self,
        app_id: &str,
        app_secret: &str,
        redirect_uri: &str,
        code: &str,
    ) -> Result<String, ProviderError> {
        let url = format!("{}/{}/oauth/access_token", self.graph_url, GRAPH_VERSION);
        let token: TokenResponse = self
            .get(&url, &[
                ("client_id", app_id),
                ("client_secret", app_secret),
                ("redirect_uri", redirect_uri),
                ("code", code),
            ])
            .await?;
        debug!("Meta code exchange complete");
        Ok(token.access_token)
    }

    /// The caller's Facebook user id, used later to honor erasure requests.
    pub async fn fetch_user_id(&self, access_token: &str) -> Result<Option<String>, ProviderError> {
        let url = format!("{}/{}/me", self.graph_url, GRAPH_VERSION);
        let me: MeResponse = self
            .get(&url, &[("fields", "id"), ("access_token", access_token)])
            .await?;
        Ok(me.id)
    }

    /// All pages the user administers, with page tokens and task lists.
    pub async fn list_pages(&self, access_token: &str) -> Result<Vec<Page>, ProviderError> {
        let url = format!("{}/{}/me/accounts", self.graph_url, GRAPH_VERSION);
        let pages: PagesResponse = self
            .get(&url, &[
                ("fields", "id,name,access_token,tasks"),
                ("access_token", access_token),
            ])
            .await?;
        Ok(pages.data)
    }

    /// The Instagram business account linked to a page, when one exists.
    pub async fn instagram_business_account(
        &self,
        page_id: &str,
        page_token: &str,
    ) -> Result<Option<String>, ProviderError> {
        let url = format!("{}/{}/{}", self.graph_url, GRAPH_VERSION, page_id);
        let field: InstagramAccountField = self
            .get(&url, &[
                ("fields", "instagram_business_account"),
                ("access_token", page_token),
            ])
            .await?;
        Ok(field.instagram_business_account.map(|o| o.id))
    }

    /// The username of an Instagram business account.
    pub async fn instagram_username(
        &self,
        instagram_account_id: &str,
        page_token: &str,
    ) -> Result<Option<String>, ProviderError> {
        let url = format!(
            "{}/{}/{}",
            self.graph_url, GRAPH_VERSION, instagram_account_id
        );
        let field: UsernameField = self
            .get(&url, &[("fields", "username"), ("access_token", page_token)])
            .await?;
        Ok(field.username)
    }

    /// GET with query params; a Graph `{"error": ...}` body is an API error
    /// whatever the HTTP status says.
    async fn get<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<T, ProviderError> {
        let response = self
            .http
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| ProviderError::Request(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::Request(e.to_string()))?;

        if let Ok(err) = serde_json::from_str::<GraphErrorBody>(&body) {
            return Err(ProviderError::Api {
                status: status.as_u16(),
                message: err.error.message,
            });
        }
        if !status.is_success() {
            return Err(ProviderError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        serde_json::from_str(&body)
            .map_err(|e| ProviderError::Request(format!("unexpected response body: {e}")))
    }
}
