//! Meta page-linking service: OAuth callback orchestration and the signed
//! data-erasure flow.

use std::sync::Arc;

use courier_core::db::unix_timestamp;
use courier_core::signed_request::parse_signed_request;
use courier_core::Config;
use courier_providers::GraphClient;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::storage::{Database, MetaAccount, MetaAccountParams};

/// Terminal failure of the linking callback, one per redirect flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkFailure {
    ServerConfig,
    TokenExchange,
    NoPages,
    Unknown,
}

impl LinkFailure {
    /// The `meta_error` query value the dashboard receives.
    pub const fn flag(self) -> &'static str {
        match self {
            Self::ServerConfig => "server_config",
            Self::TokenExchange => "token_exchange",
            Self::NoPages => "no_pages",
            Self::Unknown => "unknown",
        }
    }
}

/// Receipt returned to Meta for a deletion request, match or not.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ErasureReceipt {
    pub url: String,
    pub confirmation_code: String,
}

/// Rejection of a deletion request before any processing.
#[derive(Debug, thiserror::Error)]
pub enum ErasureError {
    #[error("Invalid signed request")]
    InvalidSignedRequest,
}

#[derive(Clone)]
pub struct MetaLinkService {
    db: Database,
    config: Arc<Config>,
    graph: GraphClient,
}

impl MetaLinkService {
    pub fn new(db: Database, config: Arc<Config>, graph: GraphClient) -> Self {
        Self { db, config, graph }
    }

    /// The user's linked pages, for the connected-accounts view.
    pub async fn list_accounts(&self, user_id: &str) -> courier_core::Result<Vec<MetaAccount>> {
        Ok(self.db.list_meta_accounts(user_id).await?)
    }

    /// The redirect URI registered with the Meta app.
    pub fn redirect_uri(&self) -> Option<String> {
        self.config
            .app_url()
            .ok()
            .map(|base| format!("{base}/api/auth/meta/callback"))
    }

    /// Complete the OAuth flow for an authenticated user: exchange the code,
    /// enumerate messaging-capable pages, probe Instagram links, and upsert
    /// one linked-account row per page.
    ///
    /// Failing to enumerate any page is fatal; failing to find an Instagram
    /// profile on one page is not — that page is linked with null profile
    /// fields.
    pub async fn handle_callback(
        &self,
        user_id: &str,
        code: &str,
    ) -> Result<usize, LinkFailure> {
        let Ok(creds) = self.config.meta() else {
            return Err(LinkFailure::ServerConfig);
        };
        let Some(redirect_uri) = self.redirect_uri() else {
            return Err(LinkFailure::ServerConfig);
        };

        let user_token = match self
            .graph
            .exchange_code(&creds.app_id, &creds.app_secret, &redirect_uri, code)
            .await
        {
            Ok(token) => token,
            Err(e) => {
                warn!(error = %e, "Meta token exchange failed");
                return Err(LinkFailure::TokenExchange);
            }
        };

        // Best-effort: the Facebook user id only matters for later erasure
        // requests.
        let facebook_user_id = match self.graph.fetch_user_id(&user_token).await {
            Ok(id) => id,
            Err(e) => {
                warn!(error = %e, "Meta user id fetch failed");
                None
            }
        };

        let pages = match self.graph.list_pages(&user_token).await {
            Ok(pages) if !pages.is_empty() => pages,
            Ok(_) => {
                warn!(user_id, "Meta returned no pages");
                return Err(LinkFailure::NoPages);
            }
            Err(e) => {
                warn!(error = %e, "Meta page enumeration failed");
                return Err(LinkFailure::NoPages);
            }
        };

        let mut linked = 0;
        for page in pages.iter().filter(|p| p.can_message()) {
            // A page without a linked Instagram profile is still linked,
            // with those fields null.
            let instagram_account_id = match self
                .graph
                .instagram_business_account(&page.id, &page.access_token)
                .await
            {
                Ok(id) => id,
                Err(e) => {
                    warn!(page_id = %page.id, error = %e, "Instagram probe failed");
                    None
                }
            };
            let instagram_username = match &instagram_account_id {
                Some(ig_id) => self
                    .graph
                    .instagram_username(ig_id, &page.access_token)
                    .await
                    .unwrap_or_else(|e| {
                        warn!(page_id = %page.id, error = %e, "Instagram username fetch failed");
                        None
                    }),
                None => None,
            };

            let upserted = self
                .db
                .upsert_meta_account(&MetaAccountParams {
                    id: &Uuid::new_v4().to_string(),
                    user_id,
                    page_id: &page.id,
                    page_name: &page.name,
                    access_token: &page.access_token,
                    facebook_user_id: facebook_user_id.as_deref(),
                    instagram_account_id: instagram_account_id.as_deref(),
                    instagram_username: instagram_username.as_deref(),
                })
                .await;

            match upserted {
                Ok(_) => linked += 1,
                Err(e) => error!(page_id = %page.id, error = %e, "Meta account upsert failed"),
            }
        }

        info!(user_id, linked, "Meta pages linked");
        Ok(linked)
    }

    /// Process a signed deletion request from Meta.
    ///
    /// A valid signature erases every entity family for every local user
    /// bound to the payload's Facebook user id. The receipt is produced
    /// unconditionally; the external platform is not told whether anything
    /// matched.
    pub async fn process_erasure(
        &self,
        signed_request: &str,
    ) -> Result<ErasureReceipt, ErasureError> {
        let Ok(creds) = self.config.meta() else {
            error!("Erasure request received but META_APP_SECRET is not configured");
            return Err(ErasureError::InvalidSignedRequest);
        };

        let payload = parse_signed_request(signed_request, &creds.app_secret).map_err(|e| {
            warn!(error = %e, "Rejected deletion request");
            ErasureError::InvalidSignedRequest
        })?;
        let facebook_user_id = payload
            .user_id
            .ok_or(ErasureError::InvalidSignedRequest)?;

        let receipt = self.make_receipt();

        match self.db.find_meta_user_ids(&facebook_user_id).await {
            Ok(user_ids) => {
                for user_id in &user_ids {
                    match self.db.erase_user_data(user_id).await {
                        Ok(removed) => {
                            info!(user_id, removed, "User data erased");
                        }
                        Err(e) => error!(user_id, error = %e, "User data erasure failed"),
                    }
                }
                info!(
                    facebook_user_id,
                    users = user_ids.len(),
                    code = %receipt.confirmation_code,
                    "Deletion request processed"
                );
            }
            Err(e) => error!(error = %e, "Deletion request lookup failed"),
        }

        Ok(receipt)
    }

    fn make_receipt(&self) -> ErasureReceipt {
        let base = self
            .config
            .app_url()
            .unwrap_or_else(|_| "https://localhost".to_string());
        let random = Uuid::new_v4().simple().to_string();
        ErasureReceipt {
            url: format!("{base}/user-data-deletion"),
            confirmation_code: format!("del-{}-{}", unix_timestamp(), &random[..6]),
        }
    }
}
