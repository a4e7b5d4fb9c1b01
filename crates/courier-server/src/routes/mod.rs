//! HTTP surface of the Courier server.

pub mod api;
pub mod data_deletion;
pub mod meta_oauth;
pub mod meta_webhook;
pub mod twilio_webhook;

use std::sync::Arc;

use axum::Router;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use courier_core::{Config, Error};
use courier_providers::GraphClient;
use tower_http::trace::TraceLayer;

use crate::auth::SessionVerifier;
use crate::services::{LinkingService, MessagingService, MetaLinkService};
use crate::storage::Database;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub db: Database,
    pub linking: LinkingService,
    pub messaging: MessagingService,
    pub meta: MetaLinkService,
    pub graph: GraphClient,
    pub verifier: Option<SessionVerifier>,
}

impl AppState {
    /// State against the real provider hosts.
    pub fn new(db: Database, config: Arc<Config>) -> Self {
        Self::with_provider_hosts(db, config, "https://api.twilio.com", GraphClient::new())
    }

    /// State with injectable provider hosts (tests point these at mocks).
    pub fn with_provider_hosts(
        db: Database,
        config: Arc<Config>,
        twilio_base_url: impl Into<String>,
        graph: GraphClient,
    ) -> Self {
        let twilio_base_url = twilio_base_url.into();
        let verifier = config
            .session_secret
            .as_deref()
            .map(|secret| SessionVerifier::new(secret.as_bytes()));

        Self {
            linking: LinkingService::with_twilio_base_url(
                db.clone(),
                Arc::clone(&config),
                twilio_base_url.clone(),
            ),
            messaging: MessagingService::with_twilio_base_url(db.clone(), twilio_base_url),
            meta: MetaLinkService::new(db.clone(), Arc::clone(&config), graph.clone()),
            graph,
            verifier,
            config,
            db,
        }
    }
}

/// Build the Courier router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        // Provider-facing endpoints (no session).
        .route("/api/twilio/webhook", post(twilio_webhook::receive))
        .route(
            "/api/meta/webhook",
            get(meta_webhook::verify).post(meta_webhook::receive),
        )
        .route("/api/user-data-deletion", post(data_deletion::handle))
        // OAuth redirect flow.
        .route("/api/auth/meta", get(meta_oauth::start))
        .route("/api/auth/meta/callback", get(meta_oauth::callback))
        // Authenticated dashboard API.
        .route(
            "/api/account",
            get(api::get_account).post(api::create_account),
        )
        .route(
            "/api/numbers",
            get(api::list_numbers).post(api::purchase_number),
        )
        .route("/api/numbers/search", get(api::search_numbers))
        .route("/api/meta/accounts", get(api::list_meta_accounts))
        .route(
            "/api/numbers/{id}/webhook",
            post(api::update_number_webhook),
        )
        .route(
            "/api/conversations",
            get(api::list_conversations).post(api::create_conversation),
        )
        .route(
            "/api/conversations/{id}/messages",
            get(api::list_messages).post(api::send_message),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Map a service error onto an HTTP response. Internal failure detail never
/// leaves the server.
pub(crate) fn error_response(err: &Error) -> Response {
    let (status, message) = match err {
        Error::NotAuthenticated => (StatusCode::UNAUTHORIZED, err.to_string()),
        Error::NotFound(_) => (StatusCode::NOT_FOUND, err.to_string()),
        Error::AlreadyLinked => (StatusCode::CONFLICT, err.to_string()),
        Error::NotLinked | Error::Validation(_) => (StatusCode::BAD_REQUEST, err.to_string()),
        Error::Provider(_) => (StatusCode::BAD_GATEWAY, err.to_string()),
        Error::ServerConfig(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Server configuration error".to_string(),
        ),
        Error::Database(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal error".to_string())
        }
    };

    (
        status,
        axum::Json(serde_json::json!({ "error": message })),
    )
        .into_response()
}
