//! Meta OAuth flow: start redirect and callback.
//!
//! Every callback terminal is a redirect back to the dashboard with a coarse
//! flag; the browser never sees an underlying error.

use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Redirect, Response};
use serde::Deserialize;
use tracing::warn;

use crate::auth::session_user;

use super::AppState;

const DASHBOARD_PATH: &str = "/dashboard/chat";

/// `GET /api/auth/meta` — send the browser to the Facebook OAuth dialog.
pub async fn start(State(state): State<AppState>) -> Response {
    let Ok(creds) = state.config.meta() else {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            axum::Json(serde_json::json!({ "error": "META_APP_ID is not configured" })),
        )
            .into_response();
    };
    let Some(redirect_uri) = state.meta.redirect_uri() else {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            axum::Json(serde_json::json!({ "error": "COURIER_PUBLIC_URL is not configured" })),
        )
            .into_response();
    };

    Redirect::temporary(&state.graph.authorize_url(&creds.app_id, &redirect_uri)).into_response()
}

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub error: Option<String>,
}

fn to_dashboard(flag: &str, value: &str) -> Redirect {
    Redirect::to(&format!("{DASHBOARD_PATH}?{flag}={value}"))
}

/// `GET /api/auth/meta/callback`
pub async fn callback(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<CallbackQuery>,
) -> Redirect {
    // A provider-reported denial short-circuits before any exchange.
    if let Some(error) = &query.error {
        warn!(error, "Meta OAuth denied");
        return to_dashboard("meta_error", error);
    }

    let Some(code) = &query.code else {
        return to_dashboard("meta_error", "missing_code");
    };

    if state.config.meta().is_err() {
        return to_dashboard("meta_error", "server_config");
    }

    let Some(user_id) = session_user(state.verifier.as_ref(), &headers) else {
        return to_dashboard("meta_error", "not_authenticated");
    };

    match state.meta.handle_callback(&user_id, code).await {
        Ok(_) => to_dashboard("meta_connected", "true"),
        Err(failure) => to_dashboard("meta_error", failure.flag()),
    }
}
