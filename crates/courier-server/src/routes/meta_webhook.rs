//! Meta webhook: subscription verification handshake and event intake.
//!
//! Messenger/Instagram message persistence is future work; events are
//! resolved to a linked page and logged. Meta, like Twilio, must always see
//! a success acknowledgment for a delivery it already made.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use serde_json::Value;
use tracing::{info, warn};

use super::AppState;

#[derive(Debug, Deserialize)]
pub struct VerifyQuery {
    #[serde(rename = "hub.mode")]
    pub mode: Option<String>,
    #[serde(rename = "hub.verify_token")]
    pub verify_token: Option<String>,
    #[serde(rename = "hub.challenge")]
    pub challenge: Option<String>,
}

/// `GET /api/meta/webhook` — echo the challenge iff the shared token matches.
pub async fn verify(State(state): State<AppState>, Query(query): Query<VerifyQuery>) -> Response {
    let token_matches = match (&state.config.meta_verify_token, &query.verify_token) {
        (Some(expected), Some(presented)) => expected == presented,
        _ => false,
    };

    if query.mode.as_deref() == Some("subscribe") && token_matches {
        return (StatusCode::OK, query.challenge.unwrap_or_default()).into_response();
    }

    (StatusCode::FORBIDDEN, "Forbidden").into_response()
}

fn ack() -> Response {
    axum::Json(serde_json::json!({ "received": true })).into_response()
}

/// `POST /api/meta/webhook`
pub async fn receive(
    State(state): State<AppState>,
    payload: Result<axum::Json<Value>, JsonRejection>,
) -> Response {
    let Ok(axum::Json(body)) = payload else {
        warn!("Unparseable Meta webhook payload, acknowledging anyway");
        return ack();
    };

    let object = body.get("object").and_then(Value::as_str);
    if object != Some("page") && object != Some("instagram") {
        return ack();
    }

    for entry in body
        .get("entry")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
    {
        let page_id = entry.get("id").and_then(Value::as_str).unwrap_or_default();

        for event in entry
            .get("messaging")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
        {
            let sender_id = event
                .pointer("/sender/id")
                .and_then(Value::as_str)
                .unwrap_or_default();

            if let Some(message) = event.get("message") {
                let text = message.get("text").and_then(Value::as_str).unwrap_or("");
                match state.db.find_meta_account_by_page(page_id).await {
                    Ok(Some(account)) => {
                        info!(
                            page_id,
                            sender_id,
                            user_id = %account.user_id,
                            text,
                            "Meta message event received"
                        );
                    }
                    Ok(None) => {
                        warn!(page_id, "Meta event for unlinked page, dropping");
                    }
                    Err(e) => {
                        warn!(page_id, error = %e, "Meta account lookup failed");
                    }
                }
            }

            if event.get("postback").is_some() {
                info!(page_id, sender_id, "Meta postback event received");
            }
        }
    }

    ack()
}
