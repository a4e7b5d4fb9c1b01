//! Inbound Twilio webhook.
//!
//! Twilio retries deliveries that receive an error status, so this endpoint
//! acknowledges with an empty TwiML document and a 200 in every case; all
//! internal failures are logged and swallowed in the messaging service.

use axum::Form;
use axum::extract::State;
use axum::extract::rejection::FormRejection;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use tracing::warn;

use crate::services::InboundEvent;

use super::AppState;

/// The acknowledgment Twilio expects: no reply instructions.
const EMPTY_TWIML: &str = r#"<?xml version="1.0" encoding="UTF-8"?><Response></Response>"#;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct TwilioWebhookForm {
    #[serde(rename = "MessageSid")]
    pub message_sid: String,
    #[serde(rename = "From")]
    pub from: String,
    #[serde(rename = "To")]
    pub to: String,
    #[serde(rename = "Body")]
    pub body: String,
    #[serde(rename = "AccountSid")]
    pub account_sid: String,
}

fn ack() -> Response {
    ([(header::CONTENT_TYPE, "text/xml")], EMPTY_TWIML).into_response()
}

/// `POST /api/twilio/webhook`
pub async fn receive(
    State(state): State<AppState>,
    payload: Result<Form<TwilioWebhookForm>, FormRejection>,
) -> Response {
    let Ok(Form(form)) = payload else {
        warn!("Unparseable webhook payload, acknowledging anyway");
        return ack();
    };

    if form.message_sid.is_empty() || form.from.is_empty() || form.to.is_empty() {
        warn!("Webhook delivery missing required fields, acknowledging anyway");
        return ack();
    }

    state
        .messaging
        .record_inbound(&InboundEvent {
            message_sid: form.message_sid,
            from: form.from,
            to: form.to,
            body: form.body,
        })
        .await;

    ack()
}
