//! Authenticated JSON API backing the dashboard.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use courier_core::Channel;
use serde::Deserialize;

use crate::auth::AuthUser;

use super::{AppState, error_response};

/// Presentation-layer cap on number-search results.
const SEARCH_RESULT_CAP: usize = 10;

/// `POST /api/account` — link a sub-account for the caller.
pub async fn create_account(State(state): State<AppState>, AuthUser(user): AuthUser) -> Response {
    match state.linking.create_sub_account(&user).await {
        Ok(account) => (StatusCode::CREATED, axum::Json(account)).into_response(),
        Err(e) => error_response(&e),
    }
}

/// `GET /api/account`
pub async fn get_account(State(state): State<AppState>, AuthUser(user): AuthUser) -> Response {
    match state.linking.get_account(&user).await {
        Ok(account) => axum::Json(account).into_response(),
        Err(e) => error_response(&e),
    }
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub country: Option<String>,
    pub area_code: Option<String>,
}

/// `GET /api/numbers/search?country=US&area_code=415`
pub async fn search_numbers(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Query(query): Query<SearchQuery>,
) -> Response {
    let country = query.country.as_deref().unwrap_or("US");
    match state
        .linking
        .search_numbers(&user, country, query.area_code.as_deref())
        .await
    {
        Ok(mut numbers) => {
            numbers.truncate(SEARCH_RESULT_CAP);
            axum::Json(numbers).into_response()
        }
        Err(e) => error_response(&e),
    }
}

#[derive(Debug, Deserialize)]
pub struct PurchaseRequest {
    pub phone_number: String,
    /// Overrides the configured public base URL for the inbound webhook.
    pub webhook_base_url: Option<String>,
}

/// `POST /api/numbers`
pub async fn purchase_number(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    axum::Json(request): axum::Json<PurchaseRequest>,
) -> Response {
    match state
        .linking
        .purchase_number(
            &user,
            &request.phone_number,
            request.webhook_base_url.as_deref(),
        )
        .await
    {
        Ok(number) => (StatusCode::CREATED, axum::Json(number)).into_response(),
        Err(e) => error_response(&e),
    }
}

/// `GET /api/numbers`
pub async fn list_numbers(State(state): State<AppState>, AuthUser(user): AuthUser) -> Response {
    match state.linking.list_numbers(&user).await {
        Ok(numbers) => axum::Json(numbers).into_response(),
        Err(e) => error_response(&e),
    }
}

#[derive(Debug, Deserialize)]
pub struct WebhookUpdateRequest {
    pub webhook_url: String,
}

/// `POST /api/numbers/{id}/webhook`
pub async fn update_number_webhook(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(number_id): Path<String>,
    axum::Json(request): axum::Json<WebhookUpdateRequest>,
) -> Response {
    match state
        .linking
        .update_number_webhook(&user, &number_id, &request.webhook_url)
        .await
    {
        Ok(()) => axum::Json(serde_json::json!({ "success": true })).into_response(),
        Err(e) => error_response(&e),
    }
}

/// `GET /api/meta/accounts` — the caller's linked pages.
pub async fn list_meta_accounts(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Response {
    match state.meta.list_accounts(&user).await {
        Ok(accounts) => axum::Json(accounts).into_response(),
        Err(e) => error_response(&e),
    }
}

/// `GET /api/conversations`
pub async fn list_conversations(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Response {
    match state.messaging.list_conversations(&user).await {
        Ok(conversations) => axum::Json(conversations).into_response(),
        Err(e) => error_response(&e),
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateConversationRequest {
    pub phone_number_id: String,
    pub contact_phone: String,
    pub contact_name: Option<String>,
    pub channel: Channel,
}

/// `POST /api/conversations`
pub async fn create_conversation(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    axum::Json(request): axum::Json<CreateConversationRequest>,
) -> Response {
    match state
        .messaging
        .start_conversation(
            &user,
            &request.phone_number_id,
            &request.contact_phone,
            request.channel,
            request.contact_name.as_deref(),
        )
        .await
    {
        Ok(conversation) => (StatusCode::CREATED, axum::Json(conversation)).into_response(),
        Err(e) => error_response(&e),
    }
}

/// `GET /api/conversations/{id}/messages`
pub async fn list_messages(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(conversation_id): Path<String>,
) -> Response {
    match state.messaging.list_messages(&user, &conversation_id).await {
        Ok(messages) => axum::Json(messages).into_response(),
        Err(e) => error_response(&e),
    }
}

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub body: String,
}

/// `POST /api/conversations/{id}/messages` — outbound dispatch.
pub async fn send_message(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(conversation_id): Path<String>,
    axum::Json(request): axum::Json<SendMessageRequest>,
) -> Response {
    match state
        .messaging
        .send_message(&user, &conversation_id, &request.body)
        .await
    {
        Ok(message) => (StatusCode::CREATED, axum::Json(message)).into_response(),
        Err(e) => error_response(&e),
    }
}
