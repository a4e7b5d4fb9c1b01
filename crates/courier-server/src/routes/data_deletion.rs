//! Meta user-data deletion callback.

use axum::Form;
use axum::extract::State;
use axum::extract::rejection::FormRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;

use super::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DeletionForm {
    pub signed_request: String,
}

/// `POST /api/user-data-deletion`
///
/// A missing or invalid `signed_request` is the only rejection (400); a
/// verified request is always answered with a status URL and confirmation
/// code, whether or not anything matched.
pub async fn handle(
    State(state): State<AppState>,
    payload: Result<Form<DeletionForm>, FormRejection>,
) -> Response {
    let signed_request = match &payload {
        Ok(Form(form)) if !form.signed_request.is_empty() => &form.signed_request,
        _ => {
            return (
                StatusCode::BAD_REQUEST,
                axum::Json(serde_json::json!({ "error": "Missing signed_request" })),
            )
                .into_response();
        }
    };

    match state.meta.process_erasure(signed_request).await {
        Ok(receipt) => axum::Json(receipt).into_response(),
        Err(_) => (
            StatusCode::BAD_REQUEST,
            axum::Json(serde_json::json!({ "error": "Invalid signed request" })),
        )
            .into_response(),
    }
}
