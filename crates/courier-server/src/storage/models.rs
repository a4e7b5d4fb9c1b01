//! Data models for Courier storage.

use serde::{Deserialize, Serialize};

/// A Twilio sub-account linked to one user. At most one per user.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct TwilioAccount {
    pub id: String,
    pub user_id: String,
    pub account_sid: String,
    /// Sub-account secret; never serialized into API responses.
    #[serde(skip_serializing, default)]
    pub auth_token: String,
    pub friendly_name: String,
    pub created_at: i64,
}

/// A purchased phone number owned by one sub-account.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PhoneNumber {
    pub id: String,
    pub user_id: String,
    pub twilio_account_id: String,
    pub phone_number: String,
    pub phone_sid: String,
    pub friendly_name: String,
    pub sms_enabled: i64,
    pub voice_enabled: i64,
    pub mms_enabled: i64,
    pub created_at: i64,
}

/// One conversation per (user, phone number, counterpart, channel) tuple.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Conversation {
    pub id: String,
    pub user_id: String,
    pub phone_number_id: String,
    /// Counterpart address, stored without any channel tag.
    pub contact_phone: String,
    pub contact_name: Option<String>,
    pub channel: String,
    pub last_message_at: Option<i64>,
    pub created_at: i64,
}

/// A conversation joined with its number and latest message preview, for the
/// inbox listing.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ConversationSummary {
    pub id: String,
    pub user_id: String,
    pub phone_number_id: String,
    pub contact_phone: String,
    pub contact_name: Option<String>,
    pub channel: String,
    pub last_message_at: Option<i64>,
    pub created_at: i64,
    pub phone_number: String,
    pub last_body: Option<String>,
    pub last_direction: Option<String>,
}

/// An immutable message row in a conversation's ledger.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Message {
    pub id: String,
    pub user_id: String,
    pub conversation_id: String,
    pub twilio_message_sid: String,
    pub direction: String,
    pub body: String,
    pub status: String,
    pub created_at: i64,
}

/// A linked Meta page (and optionally its Instagram business profile).
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct MetaAccount {
    pub id: String,
    pub user_id: String,
    pub platform: String,
    pub page_id: String,
    pub page_name: String,
    /// Page access token; never serialized into API responses.
    #[serde(skip_serializing, default)]
    pub access_token: String,
    pub facebook_user_id: Option<String>,
    pub instagram_account_id: Option<String>,
    pub instagram_username: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}
