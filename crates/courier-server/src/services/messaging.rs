//! Messaging service: conversation directory access, outbound dispatch, and
//! the inbound webhook core.

use courier_core::db::unix_timestamp;
use courier_core::{Channel, Error, Result};
use courier_providers::TwilioClient;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::storage::{
    AppendMessageParams, Conversation, ConversationSummary, Database, Message,
    ResolveConversationParams,
};

use super::provider_error;

/// A normalized inbound delivery from the Twilio webhook.
#[derive(Debug, Clone)]
pub struct InboundEvent {
    pub message_sid: String,
    pub from: String,
    pub to: String,
    pub body: String,
}

/// Reads and writes conversations and their message ledgers.
#[derive(Clone)]
pub struct MessagingService {
    db: Database,
    twilio_base_url: String,
}

impl MessagingService {
    pub fn with_twilio_base_url(db: Database, base_url: impl Into<String>) -> Self {
        Self {
            db,
            twilio_base_url: base_url.into(),
        }
    }

    /// Open (or find) a conversation from the compose form. The stored
    /// counterpart address is always untagged.
    pub async fn start_conversation(
        &self,
        user_id: &str,
        phone_number_id: &str,
        contact_phone: &str,
        channel: Channel,
        contact_name: Option<&str>,
    ) -> Result<Conversation> {
        if contact_phone.trim().is_empty() {
            return Err(Error::Validation("contact_phone is required".into()));
        }
        self.db
            .get_phone_number(user_id, phone_number_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Phone number {phone_number_id}")))?;

        let conversation = self
            .db
            .resolve_conversation(&ResolveConversationParams {
                id: &Uuid::new_v4().to_string(),
                user_id,
                phone_number_id,
                contact_phone: Channel::strip_tag(contact_phone.trim()),
                channel: channel.as_str(),
                contact_name: contact_name.filter(|n| !n.trim().is_empty()),
            })
            .await?;

        Ok(conversation)
    }

    /// Outbound dispatch: format addresses for the conversation's channel,
    /// send through the sub-account, persist the result, advance recency.
    pub async fn send_message(
        &self,
        user_id: &str,
        conversation_id: &str,
        body: &str,
    ) -> Result<Message> {
        if body.trim().is_empty() {
            return Err(Error::Validation("message body is required".into()));
        }

        let conversation = self
            .db
            .get_conversation(user_id, conversation_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Conversation {conversation_id}")))?;
        let number = self
            .db
            .get_phone_number(user_id, &conversation.phone_number_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Phone number {}", conversation.phone_number_id)))?;
        let account = self
            .db
            .get_twilio_account(user_id)
            .await?
            .ok_or(Error::NotLinked)?;

        // The tag goes on the wire only; stored addresses stay bare.
        let channel: Channel = conversation.channel.parse()?;
        let from = channel.tag(&number.phone_number);
        let to = channel.tag(&conversation.contact_phone);

        let client = TwilioClient::with_base_url(
            &self.twilio_base_url,
            &account.account_sid,
            &account.auth_token,
        );
        let sent = client
            .send_message(&from, &to, body)
            .await
            .map_err(|e| provider_error(&e))?;

        self.db
            .append_message(&AppendMessageParams {
                id: &Uuid::new_v4().to_string(),
                user_id,
                conversation_id,
                twilio_message_sid: &sent.sid,
                direction: "outbound",
                body,
                status: &sent.status,
            })
            .await?;
        self.db
            .touch_conversation(conversation_id, unix_timestamp())
            .await?;

        info!(user_id, conversation_id, sid = %sent.sid, "Outbound message sent");
        Ok(self.db.get_message_by_sid(&sent.sid).await?)
    }

    /// The inbound webhook core. Never fails: the adapter acknowledges the
    /// provider whatever happens here, so every failure path logs and drops.
    pub async fn record_inbound(&self, event: &InboundEvent) {
        let channel = Channel::detect(&event.from, &event.to);
        let contact_phone = Channel::strip_tag(&event.from);
        let our_number = Channel::strip_tag(&event.to);

        let number = match self.db.find_phone_number_by_number(our_number).await {
            Ok(Some(number)) => number,
            Ok(None) => {
                // Unregistered (or since-deleted) destination: not an error
                // the provider should retry on.
                warn!(to = our_number, "Inbound delivery for unknown number, dropping");
                return;
            }
            Err(e) => {
                error!(error = %e, "Inbound number lookup failed");
                return;
            }
        };

        let conversation = match self
            .db
            .resolve_conversation(&ResolveConversationParams {
                id: &Uuid::new_v4().to_string(),
                user_id: &number.user_id,
                phone_number_id: &number.id,
                contact_phone,
                channel: channel.as_str(),
                contact_name: None,
            })
            .await
        {
            Ok(conversation) => conversation,
            Err(e) => {
                error!(error = %e, "Failed to resolve conversation for inbound message");
                return;
            }
        };

        let appended = self
            .db
            .append_message(&AppendMessageParams {
                id: &Uuid::new_v4().to_string(),
                user_id: &number.user_id,
                conversation_id: &conversation.id,
                twilio_message_sid: &event.message_sid,
                direction: "inbound",
                body: &event.body,
                status: "received",
            })
            .await;

        match appended {
            Ok(true) => {
                if let Err(e) = self
                    .db
                    .touch_conversation(&conversation.id, unix_timestamp())
                    .await
                {
                    error!(error = %e, "Failed to touch conversation");
                }
                info!(
                    conversation_id = %conversation.id,
                    channel = %channel,
                    "Inbound message recorded"
                );
            }
            Ok(false) => {
                info!(sid = %event.message_sid, "Duplicate inbound delivery ignored");
            }
            Err(e) => {
                error!(error = %e, "Failed to save inbound message");
            }
        }
    }

    /// Inbox listing, most recent activity first.
    pub async fn list_conversations(&self, user_id: &str) -> Result<Vec<ConversationSummary>> {
        Ok(self.db.list_conversations(user_id).await?)
    }

    /// A conversation's ledger, oldest first. `NotFound` when the
    /// conversation is not the caller's.
    pub async fn list_messages(
        &self,
        user_id: &str,
        conversation_id: &str,
    ) -> Result<Vec<Message>> {
        self.db
            .get_conversation(user_id, conversation_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Conversation {conversation_id}")))?;

        Ok(self.db.list_messages(user_id, conversation_id).await?)
    }
}
