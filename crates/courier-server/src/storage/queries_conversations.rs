//! Conversation directory and message ledger queries.

use courier_core::db::{DatabaseError, unix_timestamp};

use super::db::Database;
use super::models::{Conversation, ConversationSummary, Message};

/// Key tuple (plus optional display name) for a directory resolve.
#[derive(Debug)]
pub struct ResolveConversationParams<'a> {
    /// Id used only if this call creates the conversation.
    pub id: &'a str,
    pub user_id: &'a str,
    pub phone_number_id: &'a str,
    /// Bare counterpart address, tag already stripped.
    pub contact_phone: &'a str,
    pub channel: &'a str,
    pub contact_name: Option<&'a str>,
}

/// Fields for a ledger append.
#[derive(Debug)]
pub struct AppendMessageParams<'a> {
    pub id: &'a str,
    pub user_id: &'a str,
    pub conversation_id: &'a str,
    pub twilio_message_sid: &'a str,
    pub direction: &'a str,
    pub body: &'a str,
    pub status: &'a str,
}

impl Database {
    // =========================================================================
    // Conversation directory
    // =========================================================================

    /// Return the conversation for the key tuple, creating it when absent.
    ///
    /// The insert ignores conflicts on the unique key, so concurrent
    /// first-contact deliveries for the same counterpart converge on a
    /// single row.
    pub async fn resolve_conversation(
        &self,
        params: &ResolveConversationParams<'_>,
    ) -> Result<Conversation, DatabaseError> {
        let now = unix_timestamp();

        sqlx::query(
            "INSERT INTO conversations (id, user_id, phone_number_id, contact_phone, contact_name, channel, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT (user_id, phone_number_id, contact_phone, channel) DO NOTHING",
        )
        .bind(params.id)
        .bind(params.user_id)
        .bind(params.phone_number_id)
        .bind(params.contact_phone)
        .bind(params.contact_name)
        .bind(params.channel)
        .bind(now)
        .execute(self.pool())
        .await?;

        sqlx::query_as::<_, Conversation>(
            "SELECT * FROM conversations WHERE user_id = ? AND phone_number_id = ? AND contact_phone = ? AND channel = ?",
        )
        .bind(params.user_id)
        .bind(params.phone_number_id)
        .bind(params.contact_phone)
        .bind(params.channel)
        .fetch_optional(self.pool())
        .await?
        .ok_or_else(|| {
            DatabaseError::NotFound(format!(
                "Conversation for contact {}",
                params.contact_phone
            ))
        })
    }

    /// Advance the conversation's last-activity marker.
    pub async fn touch_conversation(&self, id: &str, at: i64) -> Result<(), DatabaseError> {
        sqlx::query("UPDATE conversations SET last_message_at = ? WHERE id = ?")
            .bind(at)
            .bind(id)
            .execute(self.pool())
            .await?;

        Ok(())
    }

    /// A conversation by id, scoped to its owner.
    pub async fn get_conversation(
        &self,
        user_id: &str,
        id: &str,
    ) -> Result<Option<Conversation>, DatabaseError> {
        let conversation = sqlx::query_as::<_, Conversation>(
            "SELECT * FROM conversations WHERE user_id = ? AND id = ?",
        )
        .bind(user_id)
        .bind(id)
        .fetch_optional(self.pool())
        .await?;

        Ok(conversation)
    }

    /// Inbox listing: most recent activity first, with the owning number and
    /// a last-message preview.
    pub async fn list_conversations(
        &self,
        user_id: &str,
    ) -> Result<Vec<ConversationSummary>, DatabaseError> {
        let conversations = sqlx::query_as::<_, ConversationSummary>(
            "SELECT c.id, c.user_id, c.phone_number_id, c.contact_phone, c.contact_name, \
                    c.channel, c.last_message_at, c.created_at, p.phone_number, \
                    (SELECT m.body FROM messages m WHERE m.conversation_id = c.id \
                     ORDER BY m.created_at DESC, m.rowid DESC LIMIT 1) AS last_body, \
                    (SELECT m.direction FROM messages m WHERE m.conversation_id = c.id \
                     ORDER BY m.created_at DESC, m.rowid DESC LIMIT 1) AS last_direction \
             FROM conversations c \
             JOIN phone_numbers p ON p.id = c.phone_number_id \
             WHERE c.user_id = ? \
             ORDER BY COALESCE(c.last_message_at, c.created_at) DESC",
        )
        .bind(user_id)
        .fetch_all(self.pool())
        .await?;

        Ok(conversations)
    }

    // =========================================================================
    // Message ledger
    // =========================================================================

    /// Insert an immutable message row.
    ///
    /// Conflicts on the provider message sid are ignored, so an at-least-once
    /// webhook redelivery writes no duplicate. Returns whether a row was
    /// actually written.
    pub async fn append_message(
        &self,
        params: &AppendMessageParams<'_>,
    ) -> Result<bool, DatabaseError> {
        let now = unix_timestamp();

        let result = sqlx::query(
            "INSERT INTO messages (id, user_id, conversation_id, twilio_message_sid, direction, body, status, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT (twilio_message_sid) DO NOTHING",
        )
        .bind(params.id)
        .bind(params.user_id)
        .bind(params.conversation_id)
        .bind(params.twilio_message_sid)
        .bind(params.direction)
        .bind(params.body)
        .bind(params.status)
        .bind(now)
        .execute(self.pool())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// A message by provider sid (the row an append resolved to).
    pub async fn get_message_by_sid(&self, sid: &str) -> Result<Message, DatabaseError> {
        sqlx::query_as::<_, Message>("SELECT * FROM messages WHERE twilio_message_sid = ?")
            .bind(sid)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("Message {sid}")))
    }

    /// All messages in a conversation, oldest first, scoped to the owner.
    pub async fn list_messages(
        &self,
        user_id: &str,
        conversation_id: &str,
    ) -> Result<Vec<Message>, DatabaseError> {
        let messages = sqlx::query_as::<_, Message>(
            "SELECT * FROM messages WHERE user_id = ? AND conversation_id = ? \
             ORDER BY created_at ASC, rowid ASC",
        )
        .bind(user_id)
        .bind(conversation_id)
        .fetch_all(self.pool())
        .await?;

        Ok(messages)
    }
}
