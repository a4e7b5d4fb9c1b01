//! Sub-account and phone-number queries.

use courier_core::db::{DatabaseError, unix_timestamp};

use super::db::Database;
use super::models::{PhoneNumber, TwilioAccount};

/// Fields persisted when a number purchase succeeds.
#[derive(Debug)]
pub struct PhoneNumberParams<'a> {
    pub id: &'a str,
    pub user_id: &'a str,
    pub twilio_account_id: &'a str,
    pub phone_number: &'a str,
    pub phone_sid: &'a str,
    pub friendly_name: &'a str,
    pub sms_enabled: bool,
    pub voice_enabled: bool,
    pub mms_enabled: bool,
}

impl Database {
    // =========================================================================
    // Sub-account queries
    // =========================================================================

    /// Persist a newly created sub-account. Fails on the per-user unique
    /// constraint when one already exists.
    pub async fn create_twilio_account(
        &self,
        id: &str,
        user_id: &str,
        account_sid: &str,
        auth_token: &str,
        friendly_name: &str,
    ) -> Result<TwilioAccount, DatabaseError> {
        let now = unix_timestamp();

        sqlx::query(
            "INSERT INTO twilio_accounts (id, user_id, account_sid, auth_token, friendly_name, created_at) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(id)
        .bind(user_id)
        .bind(account_sid)
        .bind(auth_token)
        .bind(friendly_name)
        .bind(now)
        .execute(self.pool())
        .await?;

        self.get_twilio_account(user_id)
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("Twilio account for user {user_id}")))
    }

    /// The user's sub-account, if one is linked.
    pub async fn get_twilio_account(
        &self,
        user_id: &str,
    ) -> Result<Option<TwilioAccount>, DatabaseError> {
        let account =
            sqlx::query_as::<_, TwilioAccount>("SELECT * FROM twilio_accounts WHERE user_id = ?")
                .bind(user_id)
                .fetch_optional(self.pool())
                .await?;

        Ok(account)
    }

    // =========================================================================
    // Phone-number queries
    // =========================================================================

    /// Persist a purchased number.
    pub async fn create_phone_number(
        &self,
        params: &PhoneNumberParams<'_>,
    ) -> Result<PhoneNumber, DatabaseError> {
        let now = unix_timestamp();

        sqlx::query(
            "INSERT INTO phone_numbers (id, user_id, twilio_account_id, phone_number, phone_sid, friendly_name, sms_enabled, voice_enabled, mms_enabled, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(params.id)
        .bind(params.user_id)
        .bind(params.twilio_account_id)
        .bind(params.phone_number)
        .bind(params.phone_sid)
        .bind(params.friendly_name)
        .bind(i64::from(params.sms_enabled))
        .bind(i64::from(params.voice_enabled))
        .bind(i64::from(params.mms_enabled))
        .bind(now)
        .execute(self.pool())
        .await?;

        self.get_phone_number(params.user_id, params.id)
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("Phone number {}", params.id)))
    }

    /// A number by id, scoped to its owner.
    pub async fn get_phone_number(
        &self,
        user_id: &str,
        id: &str,
    ) -> Result<Option<PhoneNumber>, DatabaseError> {
        let number = sqlx::query_as::<_, PhoneNumber>(
            "SELECT * FROM phone_numbers WHERE user_id = ? AND id = ?",
        )
        .bind(user_id)
        .bind(id)
        .fetch_optional(self.pool())
        .await?;

        Ok(number)
    }

    /// The user's numbers, newest first.
    pub async fn list_phone_numbers(
        &self,
        user_id: &str,
    ) -> Result<Vec<PhoneNumber>, DatabaseError> {
        let numbers = sqlx::query_as::<_, PhoneNumber>(
            "SELECT * FROM phone_numbers WHERE user_id = ? ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(self.pool())
        .await?;

        Ok(numbers)
    }

    /// Webhook-side lookup by dialable number; unscoped because inbound
    /// deliveries carry no user context. The row itself names the owner.
    pub async fn find_phone_number_by_number(
        &self,
        phone_number: &str,
    ) -> Result<Option<PhoneNumber>, DatabaseError> {
        let number =
            sqlx::query_as::<_, PhoneNumber>("SELECT * FROM phone_numbers WHERE phone_number = ?")
                .bind(phone_number)
                .fetch_optional(self.pool())
                .await?;

        Ok(number)
    }
}
