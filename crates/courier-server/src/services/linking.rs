//! Account-linking service: sub-account creation and phone-number inventory.

use std::sync::Arc;

use courier_core::{Config, Error, Result};
use courier_providers::TwilioClient;
use courier_providers::twilio::AvailableNumber;
use tracing::info;
use uuid::Uuid;

use crate::storage::{Database, PhoneNumber, PhoneNumberParams, TwilioAccount};

use super::provider_error;

/// Creates and looks up the per-user Twilio sub-account and its numbers.
#[derive(Clone)]
pub struct LinkingService {
    db: Database,
    config: Arc<Config>,
    twilio_base_url: String,
}

impl LinkingService {
    /// Construct against a Twilio host (tests point this at a mock server).
    pub fn with_twilio_base_url(
        db: Database,
        config: Arc<Config>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            db,
            config,
            twilio_base_url: base_url.into(),
        }
    }

    /// A client under the platform's master credentials.
    fn master_client(&self) -> Result<TwilioClient> {
        let creds = self.config.twilio()?;
        Ok(TwilioClient::with_base_url(
            &self.twilio_base_url,
            &creds.account_sid,
            &creds.auth_token,
        ))
    }

    /// The user's sub-account and a client under its credentials, or
    /// `NotLinked`.
    async fn sub_client(&self, user_id: &str) -> Result<(TwilioAccount, TwilioClient)> {
        let account = self
            .db
            .get_twilio_account(user_id)
            .await?
            .ok_or(Error::NotLinked)?;
        let client = TwilioClient::with_base_url(
            &self.twilio_base_url,
            &account.account_sid,
            &account.auth_token,
        );
        Ok((account, client))
    }

    /// Create and persist the user's sub-account. At most one may exist.
    pub async fn create_sub_account(&self, user_id: &str) -> Result<TwilioAccount> {
        if self.db.get_twilio_account(user_id).await?.is_some() {
            return Err(Error::AlreadyLinked);
        }

        let friendly_name = format!("User-{}", user_id.chars().take(8).collect::<String>());
        let subaccount = self
            .master_client()?
            .create_subaccount(&friendly_name)
            .await
            .map_err(|e| provider_error(&e))?;

        let account = self
            .db
            .create_twilio_account(
                &Uuid::new_v4().to_string(),
                user_id,
                &subaccount.sid,
                &subaccount.auth_token,
                &subaccount.friendly_name,
            )
            .await?;

        info!(user_id, sid = %account.account_sid, "Sub-account linked");
        Ok(account)
    }

    /// The user's sub-account, if linked.
    pub async fn get_account(&self, user_id: &str) -> Result<Option<TwilioAccount>> {
        Ok(self.db.get_twilio_account(user_id).await?)
    }

    /// Read-only availability search under the user's sub-account.
    pub async fn search_numbers(
        &self,
        user_id: &str,
        country: &str,
        area_code: Option<&str>,
    ) -> Result<Vec<AvailableNumber>> {
        let (_, client) = self.sub_client(user_id).await?;
        client
            .search_local_numbers(country, area_code)
            .await
            .map_err(|e| provider_error(&e))
    }

    /// Purchase a number, attaching the inbound webhook URL when one can be
    /// resolved, and persist the returned record.
    pub async fn purchase_number(
        &self,
        user_id: &str,
        phone_number: &str,
        webhook_base_override: Option<&str>,
    ) -> Result<PhoneNumber> {
        let (account, client) = self.sub_client(user_id).await?;

        let webhook_url = self.config.twilio_webhook_url(webhook_base_override);
        let purchased = client
            .purchase_number(phone_number, webhook_url.as_deref())
            .await
            .map_err(|e| provider_error(&e))?;

        let number = self
            .db
            .create_phone_number(&PhoneNumberParams {
                id: &Uuid::new_v4().to_string(),
                user_id,
                twilio_account_id: &account.id,
                phone_number: &purchased.phone_number,
                phone_sid: &purchased.sid,
                friendly_name: &purchased.friendly_name,
                sms_enabled: purchased.capabilities.sms,
                voice_enabled: purchased.capabilities.voice,
                mms_enabled: purchased.capabilities.mms,
            })
            .await?;

        info!(
            user_id,
            number = %number.phone_number,
            webhook = webhook_url.is_some(),
            "Number purchased"
        );
        Ok(number)
    }

    /// Repoint an owned number's inbound webhook. Provider-side only; the
    /// stored row is immutable after purchase.
    pub async fn update_number_webhook(
        &self,
        user_id: &str,
        phone_number_id: &str,
        webhook_url: &str,
    ) -> Result<()> {
        let (_, client) = self.sub_client(user_id).await?;
        let number = self
            .db
            .get_phone_number(user_id, phone_number_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Phone number {phone_number_id}")))?;

        client
            .update_sms_url(&number.phone_sid, webhook_url)
            .await
            .map_err(|e| provider_error(&e))?;

        info!(user_id, number = %number.phone_number, "Webhook reconfigured");
        Ok(())
    }

    /// The user's purchased numbers, newest first.
    pub async fn list_numbers(&self, user_id: &str) -> Result<Vec<PhoneNumber>> {
        Ok(self.db.list_phone_numbers(user_id).await?)
    }
}
