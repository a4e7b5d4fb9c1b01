//! Linked Meta account queries and user-data erasure.

use courier_core::db::{DatabaseError, unix_timestamp};

use super::db::Database;
use super::models::MetaAccount;

/// Fields upserted when a page is linked (or re-linked).
#[derive(Debug)]
pub struct MetaAccountParams<'a> {
    /// Id used only if this call creates the row.
    pub id: &'a str,
    pub user_id: &'a str,
    pub page_id: &'a str,
    pub page_name: &'a str,
    pub access_token: &'a str,
    pub facebook_user_id: Option<&'a str>,
    pub instagram_account_id: Option<&'a str>,
    pub instagram_username: Option<&'a str>,
}

impl Database {
    /// Idempotent upsert keyed on (user, page); re-linking overwrites tokens
    /// and profile fields and bumps `updated_at`.
    pub async fn upsert_meta_account(
        &self,
        params: &MetaAccountParams<'_>,
    ) -> Result<MetaAccount, DatabaseError> {
        let now = unix_timestamp();

        sqlx::query(
            "INSERT INTO meta_accounts (id, user_id, platform, page_id, page_name, access_token, facebook_user_id, instagram_account_id, instagram_username, created_at, updated_at) \
             VALUES (?, ?, 'facebook', ?, ?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT (user_id, page_id) DO UPDATE SET \
                page_name = excluded.page_name, \
                access_token = excluded.access_token, \
                facebook_user_id = excluded.facebook_user_id, \
                instagram_account_id = excluded.instagram_account_id, \
                instagram_username = excluded.instagram_username, \
                updated_at = excluded.updated_at",
        )
        .bind(params.id)
        .bind(params.user_id)
        .bind(params.page_id)
        .bind(params.page_name)
        .bind(params.access_token)
        .bind(params.facebook_user_id)
        .bind(params.instagram_account_id)
        .bind(params.instagram_username)
        .bind(now)
        .bind(now)
        .execute(self.pool())
        .await?;

        sqlx::query_as::<_, MetaAccount>(
            "SELECT * FROM meta_accounts WHERE user_id = ? AND page_id = ?",
        )
        .bind(params.user_id)
        .bind(params.page_id)
        .fetch_optional(self.pool())
        .await?
        .ok_or_else(|| DatabaseError::NotFound(format!("Meta account for page {}", params.page_id)))
    }

    /// The user's linked pages, most recently updated first.
    pub async fn list_meta_accounts(
        &self,
        user_id: &str,
    ) -> Result<Vec<MetaAccount>, DatabaseError> {
        let accounts = sqlx::query_as::<_, MetaAccount>(
            "SELECT * FROM meta_accounts WHERE user_id = ? ORDER BY updated_at DESC",
        )
        .bind(user_id)
        .fetch_all(self.pool())
        .await?;

        Ok(accounts)
    }

    /// Webhook-side lookup of a linked page; unscoped (events carry no user
    /// context).
    pub async fn find_meta_account_by_page(
        &self,
        page_id: &str,
    ) -> Result<Option<MetaAccount>, DatabaseError> {
        let account =
            sqlx::query_as::<_, MetaAccount>("SELECT * FROM meta_accounts WHERE page_id = ?")
                .bind(page_id)
                .fetch_optional(self.pool())
                .await?;

        Ok(account)
    }

    /// Every local user bound to an app-scoped Facebook user id.
    pub async fn find_meta_user_ids(
        &self,
        facebook_user_id: &str,
    ) -> Result<Vec<String>, DatabaseError> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT DISTINCT user_id FROM meta_accounts WHERE facebook_user_id = ?",
        )
        .bind(facebook_user_id)
        .fetch_all(self.pool())
        .await?;

        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    /// Delete every row the user owns, across all entity families. Children
    /// go first so the foreign keys hold throughout.
    pub async fn erase_user_data(&self, user_id: &str) -> Result<u64, DatabaseError> {
        let mut removed = 0;

        for table in [
            "meta_accounts",
            "messages",
            "conversations",
            "phone_numbers",
            "twilio_accounts",
        ] {
            let result = sqlx::query(&format!("DELETE FROM {table} WHERE user_id = ?"))
                .bind(user_id)
                .execute(self.pool())
                .await?;
            removed += result.rows_affected();
        }

        Ok(removed)
    }
}
