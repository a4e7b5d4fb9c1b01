//! Storage layer tests for the Courier server.

#![allow(clippy::unwrap_used)]

use courier_core::db::unix_timestamp;

use super::db::Database;
use super::queries::PhoneNumberParams;
use super::queries_conversations::{AppendMessageParams, ResolveConversationParams};
use super::queries_meta::MetaAccountParams;

async fn test_db() -> Database {
    Database::open_in_memory().await.unwrap()
}

#[tokio::test]
async fn open_creates_file_and_runs_migrations() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("courier.db");

    let db = Database::open(&path).await.unwrap();
    assert!(path.exists());

    // The schema is in place: a simple insert round-trips.
    db.create_twilio_account("a1", "u1", "ACsub", "tok", "User-abc12345")
        .await
        .unwrap();
    assert!(db.get_twilio_account("u1").await.unwrap().is_some());
}

async fn seed_account_and_number(db: &Database, user_id: &str, number: &str) {
    db.create_twilio_account(
        &format!("acct-{user_id}"),
        user_id,
        "ACsub",
        "sub-token",
        "User-test",
    )
    .await
    .unwrap();

    db.create_phone_number(&PhoneNumberParams {
        id: &format!("num-{user_id}"),
        user_id,
        twilio_account_id: &format!("acct-{user_id}"),
        phone_number: number,
        phone_sid: &format!("PN-{user_id}"),
        friendly_name: "(555) 123-4567",
        sms_enabled: true,
        voice_enabled: true,
        mms_enabled: false,
    })
    .await
    .unwrap();
}

// === Sub-account tests ===

#[tokio::test]
async fn create_and_get_twilio_account() {
    let db = test_db().await;
    let account = db
        .create_twilio_account("a1", "u1", "ACsub", "tok", "User-abc12345")
        .await
        .unwrap();

    assert_eq!(account.id, "a1");
    assert_eq!(account.account_sid, "ACsub");

    let fetched = db.get_twilio_account("u1").await.unwrap().unwrap();
    assert_eq!(fetched.id, "a1");
    assert!(db.get_twilio_account("u2").await.unwrap().is_none());
}

#[tokio::test]
async fn second_account_for_same_user_is_rejected() {
    let db = test_db().await;
    db.create_twilio_account("a1", "u1", "ACsub", "tok", "first")
        .await
        .unwrap();

    let second = db
        .create_twilio_account("a2", "u1", "ACother", "tok2", "second")
        .await;
    assert!(second.is_err());

    // The existing record is untouched.
    let existing = db.get_twilio_account("u1").await.unwrap().unwrap();
    assert_eq!(existing.id, "a1");
    assert_eq!(existing.account_sid, "ACsub");
}

// === Phone-number tests ===

#[tokio::test]
async fn find_phone_number_by_number() {
    let db = test_db().await;
    seed_account_and_number(&db, "u1", "+15551234567").await;

    let found = db
        .find_phone_number_by_number("+15551234567")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.user_id, "u1");
    assert_eq!(found.phone_sid, "PN-u1");

    assert!(
        db.find_phone_number_by_number("+15550000000")
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn phone_number_lookup_is_owner_scoped() {
    let db = test_db().await;
    seed_account_and_number(&db, "u1", "+15551234567").await;

    assert!(db.get_phone_number("u1", "num-u1").await.unwrap().is_some());
    assert!(db.get_phone_number("u2", "num-u1").await.unwrap().is_none());
}

// === Conversation directory tests ===

#[tokio::test]
async fn resolve_conversation_is_idempotent() {
    let db = test_db().await;
    seed_account_and_number(&db, "u1", "+15551234567").await;

    let params = ResolveConversationParams {
        id: "c1",
        user_id: "u1",
        phone_number_id: "num-u1",
        contact_phone: "+15559876543",
        channel: "sms",
        contact_name: None,
    };
    let first = db.resolve_conversation(&params).await.unwrap();
    assert_eq!(first.id, "c1");
    assert!(first.last_message_at.is_none());

    // Same key, different candidate id: the existing row comes back.
    let again = db
        .resolve_conversation(&ResolveConversationParams {
            id: "c2",
            ..params
        })
        .await
        .unwrap();
    assert_eq!(again.id, "c1");
}

#[tokio::test]
async fn same_contact_on_different_channel_is_a_new_conversation() {
    let db = test_db().await;
    seed_account_and_number(&db, "u1", "+15551234567").await;

    let sms = db
        .resolve_conversation(&ResolveConversationParams {
            id: "c1",
            user_id: "u1",
            phone_number_id: "num-u1",
            contact_phone: "+15559876543",
            channel: "sms",
            contact_name: None,
        })
        .await
        .unwrap();
    let whatsapp = db
        .resolve_conversation(&ResolveConversationParams {
            id: "c2",
            user_id: "u1",
            phone_number_id: "num-u1",
            contact_phone: "+15559876543",
            channel: "whatsapp",
            contact_name: None,
        })
        .await
        .unwrap();

    assert_ne!(sms.id, whatsapp.id);
}

#[tokio::test]
async fn touch_advances_last_activity() {
    let db = test_db().await;
    seed_account_and_number(&db, "u1", "+15551234567").await;

    let conversation = db
        .resolve_conversation(&ResolveConversationParams {
            id: "c1",
            user_id: "u1",
            phone_number_id: "num-u1",
            contact_phone: "+15559876543",
            channel: "sms",
            contact_name: None,
        })
        .await
        .unwrap();
    assert!(conversation.last_message_at.is_none());

    let now = unix_timestamp();
    db.touch_conversation("c1", now).await.unwrap();

    let touched = db.get_conversation("u1", "c1").await.unwrap().unwrap();
    assert_eq!(touched.last_message_at, Some(now));
}

// === Message ledger tests ===

#[tokio::test]
async fn append_message_dedupes_on_provider_sid() {
    let db = test_db().await;
    seed_account_and_number(&db, "u1", "+15551234567").await;
    db.resolve_conversation(&ResolveConversationParams {
        id: "c1",
        user_id: "u1",
        phone_number_id: "num-u1",
        contact_phone: "+15559876543",
        channel: "sms",
        contact_name: None,
    })
    .await
    .unwrap();

    let params = AppendMessageParams {
        id: "m1",
        user_id: "u1",
        conversation_id: "c1",
        twilio_message_sid: "SM100",
        direction: "inbound",
        body: "hello",
        status: "received",
    };
    assert!(db.append_message(&params).await.unwrap());

    // Redelivery of the same provider sid writes nothing.
    let redelivered = AppendMessageParams { id: "m2", ..params };
    assert!(!db.append_message(&redelivered).await.unwrap());

    let messages = db.list_messages("u1", "c1").await.unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].id, "m1");
}

#[tokio::test]
async fn list_messages_is_owner_scoped_and_oldest_first() {
    let db = test_db().await;
    seed_account_and_number(&db, "u1", "+15551234567").await;
    db.resolve_conversation(&ResolveConversationParams {
        id: "c1",
        user_id: "u1",
        phone_number_id: "num-u1",
        contact_phone: "+15559876543",
        channel: "sms",
        contact_name: None,
    })
    .await
    .unwrap();

    for (id, sid, body) in [("m1", "SM1", "first"), ("m2", "SM2", "second")] {
        db.append_message(&AppendMessageParams {
            id,
            user_id: "u1",
            conversation_id: "c1",
            twilio_message_sid: sid,
            direction: "outbound",
            body,
            status: "queued",
        })
        .await
        .unwrap();
    }

    let messages = db.list_messages("u1", "c1").await.unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].body, "first");
    assert_eq!(messages[1].body, "second");

    // Another user sees nothing.
    assert!(db.list_messages("u2", "c1").await.unwrap().is_empty());
}

#[tokio::test]
async fn conversation_listing_carries_preview() {
    let db = test_db().await;
    seed_account_and_number(&db, "u1", "+15551234567").await;
    db.resolve_conversation(&ResolveConversationParams {
        id: "c1",
        user_id: "u1",
        phone_number_id: "num-u1",
        contact_phone: "+15559876543",
        channel: "whatsapp",
        contact_name: Some("Ada"),
    })
    .await
    .unwrap();
    db.append_message(&AppendMessageParams {
        id: "m1",
        user_id: "u1",
        conversation_id: "c1",
        twilio_message_sid: "SM1",
        direction: "inbound",
        body: "hello",
        status: "received",
    })
    .await
    .unwrap();

    let listing = db.list_conversations("u1").await.unwrap();
    assert_eq!(listing.len(), 1);
    assert_eq!(listing[0].phone_number, "+15551234567");
    assert_eq!(listing[0].contact_name.as_deref(), Some("Ada"));
    assert_eq!(listing[0].last_body.as_deref(), Some("hello"));
    assert_eq!(listing[0].last_direction.as_deref(), Some("inbound"));
}

// === Meta account tests ===

#[tokio::test]
async fn upsert_meta_account_overwrites_on_relink() {
    let db = test_db().await;

    let created = db
        .upsert_meta_account(&MetaAccountParams {
            id: "ma1",
            user_id: "u1",
            page_id: "page-1",
            page_name: "Support",
            access_token: "tok-old",
            facebook_user_id: Some("999"),
            instagram_account_id: None,
            instagram_username: None,
        })
        .await
        .unwrap();
    assert_eq!(created.id, "ma1");
    assert!(created.instagram_account_id.is_none());

    let relinked = db
        .upsert_meta_account(&MetaAccountParams {
            id: "ma2",
            user_id: "u1",
            page_id: "page-1",
            page_name: "Support Renamed",
            access_token: "tok-new",
            facebook_user_id: Some("999"),
            instagram_account_id: Some("ig-77"),
            instagram_username: Some("acme_support"),
        })
        .await
        .unwrap();

    // Same row, refreshed fields.
    assert_eq!(relinked.id, "ma1");
    assert_eq!(relinked.page_name, "Support Renamed");
    assert_eq!(relinked.access_token, "tok-new");
    assert_eq!(relinked.instagram_username.as_deref(), Some("acme_support"));

    assert_eq!(db.list_meta_accounts("u1").await.unwrap().len(), 1);
}

#[tokio::test]
async fn find_meta_user_ids_is_distinct() {
    let db = test_db().await;

    for (id, user, page) in [
        ("ma1", "u1", "page-1"),
        ("ma2", "u1", "page-2"),
        ("ma3", "u2", "page-3"),
    ] {
        db.upsert_meta_account(&MetaAccountParams {
            id,
            user_id: user,
            page_id: page,
            page_name: "P",
            access_token: "tok",
            facebook_user_id: Some("999"),
            instagram_account_id: None,
            instagram_username: None,
        })
        .await
        .unwrap();
    }

    let mut users = db.find_meta_user_ids("999").await.unwrap();
    users.sort();
    assert_eq!(users, vec!["u1".to_string(), "u2".to_string()]);
    assert!(db.find_meta_user_ids("000").await.unwrap().is_empty());
}

// === Erasure tests ===

#[tokio::test]
async fn erase_user_data_spans_all_entity_families() {
    let db = test_db().await;
    seed_account_and_number(&db, "u1", "+15551234567").await;
    seed_account_and_number(&db, "u2", "+15557654321").await;

    db.resolve_conversation(&ResolveConversationParams {
        id: "c1",
        user_id: "u1",
        phone_number_id: "num-u1",
        contact_phone: "+15559876543",
        channel: "sms",
        contact_name: None,
    })
    .await
    .unwrap();
    db.append_message(&AppendMessageParams {
        id: "m1",
        user_id: "u1",
        conversation_id: "c1",
        twilio_message_sid: "SM1",
        direction: "inbound",
        body: "hi",
        status: "received",
    })
    .await
    .unwrap();
    db.upsert_meta_account(&MetaAccountParams {
        id: "ma1",
        user_id: "u1",
        page_id: "page-1",
        page_name: "P",
        access_token: "tok",
        facebook_user_id: Some("999"),
        instagram_account_id: None,
        instagram_username: None,
    })
    .await
    .unwrap();

    let removed = db.erase_user_data("u1").await.unwrap();
    assert_eq!(removed, 5); // meta account, message, conversation, number, sub-account

    assert!(db.get_twilio_account("u1").await.unwrap().is_none());
    assert!(db.list_phone_numbers("u1").await.unwrap().is_empty());
    assert!(db.list_conversations("u1").await.unwrap().is_empty());
    assert!(db.list_meta_accounts("u1").await.unwrap().is_empty());

    // The other user's data is untouched.
    assert!(db.get_twilio_account("u2").await.unwrap().is_some());
}
