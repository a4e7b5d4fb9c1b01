//! SQLite storage for the Courier server.
//!
//! Provides persistence for sub-accounts, phone numbers, the conversation
//! directory, the message ledger, and linked Meta accounts.

mod db;
mod models;
mod queries;
mod queries_conversations;
mod queries_meta;

#[cfg(test)]
mod tests;

pub use db::Database;
pub use models::*;
pub use queries::PhoneNumberParams;
pub use queries_conversations::{AppendMessageParams, ResolveConversationParams};
pub use queries_meta::MetaAccountParams;
