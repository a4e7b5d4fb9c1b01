//! Courier messaging server.
//!
//! HTTP backend for a multi-channel messaging dashboard: Twilio sub-account
//! linking and number inventory, SMS/WhatsApp inbound webhooks and outbound
//! dispatch, and Meta (Facebook/Instagram) page linking with a signed
//! data-erasure callback.

pub mod auth;
pub mod routes;
pub mod services;
pub mod storage;
