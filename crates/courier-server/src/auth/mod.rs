//! Session validation for the Courier server.
//!
//! Sessions are issued by the external identity provider as HMAC-signed JWTs
//! over a shared secret; Courier only validates them. Tokens arrive either
//! as an `Authorization: Bearer` header (JSON API) or as the
//! `courier_session` cookie (browser redirect flows).

pub mod claims;
pub mod session;

pub use claims::Claims;
pub use session::{AuthUser, SessionVerifier, session_user};
