//! Session-token validation and the axum auth extractor.

use axum::extract::FromRequestParts;
use axum::http::{HeaderMap, header, request::Parts};
use axum::response::Response;
use courier_core::Error;
use jsonwebtoken::{DecodingKey, Validation};

use crate::routes::{AppState, error_response};

use super::claims::Claims;

/// Name of the session cookie set by the identity provider.
const SESSION_COOKIE: &str = "courier_session";

/// Validates session tokens against the shared identity-provider secret.
#[derive(Clone)]
pub struct SessionVerifier {
    decoding_key: DecodingKey,
}

impl SessionVerifier {
    pub fn new(secret: &[u8]) -> Self {
        Self {
            decoding_key: DecodingKey::from_secret(secret),
        }
    }

    /// Validate a token and return its claims.
    pub fn verify(&self, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        let data =
            jsonwebtoken::decode::<Claims>(token, &self.decoding_key, &Validation::default())?;
        Ok(data.claims)
    }
}

/// Extract the session token from request headers: Bearer first, cookie
/// fallback.
fn token_from_headers(headers: &HeaderMap) -> Option<String> {
    if let Some(bearer) = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
    {
        return Some(bearer.trim().to_string());
    }

    headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(|cookies| {
            cookies.split(';').find_map(|pair| {
                let (name, value) = pair.trim().split_once('=')?;
                (name == SESSION_COOKIE).then(|| value.to_string())
            })
        })
}

/// The authenticated user id carried by a request, or `None` when the
/// request has no valid session. Used directly by redirect-flow handlers
/// that must answer with an error flag rather than a 401.
pub fn session_user(verifier: Option<&SessionVerifier>, headers: &HeaderMap) -> Option<String> {
    let verifier = verifier?;
    let token = token_from_headers(headers)?;
    verifier.verify(&token).ok().map(|claims| claims.sub)
}

/// Extractor rejecting unauthenticated requests with a 401 JSON body.
#[derive(Debug, Clone)]
pub struct AuthUser(pub String);

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        session_user(state.verifier.as_ref(), &parts.headers)
            .map(Self)
            .ok_or_else(|| error_response(&Error::NotAuthenticated))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use courier_core::db::unix_timestamp;
    use jsonwebtoken::{EncodingKey, Header};

    use super::*;

    fn issue(secret: &[u8], sub: &str) -> String {
        let now = unix_timestamp();
        let claims = Claims {
            sub: sub.to_string(),
            iat: now,
            exp: now + 3600,
        };
        jsonwebtoken::encode(&Header::default(), &claims, &EncodingKey::from_secret(secret))
            .unwrap()
    }

    #[test]
    fn bearer_header_is_accepted() {
        let verifier = SessionVerifier::new(b"secret");
        let token = issue(b"secret", "u1");

        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            format!("Bearer {token}").parse().unwrap(),
        );

        assert_eq!(
            session_user(Some(&verifier), &headers).as_deref(),
            Some("u1")
        );
    }

    #[test]
    fn session_cookie_is_accepted() {
        let verifier = SessionVerifier::new(b"secret");
        let token = issue(b"secret", "u2");

        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            format!("theme=dark; courier_session={token}")
                .parse()
                .unwrap(),
        );

        assert_eq!(
            session_user(Some(&verifier), &headers).as_deref(),
            Some("u2")
        );
    }

    #[test]
    fn wrong_secret_or_missing_token_is_rejected() {
        let verifier = SessionVerifier::new(b"secret");

        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            format!("Bearer {}", issue(b"other", "u1")).parse().unwrap(),
        );
        assert!(session_user(Some(&verifier), &headers).is_none());

        assert!(session_user(Some(&verifier), &HeaderMap::new()).is_none());
    }

    #[test]
    fn unconfigured_verifier_rejects_everything() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            format!("Bearer {}", issue(b"secret", "u1"))
                .parse()
                .unwrap(),
        );
        assert!(session_user(None, &headers).is_none());
    }
}
