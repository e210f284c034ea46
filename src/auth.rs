//! Opaque session credentials.
//!
//! A token is `<user-id>.<hex hmac-sha256>` over the user id, signed with
//! the service's session secret. Verification resolves a token to a
//! [`Principal`] and fails closed: any absent, malformed, or forged
//! credential is rejected before business logic runs.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::request::Parts,
};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use uuid::Uuid;

use crate::error::AppError;

type HmacSha256 = Hmac<Sha256>;

/// Authenticated identity resolved from a session credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Principal {
    pub user_id: Uuid,
}

/// Issues a signed session token for the given user.
pub fn issue_token(secret: &str, user_id: Uuid) -> String {
    let id = user_id.to_string();
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .expect("HMAC accepts keys of any length");
    mac.update(id.as_bytes());
    let signature = hex::encode(mac.finalize().into_bytes());
    format!("{}.{}", id, signature)
}

/// Verifies a token against the session secret. Constant-time signature
/// comparison; `None` for anything that does not parse or verify.
pub fn verify_token(secret: &str, token: &str) -> Option<Principal> {
    let (id, signature) = token.split_once('.')?;
    let user_id = Uuid::parse_str(id).ok()?;
    let expected = hex::decode(signature).ok()?;

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(id.as_bytes());
    mac.verify_slice(&expected).ok()?;

    Some(Principal { user_id })
}

#[async_trait]
impl FromRequestParts<crate::AppState> for Principal {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &crate::AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get("Authorization")
            .and_then(|h| h.to_str().ok())
            .ok_or_else(|| AppError::Unauthenticated("missing Authorization header".to_string()))?;

        let token = header
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::Unauthenticated("expected a bearer token".to_string()))?;

        verify_token(&state.config.session_secret, token)
            .ok_or_else(|| AppError::Unauthenticated("invalid session token".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-session-secret";

    #[test]
    fn issued_token_verifies() {
        let user_id = Uuid::new_v4();
        let token = issue_token(SECRET, user_id);
        let principal = verify_token(SECRET, &token).expect("token should verify");
        assert_eq!(principal.user_id, user_id);
    }

    #[test]
    fn forged_signature_is_rejected() {
        let user_id = Uuid::new_v4();
        let forged = format!("{}.{}", user_id, "ab".repeat(32));
        assert!(verify_token(SECRET, &forged).is_none());
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let token = issue_token("other-secret", Uuid::new_v4());
        assert!(verify_token(SECRET, &token).is_none());
    }

    #[test]
    fn malformed_tokens_are_rejected() {
        assert!(verify_token(SECRET, "").is_none());
        assert!(verify_token(SECRET, "no-dot").is_none());
        assert!(verify_token(SECRET, "not-a-uuid.abcdef").is_none());
        let user_id = Uuid::new_v4();
        assert!(verify_token(SECRET, &format!("{}.zzzz", user_id)).is_none());
    }
}
