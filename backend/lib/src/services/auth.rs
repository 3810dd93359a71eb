//! JWT bearer authentication.
//!
//! Token issuance lives in a separate identity service; this module only
//! validates HS256 tokens and exposes the authenticated user to handlers
//! through axum extractors. Superuser-only endpoints use the [`Superuser`]
//! extractor, which turns a valid non-superuser token into a 403.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Error;
use crate::services::Services;

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    /// User id.
    sub: Uuid,
    exp: i64,
    #[serde(default)]
    superuser: bool,
}

pub struct AuthService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl AuthService {
    pub fn new(secret: &[u8]) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
        }
    }

    pub fn decode_token(&self, token: &str) -> Result<CurrentUser, Error> {
        let data = decode::<Claims>(token, &self.decoding_key, &Validation::default())
            .map_err(|_| Error::Unauthorized("Could not validate credentials".to_string()))?;
        Ok(CurrentUser {
            id: data.claims.sub,
            is_superuser: data.claims.superuser,
        })
    }

    /// Issues a token signed with the shared secret. Used by tests and
    /// operational tooling; production tokens come from the identity
    /// service.
    pub fn issue_token(&self, user_id: Uuid, superuser: bool, ttl_secs: i64) -> String {
        let claims = Claims {
            sub: user_id,
            exp: Utc::now().timestamp() + ttl_secs,
            superuser,
        };
        encode(&Header::default(), &claims, &self.encoding_key)
            .expect("HS256 encoding cannot fail")
    }
}

/// The authenticated caller.
#[derive(Debug, Clone, Copy)]
pub struct CurrentUser {
    pub id: Uuid,
    pub is_superuser: bool,
}

impl std::fmt::Display for CurrentUser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id)
    }
}

fn bearer_token(parts: &Parts) -> Result<&str, Error> {
    parts
        .headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or_else(|| Error::Unauthorized("Missing bearer token".to_string()))
}

impl FromRequestParts<Services> for CurrentUser {
    type Rejection = Error;

    async fn from_request_parts(
        parts: &mut Parts,
        services: &Services,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;
        services.auth.decode_token(token)
    }
}

/// Extractor for superuser-only endpoints.
#[derive(Debug, Clone, Copy)]
pub struct Superuser(pub CurrentUser);

impl FromRequestParts<Services> for Superuser {
    type Rejection = Error;

    async fn from_request_parts(
        parts: &mut Parts,
        services: &Services,
    ) -> Result<Self, Self::Rejection> {
        let user = CurrentUser::from_request_parts(parts, services).await?;
        if !user.is_superuser {
            return Err(Error::Forbidden(
                "The user doesn't have enough privileges".to_string(),
            ));
        }
        Ok(Superuser(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issued_tokens_round_trip() {
        let auth = AuthService::new(b"test-secret");
        let user_id = Uuid::now_v7();
        let token = auth.issue_token(user_id, true, 60);
        let user = auth.decode_token(&token).unwrap();
        assert_eq!(user.id, user_id);
        assert!(user.is_superuser);
    }

    #[test]
    fn expired_tokens_are_rejected() {
        let auth = AuthService::new(b"test-secret");
        let token = auth.issue_token(Uuid::now_v7(), false, -120);
        assert!(auth.decode_token(&token).is_err());
    }

    #[test]
    fn tokens_signed_with_another_secret_are_rejected() {
        let issuer = AuthService::new(b"other-secret");
        let verifier = AuthService::new(b"test-secret");
        let token = issuer.issue_token(Uuid::now_v7(), false, 60);
        assert!(verifier.decode_token(&token).is_err());
    }
}
