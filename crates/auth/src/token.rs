//! HS256 token issuance and verification.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use thiserror::Error;

use fintrack_core::UserId;

use crate::claims::{JwtClaims, TokenValidationError, validate_claims};

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("malformed or badly signed token: {0}")]
    Decode(#[from] jsonwebtoken::errors::Error),

    #[error(transparent)]
    Claims(#[from] TokenValidationError),
}

/// Verifies a bearer token and yields its claims.
pub trait JwtValidator: Send + Sync {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<JwtClaims, TokenError>;
}

/// Mints bearer tokens for an authenticated user.
pub trait TokenIssuer: Send + Sync {
    fn issue(&self, user_id: UserId, now: DateTime<Utc>) -> Result<String, TokenError>;
}

/// Shared-secret HS256 implementation of both halves.
///
/// Expiry is checked by [`validate_claims`] against the caller's clock rather
/// than by `jsonwebtoken`, since the claims carry RFC 3339 timestamps.
pub struct Hs256Jwt {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl Hs256Jwt {
    pub fn new(secret: impl AsRef<[u8]>, ttl: Duration) -> Self {
        let secret = secret.as_ref();
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.required_spec_claims.clear();

        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}

impl JwtValidator for Hs256Jwt {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<JwtClaims, TokenError> {
        let data = jsonwebtoken::decode::<JwtClaims>(token, &self.decoding, &self.validation)?;
        validate_claims(&data.claims, now)?;
        Ok(data.claims)
    }
}

impl TokenIssuer for Hs256Jwt {
    fn issue(&self, user_id: UserId, now: DateTime<Utc>) -> Result<String, TokenError> {
        let claims = JwtClaims::new(user_id, now, self.ttl);
        Ok(jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &self.encoding,
        )?)
    }
}
