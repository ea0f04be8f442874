use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use fintrack_core::UserId;

/// JWT claims model (transport-agnostic).
///
/// The subject is the internal user id; everything else about the caller is
/// loaded from the user store on each request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtClaims {
    /// Subject / user identifier.
    pub sub: UserId,

    /// Issued-at timestamp.
    pub issued_at: DateTime<Utc>,

    /// Expiration timestamp.
    pub expires_at: DateTime<Utc>,
}

impl JwtClaims {
    pub fn new(sub: UserId, now: DateTime<Utc>, ttl: Duration) -> Self {
        Self {
            sub,
            issued_at: now,
            expires_at: now + ttl,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenValidationError {
    #[error("token has expired")]
    Expired,

    #[error("token not yet valid (issued_at is in the future)")]
    NotYetValid,

    #[error("invalid token time window (expires_at <= issued_at)")]
    InvalidTimeWindow,
}

/// Deterministically validate JWT claims.
///
/// Signature verification happens in [`crate::token`]; this only checks the
/// time window.
pub fn validate_claims(claims: &JwtClaims, now: DateTime<Utc>) -> Result<(), TokenValidationError> {
    if claims.expires_at <= claims.issued_at {
        return Err(TokenValidationError::InvalidTimeWindow);
    }
    if now < claims.issued_at {
        return Err(TokenValidationError::NotYetValid);
    }
    if now >= claims.expires_at {
        return Err(TokenValidationError::Expired);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_claims_inside_the_window() {
        let now = Utc::now();
        let claims = JwtClaims::new(UserId::new(), now, Duration::hours(1));
        assert_eq!(validate_claims(&claims, now + Duration::minutes(5)), Ok(()));
    }

    #[test]
    fn rejects_expired_and_future_claims() {
        let now = Utc::now();
        let claims = JwtClaims::new(UserId::new(), now, Duration::hours(1));

        assert_eq!(
            validate_claims(&claims, now + Duration::hours(2)),
            Err(TokenValidationError::Expired)
        );
        assert_eq!(
            validate_claims(&claims, now - Duration::minutes(1)),
            Err(TokenValidationError::NotYetValid)
        );
    }

    #[test]
    fn rejects_inverted_window() {
        let now = Utc::now();
        let claims = JwtClaims {
            sub: UserId::new(),
            issued_at: now,
            expires_at: now,
        };
        assert_eq!(
            validate_claims(&claims, now),
            Err(TokenValidationError::InvalidTimeWindow)
        );
    }
}
