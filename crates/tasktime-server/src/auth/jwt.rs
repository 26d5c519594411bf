//! Bearer token signing and verification.
//!
//! Tokens are HS256 JWTs with the user id in `sub`. Expiry is checked against
//! the server clock rather than the library's, so tests with a manual clock
//! see consistent lifetimes.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use tasktime_core::UserId;

use crate::error::AppError;

/// JWT claims.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// User id.
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
}

/// Signing material plus the lifetime of issued tokens.
#[derive(Clone)]
pub struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    lifetime: Duration,
}

impl fmt::Debug for TokenKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenKeys")
            .field("lifetime", &self.lifetime)
            .finish_non_exhaustive()
    }
}

impl TokenKeys {
    pub fn new(secret: &str, lifetime_secs: u64) -> Self {
        let lifetime_secs = i64::try_from(lifetime_secs).unwrap_or(i64::MAX);
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            lifetime: Duration::try_seconds(lifetime_secs).unwrap_or(Duration::MAX),
        }
    }

    pub const fn lifetime(&self) -> Duration {
        self.lifetime
    }

    /// Issues a token for `user` valid from `now`.
    pub fn issue(&self, user: &UserId, now: DateTime<Utc>) -> Result<String, AppError> {
        let exp = now.checked_add_signed(self.lifetime).unwrap_or(DateTime::<Utc>::MAX_UTC);
        let claims = Claims {
            sub: user.to_string(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AppError::internal(format!("token creation failed: {e}")))
    }

    /// Verifies a token and returns the user it was issued to.
    pub fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<UserId, AppError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;

        let claims = decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|_| AppError::unauthenticated("Invalid token"))?;

        if claims.exp <= now.timestamp() {
            return Err(AppError::unauthenticated("Token expired"));
        }
        UserId::new(claims.sub).map_err(|_| AppError::unauthenticated("Invalid token"))
    }
}
