//! Signed identity tokens.
//!
//! Shoppers and owners get HS256 tokens with different audiences, so a
//! shopper token never verifies as an owner token and the other way round.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use scatch_core::Email;

use super::AuthError;

/// Token lifetime.
pub const TOKEN_TTL_HOURS: i64 = 24;

/// [`TOKEN_TTL_HOURS`] in seconds, for cookie max-age.
pub const TOKEN_TTL_SECONDS: i64 = TOKEN_TTL_HOURS * 60 * 60;

/// Who a token was issued to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenScope {
    Shopper,
    Owner,
}

impl TokenScope {
    const fn audience(self) -> &'static str {
        match self {
            Self::Shopper => "scatch:user",
            Self::Owner => "scatch:admin",
        }
    }

    /// Cookie the token travels in.
    #[must_use]
    pub const fn cookie_name(self) -> &'static str {
        match self {
            Self::Shopper => "token",
            Self::Owner => "admin_token",
        }
    }
}

/// Token payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub email: String,
    pub id: i32,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
}

/// HS256 signing and verification keys.
#[derive(Clone)]
pub struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl std::fmt::Debug for TokenKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenKeys").finish_non_exhaustive()
    }
}

impl TokenKeys {
    #[must_use]
    pub fn new(secret: &SecretString) -> Self {
        let bytes = secret.expose_secret().as_bytes();
        Self {
            encoding: EncodingKey::from_secret(bytes),
            decoding: DecodingKey::from_secret(bytes),
        }
    }

    /// Issue a token valid for [`TOKEN_TTL_HOURS`].
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Token` if signing fails.
    pub fn issue(&self, scope: TokenScope, id: i32, email: &Email) -> Result<String, AuthError> {
        self.issue_at(scope, id, email, Utc::now())
    }

    /// Issue a token as if the current time were `now`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Token` if signing fails.
    pub fn issue_at(
        &self,
        scope: TokenScope,
        id: i32,
        email: &Email,
        now: DateTime<Utc>,
    ) -> Result<String, AuthError> {
        let claims = Claims {
            email: email.as_str().to_owned(),
            id,
            aud: scope.audience().to_owned(),
            iat: now.timestamp(),
            exp: (now + Duration::hours(TOKEN_TTL_HOURS)).timestamp(),
        };

        Ok(encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &self.encoding,
        )?)
    }

    /// Verify a token for `scope`.
    ///
    /// Expired, tampered or wrongly scoped tokens yield `None`.
    #[must_use]
    pub fn verify(&self, scope: TokenScope, token: &str) -> Option<Claims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[scope.audience()]);
        validation.leeway = 0;

        match decode::<Claims>(token, &self.decoding, &validation) {
            Ok(data) => Some(data.claims),
            Err(e) => {
                tracing::debug!(error = %e, "rejected identity token");
                None
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn keys() -> TokenKeys {
        TokenKeys::new(&SecretString::from("k8Jd2mQv9XzR4tLw7NpB3cYh6FgT1sAe"))
    }

    fn email() -> Email {
        Email::parse("asha@example.com").unwrap()
    }

    #[test]
    fn test_issue_and_verify() {
        let keys = keys();
        let token = keys.issue(TokenScope::Shopper, 7, &email()).unwrap();
        let claims = keys.verify(TokenScope::Shopper, &token).unwrap();
        assert_eq!(claims.id, 7);
        assert_eq!(claims.email, "asha@example.com");
        assert_eq!(claims.exp - claims.iat, TOKEN_TTL_SECONDS);
    }

    #[test]
    fn test_scopes_are_not_interchangeable() {
        let keys = keys();
        let shopper = keys.issue(TokenScope::Shopper, 1, &email()).unwrap();
        let owner = keys.issue(TokenScope::Owner, 1, &email()).unwrap();
        assert!(keys.verify(TokenScope::Owner, &shopper).is_none());
        assert!(keys.verify(TokenScope::Shopper, &owner).is_none());
    }

    #[test]
    fn test_expired_token_rejected() {
        let keys = keys();
        let issued = Utc::now() - Duration::hours(TOKEN_TTL_HOURS + 1);
        let token = keys
            .issue_at(TokenScope::Shopper, 1, &email(), issued)
            .unwrap();
        assert!(keys.verify(TokenScope::Shopper, &token).is_none());
    }

    #[test]
    fn test_foreign_key_rejected() {
        let token = keys().issue(TokenScope::Shopper, 1, &email()).unwrap();
        let other = TokenKeys::new(&SecretString::from("Zq4Wn8Rb2Lx6Vt1Mc9Hy3Kp7Gd5Js0Fe"));
        assert!(other.verify(TokenScope::Shopper, &token).is_none());
        assert!(keys().verify(TokenScope::Shopper, "not-a-token").is_none());
    }
}
