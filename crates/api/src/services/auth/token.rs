//! HS256 bearer tokens.

use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};

use etic_core::{Email, UserId};

use super::AuthError;
use crate::config::JwtConfig;

/// Token claims.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// User ID.
    pub sub: UserId,
    pub email: Email,
    /// Issued at, seconds since the epoch.
    pub iat: i64,
    /// Expiry, seconds since the epoch.
    pub exp: i64,
}

/// Signs and verifies bearer tokens.
///
/// Implements `Debug` manually; the keys are never printed.
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    lifetime: Duration,
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("keys", &"[REDACTED]")
            .field("lifetime", &self.lifetime)
            .finish_non_exhaustive()
    }
}

impl TokenService {
    /// Build a token service from JWT settings.
    #[must_use]
    pub fn new(config: &JwtConfig) -> Self {
        let secret = config.secret.expose_secret().as_bytes();
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation: Validation::new(Algorithm::HS256),
            lifetime: Duration::hours(config.expires_in_hours),
        }
    }

    /// Issue a token for a user.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::TokenEncoding` if signing fails.
    pub fn issue(&self, user: UserId, email: &Email) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user,
            email: email.clone(),
            iat: now.timestamp(),
            exp: (now + self.lifetime).timestamp(),
        };

        jsonwebtoken::encode(&Header::default(), &claims, &self.encoding)
            .map_err(AuthError::TokenEncoding)
    }

    /// Verify a token's signature and expiry and return its claims.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidToken` for malformed, forged or expired
    /// tokens.
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        jsonwebtoken::decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::InvalidToken("token expired".to_owned()),
                _ => AuthError::InvalidToken(e.to_string()),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::SecretString;

    fn service(hours: i64) -> TokenService {
        TokenService::new(&JwtConfig {
            secret: SecretString::from("k7#mP2$xL9@nQ4&wR8!vT3*yB6^zC1%f"),
            expires_in_hours: hours,
        })
    }

    fn email() -> Email {
        Email::parse("demo@etic.com").unwrap()
    }

    #[test]
    fn test_issue_and_verify() {
        let tokens = service(168);
        let user = UserId::new();
        let token = tokens.issue(user, &email()).unwrap();
        let claims = tokens.verify(&token).unwrap();
        assert_eq!(claims.sub, user);
        assert_eq!(claims.email, email());
        assert_eq!(claims.exp - claims.iat, 168 * 3600);
    }

    #[test]
    fn test_expired_token_is_rejected() {
        // Past the default 60 second leeway.
        let tokens = service(-1);
        let token = tokens.issue(UserId::new(), &email()).unwrap();
        assert!(matches!(
            tokens.verify(&token),
            Err(AuthError::InvalidToken(reason)) if reason == "token expired"
        ));
    }

    #[test]
    fn test_foreign_signature_is_rejected() {
        let token = service(1).issue(UserId::new(), &email()).unwrap();
        let other = TokenService::new(&JwtConfig {
            secret: SecretString::from("Zq8&Lw3!Rt6@Yp1#Nm4$Kv7%Hx2^Bc5*"),
            expires_in_hours: 1,
        });
        assert!(matches!(other.verify(&token), Err(AuthError::InvalidToken(_))));
    }

    #[test]
    fn test_garbage_is_rejected() {
        assert!(matches!(
            service(1).verify("not.a.jwt"),
            Err(AuthError::InvalidToken(_))
        ));
    }

    #[test]
    fn test_debug_hides_keys() {
        let debug = format!("{:?}", service(1));
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("k7#mP2"));
    }
}
