//! Identity tokens
//!
//! HS256 JWTs carrying an `Identity` plus issued-at, expiry and a random
//! nonce. The server keeps only the signing secret; issued tokens are never
//! stored.

use jwt_simple::prelude::{Claims, Duration as JwtDuration, HS256Key, MACLike, VerificationOptions};

use crate::models::Identity;

/// Default token lifetime (1 hour)
pub const DEFAULT_TOKEN_TTL_SECS: u64 = 3600;

/// Shortest HMAC secret the signer accepts (96 bits)
pub const MIN_SECRET_BYTES: usize = 12;

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    /// The signing backend failed
    #[error("Failed to sign token: {0}")]
    Signing(String),

    /// Bad signature, malformed token, or past its expiry
    #[error("Invalid or expired token")]
    Invalid,
}

/// Signs and verifies identity tokens with a server-held secret
pub struct TokenIssuer {
    key: HS256Key,
    ttl: JwtDuration,
}

impl TokenIssuer {
    pub fn new(secret: &str, ttl_secs: u64) -> Self {
        Self {
            key: HS256Key::from_bytes(secret.as_bytes()),
            ttl: JwtDuration::from_secs(ttl_secs),
        }
    }

    /// Sign `identity` into a token that expires one lifetime from now.
    ///
    /// Each token carries a fresh nonce, so two logins within the same
    /// second never yield the same token.
    pub fn issue(&self, identity: &Identity) -> Result<String, TokenError> {
        let mut claims = Claims::with_custom_claims(identity.clone(), self.ttl);
        claims.create_nonce();
        self.key
            .authenticate(claims)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    /// Check signature and expiry, returning the embedded identity
    pub fn verify(&self, token: &str) -> Result<Identity, TokenError> {
        let options = VerificationOptions {
            time_tolerance: Some(JwtDuration::from_secs(0)),
            ..Default::default()
        };

        self.key
            .verify_token::<Identity>(token, Some(options))
            .map(|claims| claims.custom)
            .map_err(|e| {
                tracing::debug!("Token verification failed: {}", e);
                TokenError::Invalid
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jwt_simple::prelude::Clock;

    fn identity(username: &str, is_admin: bool) -> Identity {
        Identity {
            username: username.to_string(),
            is_admin,
        }
    }

    #[test]
    fn test_issue_then_verify_recovers_identity() {
        let issuer = TokenIssuer::new("token-test-secret", DEFAULT_TOKEN_TTL_SECS);
        let admin = identity("admin@mail.com", true);

        let token = issuer.issue(&admin).unwrap();
        assert_eq!(issuer.verify(&token).unwrap(), admin);
    }

    #[test]
    fn test_same_second_tokens_differ() {
        let issuer = TokenIssuer::new("token-test-secret", DEFAULT_TOKEN_TTL_SECS);
        let user = identity("user@mail.com", false);

        let first = issuer.issue(&user).unwrap();
        let second = issuer.issue(&user).unwrap();

        assert_ne!(first, second);
        assert_eq!(issuer.verify(&second).unwrap(), user);
    }

    #[test]
    fn test_short_secret_cannot_sign() {
        let secret = "x".repeat(MIN_SECRET_BYTES - 1);
        let issuer = TokenIssuer::new(&secret, DEFAULT_TOKEN_TTL_SECS);
        assert!(matches!(
            issuer.issue(&identity("user@mail.com", false)),
            Err(TokenError::Signing(_))
        ));

        let secret = "x".repeat(MIN_SECRET_BYTES);
        let issuer = TokenIssuer::new(&secret, DEFAULT_TOKEN_TTL_SECS);
        assert!(issuer.issue(&identity("user@mail.com", false)).is_ok());
    }

    #[test]
    fn test_token_from_other_secret_is_invalid() {
        let issuer = TokenIssuer::new("token-test-secret", DEFAULT_TOKEN_TTL_SECS);
        let other = TokenIssuer::new("other-secret", DEFAULT_TOKEN_TTL_SECS);

        let token = other.issue(&identity("user@mail.com", false)).unwrap();
        assert!(matches!(issuer.verify(&token), Err(TokenError::Invalid)));
    }

    #[test]
    fn test_garbage_is_invalid() {
        let issuer = TokenIssuer::new("token-test-secret", DEFAULT_TOKEN_TTL_SECS);
        for token in ["", "mock.jwt.token", "a.b", "not a token at all"] {
            assert!(matches!(issuer.verify(token), Err(TokenError::Invalid)));
        }
    }

    #[test]
    fn test_tampered_payload_is_invalid() {
        let issuer = TokenIssuer::new("token-test-secret", DEFAULT_TOKEN_TTL_SECS);
        let token = issuer.issue(&identity("user@mail.com", false)).unwrap();

        let forged = issuer.issue(&identity("user@mail.com", true)).unwrap();
        let mut parts: Vec<&str> = token.split('.').collect();
        let forged_parts: Vec<&str> = forged.split('.').collect();
        parts[1] = forged_parts[1];
        let spliced = parts.join(".");

        assert!(matches!(issuer.verify(&spliced), Err(TokenError::Invalid)));
    }

    #[test]
    fn test_expired_token_is_invalid() {
        let issuer = TokenIssuer::new("token-test-secret", DEFAULT_TOKEN_TTL_SECS);

        let issued = Clock::now_since_epoch() - JwtDuration::from_hours(2);
        let mut claims = Claims::with_custom_claims(identity("user@mail.com", false), issuer.ttl);
        claims.issued_at = Some(issued);
        claims.invalid_before = Some(issued);
        claims.expires_at = Some(issued + issuer.ttl);
        let token = issuer.key.authenticate(claims).unwrap();

        assert!(matches!(issuer.verify(&token), Err(TokenError::Invalid)));
    }
}

#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(50))]

        /// Every issued token verifies back to exactly the identity it was issued for.
        #[test]
        fn issued_identity_roundtrips(username in "[a-z0-9@._-]{1,40}", is_admin in prop::bool::ANY) {
            let issuer = TokenIssuer::new("property-secret", DEFAULT_TOKEN_TTL_SECS);
            let identity = Identity { username, is_admin };

            let token = issuer.issue(&identity).unwrap();
            prop_assert_eq!(issuer.verify(&token).unwrap(), identity);
        }
    }
}
