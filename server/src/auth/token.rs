//! HS256 bearer tokens carrying the caller's user id and email.

use std::time::Duration;

use chrono::Utc;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: i64,
    pub email: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("token has expired")]
    Expired,
    #[error("invalid token")]
    Invalid,
    #[error("failed to sign token: {0}")]
    Signing(String),
}

/// Issues and validates tokens with one shared secret.
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl TokenIssuer {
    pub fn new(secret: &[u8], ttl: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            ttl,
        }
    }

    pub fn issue(&self, user_id: i64, email: &str) -> Result<String, TokenError> {
        let now = Utc::now().timestamp();
        let exp = i64::try_from(self.ttl.as_secs())
            .ok()
            .and_then(|ttl| now.checked_add(ttl))
            .ok_or_else(|| TokenError::Signing("token lifetime out of range".to_string()))?;
        let claims = Claims {
            user_id,
            email: email.to_string(),
            iat: now,
            exp,
        };
        self.encode(&claims)
    }

    fn encode(&self, claims: &Claims) -> Result<String, TokenError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    pub fn validate(&self, token: &str) -> Result<Claims, TokenError> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issuer() -> TokenIssuer {
        TokenIssuer::new(b"test-secret", Duration::from_secs(3600))
    }

    #[test]
    fn test_issue_and_validate() {
        let issuer = issuer();
        let token = issuer.issue(7, "nao@example.com").unwrap();
        let claims = issuer.validate(&token).unwrap();
        assert_eq!(claims.user_id, 7);
        assert_eq!(claims.email, "nao@example.com");
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn test_oversized_ttl_is_an_error() {
        let issuer = TokenIssuer::new(b"test-secret", Duration::from_secs(u64::MAX));
        assert!(matches!(
            issuer.issue(7, "nao@example.com"),
            Err(TokenError::Signing(_))
        ));
    }

    #[test]
    fn test_wrong_secret_is_invalid() {
        let token = issuer().issue(7, "nao@example.com").unwrap();
        let other = TokenIssuer::new(b"other-secret", Duration::from_secs(3600));
        assert_eq!(other.validate(&token), Err(TokenError::Invalid));
    }

    #[test]
    fn test_garbage_is_invalid() {
        assert_eq!(issuer().validate("not.a.jwt"), Err(TokenError::Invalid));
        assert_eq!(issuer().validate(""), Err(TokenError::Invalid));
    }

    #[test]
    fn test_expired_token() {
        let issuer = issuer();
        let now = Utc::now().timestamp();
        let token = issuer
            .encode(&Claims {
                user_id: 1,
                email: "old@example.com".to_string(),
                iat: now - 7200,
                exp: now - 3600,
            })
            .unwrap();
        assert_eq!(issuer.validate(&token), Err(TokenError::Expired));
    }
}
