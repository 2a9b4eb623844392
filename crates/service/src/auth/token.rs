use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use uuid::Uuid;

use super::domain::Claims;
use super::errors::AuthError;

/// Issues and verifies HS256 tokens whose subject is a principal id.
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl: Duration,
}

impl TokenService {
    pub fn new(secret: &str, expire_hours: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            ttl: Duration::hours(expire_hours),
        }
    }

    pub fn from_config(cfg: &configs::AuthConfig) -> Self {
        Self::new(&cfg.jwt_secret, cfg.jwt_expire_hours)
    }

    pub fn issue_token(&self, principal_id: Uuid) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = Claims { sub: principal_id.to_string(), iat: now.timestamp(), exp: (now + self.ttl).timestamp() };
        encode(&Header::default(), &claims, &self.encoding_key).map_err(|e| AuthError::TokenError(e.to_string()))
    }

    /// Signature and expiry are checked; the principal itself is not looked up.
    pub fn verify_token(&self, token: &str) -> Result<Uuid, AuthError> {
        let data = decode::<Claims>(token, &self.decoding_key, &Validation::new(Algorithm::HS256)).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::TokenError("token expired".into()),
                ErrorKind::InvalidSignature => AuthError::TokenError("invalid signature".into()),
                _ => AuthError::TokenError("malformed token".into()),
            }
        })?;
        Uuid::parse_str(&data.claims.sub).map_err(|_| AuthError::TokenError("malformed subject".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issued_tokens_verify_to_the_same_principal() {
        let tokens = TokenService::new("test-secret", 1);
        let id = Uuid::new_v4();
        let token = tokens.issue_token(id).unwrap();
        assert_eq!(tokens.verify_token(&token).unwrap(), id);
    }

    #[test]
    fn foreign_and_garbage_tokens_fail() {
        let ours = TokenService::new("secret-a", 1);
        let theirs = TokenService::new("secret-b", 1);
        let token = theirs.issue_token(Uuid::new_v4()).unwrap();
        assert!(ours.verify_token(&token).is_err());
        assert!(ours.verify_token("not.a.token").is_err());
    }

    #[test]
    fn expired_tokens_fail() {
        let tokens = TokenService::new("test-secret", -2);
        let token = tokens.issue_token(Uuid::new_v4()).unwrap();
        assert!(matches!(tokens.verify_token(&token), Err(AuthError::TokenError(m)) if m == "token expired"));
    }
}
