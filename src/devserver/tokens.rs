//! JWT access tokens issued by the development server

use crate::auth::models::LoginType;
use crate::error::{Error, Result};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// JWT claims
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    pub phone: String,
    pub login_type: LoginType,
    /// Token ID, used for revocation
    pub jti: String,
    /// Issued at
    pub iat: i64,
    /// Expiration time
    pub exp: i64,
}

impl Claims {
    pub fn new(user_id: &str, phone: &str, login_type: LoginType, ttl_secs: i64) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            sub: user_id.to_string(),
            phone: phone.to_string(),
            login_type,
            jti: uuid::Uuid::new_v4().to_string(),
            iat: now,
            exp: now + ttl_secs,
        }
    }

    pub fn is_expired(&self) -> bool {
        chrono::Utc::now().timestamp() >= self.exp
    }
}

pub fn create_token(claims: &Claims, secret: &str) -> Result<String> {
    encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| Error::Config(format!("Failed to create token: {}", e)))
}

pub fn validate_token(token: &str, secret: &str) -> Result<Claims> {
    let mut validation = Validation::default();
    validation.leeway = 0;
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|_| Error::Unauthorized)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret";

    #[test]
    fn test_create_and_validate_token() {
        let claims = Claims::new("u1", "13800000000", LoginType::Mcn, 60);
        let token = create_token(&claims, SECRET).expect("Failed to create token");
        let decoded = validate_token(&token, SECRET).expect("Failed to validate token");

        assert_eq!(decoded.sub, "u1");
        assert_eq!(decoded.login_type, LoginType::Mcn);
        assert_eq!(decoded.jti, claims.jti);
        assert!(!decoded.is_expired());
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let claims = Claims::new("u1", "1", LoginType::Brand, 60);
        let token = create_token(&claims, SECRET).unwrap();
        assert!(matches!(
            validate_token(&token, "other-secret"),
            Err(Error::Unauthorized)
        ));
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let mut claims = Claims::new("u1", "1", LoginType::Brand, 60);
        claims.exp = chrono::Utc::now().timestamp() - 5;
        let token = create_token(&claims, SECRET).unwrap();
        assert!(validate_token(&token, SECRET).is_err());
    }

    #[test]
    fn test_invalid_token() {
        assert!(validate_token("invalid.token.here", SECRET).is_err());
    }
}
