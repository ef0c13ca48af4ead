use anyhow::{Context, Result};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// JWT Claims - data carried by the identity provider's access token
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String, // Subject (owner id as string)
    pub exp: i64,    // Expiration timestamp
    pub iat: i64,    // Issued at timestamp
    pub iss: String, // Issuer
}

impl Claims {
    /// Owner id from `sub`
    pub fn owner_id(&self) -> Result<Uuid> {
        Uuid::parse_str(&self.sub).context("token subject is not a UUID")
    }
}

/// JWT Service - verifies access tokens minted by the identity provider
///
/// Tokens are HS256 with a secret shared with the provider. `create_token`
/// exists for local development and tests.
#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
}

impl JwtService {
    /// Create new JWT service with secret and issuer
    pub fn new(secret: &str, issuer: String) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            issuer,
        }
    }

    /// Mint a token for an owner, valid for `ttl`
    pub fn create_token(&self, owner_id: Uuid, ttl: chrono::Duration) -> Result<String> {
        let now = chrono::Utc::now();

        let claims = Claims {
            sub: owner_id.to_string(),
            exp: (now + ttl).timestamp(),
            iat: now.timestamp(),
            iss: self.issuer.clone(),
        };

        encode(&Header::default(), &claims, &self.encoding_key).map_err(Into::into)
    }

    /// Verify and decode a JWT token
    ///
    /// Returns claims if token is valid, unexpired and from our issuer
    pub fn verify_token(&self, token: &str) -> Result<Claims> {
        let mut validation = Validation::default();
        validation.set_issuer(&[&self.issuer]);

        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> JwtService {
        JwtService::new("test_secret_key", "test_issuer".to_string())
    }

    #[test]
    fn test_create_and_verify_token() {
        let service = service();
        let owner_id = Uuid::new_v4();

        let token = service
            .create_token(owner_id, chrono::Duration::hours(1))
            .unwrap();

        let claims = service.verify_token(&token).unwrap();
        assert_eq!(claims.owner_id().unwrap(), owner_id);
        assert_eq!(claims.iss, "test_issuer");
    }

    #[test]
    fn test_invalid_token() {
        assert!(service().verify_token("invalid_token").is_err());
    }

    #[test]
    fn test_wrong_secret() {
        let service1 = JwtService::new("secret1", "test_issuer".to_string());
        let service2 = JwtService::new("secret2", "test_issuer".to_string());

        let token = service1
            .create_token(Uuid::new_v4(), chrono::Duration::hours(1))
            .unwrap();

        // Token created with secret1 should not verify with secret2
        assert!(service2.verify_token(&token).is_err());
    }

    #[test]
    fn test_wrong_issuer() {
        let minted = JwtService::new("shared", "someone_else".to_string())
            .create_token(Uuid::new_v4(), chrono::Duration::hours(1))
            .unwrap();

        let ours = JwtService::new("shared", "test_issuer".to_string());
        assert!(ours.verify_token(&minted).is_err());
    }

    #[test]
    fn test_expired_token() {
        let service = service();
        // Well past the default 60s leeway
        let token = service
            .create_token(Uuid::new_v4(), chrono::Duration::minutes(-10))
            .unwrap();

        assert!(service.verify_token(&token).is_err());
    }

    #[test]
    fn test_non_uuid_subject() {
        let claims = Claims {
            sub: "user-42".to_string(),
            exp: 0,
            iat: 0,
            iss: "test_issuer".to_string(),
        };
        assert!(claims.owner_id().is_err());
    }
}
