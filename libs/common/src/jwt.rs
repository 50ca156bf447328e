//! JWT service for token generation and validation
//!
//! Tokens are signed with RS256 when an RSA key pair is configured, or with
//! HS256 when only a shared secret is available. The auth service holds the
//! signing key; the api service only needs the verification key.

use anyhow::{Result, anyhow};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

use crate::error::ConfigError;

/// Key material used to sign and verify tokens
#[derive(Debug, Clone)]
pub enum JwtKeys {
    /// RS256 key pair in PEM format; the private key is optional for
    /// services that only verify tokens
    Rsa {
        private_key: Option<String>,
        public_key: String,
    },
    /// HS256 shared secret
    Hmac { secret: String },
}

/// JWT configuration
#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub keys: JwtKeys,
    /// Access token expiration time in seconds (default: 1 hour)
    pub access_token_expiry: u64,
    /// Refresh token expiration time in seconds (default: 7 days)
    pub refresh_token_expiry: u64,
}

/// Read a PEM value that may also be given as a path to a file
fn read_pem(name: &'static str, value: String) -> Result<String, ConfigError> {
    if value.starts_with("-----BEGIN") {
        return Ok(value);
    }

    std::fs::read_to_string(&value)
        .map(|pem| pem.trim().to_string())
        .map_err(|e| ConfigError::Invalid {
            name,
            reason: format!("failed to read key file {}: {}", value, e),
        })
}

fn env_u64(name: &str, default: u64) -> u64 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl JwtConfig {
    /// Create a new JwtConfig from environment variables
    ///
    /// # Environment Variables
    /// - `JWT_PUBLIC_KEY`: RSA public key (PEM or path); selects RS256
    /// - `JWT_PRIVATE_KEY`: RSA private key (PEM or path); needed to issue tokens
    /// - `JWT_SECRET`: shared secret; selects HS256 when no public key is set
    /// - `JWT_ACCESS_TOKEN_EXPIRY`: Access token expiry in seconds (default: 3600)
    /// - `JWT_REFRESH_TOKEN_EXPIRY`: Refresh token expiry in seconds (default: 604800)
    pub fn from_env() -> Result<Self, ConfigError> {
        let keys = match std::env::var("JWT_PUBLIC_KEY") {
            Ok(public_key) => JwtKeys::Rsa {
                public_key: read_pem("JWT_PUBLIC_KEY", public_key)?,
                private_key: std::env::var("JWT_PRIVATE_KEY")
                    .ok()
                    .map(|key| read_pem("JWT_PRIVATE_KEY", key))
                    .transpose()?,
            },
            Err(_) => {
                let secret = std::env::var("JWT_SECRET")
                    .map_err(|_| ConfigError::Missing("JWT_PUBLIC_KEY or JWT_SECRET"))?;
                if secret.len() < 32 {
                    return Err(ConfigError::Invalid {
                        name: "JWT_SECRET",
                        reason: "must be at least 32 bytes long".to_string(),
                    });
                }
                JwtKeys::Hmac { secret }
            }
        };

        Ok(JwtConfig {
            keys,
            access_token_expiry: env_u64("JWT_ACCESS_TOKEN_EXPIRY", 3600),
            refresh_token_expiry: env_u64("JWT_REFRESH_TOKEN_EXPIRY", 604800),
        })
    }
}

/// JWT claims structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Claims {
    /// User ID
    pub sub: Uuid,
    /// User email
    pub email: String,
    /// Issued at time
    pub iat: u64,
    /// Expiration time
    pub exp: u64,
    /// Unique token id, keeps two tokens issued in the same second distinct
    pub jti: Uuid,
    /// Token type (access or refresh)
    pub token_type: TokenType,
}

/// Token type enum
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    /// Access token
    Access,
    /// Refresh token
    Refresh,
}

/// JWT service
#[derive(Clone)]
pub struct JwtService {
    algorithm: Algorithm,
    encoding_key: Option<EncodingKey>,
    decoding_key: DecodingKey,
    validation: Validation,
    config: JwtConfig,
}

/// Seconds since the Unix epoch
pub fn now_secs() -> Result<u64> {
    Ok(SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| anyhow!("Failed to get current time: {}", e))?
        .as_secs())
}

impl JwtService {
    /// Initialize a new JWT service
    pub fn new(config: JwtConfig) -> Result<Self> {
        let (algorithm, encoding_key, decoding_key) = match &config.keys {
            JwtKeys::Rsa {
                private_key,
                public_key,
            } => (
                Algorithm::RS256,
                private_key
                    .as_ref()
                    .map(|key| EncodingKey::from_rsa_pem(key.as_bytes()))
                    .transpose()?,
                DecodingKey::from_rsa_pem(public_key.as_bytes())?,
            ),
            JwtKeys::Hmac { secret } => (
                Algorithm::HS256,
                Some(EncodingKey::from_secret(secret.as_bytes())),
                DecodingKey::from_secret(secret.as_bytes()),
            ),
        };

        let mut validation = Validation::new(algorithm);
        validation.validate_exp = true;
        validation.leeway = 0;

        Ok(JwtService {
            algorithm,
            encoding_key,
            decoding_key,
            validation,
            config,
        })
    }

    fn issue(&self, user_id: Uuid, email: &str, token_type: TokenType) -> Result<String> {
        let encoding_key = self
            .encoding_key
            .as_ref()
            .ok_or_else(|| anyhow!("No signing key configured"))?;

        let now = now_secs()?;
        let expiry = match token_type {
            TokenType::Access => self.config.access_token_expiry,
            TokenType::Refresh => self.config.refresh_token_expiry,
        };

        let claims = Claims {
            sub: user_id,
            email: email.to_string(),
            iat: now,
            exp: now + expiry,
            jti: Uuid::new_v4(),
            token_type,
        };

        Ok(encode(&Header::new(self.algorithm), &claims, encoding_key)?)
    }

    /// Generate an access token for a user
    pub fn generate_access_token(&self, user_id: Uuid, email: &str) -> Result<String> {
        self.issue(user_id, email, TokenType::Access)
    }

    /// Generate a refresh token for a user
    pub fn generate_refresh_token(&self, user_id: Uuid, email: &str) -> Result<String> {
        self.issue(user_id, email, TokenType::Refresh)
    }

    /// Validate a token and return the claims
    pub fn validate_token(&self, token: &str) -> Result<Claims> {
        let token_data = decode::<Claims>(token, &self.decoding_key, &self.validation)?;
        Ok(token_data.claims)
    }

    /// Validate a token and check that it has the expected type
    pub fn validate_token_of_type(&self, token: &str, expected: TokenType) -> Result<Claims> {
        let claims = self.validate_token(token)?;
        if claims.token_type != expected {
            return Err(anyhow!("Expected a {:?} token", expected));
        }
        Ok(claims)
    }

    /// Get the access token expiry time
    pub fn access_token_expiry(&self) -> u64 {
        self.config.access_token_expiry
    }

    /// Get the refresh token expiry time
    pub fn refresh_token_expiry(&self) -> u64 {
        self.config.refresh_token_expiry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn hmac_service() -> JwtService {
        JwtService::new(JwtConfig {
            keys: JwtKeys::Hmac {
                secret: "an-hmac-secret-that-is-long-enough!!".to_string(),
            },
            access_token_expiry: 900,
            refresh_token_expiry: 3600,
        })
        .unwrap()
    }

    #[test]
    fn test_access_token_round_trip() {
        let service = hmac_service();
        let user_id = Uuid::new_v4();

        let token = service
            .generate_access_token(user_id, "a@test.com")
            .unwrap();
        let claims = service.validate_token(&token).unwrap();

        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.email, "a@test.com");
        assert_eq!(claims.token_type, TokenType::Access);
        assert_eq!(claims.exp - claims.iat, 900);
    }

    #[test]
    fn test_refresh_token_is_not_an_access_token() {
        let service = hmac_service();
        let token = service
            .generate_refresh_token(Uuid::new_v4(), "a@test.com")
            .unwrap();

        assert!(
            service
                .validate_token_of_type(&token, TokenType::Refresh)
                .is_ok()
        );
        assert!(
            service
                .validate_token_of_type(&token, TokenType::Access)
                .is_err()
        );
    }

    #[test]
    fn test_tokens_are_unique() {
        let service = hmac_service();
        let user_id = Uuid::new_v4();

        let first = service.generate_refresh_token(user_id, "a@test.com").unwrap();
        let second = service.generate_refresh_token(user_id, "a@test.com").unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn test_rejects_token_signed_with_other_secret() {
        let other = JwtService::new(JwtConfig {
            keys: JwtKeys::Hmac {
                secret: "a-completely-different-secret-value!".to_string(),
            },
            access_token_expiry: 900,
            refresh_token_expiry: 3600,
        })
        .unwrap();

        let token = other
            .generate_access_token(Uuid::new_v4(), "a@test.com")
            .unwrap();
        assert!(hmac_service().validate_token(&token).is_err());
    }

    #[test]
    fn test_rejects_expired_token() {
        let service = hmac_service();
        let claims = Claims {
            sub: Uuid::new_v4(),
            email: "a@test.com".to_string(),
            iat: 1_000,
            exp: 2_000,
            jti: Uuid::new_v4(),
            token_type: TokenType::Access,
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(b"an-hmac-secret-that-is-long-enough!!"),
        )
        .unwrap();

        assert!(service.validate_token(&token).is_err());
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(hmac_service().validate_token("not.a.token").is_err());
    }

    #[test]
    #[serial]
    fn test_jwt_config_from_env_with_secret() {
        unsafe {
            std::env::remove_var("JWT_PUBLIC_KEY");
            std::env::remove_var("JWT_PRIVATE_KEY");
            std::env::remove_var("JWT_ACCESS_TOKEN_EXPIRY");
            std::env::remove_var("JWT_REFRESH_TOKEN_EXPIRY");
            std::env::set_var("JWT_SECRET", "0123456789abcdef0123456789abcdef");
        }

        let config = JwtConfig::from_env().unwrap();
        assert!(matches!(config.keys, JwtKeys::Hmac { .. }));
        assert_eq!(config.access_token_expiry, 3600);
        assert_eq!(config.refresh_token_expiry, 604800);

        unsafe {
            std::env::remove_var("JWT_SECRET");
        }
    }

    #[test]
    #[serial]
    fn test_jwt_config_rejects_short_secret() {
        unsafe {
            std::env::remove_var("JWT_PUBLIC_KEY");
            std::env::set_var("JWT_SECRET", "short");
        }

        assert!(matches!(
            JwtConfig::from_env(),
            Err(ConfigError::Invalid { name: "JWT_SECRET", .. })
        ));

        unsafe {
            std::env::remove_var("JWT_SECRET");
        }
    }

    #[test]
    #[serial]
    fn test_jwt_config_requires_keys() {
        unsafe {
            std::env::remove_var("JWT_PUBLIC_KEY");
            std::env::remove_var("JWT_SECRET");
        }

        assert!(matches!(
            JwtConfig::from_env(),
            Err(ConfigError::Missing(_))
        ));
    }

    #[test]
    fn test_verify_only_service_cannot_issue() {
        let service = hmac_service();
        let verify_only = JwtService {
            encoding_key: None,
            ..service
        };

        assert!(
            verify_only
                .generate_access_token(Uuid::new_v4(), "a@test.com")
                .is_err()
        );
    }
}
