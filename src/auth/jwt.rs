use crate::config::JwtConfig;
use crate::error::{GatewayError, Result};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::{Principal, PrincipalResolver};

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (the principal)
    pub sub: String,
    /// Issuer
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
    /// Audience
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aud: Option<String>,
    /// Expiration time (Unix timestamp)
    pub exp: usize,
    /// Issued at (Unix timestamp)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iat: Option<usize>,
    /// Additional custom claims
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

/// Production [`PrincipalResolver`]: validates a JWT bearer credential and
/// yields the subject claim as the principal.
pub struct JwtResolver {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtResolver {
    /// Create a new JWT resolver from configuration
    pub fn new(config: &JwtConfig) -> Result<Self> {
        let algorithm = Self::parse_algorithm(&config.algorithm)?;

        let decoding_key = match algorithm {
            Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512 => {
                let secret = config.secret.as_ref().ok_or_else(|| {
                    GatewayError::Config(
                        "JWT secret is required for HS256/HS384/HS512 algorithms".to_string(),
                    )
                })?;
                DecodingKey::from_secret(secret.as_bytes())
            }
            Algorithm::RS256 | Algorithm::RS384 | Algorithm::RS512 => {
                let public_key = config.public_key.as_ref().ok_or_else(|| {
                    GatewayError::Config(
                        "JWT public key is required for RS256/RS384/RS512 algorithms".to_string(),
                    )
                })?;
                DecodingKey::from_rsa_pem(public_key.as_bytes())
                    .map_err(|e| GatewayError::Config(format!("Invalid RSA public key: {}", e)))?
            }
            _ => {
                return Err(GatewayError::Config(format!(
                    "Unsupported JWT algorithm: {}",
                    config.algorithm
                )))
            }
        };

        let mut validation = Validation::new(algorithm);

        if let Some(issuer) = &config.issuer {
            validation.set_issuer(&[issuer]);
        }

        if let Some(audience) = &config.audience {
            validation.set_audience(&[audience]);
        }

        // Expiration is always checked; issuer/audience only when configured
        validation.validate_exp = true;

        Ok(Self {
            decoding_key,
            validation,
        })
    }

    /// Parse algorithm string to Algorithm enum
    fn parse_algorithm(algo: &str) -> Result<Algorithm> {
        match algo.to_uppercase().as_str() {
            "HS256" => Ok(Algorithm::HS256),
            "HS384" => Ok(Algorithm::HS384),
            "HS512" => Ok(Algorithm::HS512),
            "RS256" => Ok(Algorithm::RS256),
            "RS384" => Ok(Algorithm::RS384),
            "RS512" => Ok(Algorithm::RS512),
            _ => Err(GatewayError::Config(format!(
                "Unsupported algorithm: {}",
                algo
            ))),
        }
    }
}

#[async_trait::async_trait]
impl PrincipalResolver for JwtResolver {
    async fn resolve(&self, credential: &str) -> Result<Principal> {
        let token_data = decode::<Claims>(credential, &self.decoding_key, &self.validation)
            .map_err(|e| GatewayError::InvalidToken(format!("Token validation failed: {}", e)))?;

        Ok(Principal::new(token_data.claims.sub))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};

    fn create_test_token(secret: &str, claims: &Claims) -> String {
        encode(
            &Header::new(Algorithm::HS256),
            claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    fn claims(sub: &str, exp_offset_hours: i64) -> Claims {
        Claims {
            sub: sub.to_string(),
            iss: None,
            aud: None,
            exp: (chrono::Utc::now() + chrono::Duration::hours(exp_offset_hours)).timestamp()
                as usize,
            iat: Some(chrono::Utc::now().timestamp() as usize),
            extra: HashMap::new(),
        }
    }

    fn hs256_config(secret: Option<&str>) -> JwtConfig {
        JwtConfig {
            secret: secret.map(|s| s.to_string()),
            public_key: None,
            algorithm: "HS256".to_string(),
            issuer: None,
            audience: None,
        }
    }

    #[test]
    fn test_resolver_creation_hs256() {
        assert!(JwtResolver::new(&hs256_config(Some("test-secret"))).is_ok());
    }

    #[test]
    fn test_resolver_missing_secret() {
        assert!(JwtResolver::new(&hs256_config(None)).is_err());
    }

    #[test]
    fn test_resolver_unknown_algorithm() {
        let config = JwtConfig {
            secret: Some("s".to_string()),
            public_key: None,
            algorithm: "ES999".to_string(),
            issuer: None,
            audience: None,
        };
        assert!(JwtResolver::new(&config).is_err());
    }

    #[tokio::test]
    async fn test_resolve_valid_token() {
        let secret = "test-secret-key";
        let resolver = JwtResolver::new(&hs256_config(Some(secret))).unwrap();

        let token = create_test_token(secret, &claims("user123", 1));

        let principal = resolver.resolve(&token).await.unwrap();
        assert_eq!(principal.as_str(), "user123");
    }

    #[tokio::test]
    async fn test_resolve_expired_token() {
        let secret = "test-secret-key";
        let resolver = JwtResolver::new(&hs256_config(Some(secret))).unwrap();

        let token = create_test_token(secret, &claims("user123", -1));

        let result = resolver.resolve(&token).await;
        assert!(matches!(result, Err(GatewayError::InvalidToken(_))));
    }

    #[tokio::test]
    async fn test_resolve_wrong_secret() {
        let resolver = JwtResolver::new(&hs256_config(Some("right-secret"))).unwrap();

        let token = create_test_token("wrong-secret", &claims("user123", 1));

        assert!(resolver.resolve(&token).await.is_err());
    }

    #[tokio::test]
    async fn test_resolve_issuer_mismatch() {
        let config = JwtConfig {
            secret: Some("secret".to_string()),
            public_key: None,
            algorithm: "HS256".to_string(),
            issuer: Some("https://issuer.example.com".to_string()),
            audience: None,
        };
        let resolver = JwtResolver::new(&config).unwrap();

        let mut c = claims("user123", 1);
        c.iss = Some("https://other.example.com".to_string());
        let token = create_test_token("secret", &c);

        assert!(resolver.resolve(&token).await.is_err());
    }

    #[tokio::test]
    async fn test_resolve_garbage_credential() {
        let resolver = JwtResolver::new(&hs256_config(Some("secret"))).unwrap();
        assert!(resolver.resolve("not-a-jwt").await.is_err());
    }
}
