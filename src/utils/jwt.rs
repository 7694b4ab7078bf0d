use crate::config::IdentityConfig;
use crate::error::{AppError, AppResult};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};

/// Session claims issued by the identity provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: String, // provider user id
    pub exp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nbf: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
    /// Authorized party: the origin the session was minted for.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub azp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sid: Option<String>,
}

/// Verifies identity-provider session tokens. Networkless: the provider's
/// public key (or a dev shared secret) comes from configuration.
#[derive(Clone)]
pub struct SessionVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
    authorized_parties: Vec<String>,
}

impl SessionVerifier {
    pub fn from_config(config: &IdentityConfig) -> AppResult<Self> {
        let (decoding_key, algorithm) = match (&config.jwt_public_key, &config.jwt_secret) {
            (Some(pem), _) => (
                DecodingKey::from_rsa_pem(pem.replace("\\n", "\n").as_bytes())?,
                Algorithm::RS256,
            ),
            (None, Some(secret)) => (
                DecodingKey::from_secret(secret.as_bytes()),
                Algorithm::HS256,
            ),
            (None, None) => {
                return Err(AppError::ConfigError(
                    "identity.jwt_public_key or identity.jwt_secret must be set".to_string(),
                ));
            }
        };

        let mut validation = Validation::new(algorithm);
        validation.validate_nbf = true;
        validation.validate_aud = false;
        if let Some(iss) = &config.issuer {
            validation.set_issuer(&[iss]);
        }

        Ok(Self {
            decoding_key,
            validation,
            authorized_parties: config.authorized_parties.clone(),
        })
    }

    pub fn with_secret(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_aud = false;
        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            authorized_parties: Vec::new(),
        }
    }

    pub fn verify_session_token(&self, token: &str) -> AppResult<SessionClaims> {
        let claims = decode::<SessionClaims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)?;

        if claims.sub.is_empty() {
            return Err(AppError::AuthError("Session has no subject".to_string()));
        }

        if !self.authorized_parties.is_empty() {
            match &claims.azp {
                Some(azp) if self.authorized_parties.iter().any(|p| p == azp) => {}
                _ => {
                    return Err(AppError::AuthError(
                        "Session minted for an unknown origin".to_string(),
                    ));
                }
            }
        }

        Ok(claims)
    }
}
