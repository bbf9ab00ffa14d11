use jsonwebtoken::{decode, DecodingKey, Validation};

use crate::config::AuthConfig;
use crate::error::ApiError;

use super::Claims;

/// Bearer-token validation for optional authenticated identity.
///
/// Identity is delegated to an external issuer; this service only verifies
/// the signature and standard claims. With no secret configured the
/// validator is disabled and every caller is a guest.
pub struct JwtValidator {
    inner: Option<(DecodingKey, Validation)>,
}

impl JwtValidator {
    pub fn new(config: &AuthConfig) -> Self {
        let inner = config.jwt_secret.as_ref().map(|secret| {
            let decoding_key = DecodingKey::from_secret(secret.as_bytes());

            let mut validation = Validation::default();

            if let Some(ref issuer) = config.issuer {
                validation.set_issuer(&[issuer]);
            }

            if let Some(ref audience) = config.audience {
                validation.set_audience(&[audience]);
            }

            (decoding_key, validation)
        });

        Self { inner }
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.is_some()
    }

    pub fn validate(&self, token: &str) -> Result<Claims, ApiError> {
        let (decoding_key, validation) = self
            .inner
            .as_ref()
            .ok_or_else(|| ApiError::unauthorized("JWT validation is not configured"))?;

        let token_data = decode::<Claims>(token, decoding_key, validation)
            .map_err(|e| ApiError::unauthorized(format!("Invalid token: {}", e)))?;

        Ok(token_data.claims)
    }
}
