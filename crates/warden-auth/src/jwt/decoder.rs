//! Access token verification.

use jsonwebtoken::{DecodingKey, Validation, decode};

use warden_core::config::AuthConfig;
use warden_core::{AppError, AppResult};

use super::claims::Claims;
use super::hmac_algorithm;

/// Validates access tokens.
#[derive(Clone)]
pub struct JwtDecoder {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl std::fmt::Debug for JwtDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtDecoder")
            .field("validation", &self.validation)
            .finish()
    }
}

impl JwtDecoder {
    /// Creates a new decoder from auth configuration.
    pub fn new(config: &AuthConfig) -> AppResult<Self> {
        let mut validation = Validation::new(hmac_algorithm(&config.jwt_algorithm)?);
        validation.validate_exp = true;
        validation.leeway = 5;

        Ok(Self {
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            validation,
        })
    }

    /// Verifies signature and expiry, returning the claims.
    ///
    /// Every failure is an `Authentication` error.
    pub fn decode(&self, token: &str) -> AppResult<Claims> {
        let token_data =
            decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
                match e.kind() {
                    jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                        AppError::authentication("Token has expired")
                    }
                    jsonwebtoken::errors::ErrorKind::InvalidToken => {
                        AppError::authentication("Invalid token format")
                    }
                    jsonwebtoken::errors::ErrorKind::InvalidSignature => {
                        AppError::authentication("Invalid token signature")
                    }
                    _ => AppError::authentication("Could not validate credentials"),
                }
            })?;

        Ok(token_data.claims)
    }
}
