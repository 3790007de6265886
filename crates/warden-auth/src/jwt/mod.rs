//! JWT access token encoding, decoding, and claims.

pub mod claims;
pub mod decoder;
pub mod encoder;

pub use claims::Claims;
pub use decoder::JwtDecoder;
pub use encoder::{IssuedToken, JwtEncoder};

use jsonwebtoken::Algorithm;
use warden_core::{AppError, AppResult};

/// Resolve the configured signing algorithm. Only HMAC algorithms are
/// accepted since tokens are signed with a shared secret.
pub(crate) fn hmac_algorithm(name: &str) -> AppResult<Algorithm> {
    match name.to_ascii_uppercase().as_str() {
        "HS256" => Ok(Algorithm::HS256),
        "HS384" => Ok(Algorithm::HS384),
        "HS512" => Ok(Algorithm::HS512),
        other => Err(AppError::configuration(format!(
            "Unsupported JWT algorithm '{other}', expected HS256, HS384 or HS512"
        ))),
    }
}
