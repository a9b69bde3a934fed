//! Bearer-token decoding.

use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use thiserror::Error;

use opsgate_auth::AuthClaims;

#[derive(Debug, Error)]
pub enum TokenDecodeError {
    #[error("invalid token: {0}")]
    Invalid(String),
}

pub trait TokenDecoder: Send + Sync {
    fn decode(&self, token: &str) -> Result<AuthClaims, TokenDecodeError>;
}

/// HS256 decoder.
///
/// Time-window checks run separately through `opsgate_auth::validate_claims`
/// against the claims' own timestamps, so jsonwebtoken's spec-claim
/// validation is disabled here.
pub struct Hs256TokenDecoder {
    key: DecodingKey,
    validation: Validation,
}

impl Hs256TokenDecoder {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.required_spec_claims.clear();
        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }
}

impl TokenDecoder for Hs256TokenDecoder {
    fn decode(&self, token: &str) -> Result<AuthClaims, TokenDecodeError> {
        jsonwebtoken::decode::<AuthClaims>(token, &self.key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| TokenDecodeError::Invalid(e.to_string()))
    }
}
