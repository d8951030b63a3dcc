//! Access tokens signed with a shared HMAC secret (HS256)
//!
//! Tokens carry the user id, email, role and the industries a specialist is
//! assigned to. They are issued by the identity provider in front of the
//! portal; [`JwtManager::issue_token`] exists for tooling and tests.

pub mod error;
mod types;

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};

pub use types::{PortalClaims, UserRole, TOKEN_EXPIRATION_SECS};

use crate::types::Environment;
use error::JwtError;

/// Shortest secret accepted outside development
const MIN_SECRET_LEN: usize = 32;

/// Signs and validates HS256 access tokens
#[derive(Clone)]
pub struct JwtManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtManager {
    /// Creates a manager from a raw secret
    #[must_use]
    pub fn new(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
        }
    }

    /// Creates a manager from the environment's `JWT_SECRET`
    ///
    /// # Errors
    ///
    /// Returns `JwtError::Secret` if the secret is missing, or too
    /// short outside development
    pub fn from_environment(environment: &Environment) -> Result<Self, JwtError> {
        let secret = environment
            .jwt_secret()
            .ok_or_else(|| JwtError::Secret("JWT_SECRET is not set".to_string()))?;

        if !matches!(environment, Environment::Development) && secret.len() < MIN_SECRET_LEN {
            return Err(JwtError::Secret(format!(
                "JWT_SECRET must be at least {MIN_SECRET_LEN} bytes"
            )));
        }

        tracing::info!("JWT manager initialized");
        Ok(Self::new(secret.as_bytes()))
    }

    /// Issues a signed token for `claims`
    ///
    /// # Errors
    ///
    /// Returns `JwtError::Signing` if signing fails
    pub fn issue_token(&self, claims: &PortalClaims) -> Result<String, JwtError> {
        Ok(encode(
            &Header::new(Algorithm::HS256),
            claims,
            &self.encoding_key,
        )?)
    }

    /// Verifies signature and expiry and returns the claims
    ///
    /// # Errors
    ///
    /// Returns `JwtError::InvalidToken` for any invalid token
    pub fn validate(&self, token: &str) -> Result<PortalClaims, JwtError> {
        decode::<PortalClaims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|err| {
                tracing::debug!("token rejected: {err}");
                JwtError::InvalidToken
            })
    }
}
