//! Token error types

use thiserror::Error;

/// Errors raised while signing or checking access tokens
#[derive(Error, Debug)]
pub enum JwtError {
    /// Signing a token failed
    #[error("Failed to sign token: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),

    /// Signature, expiry or claims did not check out
    #[error("Invalid or expired token")]
    InvalidToken,

    /// The signing secret is missing or unusable
    #[error("Unusable JWT secret: {0}")]
    Secret(String),
}
