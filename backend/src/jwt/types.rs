use chrono::Utc;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum::Display;

/// Token lifetime in seconds (12 hours)
pub const TOKEN_EXPIRATION_SECS: i64 = 12 * 60 * 60;

/// Role of a portal editor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum UserRole {
    /// Full access to every collection
    Admin,
    /// Edits the industries they are assigned to, plus solutions and content
    Specialist,
}

/// Claims carried by an access token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortalClaims {
    /// User id
    pub sub: String,
    /// User email
    pub email: String,
    /// Editor role
    pub role: UserRole,
    /// Industry ids a specialist may edit
    #[serde(default)]
    pub industries: Vec<String>,
    /// Expiry as a Unix timestamp in seconds
    pub exp: i64,
}

impl PortalClaims {
    /// Claims expiring [`TOKEN_EXPIRATION_SECS`] from now
    #[must_use]
    pub fn new(
        sub: impl Into<String>,
        email: impl Into<String>,
        role: UserRole,
        industries: Vec<String>,
    ) -> Self {
        Self {
            sub: sub.into(),
            email: email.into(),
            role,
            industries,
            exp: Utc::now().timestamp() + TOKEN_EXPIRATION_SECS,
        }
    }
}
