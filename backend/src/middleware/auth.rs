//! Bearer token authentication and role checks

use std::collections::HashSet;
use std::sync::Arc;

use aide::OperationIo;
use axum::{
    extract::{FromRequestParts, Request},
    http::{header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::Response,
    Extension,
};

use crate::{
    jwt::{JwtManager, PortalClaims, UserRole},
    types::AppError,
};

/// Authenticated editor extracted from the access token
#[derive(Debug, Clone, OperationIo)]
pub struct AuthenticatedUser {
    /// User id from the token subject
    pub user_id: String,
    /// User email
    pub email: String,
    /// Editor role
    pub role: UserRole,
    /// Industries a specialist is assigned to
    pub industries: HashSet<String>,
}

impl From<PortalClaims> for AuthenticatedUser {
    fn from(claims: PortalClaims) -> Self {
        Self {
            user_id: claims.sub,
            email: claims.email,
            role: claims.role,
            industries: claims.industries.into_iter().collect(),
        }
    }
}

impl AuthenticatedUser {
    /// Whether the user is an admin
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    /// Only admins pass
    ///
    /// # Errors
    ///
    /// Returns `403 FORBIDDEN` for specialists
    pub fn require_admin(&self) -> Result<(), AppError> {
        if self.is_admin() {
            return Ok(());
        }
        Err(AppError::forbidden("Admin role required"))
    }

    /// Admins and specialists assigned to `industry_id` pass
    ///
    /// # Errors
    ///
    /// Returns `403 FORBIDDEN` for specialists of other industries
    pub fn require_industry_access(&self, industry_id: &str) -> Result<(), AppError> {
        if self.is_admin() || self.industries.contains(industry_id) {
            return Ok(());
        }

        tracing::debug!(user_id = %self.user_id, industry_id, "industry not assigned");
        Err(AppError::forbidden(
            "You are not assigned to this industry",
        ))
    }

    /// Untagged content is open to every editor; tagged content needs industry access
    ///
    /// # Errors
    ///
    /// Returns `403 FORBIDDEN` for specialists of other industries
    pub fn require_content_access(&self, industry_id: Option<&str>) -> Result<(), AppError> {
        industry_id.map_or(Ok(()), |id| self.require_industry_access(id))
    }
}

/// Axum extractor for the authenticated user
///
/// Rejects with `401 UNAUTHORIZED` when the request carried no token.
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Self>()
            .cloned()
            .ok_or_else(|| AppError::unauthorized("Authentication required"))
    }
}

/// JWT Authentication middleware
///
/// This middleware:
/// 1. Lets requests without an `Authorization` header through anonymously
/// 2. Validates a Bearer token using `JwtManager` when one is sent
/// 3. Adds `AuthenticatedUser` to request extensions
///
/// Handlers that need a user take [`AuthenticatedUser`] as an extractor.
///
/// # Errors
///
/// - `AppError` - Malformed, invalid or expired token with 401 status code
pub async fn auth_middleware(
    Extension(jwt_manager): Extension<Arc<JwtManager>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let Some(header) = request.headers().get(AUTHORIZATION) else {
        return Ok(next.run(request).await);
    };

    let token = header
        .to_str()
        .ok()
        .and_then(|header| header.strip_prefix("Bearer "))
        .ok_or_else(|| {
            AppError::unauthorized("Authorization header must contain a valid Bearer token")
        })?;

    let claims = jwt_manager.validate(token)?;

    let user = AuthenticatedUser::from(claims);
    request.extensions_mut().insert(user);

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    fn user(role: UserRole, industries: &[&str]) -> AuthenticatedUser {
        AuthenticatedUser {
            user_id: "u1".to_string(),
            email: "u1@example.com".to_string(),
            role,
            industries: industries.iter().map(ToString::to_string).collect(),
        }
    }

    #[test]
    fn test_admin_passes_every_check() {
        let admin = user(UserRole::Admin, &[]);
        assert!(admin.require_admin().is_ok());
        assert!(admin.require_industry_access("any").is_ok());
    }

    #[test]
    fn test_specialist_is_scoped_to_assigned_industries() {
        let specialist = user(UserRole::Specialist, &["retail"]);

        assert_eq!(
            specialist.require_admin().unwrap_err().status(),
            StatusCode::FORBIDDEN
        );
        assert!(specialist.require_industry_access("retail").is_ok());
        assert!(specialist.require_industry_access("energy").is_err());
        assert!(specialist.require_content_access(None).is_ok());
        assert!(specialist.require_content_access(Some("energy")).is_err());
    }
}
