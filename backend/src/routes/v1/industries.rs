use std::sync::Arc;

use axum::{extract::Path, http::StatusCode, Extension, Json};
use portal_storage::{
    industry::{Industry, IndustryPatch, NewIndustry},
    Catalog,
};
use schemars::JsonSchema;
use serde::Deserialize;
use validator::Validate;

use crate::{
    middleware::AuthenticatedUser,
    types::{AppError, ValidatedJson},
};

/// Request to create an industry
#[derive(Debug, Deserialize, JsonSchema, Validate)]
#[serde(deny_unknown_fields)]
pub struct CreateIndustryRequest {
    /// Display name
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    /// Optional long description
    #[validate(length(max = 5000))]
    pub description: Option<String>,
}

impl From<CreateIndustryRequest> for NewIndustry {
    fn from(request: CreateIndustryRequest) -> Self {
        Self {
            name: request.name,
            description: request.description,
        }
    }
}

/// Partial update of an industry
#[derive(Debug, Deserialize, JsonSchema, Validate)]
#[serde(deny_unknown_fields)]
pub struct UpdateIndustryRequest {
    /// Version the client last read
    #[validate(range(min = 0))]
    pub version: i64,
    /// New display name
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    /// New description
    #[validate(length(max = 5000))]
    pub description: Option<String>,
}

/// List all industries
///
/// Public. Industries are sorted by name.
///
/// # Errors
///
/// - `500 INTERNAL_SERVER_ERROR` - Storage operation fails
pub async fn list_industries(
    Extension(catalog): Extension<Arc<Catalog>>,
) -> Result<Json<Vec<Industry>>, AppError> {
    Ok(Json(catalog.industries.list().await?))
}

/// Get an industry by ID
///
/// # Errors
///
/// - `404 NOT_FOUND` - Industry does not exist
pub async fn get_industry(
    Path(id): Path<String>,
    Extension(catalog): Extension<Arc<Catalog>>,
) -> Result<Json<Industry>, AppError> {
    Ok(Json(catalog.industries.get(&id).await?))
}

/// Create an industry
///
/// # Arguments
///
/// * `user` - The authenticated admin
/// * `payload` - Name and description of the industry
///
/// # Returns
///
/// Returns `201 CREATED` with the stored industry at version 1
///
/// # Errors
///
/// - `400 BAD_REQUEST` - Invalid request body
/// - `401 UNAUTHORIZED` - Missing or invalid token
/// - `403 FORBIDDEN` - Caller is not an admin
pub async fn create_industry(
    user: AuthenticatedUser,
    Extension(catalog): Extension<Arc<Catalog>>,
    ValidatedJson(payload): ValidatedJson<CreateIndustryRequest>,
) -> Result<(StatusCode, Json<Industry>), AppError> {
    user.require_admin()?;

    let industry = catalog.industries.create(payload.into()).await?;

    Ok((StatusCode::CREATED, Json(industry)))
}

/// Update an industry
///
/// Only the fields present in the body change. The body's `version` must
/// match the stored one.
///
/// # Errors
///
/// - `404 NOT_FOUND` - Industry does not exist
/// - `409 CONFLICT` - Industry changed since `version` was read
/// - `403 FORBIDDEN` - Caller is not an admin
pub async fn update_industry(
    user: AuthenticatedUser,
    Path(id): Path<String>,
    Extension(catalog): Extension<Arc<Catalog>>,
    ValidatedJson(payload): ValidatedJson<UpdateIndustryRequest>,
) -> Result<Json<Industry>, AppError> {
    user.require_admin()?;

    let patch = IndustryPatch {
        name: payload.name,
        description: payload.description,
    };
    let industry = catalog
        .industries
        .update(&id, &patch, payload.version)
        .await?;

    Ok(Json(industry))
}

/// Delete an industry
///
/// # Returns
///
/// Returns `204 NO_CONTENT` on successful deletion
///
/// # Errors
///
/// - `404 NOT_FOUND` - Industry does not exist
/// - `409 CONFLICT` - Sub-industries or tagged news/blogs still exist (`details.dependents`)
/// - `403 FORBIDDEN` - Caller is not an admin
pub async fn delete_industry(
    user: AuthenticatedUser,
    Path(id): Path<String>,
    Extension(catalog): Extension<Arc<Catalog>>,
) -> Result<StatusCode, AppError> {
    user.require_admin()?;

    catalog.industries.delete(&id).await?;

    Ok(StatusCode::NO_CONTENT)
}
