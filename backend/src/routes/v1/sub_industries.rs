use std::sync::Arc;

use axum::{extract::Path, http::StatusCode, Extension, Json};
use portal_storage::{
    sub_industry::{NewSubIndustry, SubIndustry, SubIndustryPatch},
    Catalog,
};
use schemars::JsonSchema;
use serde::Deserialize;
use validator::Validate;

use crate::{
    middleware::AuthenticatedUser,
    types::{AppError, ValidatedJson},
};

/// Request to create a sub-industry
#[derive(Debug, Deserialize, JsonSchema, Validate)]
#[serde(deny_unknown_fields)]
pub struct CreateSubIndustryRequest {
    /// Display name
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    /// Optional long description
    #[validate(length(max = 5000))]
    pub description: Option<String>,
}

/// Partial update of a sub-industry
#[derive(Debug, Deserialize, JsonSchema, Validate)]
#[serde(deny_unknown_fields)]
pub struct UpdateSubIndustryRequest {
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

/// List the sub-industries of an industry
///
/// # Errors
///
/// - `404 NOT_FOUND` - Industry does not exist
pub async fn list_sub_industries(
    Path(industry_id): Path<String>,
    Extension(catalog): Extension<Arc<Catalog>>,
) -> Result<Json<Vec<SubIndustry>>, AppError> {
    catalog.industries.get(&industry_id).await?;

    Ok(Json(
        catalog.sub_industries.list_by_industry(&industry_id).await?,
    ))
}

/// Get a sub-industry by ID
///
/// # Errors
///
/// - `404 NOT_FOUND` - Sub-industry does not exist
pub async fn get_sub_industry(
    Path(id): Path<String>,
    Extension(catalog): Extension<Arc<Catalog>>,
) -> Result<Json<SubIndustry>, AppError> {
    Ok(Json(catalog.sub_industries.get(&id).await?))
}

/// Create a sub-industry under an industry
///
/// Admins and specialists assigned to the industry.
///
/// # Errors
///
/// - `404 NOT_FOUND` - Industry does not exist
/// - `403 FORBIDDEN` - Caller is not assigned to the industry
/// - `409 CONFLICT` - Industry was deleted concurrently
pub async fn create_sub_industry(
    user: AuthenticatedUser,
    Path(industry_id): Path<String>,
    Extension(catalog): Extension<Arc<Catalog>>,
    ValidatedJson(payload): ValidatedJson<CreateSubIndustryRequest>,
) -> Result<(StatusCode, Json<SubIndustry>), AppError> {
    user.require_industry_access(&industry_id)?;

    let sub_industry = catalog
        .sub_industries
        .create(
            &industry_id,
            NewSubIndustry {
                name: payload.name,
                description: payload.description,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(sub_industry)))
}

/// Update a sub-industry
///
/// # Errors
///
/// - `404 NOT_FOUND` - Sub-industry does not exist
/// - `403 FORBIDDEN` - Caller is not assigned to the industry
/// - `409 CONFLICT` - Sub-industry changed since `version` was read
pub async fn update_sub_industry(
    user: AuthenticatedUser,
    Path(id): Path<String>,
    Extension(catalog): Extension<Arc<Catalog>>,
    ValidatedJson(payload): ValidatedJson<UpdateSubIndustryRequest>,
) -> Result<Json<SubIndustry>, AppError> {
    let current = catalog.sub_industries.get(&id).await?;
    user.require_industry_access(&current.industry_id)?;

    let patch = SubIndustryPatch {
        name: payload.name,
        description: payload.description,
    };
    let sub_industry = catalog
        .sub_industries
        .update(&id, &patch, payload.version)
        .await?;

    Ok(Json(sub_industry))
}

/// Delete a sub-industry
///
/// # Errors
///
/// - `404 NOT_FOUND` - Sub-industry does not exist
/// - `403 FORBIDDEN` - Caller is not assigned to the industry
/// - `409 CONFLICT` - Use cases still exist (`details.dependents`)
pub async fn delete_sub_industry(
    user: AuthenticatedUser,
    Path(id): Path<String>,
    Extension(catalog): Extension<Arc<Catalog>>,
) -> Result<StatusCode, AppError> {
    let current = catalog.sub_industries.get(&id).await?;
    user.require_industry_access(&current.industry_id)?;

    catalog.sub_industries.delete(&id).await?;

    Ok(StatusCode::NO_CONTENT)
}
