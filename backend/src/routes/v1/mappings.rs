use std::sync::Arc;

use axum::{extract::Path, http::StatusCode, Extension, Json};
use futures::future::try_join_all;
use portal_storage::{mapping::Mapping, solution::Solution, use_case::UseCase, Catalog};
use schemars::JsonSchema;
use serde::Deserialize;
use validator::Validate;

use crate::{
    middleware::AuthenticatedUser,
    types::{AppError, ValidatedJson},
};

/// Identifies one use case to solution mapping
#[derive(Debug, Deserialize, JsonSchema)]
pub struct MappingPath {
    /// Use case ID
    pub id: String,
    /// Solution ID
    pub solution_id: String,
}

#[derive(Debug, Default, Deserialize, JsonSchema, Validate)]
#[serde(deny_unknown_fields)]
pub struct MapSolutionRequest {
    /// Free-form remark on how the solution covers the use case
    #[validate(length(max = 2000))]
    #[serde(default)]
    pub notes: Option<String>,
}

/// List the solutions mapped to a use case
///
/// # Errors
///
/// - `404 NOT_FOUND` - Use case does not exist
pub async fn list_use_case_solutions(
    Path(id): Path<String>,
    Extension(catalog): Extension<Arc<Catalog>>,
) -> Result<Json<Vec<Solution>>, AppError> {
    catalog.use_cases.get(&id).await?;
    let mappings = catalog.mappings.list_by_use_case(&id).await?;

    let solutions = try_join_all(
        mappings
            .iter()
            .map(|mapping| catalog.solutions.get(&mapping.solution_id)),
    )
    .await?;

    Ok(Json(solutions))
}

/// List the use cases a solution is mapped to
///
/// # Errors
///
/// - `404 NOT_FOUND` - Solution does not exist
pub async fn list_solution_use_cases(
    Path(id): Path<String>,
    Extension(catalog): Extension<Arc<Catalog>>,
) -> Result<Json<Vec<UseCase>>, AppError> {
    catalog.solutions.get(&id).await?;
    let mappings = catalog.mappings.list_by_solution(&id).await?;

    let use_cases = try_join_all(
        mappings
            .iter()
            .map(|mapping| catalog.use_cases.get(&mapping.use_case_id)),
    )
    .await?;

    Ok(Json(use_cases))
}

/// Map a solution to a use case
///
/// # Errors
///
/// - `404 NOT_FOUND` - Use case or solution does not exist
/// - `403 FORBIDDEN` - Caller is not assigned to the use case's industry
/// - `409 CONFLICT` - Pair is already mapped
pub async fn map_solution(
    user: AuthenticatedUser,
    Path(path): Path<MappingPath>,
    Extension(catalog): Extension<Arc<Catalog>>,
    ValidatedJson(payload): ValidatedJson<MapSolutionRequest>,
) -> Result<(StatusCode, Json<Mapping>), AppError> {
    let use_case = catalog.use_cases.get(&path.id).await?;
    user.require_industry_access(&use_case.industry_id)?;

    let mapping = catalog
        .mappings
        .create(&path.id, &path.solution_id, payload.notes)
        .await?;

    Ok((StatusCode::CREATED, Json(mapping)))
}

/// Remove a use case to solution mapping
///
/// # Errors
///
/// - `404 NOT_FOUND` - Mapping does not exist
/// - `403 FORBIDDEN` - Caller is not assigned to the use case's industry
/// - `409 CONFLICT` - Customer cases still reference the pair
pub async fn unmap_solution(
    user: AuthenticatedUser,
    Path(path): Path<MappingPath>,
    Extension(catalog): Extension<Arc<Catalog>>,
) -> Result<StatusCode, AppError> {
    let use_case = catalog.use_cases.get(&path.id).await?;
    user.require_industry_access(&use_case.industry_id)?;

    catalog.mappings.delete(&path.id, &path.solution_id).await?;

    Ok(StatusCode::NO_CONTENT)
}
