use std::sync::Arc;

use axum::{extract::Path, http::StatusCode, Extension, Json};
use portal_storage::{
    solution::{NewSolution, Solution, SolutionPatch},
    Catalog,
};
use schemars::JsonSchema;
use serde::Deserialize;
use validator::Validate;

use super::documents::{DocumentResponse, PutDocumentRequest};
use crate::{
    document_storage::{DocumentKind, DocumentStorage},
    middleware::AuthenticatedUser,
    types::{AppError, ValidatedJson},
};

/// Request to register a solution
#[derive(Debug, Deserialize, JsonSchema, Validate)]
#[serde(deny_unknown_fields)]
pub struct CreateSolutionRequest {
    /// Display name
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    /// Optional long description
    #[validate(length(max = 5000))]
    pub description: Option<String>,
    /// Company offering the solution
    #[validate(length(min = 1, max = 200))]
    pub vendor: Option<String>,
    /// Product page
    #[validate(url)]
    pub website: Option<String>,
}

/// Partial update of a solution
#[derive(Debug, Deserialize, JsonSchema, Validate)]
#[serde(deny_unknown_fields)]
pub struct UpdateSolutionRequest {
    /// Version the client last read
    #[validate(range(min = 0))]
    pub version: i64,
    /// New display name
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    /// New description
    #[validate(length(max = 5000))]
    pub description: Option<String>,
    /// New vendor
    #[validate(length(min = 1, max = 200))]
    pub vendor: Option<String>,
    /// New product page
    #[validate(url)]
    pub website: Option<String>,
}

pub async fn list_solutions(
    Extension(catalog): Extension<Arc<Catalog>>,
) -> Result<Json<Vec<Solution>>, AppError> {
    Ok(Json(catalog.solutions.list().await?))
}

/// Get a solution by ID
///
/// # Errors
///
/// - `404 NOT_FOUND` - Solution does not exist
pub async fn get_solution(
    Path(id): Path<String>,
    Extension(catalog): Extension<Arc<Catalog>>,
) -> Result<Json<Solution>, AppError> {
    Ok(Json(catalog.solutions.get(&id).await?))
}

/// Register a solution
///
/// Any authenticated user may register solutions; they are not scoped to an industry.
pub async fn create_solution(
    _user: AuthenticatedUser,
    Extension(catalog): Extension<Arc<Catalog>>,
    ValidatedJson(payload): ValidatedJson<CreateSolutionRequest>,
) -> Result<(StatusCode, Json<Solution>), AppError> {
    let solution = catalog
        .solutions
        .create(NewSolution {
            name: payload.name,
            description: payload.description,
            vendor: payload.vendor,
            website: payload.website,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(solution)))
}

/// Update a solution
///
/// # Errors
///
/// - `404 NOT_FOUND` - Solution does not exist
/// - `409 CONFLICT` - Solution changed since `version` was read
pub async fn update_solution(
    _user: AuthenticatedUser,
    Path(id): Path<String>,
    Extension(catalog): Extension<Arc<Catalog>>,
    ValidatedJson(payload): ValidatedJson<UpdateSolutionRequest>,
) -> Result<Json<Solution>, AppError> {
    let patch = SolutionPatch {
        name: payload.name,
        description: payload.description,
        vendor: payload.vendor,
        website: payload.website,
    };

    Ok(Json(
        catalog.solutions.update(&id, &patch, payload.version).await?,
    ))
}

/// Delete a solution and its document
///
/// # Errors
///
/// - `404 NOT_FOUND` - Solution does not exist
/// - `409 CONFLICT` - Customer cases or use case mappings still reference it
pub async fn delete_solution(
    _user: AuthenticatedUser,
    Path(id): Path<String>,
    Extension(catalog): Extension<Arc<Catalog>>,
    Extension(documents): Extension<Arc<DocumentStorage>>,
) -> Result<StatusCode, AppError> {
    catalog.solutions.delete(&id).await?;

    if let Err(err) = documents.delete(DocumentKind::Solution, &id).await {
        tracing::warn!(solution_id = %id, "failed to remove document of deleted solution: {err}");
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Get the markdown document of a solution
///
/// # Errors
///
/// - `404 NOT_FOUND` - Solution or document does not exist
pub async fn get_solution_document(
    Path(id): Path<String>,
    Extension(catalog): Extension<Arc<Catalog>>,
    Extension(documents): Extension<Arc<DocumentStorage>>,
) -> Result<Json<DocumentResponse>, AppError> {
    catalog.solutions.get(&id).await?;

    let content = documents
        .get(DocumentKind::Solution, &id)
        .await?
        .ok_or_else(|| AppError::not_found("Document not found"))?;

    Ok(Json(DocumentResponse { content }))
}

/// Replace the markdown document of a solution
///
/// # Errors
///
/// - `404 NOT_FOUND` - Solution does not exist
pub async fn put_solution_document(
    _user: AuthenticatedUser,
    Path(id): Path<String>,
    Extension(catalog): Extension<Arc<Catalog>>,
    Extension(documents): Extension<Arc<DocumentStorage>>,
    ValidatedJson(payload): ValidatedJson<PutDocumentRequest>,
) -> Result<Json<DocumentResponse>, AppError> {
    catalog.solutions.get(&id).await?;

    documents
        .put(DocumentKind::Solution, &id, &payload.content)
        .await?;

    Ok(Json(DocumentResponse {
        content: payload.content,
    }))
}
