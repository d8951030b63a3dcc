use std::sync::Arc;

use axum::{extract::Path, http::StatusCode, Extension, Json};
use portal_storage::{
    use_case::{NewUseCase, UseCase, UseCasePatch},
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

/// Request to create a use case
#[derive(Debug, Deserialize, JsonSchema, Validate)]
#[serde(deny_unknown_fields)]
pub struct CreateUseCaseRequest {
    /// Display name
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    /// Optional long description
    #[validate(length(max = 5000))]
    pub description: Option<String>,
}

/// Partial update of a use case
#[derive(Debug, Deserialize, JsonSchema, Validate)]
#[serde(deny_unknown_fields)]
pub struct UpdateUseCaseRequest {
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

/// List the use cases of a sub-industry
///
/// # Errors
///
/// - `404 NOT_FOUND` - Sub-industry does not exist
pub async fn list_use_cases(
    Path(sub_industry_id): Path<String>,
    Extension(catalog): Extension<Arc<Catalog>>,
) -> Result<Json<Vec<UseCase>>, AppError> {
    catalog.sub_industries.get(&sub_industry_id).await?;

    Ok(Json(
        catalog
            .use_cases
            .list_by_sub_industry(&sub_industry_id)
            .await?,
    ))
}

/// Get a use case by ID
///
/// # Errors
///
/// - `404 NOT_FOUND` - Use case does not exist
pub async fn get_use_case(
    Path(id): Path<String>,
    Extension(catalog): Extension<Arc<Catalog>>,
) -> Result<Json<UseCase>, AppError> {
    Ok(Json(catalog.use_cases.get(&id).await?))
}

/// Create a use case under a sub-industry
///
/// # Errors
///
/// - `404 NOT_FOUND` - Sub-industry does not exist
/// - `403 FORBIDDEN` - Caller is not assigned to the industry
pub async fn create_use_case(
    user: AuthenticatedUser,
    Path(sub_industry_id): Path<String>,
    Extension(catalog): Extension<Arc<Catalog>>,
    ValidatedJson(payload): ValidatedJson<CreateUseCaseRequest>,
) -> Result<(StatusCode, Json<UseCase>), AppError> {
    let parent = catalog.sub_industries.get(&sub_industry_id).await?;
    user.require_industry_access(&parent.industry_id)?;

    let use_case = catalog
        .use_cases
        .create(
            &sub_industry_id,
            NewUseCase {
                name: payload.name,
                description: payload.description,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(use_case)))
}

/// Update a use case
///
/// # Errors
///
/// - `404 NOT_FOUND` - Use case does not exist
/// - `403 FORBIDDEN` - Caller is not assigned to the industry
/// - `409 CONFLICT` - Use case changed since `version` was read
pub async fn update_use_case(
    user: AuthenticatedUser,
    Path(id): Path<String>,
    Extension(catalog): Extension<Arc<Catalog>>,
    ValidatedJson(payload): ValidatedJson<UpdateUseCaseRequest>,
) -> Result<Json<UseCase>, AppError> {
    let current = catalog.use_cases.get(&id).await?;
    user.require_industry_access(&current.industry_id)?;

    let patch = UseCasePatch {
        name: payload.name,
        description: payload.description,
    };
    Ok(Json(
        catalog.use_cases.update(&id, &patch, payload.version).await?,
    ))
}

/// Delete a use case and its document
///
/// # Errors
///
/// - `404 NOT_FOUND` - Use case does not exist
/// - `403 FORBIDDEN` - Caller is not assigned to the industry
/// - `409 CONFLICT` - Solutions are still mapped (`details.dependents`)
pub async fn delete_use_case(
    user: AuthenticatedUser,
    Path(id): Path<String>,
    Extension(catalog): Extension<Arc<Catalog>>,
    Extension(documents): Extension<Arc<DocumentStorage>>,
) -> Result<StatusCode, AppError> {
    let current = catalog.use_cases.get(&id).await?;
    user.require_industry_access(&current.industry_id)?;

    catalog.use_cases.delete(&id).await?;
    if let Err(err) = documents.delete(DocumentKind::UseCase, &id).await {
        tracing::warn!(use_case_id = %id, "failed to remove document of deleted use case: {err}");
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Get the markdown document of a use case
///
/// # Errors
///
/// - `404 NOT_FOUND` - Use case or document does not exist
pub async fn get_use_case_document(
    Path(id): Path<String>,
    Extension(catalog): Extension<Arc<Catalog>>,
    Extension(documents): Extension<Arc<DocumentStorage>>,
) -> Result<Json<DocumentResponse>, AppError> {
    catalog.use_cases.get(&id).await?;

    let content = documents
        .get(DocumentKind::UseCase, &id)
        .await?
        .ok_or_else(|| AppError::not_found("Document not found"))?;

    Ok(Json(DocumentResponse { content }))
}

/// Replace the markdown document of a use case
///
/// # Errors
///
/// - `404 NOT_FOUND` - Use case does not exist
/// - `403 FORBIDDEN` - Caller is not assigned to the industry
pub async fn put_use_case_document(
    user: AuthenticatedUser,
    Path(id): Path<String>,
    Extension(catalog): Extension<Arc<Catalog>>,
    Extension(documents): Extension<Arc<DocumentStorage>>,
    ValidatedJson(payload): ValidatedJson<PutDocumentRequest>,
) -> Result<Json<DocumentResponse>, AppError> {
    let current = catalog.use_cases.get(&id).await?;
    user.require_industry_access(&current.industry_id)?;

    documents
        .put(DocumentKind::UseCase, &id, &payload.content)
        .await?;

    Ok(Json(DocumentResponse {
        content: payload.content,
    }))
}
