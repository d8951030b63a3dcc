use std::sync::Arc;

use axum::{
    extract::{Path, Query},
    http::StatusCode,
    Extension, Json,
};
use portal_storage::{
    content::{Content, ContentKind, ContentPatch, NewContent},
    Catalog,
};
use schemars::JsonSchema;
use serde::Deserialize;
use validator::Validate;

use crate::{
    middleware::AuthenticatedUser,
    types::{AppError, ValidatedJson},
};

/// Largest page a client may request
const MAX_LIST_LIMIT: usize = 100;

/// Filters for listing news or blog posts
#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct ListContentQuery {
    /// Only posts tagged with this industry
    pub industry_id: Option<String>,
    /// Maximum number of posts, newest first
    pub limit: Option<usize>,
}

/// Request to publish a news item or blog post
#[derive(Debug, Deserialize, JsonSchema, Validate)]
#[serde(deny_unknown_fields)]
pub struct CreateContentRequest {
    #[validate(length(min = 1, max = 300))]
    pub title: String,
    #[validate(length(max = 1000))]
    pub summary: Option<String>,
    /// Markdown body
    #[validate(length(min = 1))]
    pub body: String,
    #[validate(length(max = 200))]
    pub author: Option<String>,
    /// Industry the post is about, if any
    pub industry_id: Option<String>,
}

/// Partial update of a post; the industry tag is fixed at creation
#[derive(Debug, Deserialize, JsonSchema, Validate)]
#[serde(deny_unknown_fields)]
pub struct UpdateContentRequest {
    /// Version the client last read
    #[validate(range(min = 0))]
    pub version: i64,
    #[validate(length(min = 1, max = 300))]
    pub title: Option<String>,
    #[validate(length(max = 1000))]
    pub summary: Option<String>,
    #[validate(length(min = 1))]
    pub body: Option<String>,
    #[validate(length(max = 200))]
    pub author: Option<String>,
}

async fn list(
    kind: ContentKind,
    catalog: &Catalog,
    query: &ListContentQuery,
) -> Result<Json<Vec<Content>>, AppError> {
    let limit = query.limit.map(|limit| limit.min(MAX_LIST_LIMIT));

    Ok(Json(
        catalog
            .content
            .list(kind, query.industry_id.as_deref(), limit)
            .await?,
    ))
}

async fn create(
    kind: ContentKind,
    user: &AuthenticatedUser,
    catalog: &Catalog,
    payload: CreateContentRequest,
) -> Result<(StatusCode, Json<Content>), AppError> {
    user.require_content_access(payload.industry_id.as_deref())?;

    let post = catalog
        .content
        .create(
            kind,
            NewContent {
                title: payload.title,
                summary: payload.summary,
                body: payload.body,
                author: payload.author,
                industry_id: payload.industry_id,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(post)))
}

async fn update(
    kind: ContentKind,
    user: &AuthenticatedUser,
    catalog: &Catalog,
    id: &str,
    payload: UpdateContentRequest,
) -> Result<Json<Content>, AppError> {
    let current = catalog.content.get(kind, id).await?;
    user.require_content_access(current.industry_id.as_deref())?;

    let patch = ContentPatch {
        title: payload.title,
        summary: payload.summary,
        body: payload.body,
        author: payload.author,
    };

    Ok(Json(
        catalog
            .content
            .update(kind, id, &patch, payload.version)
            .await?,
    ))
}

async fn delete(
    kind: ContentKind,
    user: &AuthenticatedUser,
    catalog: &Catalog,
    id: &str,
) -> Result<StatusCode, AppError> {
    let current = catalog.content.get(kind, id).await?;
    user.require_content_access(current.industry_id.as_deref())?;

    catalog.content.delete(kind, id).await?;

    Ok(StatusCode::NO_CONTENT)
}

/// List news, newest first
pub async fn list_news(
    Query(query): Query<ListContentQuery>,
    Extension(catalog): Extension<Arc<Catalog>>,
) -> Result<Json<Vec<Content>>, AppError> {
    list(ContentKind::News, &catalog, &query).await
}

/// Get a news item by ID
///
/// # Errors
///
/// - `404 NOT_FOUND` - News item does not exist
pub async fn get_news(
    Path(id): Path<String>,
    Extension(catalog): Extension<Arc<Catalog>>,
) -> Result<Json<Content>, AppError> {
    Ok(Json(catalog.content.get(ContentKind::News, &id).await?))
}

/// Publish a news item
///
/// # Errors
///
/// - `403 FORBIDDEN` - Caller is not assigned to the tagged industry
/// - `404 NOT_FOUND` - Tagged industry does not exist
pub async fn create_news(
    user: AuthenticatedUser,
    Extension(catalog): Extension<Arc<Catalog>>,
    ValidatedJson(payload): ValidatedJson<CreateContentRequest>,
) -> Result<(StatusCode, Json<Content>), AppError> {
    create(ContentKind::News, &user, &catalog, payload).await
}

pub async fn update_news(
    user: AuthenticatedUser,
    Path(id): Path<String>,
    Extension(catalog): Extension<Arc<Catalog>>,
    ValidatedJson(payload): ValidatedJson<UpdateContentRequest>,
) -> Result<Json<Content>, AppError> {
    update(ContentKind::News, &user, &catalog, &id, payload).await
}

pub async fn delete_news(
    user: AuthenticatedUser,
    Path(id): Path<String>,
    Extension(catalog): Extension<Arc<Catalog>>,
) -> Result<StatusCode, AppError> {
    delete(ContentKind::News, &user, &catalog, &id).await
}

/// List blog posts, newest first
pub async fn list_blogs(
    Query(query): Query<ListContentQuery>,
    Extension(catalog): Extension<Arc<Catalog>>,
) -> Result<Json<Vec<Content>>, AppError> {
    list(ContentKind::Blog, &catalog, &query).await
}

/// Get a blog post by ID
///
/// # Errors
///
/// - `404 NOT_FOUND` - Blog post does not exist
pub async fn get_blog(
    Path(id): Path<String>,
    Extension(catalog): Extension<Arc<Catalog>>,
) -> Result<Json<Content>, AppError> {
    Ok(Json(catalog.content.get(ContentKind::Blog, &id).await?))
}

/// Publish a blog post
///
/// # Errors
///
/// - `403 FORBIDDEN` - Caller is not assigned to the tagged industry
/// - `404 NOT_FOUND` - Tagged industry does not exist
pub async fn create_blog(
    user: AuthenticatedUser,
    Extension(catalog): Extension<Arc<Catalog>>,
    ValidatedJson(payload): ValidatedJson<CreateContentRequest>,
) -> Result<(StatusCode, Json<Content>), AppError> {
    create(ContentKind::Blog, &user, &catalog, payload).await
}

pub async fn update_blog(
    user: AuthenticatedUser,
    Path(id): Path<String>,
    Extension(catalog): Extension<Arc<Catalog>>,
    ValidatedJson(payload): ValidatedJson<UpdateContentRequest>,
) -> Result<Json<Content>, AppError> {
    update(ContentKind::Blog, &user, &catalog, &id, payload).await
}

pub async fn delete_blog(
    user: AuthenticatedUser,
    Path(id): Path<String>,
    Extension(catalog): Extension<Arc<Catalog>>,
) -> Result<StatusCode, AppError> {
    delete(ContentKind::Blog, &user, &catalog, &id).await
}
