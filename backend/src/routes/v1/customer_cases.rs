use std::sync::Arc;

use axum::{extract::Path, http::StatusCode, Extension, Json};
use portal_storage::{
    customer_case::{CustomerCase, CustomerCasePatch, NewCustomerCase},
    Catalog,
};
use schemars::JsonSchema;
use serde::Deserialize;
use validator::Validate;

use crate::{
    middleware::AuthenticatedUser,
    types::{AppError, ValidatedJson},
};

/// Identifies one customer case of a solution
#[derive(Debug, Deserialize, JsonSchema)]
pub struct CustomerCasePath {
    /// Solution ID
    pub id: String,
    /// Customer case ID
    pub case_id: String,
}

/// Request to record a customer case
#[derive(Debug, Deserialize, JsonSchema, Validate)]
#[serde(deny_unknown_fields)]
pub struct CreateCustomerCaseRequest {
    /// Use case the customer applied the solution to; must be mapped to the solution
    #[validate(length(min = 1))]
    pub use_case_id: String,
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(min = 1, max = 200))]
    pub customer_name: String,
    #[validate(length(max = 5000))]
    pub summary: Option<String>,
}

/// Partial update of a customer case
#[derive(Debug, Deserialize, JsonSchema, Validate)]
#[serde(deny_unknown_fields)]
pub struct UpdateCustomerCaseRequest {
    /// Version the client last read
    #[validate(range(min = 0))]
    pub version: i64,
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    #[validate(length(min = 1, max = 200))]
    pub customer_name: Option<String>,
    #[validate(length(max = 5000))]
    pub summary: Option<String>,
}

/// List the customer cases of a solution
///
/// # Errors
///
/// - `404 NOT_FOUND` - Solution does not exist
pub async fn list_customer_cases(
    Path(id): Path<String>,
    Extension(catalog): Extension<Arc<Catalog>>,
) -> Result<Json<Vec<CustomerCase>>, AppError> {
    catalog.solutions.get(&id).await?;

    Ok(Json(catalog.customer_cases.list_by_solution(&id).await?))
}

pub async fn get_customer_case(
    Path(path): Path<CustomerCasePath>,
    Extension(catalog): Extension<Arc<Catalog>>,
) -> Result<Json<CustomerCase>, AppError> {
    Ok(Json(
        catalog.customer_cases.get(&path.id, &path.case_id).await?,
    ))
}

/// Record a customer case for a solution
///
/// # Errors
///
/// - `404 NOT_FOUND` - Solution or use case does not exist
/// - `400 VALIDATION_ERROR` - Use case is not mapped to the solution
pub async fn create_customer_case(
    _user: AuthenticatedUser,
    Path(id): Path<String>,
    Extension(catalog): Extension<Arc<Catalog>>,
    ValidatedJson(payload): ValidatedJson<CreateCustomerCaseRequest>,
) -> Result<(StatusCode, Json<CustomerCase>), AppError> {
    let customer_case = catalog
        .customer_cases
        .create(
            &id,
            NewCustomerCase {
                use_case_id: payload.use_case_id,
                title: payload.title,
                customer_name: payload.customer_name,
                summary: payload.summary,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(customer_case)))
}

/// Update a customer case
///
/// # Errors
///
/// - `404 NOT_FOUND` - Customer case does not exist
/// - `409 CONFLICT` - Customer case changed since `version` was read
pub async fn update_customer_case(
    _user: AuthenticatedUser,
    Path(path): Path<CustomerCasePath>,
    Extension(catalog): Extension<Arc<Catalog>>,
    ValidatedJson(payload): ValidatedJson<UpdateCustomerCaseRequest>,
) -> Result<Json<CustomerCase>, AppError> {
    let patch = CustomerCasePatch {
        title: payload.title,
        customer_name: payload.customer_name,
        summary: payload.summary,
    };

    Ok(Json(
        catalog
            .customer_cases
            .update(&path.id, &path.case_id, &patch, payload.version)
            .await?,
    ))
}

pub async fn delete_customer_case(
    _user: AuthenticatedUser,
    Path(path): Path<CustomerCasePath>,
    Extension(catalog): Extension<Arc<Catalog>>,
) -> Result<StatusCode, AppError> {
    catalog
        .customer_cases
        .delete(&path.id, &path.case_id)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
