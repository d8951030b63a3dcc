use aide::{axum::ApiRouter, openapi::OpenApi, scalar::Scalar};
use axum::{routing::get, Extension, Json};

use crate::types::{AppError, Environment};

/// Scalar UI at `/docs` and the raw document at `/openapi.json`
pub fn handler() -> ApiRouter {
    let scalar = Scalar::new("/openapi.json").with_title("Industry Portal API");

    ApiRouter::new()
        .route("/docs", scalar.axum_route())
        .route("/openapi.json", get(openapi_schema))
}

/// Hidden in production
#[allow(clippy::unused_async)]
async fn openapi_schema(
    Extension(environment): Extension<Environment>,
    Extension(openapi): Extension<OpenApi>,
) -> Result<Json<OpenApi>, AppError> {
    if !environment.show_api_docs() {
        return Err(AppError::not_found("API docs are disabled"));
    }
    Ok(Json(openapi))
}
