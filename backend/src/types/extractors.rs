//! Custom extractors for request validation

use aide::operation::OperationInput;
use axum::{
    extract::{rejection::JsonRejection, FromRequest, Request},
    Json,
};
use schemars::JsonSchema;
use validator::Validate;

use crate::types::error::AppError;

/// JSON extractor that also runs the payload's `validator` rules
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: serde::de::DeserializeOwned + Validate + JsonSchema,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(payload) = Json::<T>::from_request(req, state)
            .await
            .map_err(|err| match err {
                JsonRejection::MissingJsonContentType(_) => {
                    AppError::validation("Missing Content-Type: application/json header")
                }
                err => AppError::validation(format!("Invalid JSON payload: {}", err.body_text())),
            })?;

        payload.validate().map_err(|errors| {
            let details = serde_json::to_value(&errors).unwrap_or_default();
            AppError::validation("Request validation failed").with_details(details)
        })?;

        Ok(Self(payload))
    }
}

impl<T> OperationInput for ValidatedJson<T>
where
    T: JsonSchema,
{
    fn operation_input(
        ctx: &mut aide::generate::GenContext,
        operation: &mut aide::openapi::Operation,
    ) {
        // Same body shape as `Json<T>`
        Json::<T>::operation_input(ctx, operation);
    }
}
