//! Error types for document operations

use aws_sdk_s3::{
    error::SdkError,
    operation::{
        delete_object::DeleteObjectError, get_object::GetObjectError, put_object::PutObjectError,
    },
};
use thiserror::Error;

/// Result type for document operations
pub type DocumentResult<T> = Result<T, DocumentError>;

/// Errors that can occur during document operations
#[derive(Error, Debug)]
pub enum DocumentError {
    /// S3 rejected the request
    #[error("S3 service error: {0}")]
    S3Error(String),

    /// S3 answered with a 5xx or could not be reached
    #[error("Upstream service error: {0}")]
    UpstreamError(String),

    /// Stored bytes are not a markdown document
    #[error("Invalid document content: {0}")]
    InvalidContent(String),
}

fn from_sdk_error<E, R>(error: SdkError<E, R>) -> DocumentError
where
    E: std::error::Error + Send + Sync + 'static,
    R: std::fmt::Debug,
{
    match error {
        SdkError::ServiceError(_) => DocumentError::S3Error(format!("{error:?}")),
        _ => DocumentError::UpstreamError(format!("{error:?}")),
    }
}

impl From<SdkError<GetObjectError>> for DocumentError {
    fn from(error: SdkError<GetObjectError>) -> Self {
        from_sdk_error(error)
    }
}

impl From<SdkError<PutObjectError>> for DocumentError {
    fn from(error: SdkError<PutObjectError>) -> Self {
        from_sdk_error(error)
    }
}

impl From<SdkError<DeleteObjectError>> for DocumentError {
    fn from(error: SdkError<DeleteObjectError>) -> Self {
        from_sdk_error(error)
    }
}
