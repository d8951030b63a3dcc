//! Error types for key-value store operations

use aws_sdk_dynamodb::error::SdkError;
use aws_sdk_dynamodb::operation::{
    delete_item::DeleteItemError, get_item::GetItemError, put_item::PutItemError,
    query::QueryError, scan::ScanError, transact_write_items::TransactWriteItemsError,
    update_item::UpdateItemError,
};
use thiserror::Error;

/// Result type alias for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Cancellation reason code DynamoDB reports for a failed condition
const CONDITIONAL_CHECK_FAILED: &str = "ConditionalCheckFailed";

/// Per-operation outcome reported when a transaction is cancelled
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CancellationReason {
    /// Reason code, `None` (or the literal `"None"`) for operations that did not fail
    pub code: Option<String>,
    /// Optional detail message
    pub message: Option<String>,
}

impl CancellationReason {
    /// Reason recorded for an operation that passed
    #[must_use]
    pub fn none() -> Self {
        Self {
            code: Some("None".to_string()),
            message: None,
        }
    }

    /// Reason recorded for an operation whose condition was false
    #[must_use]
    pub fn condition_failed() -> Self {
        Self {
            code: Some(CONDITIONAL_CHECK_FAILED.to_string()),
            message: Some("The conditional request failed".to_string()),
        }
    }

    /// Whether the operation was rejected by its condition
    #[must_use]
    pub fn is_condition_failure(&self) -> bool {
        self.code.as_deref() == Some(CONDITIONAL_CHECK_FAILED)
    }
}

/// Store error types
#[derive(Debug, Error)]
pub enum StoreError {
    /// A conditional write was rejected because its condition did not hold
    #[error("Conditional check failed")]
    ConditionalCheckFailed,

    /// A transaction was cancelled; one reason per submitted operation
    #[error("Transaction cancelled: {reasons:?}")]
    TransactionCanceled {
        /// Reasons in submission order
        reasons: Vec<CancellationReason>,
    },

    /// The request could not be built or was rejected as malformed
    #[error("Invalid store request: {0}")]
    InvalidRequest(String),

    /// The store could not be reached
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// Failed to get an item from `DynamoDB`
    #[error("Failed to get item from DynamoDB: {0:?}")]
    DynamoDbGetError(#[from] SdkError<GetItemError>),

    /// Failed to put an item into `DynamoDB`
    #[error("Failed to put item into DynamoDB: {0:?}")]
    DynamoDbPutError(#[from] SdkError<PutItemError>),

    /// Failed to update an item in `DynamoDB`
    #[error("Failed to update item in DynamoDB: {0:?}")]
    DynamoDbUpdateError(#[from] SdkError<UpdateItemError>),

    /// Failed to delete an item from `DynamoDB`
    #[error("Failed to delete item from DynamoDB: {0:?}")]
    DynamoDbDeleteError(#[from] SdkError<DeleteItemError>),

    /// Failed to query `DynamoDB`
    #[error("Failed to query DynamoDB: {0:?}")]
    DynamoDbQueryError(#[from] SdkError<QueryError>),

    /// Failed to scan `DynamoDB`
    #[error("Failed to scan DynamoDB: {0:?}")]
    DynamoDbScanError(#[from] SdkError<ScanError>),

    /// Failed to run a `DynamoDB` transaction
    #[error("Failed to run DynamoDB transaction: {0:?}")]
    DynamoDbTransactError(#[from] SdkError<TransactWriteItemsError>),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_condition_failure_detection() {
        assert!(CancellationReason::condition_failed().is_condition_failure());
        assert!(!CancellationReason::none().is_condition_failure());
        assert!(!CancellationReason {
            code: Some("TransactionConflict".to_string()),
            message: None,
        }
        .is_condition_failure());
    }
}
