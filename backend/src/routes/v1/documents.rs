use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Largest accepted document, in bytes
const MAX_DOCUMENT_BYTES: u64 = 1024 * 1024;

/// Markdown document body
#[derive(Debug, Serialize, JsonSchema)]
pub struct DocumentResponse {
    /// Markdown text
    pub content: String,
}

/// Request to replace a document
#[derive(Debug, Deserialize, JsonSchema, Validate)]
#[serde(deny_unknown_fields)]
pub struct PutDocumentRequest {
    /// Markdown text
    #[validate(length(min = 1, max = MAX_DOCUMENT_BYTES))]
    pub content: String,
}
