//! Markdown documents attached to catalog records, stored in S3
//!
//! Every document lives at `documents/<kind>/<id>.md`. The bucket is reached
//! through [`BlobStore`] so tests can swap in the in-memory store.

mod error;
#[cfg(any(test, feature = "test-utils"))]
pub mod memory;

use std::sync::Arc;

use async_trait::async_trait;
use aws_sdk_s3::{
    operation::get_object::GetObjectError, primitives::ByteStream, Client as S3Client,
};
use strum::Display;

pub use error::{DocumentError, DocumentResult};

/// Content type of stored documents
pub const MARKDOWN_CONTENT_TYPE: &str = "text/markdown; charset=utf-8";

/// Object storage used for documents
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Reads an object, `None` when the key does not exist
    async fn get_object(&self, key: &str) -> DocumentResult<Option<Vec<u8>>>;

    /// Writes an object, replacing any previous version
    async fn put_object(&self, key: &str, body: Vec<u8>, content_type: &str)
        -> DocumentResult<()>;

    /// Removes an object; removing a missing key succeeds
    async fn delete_object(&self, key: &str) -> DocumentResult<()>;
}

/// S3 implementation of [`BlobStore`]
pub struct S3BlobStore {
    s3_client: Arc<S3Client>,
    bucket_name: String,
}

impl S3BlobStore {
    /// Creates a new S3 blob store
    ///
    /// # Arguments
    ///
    /// * `s3_client` - Pre-configured S3 client
    /// * `bucket_name` - Bucket holding the documents
    #[must_use]
    pub const fn new(s3_client: Arc<S3Client>, bucket_name: String) -> Self {
        Self {
            s3_client,
            bucket_name,
        }
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    async fn get_object(&self, key: &str) -> DocumentResult<Option<Vec<u8>>> {
        let result = self
            .s3_client
            .get_object()
            .bucket(&self.bucket_name)
            .key(key)
            .send()
            .await;

        let output = match result {
            Ok(output) => output,
            Err(err) if err.as_service_error().is_some_and(GetObjectError::is_no_such_key) => {
                return Ok(None);
            }
            Err(err) => return Err(err.into()),
        };

        let bytes = output
            .body
            .collect()
            .await
            .map_err(|e| DocumentError::UpstreamError(e.to_string()))?;

        Ok(Some(bytes.into_bytes().to_vec()))
    }

    async fn put_object(
        &self,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> DocumentResult<()> {
        self.s3_client
            .put_object()
            .bucket(&self.bucket_name)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(body))
            .send()
            .await?;

        Ok(())
    }

    async fn delete_object(&self, key: &str) -> DocumentResult<()> {
        self.s3_client
            .delete_object()
            .bucket(&self.bucket_name)
            .key(key)
            .send()
            .await?;

        Ok(())
    }
}

/// Record kinds that carry a document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "kebab-case")]
pub enum DocumentKind {
    /// Solution documentation
    Solution,
    /// Use case write-up
    UseCase,
}

/// Reads and writes markdown documents
pub struct DocumentStorage {
    blob_store: Arc<dyn BlobStore>,
}

impl DocumentStorage {
    /// Creates a new document storage over `blob_store`
    #[must_use]
    pub const fn new(blob_store: Arc<dyn BlobStore>) -> Self {
        Self { blob_store }
    }

    /// Object key of a document
    #[must_use]
    pub fn document_key(kind: DocumentKind, id: &str) -> String {
        format!("documents/{kind}/{id}.md")
    }

    /// Reads a document, `None` when none was written yet
    ///
    /// # Errors
    ///
    /// Returns `DocumentError::InvalidContent` if the stored bytes are not UTF-8,
    /// or the blob store's error
    pub async fn get(&self, kind: DocumentKind, id: &str) -> DocumentResult<Option<String>> {
        let Some(bytes) = self
            .blob_store
            .get_object(&Self::document_key(kind, id))
            .await?
        else {
            return Ok(None);
        };

        String::from_utf8(bytes)
            .map(Some)
            .map_err(|e| DocumentError::InvalidContent(e.to_string()))
    }

    /// Writes a document, replacing the previous one
    ///
    /// # Errors
    ///
    /// Returns the blob store's error
    pub async fn put(&self, kind: DocumentKind, id: &str, content: &str) -> DocumentResult<()> {
        self.blob_store
            .put_object(
                &Self::document_key(kind, id),
                content.as_bytes().to_vec(),
                MARKDOWN_CONTENT_TYPE,
            )
            .await?;

        tracing::info!(%kind, id, bytes = content.len(), "document stored");
        Ok(())
    }

    /// Removes a document if there is one
    ///
    /// # Errors
    ///
    /// Returns the blob store's error
    pub async fn delete(&self, kind: DocumentKind, id: &str) -> DocumentResult<()> {
        self.blob_store
            .delete_object(&Self::document_key(kind, id))
            .await
    }
}
