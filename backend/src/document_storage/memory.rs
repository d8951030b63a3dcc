//! In-memory blob store for tests

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{BlobStore, DocumentResult};

/// Blob store holding objects in process memory
#[derive(Debug, Default)]
pub struct InMemoryBlobStore {
    objects: Mutex<HashMap<String, (Vec<u8>, String)>>,
}

impl InMemoryBlobStore {
    /// Creates an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Content type an object was written with
    pub async fn content_type(&self, key: &str) -> Option<String> {
        self.objects
            .lock()
            .await
            .get(key)
            .map(|(_, content_type)| content_type.clone())
    }

    /// Whether an object exists
    pub async fn contains(&self, key: &str) -> bool {
        self.objects.lock().await.contains_key(key)
    }
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn get_object(&self, key: &str) -> DocumentResult<Option<Vec<u8>>> {
        Ok(self
            .objects
            .lock()
            .await
            .get(key)
            .map(|(body, _)| body.clone()))
    }

    async fn put_object(
        &self,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> DocumentResult<()> {
        self.objects
            .lock()
            .await
            .insert(key.to_string(), (body, content_type.to_string()));
        Ok(())
    }

    async fn delete_object(&self, key: &str) -> DocumentResult<()> {
        self.objects.lock().await.remove(key);
        Ok(())
    }
}
