//! News and blog storage
//!
//! Both kinds share one record shape and differ only in table and key prefix.
//! A post may be tagged with an industry; listing filters on that tag.

use std::sync::Arc;

use aws_sdk_dynamodb::types::AttributeValue;
use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum::Display;

use crate::guard::{get_item_with_version, update_with_lock, GuardResult, TransactionBuilder};
use crate::keys;
use crate::record::{
    self, from_record, from_records, guarded_delete, patch_update, to_record, touch_parent,
};
use crate::store::{Condition, ItemKey, KeyValueStore};
use crate::tables::CatalogTables;

pub use crate::guard::dependency::INDUSTRY_ID_ATTRIBUTE;

/// Kind of editorial content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum ContentKind {
    /// News item
    News,
    /// Blog post
    Blog,
}

impl ContentKind {
    const fn prefix(self) -> &'static str {
        match self {
            Self::News => keys::NEWS_PREFIX,
            Self::Blog => keys::BLOG_PREFIX,
        }
    }

    const fn entity(self) -> &'static str {
        match self {
            Self::News => "News",
            Self::Blog => "Blog",
        }
    }
}

/// Stored news item or blog post
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Content {
    /// Identifier
    pub id: String,
    /// Headline
    pub title: String,
    /// Teaser shown in lists
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// Full text
    pub body: String,
    /// Author display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    /// Industry the post is tagged with
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub industry_id: Option<String>,
    /// Optimistic lock counter
    #[serde(default)]
    pub version: i64,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last modification time
    pub updated_at: DateTime<Utc>,
}

/// Fields of a new post
#[derive(Debug, Clone, Default)]
pub struct NewContent {
    /// Headline
    pub title: String,
    /// Teaser shown in lists
    pub summary: Option<String>,
    /// Full text
    pub body: String,
    /// Author display name
    pub author: Option<String>,
    /// Industry the post is tagged with
    pub industry_id: Option<String>,
}

/// Partial post update; `None` keeps the stored value
#[derive(Debug, Clone, Default, Serialize)]
pub struct ContentPatch {
    /// New headline
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// New teaser
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// New full text
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    /// New author
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
}

/// News and blog storage
pub struct ContentStorage {
    store: Arc<dyn KeyValueStore>,
    tables: Arc<CatalogTables>,
}

impl ContentStorage {
    /// Creates a new content storage
    #[must_use]
    pub const fn new(store: Arc<dyn KeyValueStore>, tables: Arc<CatalogTables>) -> Self {
        Self { store, tables }
    }

    fn table(&self, kind: ContentKind) -> &str {
        match kind {
            ContentKind::News => &self.tables.news,
            ContentKind::Blog => &self.tables.blogs,
        }
    }

    fn key(kind: ContentKind, content_id: &str) -> ItemKey {
        keys::content(kind.prefix(), content_id)
    }

    /// Creates a post, checking the industry tag when one is given
    ///
    /// A tagged post bumps the industry's dependents revision in the same
    /// transaction, so an industry delete racing the create fails.
    ///
    /// # Errors
    ///
    /// Returns `GuardError::NotFound` if the tagged industry does not exist, or
    /// `GuardError::ConcurrentModification` if it vanished while writing
    pub async fn create(&self, kind: ContentKind, input: NewContent) -> GuardResult<Content> {
        if let Some(industry_id) = &input.industry_id {
            get_item_with_version(
                self.store.as_ref(),
                &self.tables.industries,
                &keys::industry(industry_id),
            )
            .await
            .map_err(|e| e.for_entity("Industry", industry_id))?;
        }

        let now = record::now();
        let content = Content {
            id: record::new_id(),
            title: input.title,
            summary: input.summary,
            body: input.body,
            author: input.author,
            industry_id: input.industry_id,
            version: 1,
            created_at: now,
            updated_at: now,
        };

        let item = to_record(&content, &Self::key(kind, &content.id))?;
        let mut transaction = TransactionBuilder::new();
        transaction.add_put(self.table(kind), item, Some(Condition::ItemNotExists));
        if let Some(industry_id) = &content.industry_id {
            touch_parent(
                &mut transaction,
                &self.tables.industries,
                keys::industry(industry_id),
            );
        }
        transaction.execute(self.store.as_ref()).await?;

        tracing::info!(%kind, content_id = %content.id, "content created");
        Ok(content)
    }

    /// Gets a post by id
    ///
    /// # Errors
    ///
    /// Returns `GuardError::NotFound` if the post does not exist
    pub async fn get(&self, kind: ContentKind, content_id: &str) -> GuardResult<Content> {
        let versioned = get_item_with_version(
            self.store.as_ref(),
            self.table(kind),
            &Self::key(kind, content_id),
        )
        .await
        .map_err(|e| e.for_entity(kind.entity(), content_id))?;

        from_record(versioned.item)
    }

    /// Lists posts, newest first, optionally only those tagged with `industry_id`
    ///
    /// # Errors
    ///
    /// Returns `GuardError` if the scan fails
    pub async fn list(
        &self,
        kind: ContentKind,
        industry_id: Option<&str>,
        limit: Option<usize>,
    ) -> GuardResult<Vec<Content>> {
        let filters: Vec<(String, AttributeValue)> = industry_id
            .map(|id| {
                (
                    INDUSTRY_ID_ATTRIBUTE.to_string(),
                    AttributeValue::S(id.to_string()),
                )
            })
            .into_iter()
            .collect();

        let items = self.store.scan(self.table(kind), &filters, None).await?;
        let mut posts: Vec<Content> = from_records(items)?;
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        if let Some(limit) = limit {
            posts.truncate(limit);
        }

        Ok(posts)
    }

    /// Applies `patch` if the post is still at `expected_version`
    ///
    /// # Errors
    ///
    /// Returns `GuardError::ConcurrentModification` for a stale version, or
    /// `GuardError::NotFound` if the post does not exist
    pub async fn update(
        &self,
        kind: ContentKind,
        content_id: &str,
        patch: &ContentPatch,
        expected_version: i64,
    ) -> GuardResult<Content> {
        let item = update_with_lock(
            self.store.as_ref(),
            self.table(kind),
            &Self::key(kind, content_id),
            patch_update(patch)?,
            expected_version,
        )
        .await
        .map_err(|e| e.for_entity(kind.entity(), content_id))?;

        from_record(item)
    }

    /// Deletes a post
    ///
    /// # Errors
    ///
    /// Returns `GuardError::NotFound` if the post does not exist
    pub async fn delete(&self, kind: ContentKind, content_id: &str) -> GuardResult<()> {
        guarded_delete(
            self.store.as_ref(),
            self.table(kind),
            &Self::key(kind, content_id),
            Vec::new(),
        )
        .await
        .map_err(|e| e.for_entity(kind.entity(), content_id))?;

        tracing::info!(%kind, content_id, "content deleted");
        Ok(())
    }
}
