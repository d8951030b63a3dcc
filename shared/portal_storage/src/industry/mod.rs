//! Industry storage
//!
//! Industries are the roots of the catalog tree. Each one lives under its
//! own partition with the `METADATA` sort key; sub-industries nest in the
//! same partition of the sub-industry table.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::guard::{
    dependency, get_item_with_version, update_with_lock, GuardResult, IntegrityCheck,
};
use crate::keys;
use crate::record::{self, from_record, from_records, guarded_delete, patch_update, to_record};
use crate::store::{Condition, KeyValueStore};
use crate::tables::CatalogTables;

const ENTITY: &str = "Industry";

/// Stored industry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Industry {
    /// Identifier
    pub id: String,
    /// Display name
    pub name: String,
    /// Optional long description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Optimistic lock counter
    #[serde(default)]
    pub version: i64,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last modification time
    pub updated_at: DateTime<Utc>,
}

/// Fields of a new industry
#[derive(Debug, Clone, Default)]
pub struct NewIndustry {
    /// Display name
    pub name: String,
    /// Optional long description
    pub description: Option<String>,
}

/// Partial industry update; `None` keeps the stored value
#[derive(Debug, Clone, Default, Serialize)]
pub struct IndustryPatch {
    /// New display name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// New description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Industry storage backed by the industries table
pub struct IndustryStorage {
    store: Arc<dyn KeyValueStore>,
    tables: Arc<CatalogTables>,
}

impl IndustryStorage {
    /// Creates a new industry storage
    #[must_use]
    pub const fn new(store: Arc<dyn KeyValueStore>, tables: Arc<CatalogTables>) -> Self {
        Self { store, tables }
    }

    /// Creates an industry with a generated id
    ///
    /// # Errors
    ///
    /// Returns `GuardError` if the write fails
    pub async fn create(&self, input: NewIndustry) -> GuardResult<Industry> {
        let now = record::now();
        let industry = Industry {
            id: record::new_id(),
            name: input.name,
            description: input.description,
            version: 1,
            created_at: now,
            updated_at: now,
        };

        let item = to_record(&industry, &keys::industry(&industry.id))?;
        self.store
            .put_item(
                &self.tables.industries,
                item,
                Some(&Condition::ItemNotExists),
            )
            .await?;

        tracing::info!(industry_id = %industry.id, "industry created");
        Ok(industry)
    }

    /// Gets an industry by id
    ///
    /// # Errors
    ///
    /// Returns `GuardError::NotFound` if the industry does not exist
    pub async fn get(&self, industry_id: &str) -> GuardResult<Industry> {
        let versioned = get_item_with_version(
            self.store.as_ref(),
            &self.tables.industries,
            &keys::industry(industry_id),
        )
        .await
        .map_err(|e| e.for_entity(ENTITY, industry_id))?;

        from_record(versioned.item)
    }

    /// Lists every industry
    ///
    /// # Errors
    ///
    /// Returns `GuardError` if the scan fails
    pub async fn list(&self) -> GuardResult<Vec<Industry>> {
        let items = self
            .store
            .scan(&self.tables.industries, &[], None)
            .await?;
        let mut industries: Vec<Industry> = from_records(items)?;
        industries.sort_by(|a, b| a.name.cmp(&b.name));

        Ok(industries)
    }

    /// Applies `patch` if the industry is still at `expected_version`
    ///
    /// # Errors
    ///
    /// Returns `GuardError::ConcurrentModification` for a stale version, or
    /// `GuardError::NotFound` if the industry does not exist
    pub async fn update(
        &self,
        industry_id: &str,
        patch: &IndustryPatch,
        expected_version: i64,
    ) -> GuardResult<Industry> {
        let item = update_with_lock(
            self.store.as_ref(),
            &self.tables.industries,
            &keys::industry(industry_id),
            patch_update(patch)?,
            expected_version,
        )
        .await
        .map_err(|e| e.for_entity(ENTITY, industry_id))?;

        from_record(item)
    }

    /// Deletes an industry that has no sub-industries and no tagged content
    ///
    /// # Errors
    ///
    /// Returns `GuardError::ReferentialIntegrityViolation` citing
    /// "sub-industries", "news" or "blogs" (checked in that order) while any
    /// exist, or `GuardError::NotFound`
    pub async fn delete(&self, industry_id: &str) -> GuardResult<()> {
        let store = self.store.as_ref();
        let sub_industries = self.tables.sub_industries.as_str();
        let news = self.tables.news.as_str();
        let blogs = self.tables.blogs.as_str();

        guarded_delete(
            store,
            &self.tables.industries,
            &keys::industry(industry_id),
            vec![
                IntegrityCheck::new(
                    "sub-industries",
                    "Cannot delete industry with existing sub-industries",
                    move || {
                        dependency::industry_has_sub_industries(store, sub_industries, industry_id)
                    },
                ),
                IntegrityCheck::new(
                    "news",
                    "Cannot delete industry with tagged news",
                    move || dependency::industry_has_tagged_content(store, news, industry_id),
                ),
                IntegrityCheck::new(
                    "blogs",
                    "Cannot delete industry with tagged blog posts",
                    move || dependency::industry_has_tagged_content(store, blogs, industry_id),
                ),
            ],
        )
        .await
        .map_err(|e| e.for_entity(ENTITY, industry_id))?;

        tracing::info!(industry_id, "industry deleted");
        Ok(())
    }
}
