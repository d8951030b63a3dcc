//! Sub-industry storage
//!
//! Sub-industries are stored under their industry's partition
//! (`INDUSTRY#<industryId>` / `SUBINDUSTRY#<id>`) and located by id through
//! the id index.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::guard::{
    dependency, get_item_with_version, update_with_lock, GuardResult, IntegrityCheck,
    TransactionBuilder,
};
use crate::keys;
use crate::record::{
    self, from_record, from_records, guarded_delete, locate_by_sort_key, patch_update, to_record,
    touch_parent,
};
use crate::store::{Condition, ItemKey, KeyAttribute, KeyValueStore, QuerySpec};
use crate::tables::CatalogTables;

const ENTITY: &str = "SubIndustry";

/// Stored sub-industry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SubIndustry {
    /// Identifier
    pub id: String,
    /// Parent industry
    pub industry_id: String,
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

/// Fields of a new sub-industry
#[derive(Debug, Clone, Default)]
pub struct NewSubIndustry {
    /// Display name
    pub name: String,
    /// Optional long description
    pub description: Option<String>,
}

/// Partial sub-industry update; `None` keeps the stored value
#[derive(Debug, Clone, Default, Serialize)]
pub struct SubIndustryPatch {
    /// New display name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// New description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Sub-industry storage backed by the sub-industries table
pub struct SubIndustryStorage {
    store: Arc<dyn KeyValueStore>,
    tables: Arc<CatalogTables>,
}

impl SubIndustryStorage {
    /// Creates a new sub-industry storage
    #[must_use]
    pub const fn new(store: Arc<dyn KeyValueStore>, tables: Arc<CatalogTables>) -> Self {
        Self { store, tables }
    }

    async fn locate(&self, sub_industry_id: &str) -> GuardResult<ItemKey> {
        locate_by_sort_key(
            self.store.as_ref(),
            &self.tables.sub_industries,
            &self.tables.id_index,
            keys::sub_industry_partition(sub_industry_id),
        )
        .await
        .map_err(|e| e.for_entity(ENTITY, sub_industry_id))
    }

    /// Creates a sub-industry under an existing industry
    ///
    /// The record and the bump of the industry's dependents revision are
    /// written in one transaction.
    ///
    /// # Errors
    ///
    /// Returns `GuardError::NotFound` if the industry does not exist, or
    /// `GuardError::ConcurrentModification` if it vanished while writing
    pub async fn create(
        &self,
        industry_id: &str,
        input: NewSubIndustry,
    ) -> GuardResult<SubIndustry> {
        let industry_key = keys::industry(industry_id);
        get_item_with_version(self.store.as_ref(), &self.tables.industries, &industry_key)
            .await
            .map_err(|e| e.for_entity("Industry", industry_id))?;

        let now = record::now();
        let sub_industry = SubIndustry {
            id: record::new_id(),
            industry_id: industry_id.to_string(),
            name: input.name,
            description: input.description,
            version: 1,
            created_at: now,
            updated_at: now,
        };
        let item = to_record(
            &sub_industry,
            &keys::sub_industry(industry_id, &sub_industry.id),
        )?;

        let mut transaction = TransactionBuilder::new();
        transaction.add_put(
            self.tables.sub_industries.as_str(),
            item,
            Some(Condition::ItemNotExists),
        );
        touch_parent(&mut transaction, &self.tables.industries, industry_key);
        transaction.execute(self.store.as_ref()).await?;

        tracing::info!(industry_id, sub_industry_id = %sub_industry.id, "sub-industry created");
        Ok(sub_industry)
    }

    /// Gets a sub-industry by id
    ///
    /// # Errors
    ///
    /// Returns `GuardError::NotFound` if the sub-industry does not exist
    pub async fn get(&self, sub_industry_id: &str) -> GuardResult<SubIndustry> {
        let key = self.locate(sub_industry_id).await?;
        let versioned =
            get_item_with_version(self.store.as_ref(), &self.tables.sub_industries, &key)
                .await
                .map_err(|e| e.for_entity(ENTITY, sub_industry_id))?;

        from_record(versioned.item)
    }

    /// Lists the sub-industries of an industry
    ///
    /// # Errors
    ///
    /// Returns `GuardError` if the query fails
    pub async fn list_by_industry(&self, industry_id: &str) -> GuardResult<Vec<SubIndustry>> {
        let query = QuerySpec::partition(KeyAttribute::Pk, keys::industry_partition(industry_id))
            .sort_begins_with(KeyAttribute::Sk, keys::SUB_INDUSTRY_PREFIX);
        let items = self
            .store
            .query(&self.tables.sub_industries, &query)
            .await?;

        from_records(items)
    }

    /// Applies `patch` if the sub-industry is still at `expected_version`
    ///
    /// # Errors
    ///
    /// Returns `GuardError::ConcurrentModification` for a stale version, or
    /// `GuardError::NotFound` if the sub-industry does not exist
    pub async fn update(
        &self,
        sub_industry_id: &str,
        patch: &SubIndustryPatch,
        expected_version: i64,
    ) -> GuardResult<SubIndustry> {
        let key = self.locate(sub_industry_id).await?;
        let item = update_with_lock(
            self.store.as_ref(),
            &self.tables.sub_industries,
            &key,
            patch_update(patch)?,
            expected_version,
        )
        .await
        .map_err(|e| e.for_entity(ENTITY, sub_industry_id))?;

        from_record(item)
    }

    /// Deletes a sub-industry that has no use cases
    ///
    /// # Errors
    ///
    /// Returns `GuardError::ReferentialIntegrityViolation` citing "use cases"
    /// while any exist, or `GuardError::NotFound`
    pub async fn delete(&self, sub_industry_id: &str) -> GuardResult<()> {
        let key = self.locate(sub_industry_id).await?;
        let store = self.store.as_ref();
        let use_cases = self.tables.use_cases.as_str();

        guarded_delete(
            store,
            &self.tables.sub_industries,
            &key,
            vec![IntegrityCheck::new(
                "use cases",
                "Cannot delete sub-industry with existing use cases",
                move || dependency::sub_industry_has_use_cases(store, use_cases, sub_industry_id),
            )],
        )
        .await
        .map_err(|e| e.for_entity(ENTITY, sub_industry_id))?;

        tracing::info!(sub_industry_id, "sub-industry deleted");
        Ok(())
    }
}
