//! Use case storage
//!
//! Use cases nest under their sub-industry (`SUBINDUSTRY#<subIndustryId>` /
//! `USECASE#<id>`) and carry the industry id as well, so access checks need
//! a single read.

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
use crate::sub_industry::SubIndustry;
use crate::tables::CatalogTables;

const ENTITY: &str = "UseCase";

/// Stored use case
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct UseCase {
    /// Identifier
    pub id: String,
    /// Industry of the parent sub-industry
    pub industry_id: String,
    /// Parent sub-industry
    pub sub_industry_id: String,
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

/// Fields of a new use case
#[derive(Debug, Clone, Default)]
pub struct NewUseCase {
    /// Display name
    pub name: String,
    /// Optional long description
    pub description: Option<String>,
}

/// Partial use case update; `None` keeps the stored value
#[derive(Debug, Clone, Default, Serialize)]
pub struct UseCasePatch {
    /// New display name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// New description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Use case storage backed by the use cases table
pub struct UseCaseStorage {
    store: Arc<dyn KeyValueStore>,
    tables: Arc<CatalogTables>,
}

impl UseCaseStorage {
    /// Creates a new use case storage
    #[must_use]
    pub const fn new(store: Arc<dyn KeyValueStore>, tables: Arc<CatalogTables>) -> Self {
        Self { store, tables }
    }

    async fn locate(&self, use_case_id: &str) -> GuardResult<ItemKey> {
        locate_by_sort_key(
            self.store.as_ref(),
            &self.tables.use_cases,
            &self.tables.id_index,
            keys::use_case_partition(use_case_id),
        )
        .await
        .map_err(|e| e.for_entity(ENTITY, use_case_id))
    }

    /// Creates a use case under an existing sub-industry
    ///
    /// # Errors
    ///
    /// Returns `GuardError::NotFound` if the sub-industry does not exist, or
    /// `GuardError::ConcurrentModification` if it vanished while writing
    pub async fn create(&self, sub_industry_id: &str, input: NewUseCase) -> GuardResult<UseCase> {
        let store = self.store.as_ref();
        let parent_key = locate_by_sort_key(
            store,
            &self.tables.sub_industries,
            &self.tables.id_index,
            keys::sub_industry_partition(sub_industry_id),
        )
        .await
        .map_err(|e| e.for_entity("SubIndustry", sub_industry_id))?;
        let parent: SubIndustry = from_record(
            get_item_with_version(store, &self.tables.sub_industries, &parent_key)
                .await
                .map_err(|e| e.for_entity("SubIndustry", sub_industry_id))?
                .item,
        )?;

        let now = record::now();
        let use_case = UseCase {
            id: record::new_id(),
            industry_id: parent.industry_id,
            sub_industry_id: sub_industry_id.to_string(),
            name: input.name,
            description: input.description,
            version: 1,
            created_at: now,
            updated_at: now,
        };
        let item = to_record(&use_case, &keys::use_case(sub_industry_id, &use_case.id))?;

        let mut transaction = TransactionBuilder::new();
        transaction.add_put(
            self.tables.use_cases.as_str(),
            item,
            Some(Condition::ItemNotExists),
        );
        touch_parent(&mut transaction, &self.tables.sub_industries, parent_key);
        transaction.execute(store).await?;

        tracing::info!(sub_industry_id, use_case_id = %use_case.id, "use case created");
        Ok(use_case)
    }

    /// Gets a use case by id
    ///
    /// # Errors
    ///
    /// Returns `GuardError::NotFound` if the use case does not exist
    pub async fn get(&self, use_case_id: &str) -> GuardResult<UseCase> {
        let key = self.locate(use_case_id).await?;
        let versioned = get_item_with_version(self.store.as_ref(), &self.tables.use_cases, &key)
            .await
            .map_err(|e| e.for_entity(ENTITY, use_case_id))?;

        from_record(versioned.item)
    }

    /// Lists the use cases of a sub-industry
    ///
    /// # Errors
    ///
    /// Returns `GuardError` if the query fails
    pub async fn list_by_sub_industry(&self, sub_industry_id: &str) -> GuardResult<Vec<UseCase>> {
        let query = QuerySpec::partition(
            KeyAttribute::Pk,
            keys::sub_industry_partition(sub_industry_id),
        )
        .sort_begins_with(KeyAttribute::Sk, keys::USE_CASE_PREFIX);
        let items = self.store.query(&self.tables.use_cases, &query).await?;

        from_records(items)
    }

    /// Applies `patch` if the use case is still at `expected_version`
    ///
    /// # Errors
    ///
    /// Returns `GuardError::ConcurrentModification` for a stale version, or
    /// `GuardError::NotFound` if the use case does not exist
    pub async fn update(
        &self,
        use_case_id: &str,
        patch: &UseCasePatch,
        expected_version: i64,
    ) -> GuardResult<UseCase> {
        let key = self.locate(use_case_id).await?;
        let item = update_with_lock(
            self.store.as_ref(),
            &self.tables.use_cases,
            &key,
            patch_update(patch)?,
            expected_version,
        )
        .await
        .map_err(|e| e.for_entity(ENTITY, use_case_id))?;

        from_record(item)
    }

    /// Deletes a use case no solution is mapped to
    ///
    /// # Errors
    ///
    /// Returns `GuardError::ReferentialIntegrityViolation` citing
    /// "solution mappings" while any exist, or `GuardError::NotFound`
    pub async fn delete(&self, use_case_id: &str) -> GuardResult<()> {
        let key = self.locate(use_case_id).await?;
        let store = self.store.as_ref();
        let mappings = self.tables.mappings.as_str();

        guarded_delete(
            store,
            &self.tables.use_cases,
            &key,
            vec![IntegrityCheck::new(
                "solution mappings",
                "Cannot delete use case with existing solution mappings",
                move || dependency::use_case_has_mappings(store, mappings, use_case_id),
            )],
        )
        .await
        .map_err(|e| e.for_entity(ENTITY, use_case_id))?;

        tracing::info!(use_case_id, "use case deleted");
        Ok(())
    }
}
