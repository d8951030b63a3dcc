//! Use case to solution mappings
//!
//! A mapping is written once under the use case (`USECASE#<u>` /
//! `SOLUTION#<s>`) and carries the swapped key in `GSI_PK`/`GSI_SK`, so the
//! reverse index answers "which use cases does this solution serve" from the
//! same record.

use std::sync::Arc;

use aws_sdk_dynamodb::types::AttributeValue;
use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::guard::{
    dependency, get_item_with_version, GuardError, GuardResult, IntegrityCheck,
    TransactionBuilder,
};
use crate::keys;
use crate::record::{
    self, from_record, from_records, guarded_delete, locate_by_sort_key, to_record, touch_parent,
};
use crate::store::{Condition, KeyAttribute, KeyValueStore, QuerySpec};
use crate::tables::CatalogTables;

const ENTITY: &str = "Mapping";

/// Link between a use case and a solution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Mapping {
    /// Mapped use case
    pub use_case_id: String,
    /// Mapped solution
    pub solution_id: String,
    /// How the solution addresses the use case
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Optimistic lock counter
    #[serde(default)]
    pub version: i64,
    /// Creation time
    pub created_at: DateTime<Utc>,
}

/// Mapping storage backed by the mappings table and its reverse index
pub struct MappingStorage {
    store: Arc<dyn KeyValueStore>,
    tables: Arc<CatalogTables>,
}

impl MappingStorage {
    /// Creates a new mapping storage
    #[must_use]
    pub const fn new(store: Arc<dyn KeyValueStore>, tables: Arc<CatalogTables>) -> Self {
        Self { store, tables }
    }

    /// Maps a solution to a use case
    ///
    /// Both ends must exist. The mapping and the dependents revision bumps of
    /// both ends are written in one transaction.
    ///
    /// # Errors
    ///
    /// Returns `GuardError::NotFound` if either end is missing,
    /// `GuardError::AlreadyExists` if the pair is already mapped, or
    /// `GuardError::ConcurrentModification` if an end vanished while writing
    pub async fn create(
        &self,
        use_case_id: &str,
        solution_id: &str,
        notes: Option<String>,
    ) -> GuardResult<Mapping> {
        let store = self.store.as_ref();
        let use_case_key = locate_by_sort_key(
            store,
            &self.tables.use_cases,
            &self.tables.id_index,
            keys::use_case_partition(use_case_id),
        )
        .await
        .map_err(|e| e.for_entity("UseCase", use_case_id))?;
        let solution_key = keys::solution(solution_id);
        get_item_with_version(store, &self.tables.solutions, &solution_key)
            .await
            .map_err(|e| e.for_entity("Solution", solution_id))?;

        let key = keys::mapping(use_case_id, solution_id);
        if store.get_item(&self.tables.mappings, &key).await?.is_some() {
            return Err(already_exists(use_case_id, solution_id));
        }

        let mapping = Mapping {
            use_case_id: use_case_id.to_string(),
            solution_id: solution_id.to_string(),
            notes,
            version: 1,
            created_at: record::now(),
        };
        let mut item = to_record(&mapping, &key)?;
        item.insert(
            KeyAttribute::GsiPk.to_string(),
            AttributeValue::S(keys::solution_partition(solution_id)),
        );
        item.insert(
            KeyAttribute::GsiSk.to_string(),
            AttributeValue::S(keys::use_case_partition(use_case_id)),
        );

        let mut transaction = TransactionBuilder::new();
        transaction.add_put(
            self.tables.mappings.as_str(),
            item,
            Some(Condition::ItemNotExists),
        );
        touch_parent(&mut transaction, &self.tables.use_cases, use_case_key);
        touch_parent(&mut transaction, &self.tables.solutions, solution_key);

        if let Err(err) = transaction.execute(store).await {
            // Lost a race against an identical create
            if matches!(err, GuardError::ConcurrentModification)
                && store.get_item(&self.tables.mappings, &key).await?.is_some()
            {
                return Err(already_exists(use_case_id, solution_id));
            }
            return Err(err);
        }

        tracing::info!(use_case_id, solution_id, "mapping created");
        Ok(mapping)
    }

    /// Gets the mapping of a pair
    ///
    /// # Errors
    ///
    /// Returns `GuardError::NotFound` if the pair is not mapped
    pub async fn get(&self, use_case_id: &str, solution_id: &str) -> GuardResult<Mapping> {
        let item = self
            .store
            .get_item(&self.tables.mappings, &keys::mapping(use_case_id, solution_id))
            .await?
            .ok_or_else(|| GuardError::not_found(ENTITY, &pair_id(use_case_id, solution_id)))?;

        from_record(item)
    }

    /// Lists the mappings of a use case
    ///
    /// # Errors
    ///
    /// Returns `GuardError` if the query fails
    pub async fn list_by_use_case(&self, use_case_id: &str) -> GuardResult<Vec<Mapping>> {
        let query = QuerySpec::partition(KeyAttribute::Pk, keys::use_case_partition(use_case_id));
        let items = self.store.query(&self.tables.mappings, &query).await?;

        from_records(items)
    }

    /// Lists the mappings of a solution through the reverse index
    ///
    /// # Errors
    ///
    /// Returns `GuardError` if the query fails
    pub async fn list_by_solution(&self, solution_id: &str) -> GuardResult<Vec<Mapping>> {
        let query = QuerySpec::partition(KeyAttribute::GsiPk, keys::solution_partition(solution_id))
            .on_index(&self.tables.reverse_mapping_index);
        let items = self.store.query(&self.tables.mappings, &query).await?;

        from_records(items)
    }

    /// Removes a mapping no customer case refers to
    ///
    /// # Errors
    ///
    /// Returns `GuardError::ReferentialIntegrityViolation` citing
    /// "customer cases" while any reference the pair, or `GuardError::NotFound`
    pub async fn delete(&self, use_case_id: &str, solution_id: &str) -> GuardResult<()> {
        let store = self.store.as_ref();
        let customer_cases = self.tables.customer_cases.as_str();

        guarded_delete(
            store,
            &self.tables.mappings,
            &keys::mapping(use_case_id, solution_id),
            vec![IntegrityCheck::new(
                "customer cases",
                "Cannot remove mapping referenced by customer cases",
                move || {
                    dependency::mapping_has_customer_cases(
                        store,
                        customer_cases,
                        use_case_id,
                        solution_id,
                    )
                },
            )],
        )
        .await
        .map_err(|e| e.for_entity(ENTITY, &pair_id(use_case_id, solution_id)))?;

        tracing::info!(use_case_id, solution_id, "mapping deleted");
        Ok(())
    }
}

fn pair_id(use_case_id: &str, solution_id: &str) -> String {
    format!("{use_case_id}/{solution_id}")
}

fn already_exists(use_case_id: &str, solution_id: &str) -> GuardError {
    GuardError::AlreadyExists {
        entity: ENTITY.to_string(),
        id: pair_id(use_case_id, solution_id),
    }
}
