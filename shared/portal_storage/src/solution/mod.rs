//! Solution storage

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

const ENTITY: &str = "Solution";

/// Stored solution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Solution {
    /// Identifier
    pub id: String,
    /// Display name
    pub name: String,
    /// Optional long description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Company offering the solution
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vendor: Option<String>,
    /// Product page
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    /// Optimistic lock counter
    #[serde(default)]
    pub version: i64,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last modification time
    pub updated_at: DateTime<Utc>,
}

/// Fields of a new solution
#[derive(Debug, Clone, Default)]
pub struct NewSolution {
    /// Display name
    pub name: String,
    /// Optional long description
    pub description: Option<String>,
    /// Company offering the solution
    pub vendor: Option<String>,
    /// Product page
    pub website: Option<String>,
}

/// Partial solution update; `None` keeps the stored value
#[derive(Debug, Clone, Default, Serialize)]
pub struct SolutionPatch {
    /// New display name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// New description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// New vendor
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vendor: Option<String>,
    /// New product page
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
}

/// Solution storage backed by the solutions table
pub struct SolutionStorage {
    store: Arc<dyn KeyValueStore>,
    tables: Arc<CatalogTables>,
}

impl SolutionStorage {
    /// Creates a new solution storage
    #[must_use]
    pub const fn new(store: Arc<dyn KeyValueStore>, tables: Arc<CatalogTables>) -> Self {
        Self { store, tables }
    }

    /// Creates a solution with a generated id
    ///
    /// # Errors
    ///
    /// Returns `GuardError` if the write fails
    pub async fn create(&self, input: NewSolution) -> GuardResult<Solution> {
        let now = record::now();
        let solution = Solution {
            id: record::new_id(),
            name: input.name,
            description: input.description,
            vendor: input.vendor,
            website: input.website,
            version: 1,
            created_at: now,
            updated_at: now,
        };

        let item = to_record(&solution, &keys::solution(&solution.id))?;
        self.store
            .put_item(&self.tables.solutions, item, Some(&Condition::ItemNotExists))
            .await?;

        tracing::info!(solution_id = %solution.id, "solution created");
        Ok(solution)
    }

    /// Gets a solution by id
    ///
    /// # Errors
    ///
    /// Returns `GuardError::NotFound` if the solution does not exist
    pub async fn get(&self, solution_id: &str) -> GuardResult<Solution> {
        let versioned = get_item_with_version(
            self.store.as_ref(),
            &self.tables.solutions,
            &keys::solution(solution_id),
        )
        .await
        .map_err(|e| e.for_entity(ENTITY, solution_id))?;

        from_record(versioned.item)
    }

    /// Lists every solution
    ///
    /// # Errors
    ///
    /// Returns `GuardError` if the scan fails
    pub async fn list(&self) -> GuardResult<Vec<Solution>> {
        let items = self.store.scan(&self.tables.solutions, &[], None).await?;
        let mut solutions: Vec<Solution> = from_records(items)?;
        solutions.sort_by(|a, b| a.name.cmp(&b.name));

        Ok(solutions)
    }

    /// Applies `patch` if the solution is still at `expected_version`
    ///
    /// # Errors
    ///
    /// Returns `GuardError::ConcurrentModification` for a stale version, or
    /// `GuardError::NotFound` if the solution does not exist
    pub async fn update(
        &self,
        solution_id: &str,
        patch: &SolutionPatch,
        expected_version: i64,
    ) -> GuardResult<Solution> {
        let item = update_with_lock(
            self.store.as_ref(),
            &self.tables.solutions,
            &keys::solution(solution_id),
            patch_update(patch)?,
            expected_version,
        )
        .await
        .map_err(|e| e.for_entity(ENTITY, solution_id))?;

        from_record(item)
    }

    /// Deletes a solution without customer cases or use case mappings
    ///
    /// Customer cases are checked first, then mappings through the reverse index.
    ///
    /// # Errors
    ///
    /// Returns `GuardError::ReferentialIntegrityViolation` citing the first
    /// blocking collection, or `GuardError::NotFound`
    pub async fn delete(&self, solution_id: &str) -> GuardResult<()> {
        let store = self.store.as_ref();
        let customer_cases = self.tables.customer_cases.as_str();
        let mappings = self.tables.mappings.as_str();
        let reverse_index = self.tables.reverse_mapping_index.as_str();

        guarded_delete(
            store,
            &self.tables.solutions,
            &keys::solution(solution_id),
            vec![
                IntegrityCheck::new(
                    "customer cases",
                    "Cannot delete solution with existing customer cases",
                    move || {
                        dependency::solution_has_customer_cases(store, customer_cases, solution_id)
                    },
                ),
                IntegrityCheck::new(
                    "use case mappings",
                    "Cannot delete solution mapped to use cases",
                    move || {
                        dependency::solution_has_mappings(
                            store,
                            mappings,
                            reverse_index,
                            solution_id,
                        )
                    },
                ),
            ],
        )
        .await
        .map_err(|e| e.for_entity(ENTITY, solution_id))?;

        tracing::info!(solution_id, "solution deleted");
        Ok(())
    }
}
