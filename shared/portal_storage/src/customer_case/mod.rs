//! Customer case storage
//!
//! Customer cases nest under their solution and reference a use case by id.
//! The (use case, solution) pair must be mapped before a case can cite it.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::guard::{
    get_item_with_version, update_with_lock, GuardError, GuardResult, TransactionBuilder,
};
use crate::keys;
use crate::record::{
    self, from_record, from_records, guarded_delete, locate_by_sort_key, patch_update, to_record,
    touch_parent,
};
use crate::store::{Condition, KeyAttribute, KeyValueStore, QuerySpec};
use crate::tables::CatalogTables;

const ENTITY: &str = "CustomerCase";

/// Stored customer case
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct CustomerCase {
    /// Identifier
    pub id: String,
    /// Solution the case showcases
    pub solution_id: String,
    /// Use case the solution was applied to
    pub use_case_id: String,
    /// Headline
    pub title: String,
    /// Customer the case is about
    pub customer_name: String,
    /// Short narrative
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// Optimistic lock counter
    #[serde(default)]
    pub version: i64,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last modification time
    pub updated_at: DateTime<Utc>,
}

/// Fields of a new customer case
#[derive(Debug, Clone, Default)]
pub struct NewCustomerCase {
    /// Use case the solution was applied to
    pub use_case_id: String,
    /// Headline
    pub title: String,
    /// Customer the case is about
    pub customer_name: String,
    /// Short narrative
    pub summary: Option<String>,
}

/// Partial customer case update; `None` keeps the stored value
#[derive(Debug, Clone, Default, Serialize)]
pub struct CustomerCasePatch {
    /// New headline
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// New customer name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_name: Option<String>,
    /// New narrative
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

/// Customer case storage backed by the customer cases table
pub struct CustomerCaseStorage {
    store: Arc<dyn KeyValueStore>,
    tables: Arc<CatalogTables>,
}

impl CustomerCaseStorage {
    /// Creates a new customer case storage
    #[must_use]
    pub const fn new(store: Arc<dyn KeyValueStore>, tables: Arc<CatalogTables>) -> Self {
        Self { store, tables }
    }

    /// Creates a customer case for a mapped (use case, solution) pair
    ///
    /// The write also bumps the dependents revision of the mapping and the
    /// solution, and requires the use case to still exist.
    ///
    /// # Errors
    ///
    /// Returns `GuardError::NotFound` if the solution or use case is missing,
    /// `GuardError::MissingReference` if the pair is not mapped, or
    /// `GuardError::ConcurrentModification` if a referenced record vanished
    /// while writing
    pub async fn create(
        &self,
        solution_id: &str,
        input: NewCustomerCase,
    ) -> GuardResult<CustomerCase> {
        let store = self.store.as_ref();
        let solution_key = keys::solution(solution_id);
        get_item_with_version(store, &self.tables.solutions, &solution_key)
            .await
            .map_err(|e| e.for_entity("Solution", solution_id))?;
        let use_case_key = locate_by_sort_key(
            store,
            &self.tables.use_cases,
            &self.tables.id_index,
            keys::use_case_partition(&input.use_case_id),
        )
        .await
        .map_err(|e| e.for_entity("UseCase", &input.use_case_id))?;

        let mapping_key = keys::mapping(&input.use_case_id, solution_id);
        if store
            .get_item(&self.tables.mappings, &mapping_key)
            .await?
            .is_none()
        {
            return Err(not_mapped(&input.use_case_id, solution_id));
        }

        let now = record::now();
        let customer_case = CustomerCase {
            id: record::new_id(),
            solution_id: solution_id.to_string(),
            use_case_id: input.use_case_id,
            title: input.title,
            customer_name: input.customer_name,
            summary: input.summary,
            version: 1,
            created_at: now,
            updated_at: now,
        };
        let item = to_record(
            &customer_case,
            &keys::customer_case(solution_id, &customer_case.id),
        )?;

        let mut transaction = TransactionBuilder::new();
        transaction
            .add_put(
                self.tables.customer_cases.as_str(),
                item,
                Some(Condition::ItemNotExists),
            )
            .add_condition_check(
                self.tables.use_cases.as_str(),
                use_case_key,
                Condition::ItemExists,
            );
        touch_parent(&mut transaction, &self.tables.mappings, mapping_key.clone());
        touch_parent(&mut transaction, &self.tables.solutions, solution_key);

        if let Err(err) = transaction.execute(store).await {
            if matches!(err, GuardError::ConcurrentModification)
                && store
                    .get_item(&self.tables.mappings, &mapping_key)
                    .await?
                    .is_none()
            {
                return Err(not_mapped(&customer_case.use_case_id, solution_id));
            }
            return Err(err);
        }

        tracing::info!(
            solution_id,
            customer_case_id = %customer_case.id,
            "customer case created"
        );
        Ok(customer_case)
    }

    /// Gets a customer case of a solution
    ///
    /// # Errors
    ///
    /// Returns `GuardError::NotFound` if the case does not exist
    pub async fn get(&self, solution_id: &str, customer_case_id: &str) -> GuardResult<CustomerCase> {
        let versioned = get_item_with_version(
            self.store.as_ref(),
            &self.tables.customer_cases,
            &keys::customer_case(solution_id, customer_case_id),
        )
        .await
        .map_err(|e| e.for_entity(ENTITY, customer_case_id))?;

        from_record(versioned.item)
    }

    /// Lists the customer cases of a solution
    ///
    /// # Errors
    ///
    /// Returns `GuardError` if the query fails
    pub async fn list_by_solution(&self, solution_id: &str) -> GuardResult<Vec<CustomerCase>> {
        let query = QuerySpec::partition(KeyAttribute::Pk, keys::solution_partition(solution_id))
            .sort_begins_with(KeyAttribute::Sk, keys::CUSTOMER_CASE_PREFIX);
        let items = self.store.query(&self.tables.customer_cases, &query).await?;

        from_records(items)
    }

    /// Applies `patch` if the case is still at `expected_version`
    ///
    /// # Errors
    ///
    /// Returns `GuardError::ConcurrentModification` for a stale version, or
    /// `GuardError::NotFound` if the case does not exist
    pub async fn update(
        &self,
        solution_id: &str,
        customer_case_id: &str,
        patch: &CustomerCasePatch,
        expected_version: i64,
    ) -> GuardResult<CustomerCase> {
        let item = update_with_lock(
            self.store.as_ref(),
            &self.tables.customer_cases,
            &keys::customer_case(solution_id, customer_case_id),
            patch_update(patch)?,
            expected_version,
        )
        .await
        .map_err(|e| e.for_entity(ENTITY, customer_case_id))?;

        from_record(item)
    }

    /// Deletes a customer case
    ///
    /// # Errors
    ///
    /// Returns `GuardError::NotFound` if the case does not exist
    pub async fn delete(&self, solution_id: &str, customer_case_id: &str) -> GuardResult<()> {
        guarded_delete(
            self.store.as_ref(),
            &self.tables.customer_cases,
            &keys::customer_case(solution_id, customer_case_id),
            Vec::new(),
        )
        .await
        .map_err(|e| e.for_entity(ENTITY, customer_case_id))?;

        tracing::info!(solution_id, customer_case_id, "customer case deleted");
        Ok(())
    }
}

fn not_mapped(use_case_id: &str, solution_id: &str) -> GuardError {
    GuardError::MissingReference(format!(
        "Use case {use_case_id} is not mapped to solution {solution_id}"
    ))
}
