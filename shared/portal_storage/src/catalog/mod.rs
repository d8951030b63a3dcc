//! One handle over every entity storage

use std::sync::Arc;

use crate::content::ContentStorage;
use crate::customer_case::CustomerCaseStorage;
use crate::industry::IndustryStorage;
use crate::mapping::MappingStorage;
use crate::solution::SolutionStorage;
use crate::store::KeyValueStore;
use crate::sub_industry::SubIndustryStorage;
use crate::tables::CatalogTables;
use crate::use_case::UseCaseStorage;

/// Entity storages sharing one store and one set of table names
pub struct Catalog {
    /// Industries
    pub industries: IndustryStorage,
    /// Sub-industries
    pub sub_industries: SubIndustryStorage,
    /// Use cases
    pub use_cases: UseCaseStorage,
    /// Solutions
    pub solutions: SolutionStorage,
    /// Use case to solution mappings
    pub mappings: MappingStorage,
    /// Customer cases
    pub customer_cases: CustomerCaseStorage,
    /// News and blogs
    pub content: ContentStorage,
}

impl Catalog {
    /// Wires every storage to `store`
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>, tables: CatalogTables) -> Self {
        let tables = Arc::new(tables);
        Self {
            industries: IndustryStorage::new(store.clone(), tables.clone()),
            sub_industries: SubIndustryStorage::new(store.clone(), tables.clone()),
            use_cases: UseCaseStorage::new(store.clone(), tables.clone()),
            solutions: SolutionStorage::new(store.clone(), tables.clone()),
            mappings: MappingStorage::new(store.clone(), tables.clone()),
            customer_cases: CustomerCaseStorage::new(store.clone(), tables.clone()),
            content: ContentStorage::new(store, tables),
        }
    }
}
