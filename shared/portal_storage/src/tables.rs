//! Table and index names of the portal catalog

/// Names of every table and index the catalog storages use
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogTables {
    /// Industry records
    pub industries: String,
    /// Sub-industry records
    pub sub_industries: String,
    /// Use case records
    pub use_cases: String,
    /// Solution records
    pub solutions: String,
    /// Use case to solution mappings
    pub mappings: String,
    /// Customer case records
    pub customer_cases: String,
    /// News records
    pub news: String,
    /// Blog records
    pub blogs: String,
    /// GSI keyed by `SK` on the sub-industry and use case tables, for lookups by id alone
    ///
    /// Global secondary indexes are eventually consistent: a sub-industry or
    /// use case can answer `NotFound` through this index for a short moment
    /// after its create returned.
    pub id_index: String,
    /// GSI keyed by `GSI_PK`/`GSI_SK` on the mapping table, for solution to use case lookups
    ///
    /// Eventually consistent like [`Self::id_index`].
    pub reverse_mapping_index: String,
}

impl CatalogTables {
    /// Derives every name from a common prefix, e.g. `portal-industries`
    #[must_use]
    pub fn with_prefix(prefix: &str) -> Self {
        let table = |name: &str| format!("{prefix}-{name}");
        Self {
            industries: table("industries"),
            sub_industries: table("sub-industries"),
            use_cases: table("use-cases"),
            solutions: table("solutions"),
            mappings: table("mappings"),
            customer_cases: table("customer-cases"),
            news: table("news"),
            blogs: table("blogs"),
            id_index: "id-index".to_string(),
            reverse_mapping_index: "reverse-mapping-index".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_prefix() {
        let tables = CatalogTables::with_prefix("portal-dev");
        assert_eq!(tables.industries, "portal-dev-industries");
        assert_eq!(tables.customer_cases, "portal-dev-customer-cases");
        assert_eq!(tables.id_index, "id-index");
    }
}
