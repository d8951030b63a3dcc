//! Dependency probes run before a parent record is deleted
//!
//! Every probe asks for at most one record and answers whether any came
//! back. An empty result is a valid `false`, never an error.

use aws_sdk_dynamodb::types::AttributeValue;

use super::GuardResult;
use crate::keys;
use crate::store::{KeyAttribute, KeyValueStore, QuerySpec};

/// Attribute holding the use case id on customer case records
pub const USE_CASE_ID_ATTRIBUTE: &str = "use_case_id";
/// Attribute holding the solution id on customer case records
pub const SOLUTION_ID_ATTRIBUTE: &str = "solution_id";
/// Attribute holding the optional industry tag on news and blog records
pub const INDUSTRY_ID_ATTRIBUTE: &str = "industry_id";

async fn has_any(store: &dyn KeyValueStore, table: &str, query: QuerySpec) -> GuardResult<bool> {
    let items = store.query(table, &query.limit(1)).await?;
    Ok(!items.is_empty())
}

/// Whether the industry has at least one sub-industry
///
/// # Errors
///
/// Returns `GuardError::Store` if the query fails
pub async fn industry_has_sub_industries(
    store: &dyn KeyValueStore,
    sub_industry_table: &str,
    industry_id: &str,
) -> GuardResult<bool> {
    has_any(
        store,
        sub_industry_table,
        QuerySpec::partition(KeyAttribute::Pk, keys::industry_partition(industry_id))
            .sort_begins_with(KeyAttribute::Sk, keys::SUB_INDUSTRY_PREFIX),
    )
    .await
}

/// Whether the sub-industry has at least one use case
///
/// # Errors
///
/// Returns `GuardError::Store` if the query fails
pub async fn sub_industry_has_use_cases(
    store: &dyn KeyValueStore,
    use_case_table: &str,
    sub_industry_id: &str,
) -> GuardResult<bool> {
    has_any(
        store,
        use_case_table,
        QuerySpec::partition(KeyAttribute::Pk, keys::sub_industry_partition(sub_industry_id))
            .sort_begins_with(KeyAttribute::Sk, keys::USE_CASE_PREFIX),
    )
    .await
}

/// Whether the solution has at least one customer case
///
/// # Errors
///
/// Returns `GuardError::Store` if the query fails
pub async fn solution_has_customer_cases(
    store: &dyn KeyValueStore,
    customer_case_table: &str,
    solution_id: &str,
) -> GuardResult<bool> {
    has_any(
        store,
        customer_case_table,
        QuerySpec::partition(KeyAttribute::Pk, keys::solution_partition(solution_id))
            .sort_begins_with(KeyAttribute::Sk, keys::CUSTOMER_CASE_PREFIX),
    )
    .await
}

/// Whether the use case is mapped to at least one solution (forward key)
///
/// # Errors
///
/// Returns `GuardError::Store` if the query fails
pub async fn use_case_has_mappings(
    store: &dyn KeyValueStore,
    mapping_table: &str,
    use_case_id: &str,
) -> GuardResult<bool> {
    has_any(
        store,
        mapping_table,
        QuerySpec::partition(KeyAttribute::Pk, keys::use_case_partition(use_case_id)),
    )
    .await
}

/// Whether the solution is mapped to at least one use case (reverse index)
///
/// # Errors
///
/// Returns `GuardError::Store` if the query fails
pub async fn solution_has_mappings(
    store: &dyn KeyValueStore,
    mapping_table: &str,
    reverse_index: &str,
    solution_id: &str,
) -> GuardResult<bool> {
    has_any(
        store,
        mapping_table,
        QuerySpec::partition(KeyAttribute::GsiPk, keys::solution_partition(solution_id))
            .on_index(reverse_index),
    )
    .await
}

/// Whether any news item or blog post in `content_table` is tagged with the industry
///
/// The tag is a plain attribute, so this is a filtered scan.
///
/// # Errors
///
/// Returns `GuardError::Store` if the scan fails
pub async fn industry_has_tagged_content(
    store: &dyn KeyValueStore,
    content_table: &str,
    industry_id: &str,
) -> GuardResult<bool> {
    let filters = [(
        INDUSTRY_ID_ATTRIBUTE.to_string(),
        AttributeValue::S(industry_id.to_string()),
    )];

    let items = store.scan(content_table, &filters, Some(1)).await?;
    Ok(!items.is_empty())
}

/// Whether any customer case references the (use case, solution) pair
///
/// This relation has no key path, so it is a filtered scan.
///
/// # Errors
///
/// Returns `GuardError::Store` if the scan fails
pub async fn mapping_has_customer_cases(
    store: &dyn KeyValueStore,
    customer_case_table: &str,
    use_case_id: &str,
    solution_id: &str,
) -> GuardResult<bool> {
    let filters = [
        (
            USE_CASE_ID_ATTRIBUTE.to_string(),
            AttributeValue::S(use_case_id.to_string()),
        ),
        (
            SOLUTION_ID_ATTRIBUTE.to_string(),
            AttributeValue::S(solution_id.to_string()),
        ),
    ];

    let items = store.scan(customer_case_table, &filters, Some(1)).await?;
    Ok(!items.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{memory::InMemoryStore, Item, ItemKey};
    use crate::GuardError;

    const SUB_INDUSTRIES: &str = "sub-industries";
    const MAPPINGS: &str = "mappings";
    const CUSTOMER_CASES: &str = "customer-cases";

    fn with_attributes(key: ItemKey, attributes: &[(&str, &str)]) -> Item {
        let mut item = key.to_attributes();
        for (name, value) in attributes {
            item.insert((*name).to_string(), AttributeValue::S((*value).to_string()));
        }
        item
    }

    #[tokio::test]
    async fn test_sub_industry_probe_follows_child_lifecycle() {
        let store = InMemoryStore::new();
        let child = keys::sub_industry("i1", "s1");

        assert!(!industry_has_sub_industries(&store, SUB_INDUSTRIES, "i1")
            .await
            .unwrap());

        store
            .put_item(SUB_INDUSTRIES, child.to_attributes(), None)
            .await
            .unwrap();
        assert!(industry_has_sub_industries(&store, SUB_INDUSTRIES, "i1")
            .await
            .unwrap());
        assert!(!industry_has_sub_industries(&store, SUB_INDUSTRIES, "i2")
            .await
            .unwrap());

        store
            .delete_item(SUB_INDUSTRIES, &child, None)
            .await
            .unwrap();
        assert!(!industry_has_sub_industries(&store, SUB_INDUSTRIES, "i1")
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_mapping_probes_use_both_directions() {
        let store = InMemoryStore::new();
        let item = with_attributes(
            keys::mapping("u1", "x1"),
            &[("GSI_PK", "SOLUTION#x1"), ("GSI_SK", "USECASE#u1")],
        );
        store.put_item(MAPPINGS, item, None).await.unwrap();

        assert!(use_case_has_mappings(&store, MAPPINGS, "u1").await.unwrap());
        assert!(solution_has_mappings(&store, MAPPINGS, "reverse", "x1")
            .await
            .unwrap());
        assert!(!solution_has_mappings(&store, MAPPINGS, "reverse", "u1")
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_mapping_customer_case_scan_matches_both_ids() {
        let store = InMemoryStore::new();
        let item = with_attributes(
            keys::customer_case("x1", "c1"),
            &[("use_case_id", "u1"), ("solution_id", "x1")],
        );
        store.put_item(CUSTOMER_CASES, item, None).await.unwrap();

        assert!(mapping_has_customer_cases(&store, CUSTOMER_CASES, "u1", "x1")
            .await
            .unwrap());
        assert!(!mapping_has_customer_cases(&store, CUSTOMER_CASES, "u2", "x1")
            .await
            .unwrap());
        assert!(solution_has_customer_cases(&store, CUSTOMER_CASES, "x1")
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_tagged_content_scan_matches_industry() {
        let store = InMemoryStore::new();
        let post = with_attributes(
            keys::content(keys::NEWS_PREFIX, "n1"),
            &[("industry_id", "i1")],
        );
        store.put_item("news", post, None).await.unwrap();

        assert!(industry_has_tagged_content(&store, "news", "i1")
            .await
            .unwrap());
        assert!(!industry_has_tagged_content(&store, "news", "i2")
            .await
            .unwrap());
        assert!(!industry_has_tagged_content(&store, "blogs", "i1")
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_store_errors_propagate() {
        let store = InMemoryStore::new();
        store.fail_next_call("throttled").await;

        let result = use_case_has_mappings(&store, MAPPINGS, "u1").await;
        assert!(matches!(result, Err(GuardError::Store(_))));
    }
}
