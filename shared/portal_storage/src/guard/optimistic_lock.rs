//! Optimistic locking through a per-record version counter
//!
//! Readers remember the `version` they saw; writers submit their change
//! together with the condition "stored version is absent or still equal".
//! The store evaluates the condition atomically, so a writer racing another
//! one fails instead of overwriting.

use aws_sdk_dynamodb::types::AttributeValue;

use super::{GuardError, GuardResult};
use crate::store::{Condition, Item, ItemKey, KeyValueStore, StoreError, UpdateSpec};

/// Attribute holding the version counter
pub const VERSION_ATTRIBUTE: &str = "version";

/// A record together with the version it was read at
#[derive(Debug, Clone, PartialEq)]
pub struct VersionedItem {
    /// Stored record
    pub item: Item,
    /// Version counter, 0 for records written before versioning existed
    pub version: i64,
}

/// Reads the version counter of a record, defaulting to 0
///
/// # Errors
///
/// Returns `GuardError::Serialization` if the attribute is not an integer
pub fn read_version(item: &Item) -> GuardResult<i64> {
    read_counter(item, VERSION_ATTRIBUTE)
}

/// Reads a numeric counter attribute, treating an absent one as 0
pub(crate) fn read_counter(item: &Item, name: &str) -> GuardResult<i64> {
    match item.get(name) {
        None => Ok(0),
        Some(AttributeValue::N(n)) => n
            .parse()
            .map_err(|e| GuardError::Serialization(format!("invalid {name} {n}: {e}"))),
        Some(other) => Err(GuardError::Serialization(format!(
            "{name} is not a number: {other:?}"
        ))),
    }
}

/// Fetches a record and its version
///
/// # Errors
///
/// Returns `GuardError::NotFound` if the record does not exist, or
/// `GuardError::Store` if the read fails
pub async fn get_item_with_version(
    store: &dyn KeyValueStore,
    table: &str,
    key: &ItemKey,
) -> GuardResult<VersionedItem> {
    let item = store
        .get_item(table, key)
        .await?
        .ok_or_else(|| GuardError::not_found(table, &key.to_string()))?;
    let version = read_version(&item)?;

    Ok(VersionedItem { item, version })
}

/// Condition that holds while the stored version is absent or equal to `current_version`
#[must_use]
pub fn optimistic_lock_condition(current_version: i64) -> Condition {
    Condition::AttributeMissingOrEquals {
        name: VERSION_ATTRIBUTE.to_string(),
        value: AttributeValue::N(current_version.to_string()),
    }
}

/// Extends `update` so a successful write also sets `version` to `current_version + 1`
#[must_use]
pub fn add_version_to_update(update: UpdateSpec, current_version: i64) -> UpdateSpec {
    update.set(
        VERSION_ATTRIBUTE,
        AttributeValue::N((current_version + 1).to_string()),
    )
}

/// Applies `update` only if the record is still at `expected_version`
///
/// # Errors
///
/// Returns `GuardError::ConcurrentModification` if another writer got there first,
/// `GuardError::NotFound` if the record does not exist, or `GuardError::Store`
/// if the store fails
pub async fn update_with_lock(
    store: &dyn KeyValueStore,
    table: &str,
    key: &ItemKey,
    update: UpdateSpec,
    expected_version: i64,
) -> GuardResult<Item> {
    let update = add_version_to_update(update, expected_version);
    let condition = Condition::ItemExists.and(optimistic_lock_condition(expected_version));

    match store
        .update_item(table, key, &update, Some(&condition))
        .await
    {
        Ok(item) => Ok(item),
        Err(StoreError::ConditionalCheckFailed) => {
            // The condition also fails for a missing record; tell the two apart
            if store.get_item(table, key).await?.is_none() {
                return Err(GuardError::not_found(table, &key.to_string()));
            }

            tracing::info!(%key, expected_version, "stale version rejected");
            Err(GuardError::ConcurrentModification)
        }
        Err(err) => Err(err.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::InMemoryStore;
    use pretty_assertions::assert_eq;

    const TABLE: &str = "industries";

    fn key() -> ItemKey {
        ItemKey::new("INDUSTRY#i1", "METADATA")
    }

    async fn seed(store: &InMemoryStore, version: Option<i64>) {
        let mut item = key().to_attributes();
        item.insert("name".to_string(), AttributeValue::S("Retail".to_string()));
        if let Some(version) = version {
            item.insert(
                VERSION_ATTRIBUTE.to_string(),
                AttributeValue::N(version.to_string()),
            );
        }
        store.put_item(TABLE, item, None).await.unwrap();
    }

    fn rename(name: &str) -> UpdateSpec {
        UpdateSpec::new().set("name", AttributeValue::S(name.to_string()))
    }

    #[tokio::test]
    async fn test_missing_version_reads_as_zero() {
        let store = InMemoryStore::new();
        seed(&store, None).await;

        let versioned = get_item_with_version(&store, TABLE, &key()).await.unwrap();
        assert_eq!(versioned.version, 0);
    }

    #[tokio::test]
    async fn test_missing_record_is_not_found() {
        let store = InMemoryStore::new();
        let result = get_item_with_version(&store, TABLE, &key()).await;
        assert!(matches!(result, Err(GuardError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_stale_version_is_rejected_and_leaves_record_unchanged() {
        let store = InMemoryStore::new();
        seed(&store, Some(4)).await;

        let updated = update_with_lock(&store, TABLE, &key(), rename("Retail 2"), 4)
            .await
            .unwrap();
        assert_eq!(read_version(&updated).unwrap(), 5);

        let stale = update_with_lock(&store, TABLE, &key(), rename("Retail 3"), 4).await;
        assert!(matches!(stale, Err(GuardError::ConcurrentModification)));

        let stored = get_item_with_version(&store, TABLE, &key()).await.unwrap();
        assert_eq!(stored.version, 5);
        assert_eq!(
            stored.item.get("name"),
            Some(&AttributeValue::S("Retail 2".to_string()))
        );
    }

    #[tokio::test]
    async fn test_unversioned_record_accepts_first_locked_update() {
        let store = InMemoryStore::new();
        seed(&store, None).await;

        let updated = update_with_lock(&store, TABLE, &key(), rename("Retail 2"), 0)
            .await
            .unwrap();
        assert_eq!(read_version(&updated).unwrap(), 1);
    }

    #[tokio::test]
    async fn test_locked_update_never_creates_records() {
        let store = InMemoryStore::new();
        let result = update_with_lock(&store, TABLE, &key(), rename("Retail"), 0).await;

        assert!(matches!(result, Err(GuardError::NotFound { .. })));
        assert!(store.is_empty(TABLE).await);
    }

    #[test]
    fn test_add_version_to_update() {
        let update = add_version_to_update(rename("x"), 7);
        assert_eq!(
            update.set.last(),
            Some(&(
                VERSION_ATTRIBUTE.to_string(),
                AttributeValue::N("8".to_string())
            ))
        );
    }

    #[test]
    fn test_lock_condition_matches_absent_or_equal() {
        let condition = optimistic_lock_condition(2);
        let mut item = key().to_attributes();

        assert!(condition.matches(Some(&item)));
        item.insert(
            VERSION_ATTRIBUTE.to_string(),
            AttributeValue::N("2".to_string()),
        );
        assert!(condition.matches(Some(&item)));
        item.insert(
            VERSION_ATTRIBUTE.to_string(),
            AttributeValue::N("3".to_string()),
        );
        assert!(!condition.matches(Some(&item)));
    }
}
