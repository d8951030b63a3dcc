//! Mapping between entity structs and stored records, plus the write paths
//! every entity storage shares

use aws_sdk_dynamodb::types::AttributeValue;
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};

use crate::guard::{
    optimistic_lock::read_counter, validate_referential_integrity, GuardError, GuardResult,
    IntegrityCheck, TransactionBuilder,
};
use crate::store::{
    Condition, Item, ItemKey, KeyAttribute, KeyValueStore, QuerySpec, StoreError, UpdateSpec,
};

/// Counter bumped on a parent every time a child is attached to it
pub const DEPENDENTS_REVISION_ATTRIBUTE: &str = "dependents_revision";

const UPDATED_AT_ATTRIBUTE: &str = "updated_at";

pub(crate) fn now() -> DateTime<Utc> {
    Utc::now()
}

pub(crate) fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Serializes `entity` and adds the key attributes
pub(crate) fn to_record<T: Serialize>(entity: &T, key: &ItemKey) -> GuardResult<Item> {
    let mut item: Item = serde_dynamo::to_item(entity)?;
    item.extend(key.to_attributes());
    Ok(item)
}

pub(crate) fn from_record<T: DeserializeOwned>(item: Item) -> GuardResult<T> {
    Ok(serde_dynamo::from_item(item)?)
}

pub(crate) fn from_records<T: DeserializeOwned>(items: Vec<Item>) -> GuardResult<Vec<T>> {
    items.into_iter().map(from_record).collect()
}

/// Update replacing every field the patch sets and refreshing `updated_at`
///
/// Patch structs skip `None` fields when serialized, so unset fields keep
/// their stored value.
pub(crate) fn patch_update<P: Serialize>(patch: &P) -> GuardResult<UpdateSpec> {
    let attributes: Item = serde_dynamo::to_item(patch)?;
    let updated_at: AttributeValue = serde_dynamo::to_attribute_value(now())?;

    Ok(UpdateSpec::new()
        .set_all(attributes)
        .set(UPDATED_AT_ATTRIBUTE, updated_at))
}

/// Resolves the full key of a nested record from its sort key alone
///
/// # Errors
///
/// Returns `GuardError::NotFound` if no record carries `sort_key`
pub(crate) async fn locate_by_sort_key(
    store: &dyn KeyValueStore,
    table: &str,
    id_index: &str,
    sort_key: String,
) -> GuardResult<ItemKey> {
    let query = QuerySpec::partition(KeyAttribute::Sk, sort_key.clone())
        .on_index(id_index)
        .limit(1);

    store
        .query(table, &query)
        .await?
        .first()
        .and_then(ItemKey::from_item)
        .ok_or_else(|| GuardError::not_found(table, &sort_key))
}

/// Queues the bump of a parent's dependents revision, requiring the parent to exist
pub(crate) fn touch_parent(transaction: &mut TransactionBuilder, table: &str, key: ItemKey) {
    transaction.add_update(
        table,
        key,
        UpdateSpec::new().increment(DEPENDENTS_REVISION_ATTRIBUTE, 1),
        Some(Condition::ItemExists),
    );
}

/// Deletes a record once `checks` find no dependents
///
/// The delete is conditioned on the dependents revision read before the
/// checks ran, so a child attached in between makes it fail instead of
/// leaving an orphan.
///
/// # Errors
///
/// Returns `GuardError::NotFound` if the record is absent,
/// `GuardError::ReferentialIntegrityViolation` if a check finds dependents,
/// or `GuardError::ConcurrentModification` if a child was attached meanwhile
pub(crate) async fn guarded_delete(
    store: &dyn KeyValueStore,
    table: &str,
    key: &ItemKey,
    checks: Vec<IntegrityCheck<'_>>,
) -> GuardResult<()> {
    let current = store
        .get_item(table, key)
        .await?
        .ok_or_else(|| GuardError::not_found(table, &key.to_string()))?;
    let revision = read_counter(&current, DEPENDENTS_REVISION_ATTRIBUTE)?;

    validate_referential_integrity(checks).await?;

    let condition = Condition::ItemExists.and(Condition::AttributeMissingOrEquals {
        name: DEPENDENTS_REVISION_ATTRIBUTE.to_string(),
        value: AttributeValue::N(revision.to_string()),
    });

    match store.delete_item(table, key, Some(&condition)).await {
        Ok(()) => Ok(()),
        Err(StoreError::ConditionalCheckFailed) => {
            if store.get_item(table, key).await?.is_none() {
                return Err(GuardError::not_found(table, &key.to_string()));
            }

            tracing::info!(%key, revision, "dependent attached during delete");
            Err(GuardError::ConcurrentModification)
        }
        Err(err) => Err(err.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::InMemoryStore;
    use serde::Deserialize;

    const TABLE: &str = "industries";

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Sample {
        id: String,
        name: String,
    }

    #[derive(Serialize)]
    struct SamplePatch {
        #[serde(skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    }

    #[test]
    fn test_record_keeps_key_attributes_and_ignores_them_on_read() {
        let sample = Sample {
            id: "i1".to_string(),
            name: "Retail".to_string(),
        };
        let item = to_record(&sample, &ItemKey::new("INDUSTRY#i1", "METADATA")).unwrap();

        assert_eq!(item.get("PK"), Some(&AttributeValue::S("INDUSTRY#i1".into())));
        assert_eq!(from_record::<Sample>(item).unwrap(), sample);
    }

    #[test]
    fn test_patch_update_only_sets_given_fields() {
        let update = patch_update(&SamplePatch {
            name: Some("Retail".to_string()),
            description: None,
        })
        .unwrap();

        let names: Vec<&str> = update.set.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(names, vec!["name", "updated_at"]);
    }

    #[tokio::test]
    async fn test_child_attached_after_checks_blocks_delete() {
        let store = InMemoryStore::new();
        let key = ItemKey::new("INDUSTRY#i1", "METADATA");
        store.put_item(TABLE, key.to_attributes(), None).await.unwrap();

        let store_ref = &store;
        let racing_key = key.clone();
        let result = guarded_delete(
            &store,
            TABLE,
            &key,
            vec![IntegrityCheck::new(
                "sub-industries",
                "has sub-industries",
                move || async move {
                    // A child lands between the probe and the delete
                    let mut transaction = TransactionBuilder::new();
                    touch_parent(&mut transaction, TABLE, racing_key);
                    transaction.execute(store_ref).await?;
                    Ok(false)
                },
            )],
        )
        .await;

        assert!(matches!(result, Err(GuardError::ConcurrentModification)));
        assert!(store.raw_item(TABLE, &key).await.is_some());
    }

    #[tokio::test]
    async fn test_delete_without_dependents() {
        let store = InMemoryStore::new();
        let key = ItemKey::new("INDUSTRY#i1", "METADATA");
        store.put_item(TABLE, key.to_attributes(), None).await.unwrap();

        guarded_delete(&store, TABLE, &key, Vec::new()).await.unwrap();
        assert!(store.is_empty(TABLE).await);

        let again = guarded_delete(&store, TABLE, &key, Vec::new()).await;
        assert!(matches!(again, Err(GuardError::NotFound { .. })));
    }
}
