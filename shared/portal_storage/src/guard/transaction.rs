//! All-or-nothing multi-record writes

use super::{GuardError, GuardResult};
use crate::store::{Condition, Item, ItemKey, KeyValueStore, StoreError, TransactOp, UpdateSpec};

/// Hard ceiling on operations per transaction enforced by the store
pub const MAX_TRANSACTION_ITEMS: usize = 100;

/// Accumulates writes and submits them as a single transaction
#[derive(Debug, Default)]
pub struct TransactionBuilder {
    operations: Vec<TransactOp>,
}

impl TransactionBuilder {
    /// Creates an empty transaction
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a full record write
    pub fn add_put(
        &mut self,
        table: impl Into<String>,
        item: Item,
        condition: Option<Condition>,
    ) -> &mut Self {
        self.operations.push(TransactOp::Put {
            table: table.into(),
            item,
            condition,
        });
        self
    }

    /// Queues a partial mutation of an existing record
    pub fn add_update(
        &mut self,
        table: impl Into<String>,
        key: ItemKey,
        update: UpdateSpec,
        condition: Option<Condition>,
    ) -> &mut Self {
        self.operations.push(TransactOp::Update {
            table: table.into(),
            key,
            update,
            condition,
        });
        self
    }

    /// Queues a record removal
    pub fn add_delete(
        &mut self,
        table: impl Into<String>,
        key: ItemKey,
        condition: Option<Condition>,
    ) -> &mut Self {
        self.operations.push(TransactOp::Delete {
            table: table.into(),
            key,
            condition,
        });
        self
    }

    /// Makes the state of a record part of the transaction without writing it
    pub fn add_condition_check(
        &mut self,
        table: impl Into<String>,
        key: ItemKey,
        condition: Condition,
    ) -> &mut Self {
        self.operations.push(TransactOp::ConditionCheck {
            table: table.into(),
            key,
            condition,
        });
        self
    }

    /// Number of queued operations
    #[must_use]
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    /// Whether nothing is queued
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Submits every queued operation as one unit
    ///
    /// An empty transaction is a no-op and does not reach the store.
    ///
    /// # Errors
    ///
    /// Returns
    /// - `GuardError::TransactionTooLarge` before any store call when more than
    ///   [`MAX_TRANSACTION_ITEMS`] operations are queued
    /// - `GuardError::ConcurrentModification` when any condition failed
    /// - `GuardError::TransactionFailed` when the store cancelled for another reason
    /// - `GuardError::Store` for every other store failure
    pub async fn execute(self, store: &dyn KeyValueStore) -> GuardResult<()> {
        if self.operations.is_empty() {
            tracing::debug!("skipping empty transaction");
            return Ok(());
        }

        let count = self.operations.len();
        if count > MAX_TRANSACTION_ITEMS {
            return Err(GuardError::TransactionTooLarge {
                count,
                max: MAX_TRANSACTION_ITEMS,
            });
        }

        match store.transact_write(self.operations).await {
            Ok(()) => Ok(()),
            Err(StoreError::TransactionCanceled { reasons }) => {
                if reasons.iter().any(|r| r.is_condition_failure()) {
                    tracing::info!(count, "transaction condition failed");
                    Err(GuardError::ConcurrentModification)
                } else {
                    tracing::warn!(?reasons, "transaction cancelled");
                    Err(GuardError::TransactionFailed { reasons })
                }
            }
            Err(err) => Err(err.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{memory::InMemoryStore, CancellationReason, QuerySpec, StoreResult};
    use async_trait::async_trait;
    use aws_sdk_dynamodb::types::AttributeValue;

    const TABLE: &str = "solutions";

    fn record(id: &str) -> Item {
        ItemKey::new(format!("SOLUTION#{id}"), "METADATA").to_attributes()
    }

    #[tokio::test]
    async fn test_failed_condition_applies_nothing() {
        let store = InMemoryStore::new();
        store.put_item(TABLE, record("b"), None).await.unwrap();

        let mut transaction = TransactionBuilder::new();
        transaction
            .add_put(TABLE, record("a"), Some(Condition::ItemNotExists))
            .add_put(TABLE, record("b"), Some(Condition::ItemNotExists));
        let result = transaction.execute(&store).await;

        assert!(matches!(result, Err(GuardError::ConcurrentModification)));
        assert_eq!(store.len(TABLE).await, 1);
        assert!(store
            .raw_item(TABLE, &ItemKey::new("SOLUTION#a", "METADATA"))
            .await
            .is_none());
    }

    #[tokio::test]
    async fn test_oversized_transaction_never_reaches_store() {
        let store = InMemoryStore::new();
        let mut transaction = TransactionBuilder::new();
        for i in 0..=MAX_TRANSACTION_ITEMS {
            transaction.add_put(TABLE, record(&i.to_string()), None);
        }
        assert_eq!(transaction.len(), 101);

        let result = transaction.execute(&store).await;

        assert!(matches!(
            result,
            Err(GuardError::TransactionTooLarge {
                count: 101,
                max: 100
            })
        ));
        assert_eq!(store.call_count(), 0);
    }

    #[tokio::test]
    async fn test_empty_transaction_is_noop() {
        let store = InMemoryStore::new();
        TransactionBuilder::new().execute(&store).await.unwrap();
        assert_eq!(store.call_count(), 0);
    }

    #[tokio::test]
    async fn test_mixed_operations_apply_together() {
        let store = InMemoryStore::new();
        store.put_item(TABLE, record("old"), None).await.unwrap();
        store.put_item(TABLE, record("parent"), None).await.unwrap();

        let mut transaction = TransactionBuilder::new();
        transaction
            .add_put(TABLE, record("new"), Some(Condition::ItemNotExists))
            .add_delete(
                TABLE,
                ItemKey::new("SOLUTION#old", "METADATA"),
                Some(Condition::ItemExists),
            )
            .add_update(
                TABLE,
                ItemKey::new("SOLUTION#parent", "METADATA"),
                UpdateSpec::new().increment("dependents_revision", 1),
                Some(Condition::ItemExists),
            );
        transaction.execute(&store).await.unwrap();

        assert!(store
            .raw_item(TABLE, &ItemKey::new("SOLUTION#new", "METADATA"))
            .await
            .is_some());
        assert!(store
            .raw_item(TABLE, &ItemKey::new("SOLUTION#old", "METADATA"))
            .await
            .is_none());
        let parent = store
            .raw_item(TABLE, &ItemKey::new("SOLUTION#parent", "METADATA"))
            .await
            .unwrap();
        assert_eq!(
            parent.get("dependents_revision"),
            Some(&AttributeValue::N("1".to_string()))
        );
    }

    #[tokio::test]
    async fn test_condition_check_guards_unrelated_write() {
        let store = InMemoryStore::new();

        let mut transaction = TransactionBuilder::new();
        transaction
            .add_condition_check(
                TABLE,
                ItemKey::new("SOLUTION#missing", "METADATA"),
                Condition::ItemExists,
            )
            .add_put(TABLE, record("child"), None);
        let result = transaction.execute(&store).await;

        assert!(matches!(result, Err(GuardError::ConcurrentModification)));
        assert!(store.is_empty(TABLE).await);
    }

    /// Store that cancels every transaction with a fixed reason
    struct CancellingStore {
        reason: &'static str,
    }

    #[async_trait]
    impl KeyValueStore for CancellingStore {
        async fn get_item(&self, _: &str, _: &ItemKey) -> StoreResult<Option<Item>> {
            Ok(None)
        }

        async fn put_item(&self, _: &str, _: Item, _: Option<&Condition>) -> StoreResult<()> {
            Ok(())
        }

        async fn update_item(
            &self,
            _: &str,
            _: &ItemKey,
            _: &UpdateSpec,
            _: Option<&Condition>,
        ) -> StoreResult<Item> {
            Ok(Item::new())
        }

        async fn delete_item(&self, _: &str, _: &ItemKey, _: Option<&Condition>) -> StoreResult<()> {
            Ok(())
        }

        async fn query(&self, _: &str, _: &QuerySpec) -> StoreResult<Vec<Item>> {
            Ok(Vec::new())
        }

        async fn scan(
            &self,
            _: &str,
            _: &[(String, AttributeValue)],
            _: Option<usize>,
        ) -> StoreResult<Vec<Item>> {
            Ok(Vec::new())
        }

        async fn transact_write(&self, operations: Vec<TransactOp>) -> StoreResult<()> {
            let reasons = operations
                .iter()
                .map(|_| CancellationReason {
                    code: Some(self.reason.to_string()),
                    message: None,
                })
                .collect();
            Err(StoreError::TransactionCanceled { reasons })
        }
    }

    #[tokio::test]
    async fn test_non_condition_cancellation_keeps_reasons() {
        let store = CancellingStore {
            reason: "TransactionConflict",
        };
        let mut transaction = TransactionBuilder::new();
        transaction.add_put(TABLE, record("a"), None);

        let result = transaction.execute(&store).await;

        match result {
            Err(GuardError::TransactionFailed { reasons }) => {
                assert_eq!(reasons.len(), 1);
                assert_eq!(reasons[0].code.as_deref(), Some("TransactionConflict"));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_network_errors_pass_through() {
        let store = InMemoryStore::new();
        store.fail_next_call("timeout").await;
        let mut transaction = TransactionBuilder::new();
        transaction.add_put(TABLE, record("a"), None);

        let result = transaction.execute(&store).await;
        assert!(matches!(
            result,
            Err(GuardError::Store(StoreError::Unavailable(_)))
        ));
    }
}
