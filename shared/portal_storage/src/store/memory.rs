//! In-memory store for tests
//!
//! Evaluates the same conditions as `DynamoDB`, applies transactions
//! all-or-nothing, and counts every call so tests can assert that a request
//! never reached the store.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use aws_sdk_dynamodb::types::AttributeValue;
use tokio::sync::Mutex;

use super::{
    CancellationReason, Condition, Item, ItemKey, KeyAttribute, KeyValueStore, QuerySpec,
    StoreError, StoreResult, TransactOp, UpdateSpec,
};

type Table = BTreeMap<ItemKey, Item>;

/// Store holding every table in process memory
#[derive(Debug, Default)]
pub struct InMemoryStore {
    tables: Mutex<HashMap<String, Table>>,
    calls: AtomicUsize,
    fail_next: Mutex<Option<String>>,
}

impl InMemoryStore {
    /// Creates an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of store calls made so far
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Makes the next call fail with `StoreError::Unavailable`
    pub async fn fail_next_call(&self, message: impl Into<String>) {
        *self.fail_next.lock().await = Some(message.into());
    }

    /// Number of records currently in `table`
    pub async fn len(&self, table: &str) -> usize {
        self.tables.lock().await.get(table).map_or(0, BTreeMap::len)
    }

    /// Whether `table` holds no records
    pub async fn is_empty(&self, table: &str) -> bool {
        self.len(table).await == 0
    }

    /// Raw access to a stored record
    pub async fn raw_item(&self, table: &str, key: &ItemKey) -> Option<Item> {
        self.tables
            .lock()
            .await
            .get(table)
            .and_then(|t| t.get(key))
            .cloned()
    }

    async fn record_call(&self) -> StoreResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.fail_next.lock().await.take() {
            Some(message) => Err(StoreError::Unavailable(message)),
            None => Ok(()),
        }
    }
}

fn check(condition: Option<&Condition>, current: Option<&Item>) -> StoreResult<()> {
    match condition {
        Some(condition) if !condition.matches(current) => Err(StoreError::ConditionalCheckFailed),
        _ => Ok(()),
    }
}

fn key_of(item: &Item) -> StoreResult<ItemKey> {
    ItemKey::from_item(item).ok_or_else(|| {
        StoreError::InvalidRequest(format!(
            "item is missing {} or {}",
            KeyAttribute::Pk,
            KeyAttribute::Sk
        ))
    })
}

fn updated(current: Option<&Item>, key: &ItemKey, update: &UpdateSpec) -> StoreResult<Item> {
    let mut item = current.cloned().unwrap_or_else(|| key.to_attributes());
    update.apply(&mut item)?;
    Ok(item)
}

fn string_attribute<'a>(item: &'a Item, name: &str) -> Option<&'a str> {
    item.get(name).and_then(|v| v.as_s().ok()).map(String::as_str)
}

#[async_trait]
impl KeyValueStore for InMemoryStore {
    async fn get_item(&self, table: &str, key: &ItemKey) -> StoreResult<Option<Item>> {
        self.record_call().await?;
        Ok(self.raw_item(table, key).await)
    }

    async fn put_item(
        &self,
        table: &str,
        item: Item,
        condition: Option<&Condition>,
    ) -> StoreResult<()> {
        self.record_call().await?;
        let key = key_of(&item)?;
        let mut tables = self.tables.lock().await;
        let table = tables.entry(table.to_string()).or_default();

        check(condition, table.get(&key))?;
        table.insert(key, item);
        Ok(())
    }

    async fn update_item(
        &self,
        table: &str,
        key: &ItemKey,
        update: &UpdateSpec,
        condition: Option<&Condition>,
    ) -> StoreResult<Item> {
        self.record_call().await?;
        if update.is_empty() {
            return Err(StoreError::InvalidRequest(
                "update must change at least one attribute".to_string(),
            ));
        }

        let mut tables = self.tables.lock().await;
        let table = tables.entry(table.to_string()).or_default();

        check(condition, table.get(key))?;
        let item = updated(table.get(key), key, update)?;
        table.insert(key.clone(), item.clone());
        Ok(item)
    }

    async fn delete_item(
        &self,
        table: &str,
        key: &ItemKey,
        condition: Option<&Condition>,
    ) -> StoreResult<()> {
        self.record_call().await?;
        let mut tables = self.tables.lock().await;
        let table = tables.entry(table.to_string()).or_default();

        check(condition, table.get(key))?;
        table.remove(key);
        Ok(())
    }

    async fn query(&self, table: &str, query: &QuerySpec) -> StoreResult<Vec<Item>> {
        self.record_call().await?;
        let tables = self.tables.lock().await;
        let Some(table) = tables.get(table) else {
            return Ok(Vec::new());
        };

        let mut items: Vec<Item> = table
            .values()
            .filter(|item| {
                string_attribute(item, &query.partition_attribute)
                    == Some(query.partition_value.as_str())
            })
            .filter(|item| {
                query.sort_prefix.as_ref().is_none_or(|(attribute, prefix)| {
                    string_attribute(item, attribute).is_some_and(|v| v.starts_with(prefix.as_str()))
                })
            })
            .cloned()
            .collect();

        let sort_attribute = query
            .sort_prefix
            .as_ref()
            .map_or_else(|| KeyAttribute::Sk.to_string(), |(attribute, _)| attribute.clone());
        items.sort_by(|a, b| {
            string_attribute(a, &sort_attribute).cmp(&string_attribute(b, &sort_attribute))
        });

        if let Some(limit) = query.limit {
            items.truncate(usize::try_from(limit).unwrap_or_default());
        }

        Ok(items)
    }

    async fn scan(
        &self,
        table: &str,
        filters: &[(String, AttributeValue)],
        limit: Option<usize>,
    ) -> StoreResult<Vec<Item>> {
        self.record_call().await?;
        let tables = self.tables.lock().await;
        let Some(table) = tables.get(table) else {
            return Ok(Vec::new());
        };

        let matching = table
            .values()
            .filter(|item| {
                filters
                    .iter()
                    .all(|(name, value)| item.get(name) == Some(value))
            })
            .cloned();

        Ok(match limit {
            Some(limit) => matching.take(limit).collect(),
            None => matching.collect(),
        })
    }

    async fn transact_write(&self, operations: Vec<TransactOp>) -> StoreResult<()> {
        self.record_call().await?;
        let mut tables = self.tables.lock().await;

        // DynamoDB rejects transactions that touch the same record twice
        let mut targets = HashSet::new();
        for operation in &operations {
            let (table, key) = operation.target().ok_or_else(|| {
                StoreError::InvalidRequest("transaction put is missing key attributes".to_string())
            })?;
            if !targets.insert((table.to_string(), key.clone())) {
                return Err(StoreError::InvalidRequest(format!(
                    "transaction touches {table} {key} more than once"
                )));
            }
        }

        let reasons: Vec<CancellationReason> = operations
            .iter()
            .map(|operation| {
                let (table, key, condition) = match operation {
                    TransactOp::Put {
                        table,
                        item,
                        condition,
                    } => (table, ItemKey::from_item(item), condition.as_ref()),
                    TransactOp::Update {
                        table,
                        key,
                        condition,
                        ..
                    }
                    | TransactOp::Delete {
                        table,
                        key,
                        condition,
                    } => (table, Some(key.clone()), condition.as_ref()),
                    TransactOp::ConditionCheck {
                        table,
                        key,
                        condition,
                    } => (table, Some(key.clone()), Some(condition)),
                };
                let current = key
                    .as_ref()
                    .and_then(|key| tables.get(table.as_str()).and_then(|t| t.get(key)));

                if condition.is_none_or(|c| c.matches(current)) {
                    CancellationReason::none()
                } else {
                    CancellationReason::condition_failed()
                }
            })
            .collect();

        if reasons.iter().any(CancellationReason::is_condition_failure) {
            return Err(StoreError::TransactionCanceled { reasons });
        }

        // Compute every new image before writing so a bad update leaves nothing applied
        let mut writes: Vec<(String, ItemKey, Option<Item>)> = Vec::new();
        for operation in operations {
            match operation {
                TransactOp::Put { table, item, .. } => {
                    let key = key_of(&item)?;
                    writes.push((table, key, Some(item)));
                }
                TransactOp::Update {
                    table, key, update, ..
                } => {
                    let current = tables.get(table.as_str()).and_then(|t| t.get(&key));
                    let item = updated(current, &key, &update)?;
                    writes.push((table, key, Some(item)));
                }
                TransactOp::Delete { table, key, .. } => writes.push((table, key, None)),
                TransactOp::ConditionCheck { .. } => {}
            }
        }

        for (table, key, item) in writes {
            let table = tables.entry(table).or_default();
            match item {
                Some(item) => {
                    table.insert(key, item);
                }
                None => {
                    table.remove(&key);
                }
            }
        }

        Ok(())
    }
}
