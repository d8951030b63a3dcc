//! Key-value store abstraction over the portal tables
//!
//! Every storage in this crate talks to DynamoDB through [`KeyValueStore`], which
//! is handed in at construction time. Production wires [`DynamoDbStore`]; tests
//! wire the in-memory store from [`memory`].

mod dynamodb;
mod error;
#[cfg(any(test, feature = "test-utils"))]
pub mod memory;

use std::collections::HashMap;

use async_trait::async_trait;
use aws_sdk_dynamodb::types::AttributeValue;
use strum::Display;

pub use dynamodb::DynamoDbStore;
pub use error::{CancellationReason, StoreError, StoreResult};

/// A raw record as stored in a table
pub type Item = HashMap<String, AttributeValue>;

/// Key attribute names shared by every portal table
#[derive(Debug, Clone, Copy, Display)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum KeyAttribute {
    /// Partition key
    Pk,
    /// Sort key
    Sk,
    /// Partition key of the reverse mapping index
    GsiPk,
    /// Sort key of the reverse mapping index
    GsiSk,
}

/// Full primary key of a record
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemKey {
    /// Partition key value
    pub pk: String,
    /// Sort key value
    pub sk: String,
}

impl ItemKey {
    /// Creates a key from its two parts
    #[must_use]
    pub fn new(pk: impl Into<String>, sk: impl Into<String>) -> Self {
        Self {
            pk: pk.into(),
            sk: sk.into(),
        }
    }

    /// Key attributes in the shape the store expects
    #[must_use]
    pub fn to_attributes(&self) -> Item {
        HashMap::from([
            (
                KeyAttribute::Pk.to_string(),
                AttributeValue::S(self.pk.clone()),
            ),
            (
                KeyAttribute::Sk.to_string(),
                AttributeValue::S(self.sk.clone()),
            ),
        ])
    }

    /// Reads the key back out of a stored record
    #[must_use]
    pub fn from_item(item: &Item) -> Option<Self> {
        let pk = item.get(&KeyAttribute::Pk.to_string())?.as_s().ok()?;
        let sk = item.get(&KeyAttribute::Sk.to_string())?.as_s().ok()?;
        Some(Self::new(pk.as_str(), sk.as_str()))
    }
}

impl std::fmt::Display for ItemKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.pk, self.sk)
    }
}

/// Predicate evaluated by the store at write time
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// The record must already exist
    ItemExists,
    /// The record must not exist yet
    ItemNotExists,
    /// The attribute is either absent or holds exactly `value`
    AttributeMissingOrEquals {
        /// Attribute name
        name: String,
        /// Expected value
        value: AttributeValue,
    },
    /// Every inner condition must hold
    All(Vec<Condition>),
}

impl Condition {
    /// Evaluates the condition against the current state of a record
    #[must_use]
    pub fn matches(&self, item: Option<&Item>) -> bool {
        match self {
            Self::ItemExists => item.is_some(),
            Self::ItemNotExists => item.is_none(),
            Self::AttributeMissingOrEquals { name, value } => {
                item.and_then(|item| item.get(name))
                    .is_none_or(|stored| stored == value)
            }
            Self::All(conditions) => conditions.iter().all(|c| c.matches(item)),
        }
    }

    /// Combines this condition with another one
    #[must_use]
    pub fn and(self, other: Self) -> Self {
        match self {
            Self::All(mut conditions) => {
                conditions.push(other);
                Self::All(conditions)
            }
            condition => Self::All(vec![condition, other]),
        }
    }
}

/// Partial mutation of an existing record
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateSpec {
    /// Attributes replaced with a new value
    pub set: Vec<(String, AttributeValue)>,
    /// Numeric attributes incremented in place (absent counts as zero)
    pub increment: Vec<(String, i64)>,
}

impl UpdateSpec {
    /// Creates an empty update
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces `name` with `value`
    #[must_use]
    pub fn set(mut self, name: impl Into<String>, value: AttributeValue) -> Self {
        self.set.push((name.into(), value));
        self
    }

    /// Replaces every attribute of `attributes`
    #[must_use]
    pub fn set_all(mut self, attributes: Item) -> Self {
        let mut attributes: Vec<_> = attributes.into_iter().collect();
        // Stable order keeps rendered expressions deterministic
        attributes.sort_by(|a, b| a.0.cmp(&b.0));
        self.set.extend(attributes);
        self
    }

    /// Adds `by` to the numeric attribute `name`
    #[must_use]
    pub fn increment(mut self, name: impl Into<String>, by: i64) -> Self {
        self.increment.push((name.into(), by));
        self
    }

    /// Whether the update changes nothing
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.set.is_empty() && self.increment.is_empty()
    }

    /// Applies the update to a record in place
    ///
    /// # Errors
    ///
    /// Returns `StoreError::InvalidRequest` when an incremented attribute is not a number
    pub fn apply(&self, item: &mut Item) -> StoreResult<()> {
        for (name, value) in &self.set {
            item.insert(name.clone(), value.clone());
        }

        for (name, by) in &self.increment {
            let current = match item.get(name) {
                None => 0,
                Some(AttributeValue::N(n)) => n.parse::<i64>().map_err(|e| {
                    StoreError::InvalidRequest(format!("attribute {name} is not an integer: {e}"))
                })?,
                Some(_) => {
                    return Err(StoreError::InvalidRequest(format!(
                        "attribute {name} is not a number"
                    )))
                }
            };
            item.insert(name.clone(), AttributeValue::N((current + by).to_string()));
        }

        Ok(())
    }
}

/// Key-condition query against a table or one of its indexes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuerySpec {
    /// Index to query instead of the base table
    pub index_name: Option<String>,
    /// Partition attribute of the table or index
    pub partition_attribute: String,
    /// Partition value to match
    pub partition_value: String,
    /// Sort attribute and required prefix
    pub sort_prefix: Option<(String, String)>,
    /// Maximum number of records returned
    pub limit: Option<i32>,
}

impl QuerySpec {
    /// Queries every record whose `attribute` equals `value`
    #[must_use]
    pub fn partition(attribute: impl ToString, value: impl Into<String>) -> Self {
        Self {
            index_name: None,
            partition_attribute: attribute.to_string(),
            partition_value: value.into(),
            sort_prefix: None,
            limit: None,
        }
    }

    /// Runs the query against a secondary index
    #[must_use]
    pub fn on_index(mut self, index_name: impl Into<String>) -> Self {
        self.index_name = Some(index_name.into());
        self
    }

    /// Restricts the sort key to values starting with `prefix`
    #[must_use]
    pub fn sort_begins_with(mut self, attribute: impl ToString, prefix: impl Into<String>) -> Self {
        self.sort_prefix = Some((attribute.to_string(), prefix.into()));
        self
    }

    /// Caps the number of returned records
    #[must_use]
    pub const fn limit(mut self, limit: i32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Whether the query can ask for a strongly consistent read
    ///
    /// Base-table queries can; global secondary indexes are always eventually
    /// consistent and reject the flag.
    #[must_use]
    pub const fn consistent_read(&self) -> bool {
        self.index_name.is_none()
    }
}

/// One operation of an all-or-nothing write
#[derive(Debug, Clone, PartialEq)]
pub enum TransactOp {
    /// Write a full record
    Put {
        /// Target table
        table: String,
        /// Record including its key attributes
        item: Item,
        /// Optional guard
        condition: Option<Condition>,
    },
    /// Partially mutate an existing record
    Update {
        /// Target table
        table: String,
        /// Record key
        key: ItemKey,
        /// Mutation
        update: UpdateSpec,
        /// Optional guard
        condition: Option<Condition>,
    },
    /// Remove a record
    Delete {
        /// Target table
        table: String,
        /// Record key
        key: ItemKey,
        /// Optional guard
        condition: Option<Condition>,
    },
    /// Assert a predicate on a record without writing it
    ConditionCheck {
        /// Target table
        table: String,
        /// Record key
        key: ItemKey,
        /// Asserted predicate
        condition: Condition,
    },
}

impl TransactOp {
    /// Table and key the operation touches
    ///
    /// Returns `None` for a put whose item lacks key attributes.
    #[must_use]
    pub fn target(&self) -> Option<(&str, ItemKey)> {
        match self {
            Self::Put { table, item, .. } => ItemKey::from_item(item).map(|key| (table.as_str(), key)),
            Self::Update { table, key, .. }
            | Self::Delete { table, key, .. }
            | Self::ConditionCheck { table, key, .. } => Some((table.as_str(), key.clone())),
        }
    }
}

/// Storage backend used by the guard module and every entity storage
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Fetches a record by its full key
    async fn get_item(&self, table: &str, key: &ItemKey) -> StoreResult<Option<Item>>;

    /// Writes a full record, optionally guarded by `condition`
    async fn put_item(
        &self,
        table: &str,
        item: Item,
        condition: Option<&Condition>,
    ) -> StoreResult<()>;

    /// Applies a partial mutation and returns the updated record
    async fn update_item(
        &self,
        table: &str,
        key: &ItemKey,
        update: &UpdateSpec,
        condition: Option<&Condition>,
    ) -> StoreResult<Item>;

    /// Removes a record, optionally guarded by `condition`
    async fn delete_item(
        &self,
        table: &str,
        key: &ItemKey,
        condition: Option<&Condition>,
    ) -> StoreResult<()>;

    /// Runs a key-condition query
    async fn query(&self, table: &str, query: &QuerySpec) -> StoreResult<Vec<Item>>;

    /// Scans a table, keeping records whose attributes equal every filter
    async fn scan(
        &self,
        table: &str,
        filters: &[(String, AttributeValue)],
        limit: Option<usize>,
    ) -> StoreResult<Vec<Item>>;

    /// Applies every operation or none of them
    async fn transact_write(&self, operations: Vec<TransactOp>) -> StoreResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn item(attributes: &[(&str, AttributeValue)]) -> Item {
        attributes
            .iter()
            .map(|(name, value)| ((*name).to_string(), value.clone()))
            .collect()
    }

    #[test]
    fn test_key_attribute_names() {
        assert_eq!(KeyAttribute::Pk.to_string(), "PK");
        assert_eq!(KeyAttribute::Sk.to_string(), "SK");
        assert_eq!(KeyAttribute::GsiPk.to_string(), "GSI_PK");
        assert_eq!(KeyAttribute::GsiSk.to_string(), "GSI_SK");
    }

    #[test]
    fn test_item_key_round_trips_through_attributes() {
        let key = ItemKey::new("INDUSTRY#1", "METADATA");
        assert_eq!(ItemKey::from_item(&key.to_attributes()), Some(key));
    }

    #[test]
    fn test_missing_or_equals_condition() {
        let condition = Condition::AttributeMissingOrEquals {
            name: "version".to_string(),
            value: AttributeValue::N("2".to_string()),
        };

        assert!(condition.matches(None));
        assert!(condition.matches(Some(&item(&[]))));
        assert!(condition.matches(Some(&item(&[(
            "version",
            AttributeValue::N("2".to_string())
        )]))));
        assert!(!condition.matches(Some(&item(&[(
            "version",
            AttributeValue::N("3".to_string())
        )]))));
    }

    #[test]
    fn test_and_flattens_conditions() {
        let combined = Condition::ItemExists
            .and(Condition::ItemNotExists)
            .and(Condition::ItemExists);

        assert_eq!(
            combined,
            Condition::All(vec![
                Condition::ItemExists,
                Condition::ItemNotExists,
                Condition::ItemExists
            ])
        );
        assert!(!combined.matches(None));
    }

    #[test]
    fn test_update_apply() {
        let mut record = item(&[
            ("name", AttributeValue::S("old".to_string())),
            ("counter", AttributeValue::N("4".to_string())),
        ]);

        UpdateSpec::new()
            .set("name", AttributeValue::S("new".to_string()))
            .increment("counter", 1)
            .increment("fresh", 2)
            .apply(&mut record)
            .unwrap();

        assert_eq!(
            record,
            item(&[
                ("name", AttributeValue::S("new".to_string())),
                ("counter", AttributeValue::N("5".to_string())),
                ("fresh", AttributeValue::N("2".to_string())),
            ])
        );
    }

    #[test]
    fn test_only_base_table_queries_read_consistently() {
        let base = QuerySpec::partition(KeyAttribute::Pk, "INDUSTRY#i1");
        assert!(base.consistent_read());
        assert!(!base.on_index("id-index").consistent_read());
    }

    #[test]
    fn test_increment_rejects_non_numbers() {
        let mut record = item(&[("counter", AttributeValue::S("x".to_string()))]);
        let result = UpdateSpec::new().increment("counter", 1).apply(&mut record);
        assert!(matches!(result, Err(StoreError::InvalidRequest(_))));
    }
}
