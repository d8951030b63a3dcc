//! `DynamoDB` implementation of the key-value store

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use aws_sdk_dynamodb::{
    error::SdkError,
    operation::transact_write_items::TransactWriteItemsError,
    types::{
        AttributeValue, ConditionCheck, Delete, Put, ReturnValue, TransactWriteItem, Update,
    },
    Client as DynamoDbClient,
};

use super::{
    CancellationReason, Condition, Item, ItemKey, KeyAttribute, KeyValueStore, QuerySpec,
    StoreError, StoreResult, TransactOp, UpdateSpec,
};

/// Placeholder bookkeeping for one `DynamoDB` request
#[derive(Debug, Default)]
struct Expression {
    names: HashMap<String, String>,
    values: HashMap<String, AttributeValue>,
}

impl Expression {
    fn name(&mut self, attribute: &str) -> String {
        if let Some((placeholder, _)) = self.names.iter().find(|(_, name)| *name == attribute) {
            return placeholder.clone();
        }

        let placeholder = format!("#a{}", self.names.len());
        self.names.insert(placeholder.clone(), attribute.to_string());
        placeholder
    }

    fn value(&mut self, value: AttributeValue) -> String {
        let placeholder = format!(":v{}", self.values.len());
        self.values.insert(placeholder.clone(), value);
        placeholder
    }

    fn condition(&mut self, condition: &Condition) -> String {
        match condition {
            Condition::ItemExists => {
                let pk = self.name(&KeyAttribute::Pk.to_string());
                format!("attribute_exists({pk})")
            }
            Condition::ItemNotExists => {
                let pk = self.name(&KeyAttribute::Pk.to_string());
                format!("attribute_not_exists({pk})")
            }
            Condition::AttributeMissingOrEquals { name, value } => {
                let name = self.name(name);
                let value = self.value(value.clone());
                format!("(attribute_not_exists({name}) OR {name} = {value})")
            }
            Condition::All(conditions) if conditions.is_empty() => {
                let pk = self.name(&KeyAttribute::Pk.to_string());
                format!("(attribute_exists({pk}) OR attribute_not_exists({pk}))")
            }
            Condition::All(conditions) => {
                let rendered: Vec<String> =
                    conditions.iter().map(|c| self.condition(c)).collect();
                format!("({})", rendered.join(" AND "))
            }
        }
    }

    fn update(&mut self, update: &UpdateSpec) -> String {
        let mut set_clauses = Vec::new();

        for (name, value) in &update.set {
            let name = self.name(name);
            let value = self.value(value.clone());
            set_clauses.push(format!("{name} = {value}"));
        }

        if !update.increment.is_empty() {
            let zero = self.value(AttributeValue::N("0".to_string()));
            for (name, by) in &update.increment {
                let name = self.name(name);
                let by = self.value(AttributeValue::N(by.to_string()));
                set_clauses.push(format!("{name} = if_not_exists({name}, {zero}) + {by}"));
            }
        }

        format!("SET {}", set_clauses.join(", "))
    }

    /// `DynamoDB` rejects empty placeholder maps, so they are only sent when used
    fn into_parts(
        self,
    ) -> (
        Option<HashMap<String, String>>,
        Option<HashMap<String, AttributeValue>>,
    ) {
        (
            (!self.names.is_empty()).then_some(self.names),
            (!self.values.is_empty()).then_some(self.values),
        )
    }
}

fn is_conditional_check_failed<E>(err: &SdkError<E>, check: impl Fn(&E) -> bool) -> bool {
    matches!(err, SdkError::ServiceError(svc) if check(svc.err()))
}

fn map_transact_error(err: SdkError<TransactWriteItemsError>) -> StoreError {
    if let SdkError::ServiceError(ref svc) = err {
        if let TransactWriteItemsError::TransactionCanceledException(canceled) = svc.err() {
            let reasons = canceled
                .cancellation_reasons()
                .iter()
                .map(|reason| CancellationReason {
                    code: reason.code().map(str::to_string),
                    message: reason.message().map(str::to_string),
                })
                .collect();
            return StoreError::TransactionCanceled { reasons };
        }
    }

    err.into()
}

fn build_error(err: impl std::fmt::Display) -> StoreError {
    StoreError::InvalidRequest(format!("Failed to build transaction item: {err}"))
}

fn to_transact_item(operation: TransactOp) -> StoreResult<TransactWriteItem> {
    let mut expression = Expression::default();

    let item = match operation {
        TransactOp::Put {
            table,
            item,
            condition,
        } => {
            let condition = condition.as_ref().map(|c| expression.condition(c));
            let (names, values) = expression.into_parts();
            let put = Put::builder()
                .table_name(table)
                .set_item(Some(item))
                .set_condition_expression(condition)
                .set_expression_attribute_names(names)
                .set_expression_attribute_values(values)
                .build()
                .map_err(build_error)?;
            TransactWriteItem::builder().put(put).build()
        }
        TransactOp::Update {
            table,
            key,
            update,
            condition,
        } => {
            let update_expression = expression.update(&update);
            let condition = condition.as_ref().map(|c| expression.condition(c));
            let (names, values) = expression.into_parts();
            let update = Update::builder()
                .table_name(table)
                .set_key(Some(key.to_attributes()))
                .update_expression(update_expression)
                .set_condition_expression(condition)
                .set_expression_attribute_names(names)
                .set_expression_attribute_values(values)
                .build()
                .map_err(build_error)?;
            TransactWriteItem::builder().update(update).build()
        }
        TransactOp::Delete {
            table,
            key,
            condition,
        } => {
            let condition = condition.as_ref().map(|c| expression.condition(c));
            let (names, values) = expression.into_parts();
            let delete = Delete::builder()
                .table_name(table)
                .set_key(Some(key.to_attributes()))
                .set_condition_expression(condition)
                .set_expression_attribute_names(names)
                .set_expression_attribute_values(values)
                .build()
                .map_err(build_error)?;
            TransactWriteItem::builder().delete(delete).build()
        }
        TransactOp::ConditionCheck {
            table,
            key,
            condition,
        } => {
            let condition = expression.condition(&condition);
            let (names, values) = expression.into_parts();
            let check = ConditionCheck::builder()
                .table_name(table)
                .set_key(Some(key.to_attributes()))
                .condition_expression(condition)
                .set_expression_attribute_names(names)
                .set_expression_attribute_values(values)
                .build()
                .map_err(build_error)?;
            TransactWriteItem::builder().condition_check(check).build()
        }
    };

    Ok(item)
}

/// Key-value store backed by `DynamoDB`
pub struct DynamoDbStore {
    dynamodb_client: Arc<DynamoDbClient>,
}

impl DynamoDbStore {
    /// Creates a new store
    ///
    /// # Arguments
    ///
    /// * `dynamodb_client` - Pre-configured `DynamoDB` client
    #[must_use]
    pub const fn new(dynamodb_client: Arc<DynamoDbClient>) -> Self {
        Self { dynamodb_client }
    }
}

#[async_trait]
impl KeyValueStore for DynamoDbStore {
    async fn get_item(&self, table: &str, key: &ItemKey) -> StoreResult<Option<Item>> {
        let response = self
            .dynamodb_client
            .get_item()
            .table_name(table)
            .set_key(Some(key.to_attributes()))
            .consistent_read(true)
            .send()
            .await?;

        Ok(response.item().cloned())
    }

    async fn put_item(
        &self,
        table: &str,
        item: Item,
        condition: Option<&Condition>,
    ) -> StoreResult<()> {
        let mut expression = Expression::default();
        let condition = condition.map(|c| expression.condition(c));
        let (names, values) = expression.into_parts();

        self.dynamodb_client
            .put_item()
            .table_name(table)
            .set_item(Some(item))
            .set_condition_expression(condition)
            .set_expression_attribute_names(names)
            .set_expression_attribute_values(values)
            .send()
            .await
            .map_err(|err| {
                if is_conditional_check_failed(&err, |e| e.is_conditional_check_failed_exception())
                {
                    StoreError::ConditionalCheckFailed
                } else {
                    err.into()
                }
            })?;

        Ok(())
    }

    async fn update_item(
        &self,
        table: &str,
        key: &ItemKey,
        update: &UpdateSpec,
        condition: Option<&Condition>,
    ) -> StoreResult<Item> {
        if update.is_empty() {
            return Err(StoreError::InvalidRequest(
                "update must change at least one attribute".to_string(),
            ));
        }

        let mut expression = Expression::default();
        let update_expression = expression.update(update);
        let condition = condition.map(|c| expression.condition(c));
        let (names, values) = expression.into_parts();

        let response = self
            .dynamodb_client
            .update_item()
            .table_name(table)
            .set_key(Some(key.to_attributes()))
            .update_expression(update_expression)
            .set_condition_expression(condition)
            .set_expression_attribute_names(names)
            .set_expression_attribute_values(values)
            .return_values(ReturnValue::AllNew)
            .send()
            .await
            .map_err(|err| {
                if is_conditional_check_failed(&err, |e| e.is_conditional_check_failed_exception())
                {
                    StoreError::ConditionalCheckFailed
                } else {
                    err.into()
                }
            })?;

        Ok(response.attributes().cloned().unwrap_or_default())
    }

    async fn delete_item(
        &self,
        table: &str,
        key: &ItemKey,
        condition: Option<&Condition>,
    ) -> StoreResult<()> {
        let mut expression = Expression::default();
        let condition = condition.map(|c| expression.condition(c));
        let (names, values) = expression.into_parts();

        self.dynamodb_client
            .delete_item()
            .table_name(table)
            .set_key(Some(key.to_attributes()))
            .set_condition_expression(condition)
            .set_expression_attribute_names(names)
            .set_expression_attribute_values(values)
            .send()
            .await
            .map_err(|err| {
                if is_conditional_check_failed(&err, |e| e.is_conditional_check_failed_exception())
                {
                    StoreError::ConditionalCheckFailed
                } else {
                    err.into()
                }
            })?;

        Ok(())
    }

    async fn query(&self, table: &str, query: &QuerySpec) -> StoreResult<Vec<Item>> {
        let mut expression = Expression::default();
        let partition = expression.name(&query.partition_attribute);
        let partition_value = expression.value(AttributeValue::S(query.partition_value.clone()));
        let mut key_condition = format!("{partition} = {partition_value}");

        if let Some((attribute, prefix)) = &query.sort_prefix {
            let sort = expression.name(attribute);
            let prefix = expression.value(AttributeValue::S(prefix.clone()));
            key_condition.push_str(&format!(" AND begins_with({sort}, {prefix})"));
        }

        let (names, values) = expression.into_parts();
        let mut items = Vec::new();
        let mut exclusive_start_key = None;

        loop {
            let response = self
                .dynamodb_client
                .query()
                .table_name(table)
                .set_index_name(query.index_name.clone())
                .consistent_read(query.consistent_read())
                .key_condition_expression(&key_condition)
                .set_expression_attribute_names(names.clone())
                .set_expression_attribute_values(values.clone())
                .set_limit(query.limit)
                .set_exclusive_start_key(exclusive_start_key.take())
                .send()
                .await?;

            items.extend(response.items().iter().cloned());

            if let Some(limit) = query.limit {
                let limit = usize::try_from(limit).unwrap_or_default();
                if items.len() >= limit {
                    items.truncate(limit);
                    break;
                }
            }

            match response.last_evaluated_key() {
                Some(key) if !key.is_empty() => exclusive_start_key = Some(key.clone()),
                _ => break,
            }
        }

        Ok(items)
    }

    async fn scan(
        &self,
        table: &str,
        filters: &[(String, AttributeValue)],
        limit: Option<usize>,
    ) -> StoreResult<Vec<Item>> {
        let mut expression = Expression::default();
        let clauses: Vec<String> = filters
            .iter()
            .map(|(name, value)| {
                let name = expression.name(name);
                let value = expression.value(value.clone());
                format!("{name} = {value}")
            })
            .collect();
        let filter = (!clauses.is_empty()).then(|| clauses.join(" AND "));
        let (names, values) = expression.into_parts();

        // `Limit` caps records read before filtering, so the cap is applied here instead
        let mut items = Vec::new();
        let mut exclusive_start_key = None;

        loop {
            let response = self
                .dynamodb_client
                .scan()
                .table_name(table)
                .consistent_read(true)
                .set_filter_expression(filter.clone())
                .set_expression_attribute_names(names.clone())
                .set_expression_attribute_values(values.clone())
                .set_exclusive_start_key(exclusive_start_key.take())
                .send()
                .await?;

            items.extend(response.items().iter().cloned());

            if let Some(limit) = limit {
                if items.len() >= limit {
                    items.truncate(limit);
                    break;
                }
            }

            match response.last_evaluated_key() {
                Some(key) if !key.is_empty() => exclusive_start_key = Some(key.clone()),
                _ => break,
            }
        }

        Ok(items)
    }

    async fn transact_write(&self, operations: Vec<TransactOp>) -> StoreResult<()> {
        let transact_items = operations
            .into_iter()
            .map(to_transact_item)
            .collect::<StoreResult<Vec<_>>>()?;

        self.dynamodb_client
            .transact_write_items()
            .set_transact_items(Some(transact_items))
            .send()
            .await
            .map_err(map_transact_error)?;

        Ok(())
    }
}
