//! Storage layer of the industry portal
//!
//! Holds the catalog entities (industries, sub-industries, use cases,
//! solutions, use case to solution mappings, customer cases, news and blogs)
//! in `DynamoDB` and guards every mutation against lost updates and orphaned
//! records. The guard module is usable on its own; the entity storages are
//! built on top of it.

#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    dead_code
)]

pub mod catalog;
pub mod content;
pub mod customer_case;
pub mod guard;
pub mod industry;
pub mod keys;
pub mod mapping;
mod record;
pub mod solution;
pub mod store;
pub mod sub_industry;
pub mod tables;
pub mod use_case;

pub use catalog::Catalog;
pub use guard::{GuardError, GuardResult};
pub use record::DEPENDENTS_REVISION_ATTRIBUTE;
pub use store::{DynamoDbStore, KeyValueStore};
pub use tables::CatalogTables;
