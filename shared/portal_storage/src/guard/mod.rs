//! Consistency and integrity guards
//!
//! Used by every storage before it mutates or deletes records:
//! - [`dependency`] answers "does this parent still have children?"
//! - [`optimistic_lock`] rejects writers holding a stale version
//! - [`transaction`] groups writes into one all-or-nothing unit
//! - [`integrity`] runs dependency rules in order and fails on the first hit

pub mod dependency;
mod error;
pub mod integrity;
pub mod optimistic_lock;
pub mod transaction;

pub use error::{GuardError, GuardResult};
pub use integrity::{validate_referential_integrity, IntegrityCheck};
pub use optimistic_lock::{
    add_version_to_update, get_item_with_version, optimistic_lock_condition, read_version,
    update_with_lock, VersionedItem,
};
pub use transaction::{TransactionBuilder, MAX_TRANSACTION_ITEMS};
