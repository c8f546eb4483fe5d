//! Storage boundary used by the sync engine.
//!
//! The relational schema lives outside this workspace; [`Store`] is the capability the engine
//! consumes and [`MemoryStore`] is an in-memory implementation with the same uniqueness rules.

#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![warn(missing_docs, unreachable_pub)]

mod error;
mod memory;
mod traits;

pub use error::{StoreError, StoreResult};
pub use memory::{AccountRecord, MemoryStore, UsernameRecord};
pub use traits::Store;
