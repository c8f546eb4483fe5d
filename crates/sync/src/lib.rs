//! Synchronization of committed blocks into the metrics store.
//!
//! [`SyncEngine`] walks the chain one height at a time, resolves validator identities through
//! the [`ValidatorCache`], renders every transaction with [`normalize`] and persists each height
//! as a single [`BlockAggregate`](blockmetrics_primitives::BlockAggregate).
//!
//! ## Feature Flags
//!
//! - `test-utils`: Export utilities for testing

#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![warn(missing_docs, unreachable_pub)]

mod config;
mod engine;
mod error;
mod message;
pub mod shutdown;
mod validators;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use config::SyncConfig;
pub use engine::SyncEngine;
pub use error::{ConfigError, SyncError, SyncFailure, ValidatorLookupError};
pub use message::{normalize, NormalizeError, NormalizedMessage};
pub use validators::{missing_validators, ValidatorCache};
