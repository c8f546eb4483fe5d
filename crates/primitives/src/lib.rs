//! Commonly used types for block metrics collection.
//!
//! This crate contains the block aggregate persisted per height, validator identities, and the
//! decoded ledger message model that the sync engine normalizes.

#![doc(issue_tracker_base_url = "https://github.com/iov-one/block-metrics/issues/")]
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![warn(missing_docs)]

mod address;
mod block;
mod coin;
mod decoder;
pub mod ledger;
mod validator;

pub use address::Address;
pub use block::{BlockAggregate, BlockHeight, TransactionRecord};
pub use coin::{Coin, FRAC_UNIT};
pub use decoder::{DecodeError, JsonTxDecoder, TxDecoder};
pub use ledger::{LedgerMsg, LedgerTx};
pub use validator::{NewValidator, ValidatorId, ValidatorNames, ValidatorRecord};
