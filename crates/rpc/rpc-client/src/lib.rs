//! JSON-RPC client for the consensus node.
//!
//! [`WsClient`] multiplexes concurrent calls over a single websocket connection and correlates
//! responses by id. [`ChainClient`] exposes the typed queries the sync engine needs.

#![warn(missing_docs, unreachable_pub)]
#![cfg_attr(not(test), warn(unused_crate_dependencies))]

mod chain;
mod error;
mod serde_helpers;
mod types;
mod ws;

pub use chain::{
    ChainClient, RemoteBlock, RemoteCommit, RemoteValidator, ABCI_INFO_METHOD, BLOCK_METHOD,
    COMMIT_METHOD, VALIDATORS_METHOD,
};
pub use error::RpcError;
pub use types::JSONRPC_VERSION;
pub use ws::WsClient;
