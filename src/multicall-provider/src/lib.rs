//! A JSON-RPC provider that folds concurrent `eth_call`s into Multicall2 `tryAggregate` calls.
//!
//! Callers keep issuing calls one at a time. Calls made in the same unit of work are
//! grouped by block, executed in one aggregate per group and answered in call order.
//! Aggregates failing on a timeout or a server error can be retried in smaller halves.

use std::future::Future;
use std::pin::Pin;

pub use alloy::primitives::{Address, Bytes};
pub use jsonrpc_core::{Call, Id, MethodCall, Output, Params, Request, Response, Version};

pub mod aggregator;
pub mod block;
pub mod config;
pub mod demux;
pub mod error;
pub mod group;
pub mod interceptor;
pub mod provider;
pub mod recovery;
pub mod request;
pub mod scheduler;

#[cfg(feature = "reqwest")]
pub mod reqwest;

pub use block::BlockNumber;
pub use config::MulticallConfig;
pub use error::{JsonRpcError, JsonRpcResult, TransportErrorKind};
pub use interceptor::CallRequest;
pub use provider::MulticallProvider;

/// The transport the provider wraps.
pub trait Client: Clone + Send + Sync + 'static {
    /// Send RPC request.
    fn send_rpc_request(
        &self,
        request: Request,
    ) -> Pin<Box<dyn Future<Output = JsonRpcResult<Response>> + Send>>;
}
