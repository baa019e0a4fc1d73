use std::sync::Arc;

use alloy::primitives::{Address, Bytes};
use jsonrpc_core::{Id, Params, Request, Response};
use serde_json::Value;

use crate::block::BlockNumber;
use crate::config::MulticallConfig;
use crate::error::JsonRpcResult;
use crate::interceptor::{classify, CallRequest};
use crate::recovery::BatchExecutor;
use crate::request::{eth_call, single_request};
use crate::scheduler::BatchScheduler;
use crate::Client;

/// A JSON-RPC provider that executes concurrent `eth_call`s through a Multicall2 contract.
///
/// Clones share the same pending batch.
#[derive(Clone)]
pub struct MulticallProvider<C: Client> {
    client: C,
    config: Arc<MulticallConfig>,
    scheduler: Arc<BatchScheduler<C>>,
}

impl<C: Client> MulticallProvider<C> {
    /// Create a new provider with the default configuration.
    ///
    /// # Arguments
    /// * `client` - The transport used for every request.
    pub fn new(client: C) -> Self {
        Self::build(client, MulticallConfig::default())
    }

    /// Create a new provider with the given configuration.
    pub fn with_config(client: C, config: MulticallConfig) -> JsonRpcResult<Self> {
        config.validate()?;
        Ok(Self::build(client, config))
    }

    fn build(client: C, config: MulticallConfig) -> Self {
        let config = Arc::new(config);
        let executor = BatchExecutor::new(client.clone(), config.clone());
        let scheduler = BatchScheduler::new(executor, config.max_batch_size);

        Self {
            client,
            config,
            scheduler: Arc::new(scheduler),
        }
    }

    /// Sends a JSON-RPC request and returns its result.
    ///
    /// `eth_call`s with only `to` and `data` are batched, everything else is sent as is.
    pub async fn send(&self, method: &str, params: Params) -> JsonRpcResult<Value> {
        match classify(method, &params, self.config.aggregator_address) {
            Ok(call) => {
                let data = self.scheduler.schedule(call).await?;
                Ok(Value::String(alloy::hex::encode_prefixed(data)))
            }
            Err(exclusion) => {
                if self.config.verbose {
                    log::debug!("call not multicalled because {exclusion}");
                }
                single_request(
                    &self.client,
                    method.to_string(),
                    params,
                    Id::Str(method.to_string()),
                )
                .await
            }
        }
    }

    /// Performs an `eth_call` and returns the raw return data.
    pub async fn eth_call(
        &self,
        to: Address,
        data: Bytes,
        block: BlockNumber,
    ) -> JsonRpcResult<Bytes> {
        let call = CallRequest::new(to, data, block);
        if to == self.config.aggregator_address {
            return eth_call(&self.client, &call).await;
        }

        self.scheduler.schedule(call).await
    }

    /// Performs a request without batching it.
    pub async fn request(&self, request: Request) -> JsonRpcResult<Response> {
        self.client.send_rpc_request(request).await
    }
}
