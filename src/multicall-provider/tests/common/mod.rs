use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use alloy::sol_types::SolCall;
use jsonrpc_core::{Call, ErrorCode, MethodCall, Output, Params, Request, Response, Version};
use multicall_provider::aggregator::{tryAggregateCall, AggregateResult};
use multicall_provider::config::DEFAULT_AGGREGATOR_ADDRESS;
use multicall_provider::{Address, Bytes, Client, JsonRpcResult};
use serde_json::{json, Value};

/// First byte of the call data of calls that revert.
pub const REVERT: u8 = 0xff;
/// First byte of the call data of calls that only fail inside an aggregate.
pub const FAIL_IN_AGGREGATE: u8 = 0xfe;

/// A request received by the [`MockNode`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Received {
    Aggregate { block: Value, calls: Vec<Bytes> },
    EthCall { to: Address, data: Bytes, block: Value },
    Other(String),
}

/// An in-memory node hosting a Multicall2 contract.
///
/// Calls return their own call data, except the ones starting with [`REVERT`].
#[derive(Clone)]
pub struct MockNode {
    aggregator: Address,
    max_aggregate_size: Option<usize>,
    aggregate_error: jsonrpc_core::Error,
    received: Arc<Mutex<Vec<Received>>>,
}

impl Default for MockNode {
    fn default() -> Self {
        Self {
            aggregator: DEFAULT_AGGREGATOR_ADDRESS,
            max_aggregate_size: None,
            aggregate_error: timeout_error(),
            received: Default::default(),
        }
    }
}

/// A gateway timeout reported in-band, the only node error recovery splits on.
pub fn timeout_error() -> jsonrpc_core::Error {
    jsonrpc_core::Error {
        code: ErrorCode::ServerError(-32000),
        message: "request timed out".to_string(),
        data: None,
    }
}

impl MockNode {
    /// Aggregates with more than `max_aggregate_size` calls fail with `aggregate_error`.
    pub fn failing_above(max_aggregate_size: usize, aggregate_error: jsonrpc_core::Error) -> Self {
        Self {
            max_aggregate_size: Some(max_aggregate_size),
            aggregate_error,
            ..Default::default()
        }
    }

    pub fn received(&self) -> Vec<Received> {
        self.received.lock().unwrap().clone()
    }

    /// Sizes of the aggregates received, failed ones included.
    pub fn aggregate_sizes(&self) -> Vec<usize> {
        self.received()
            .into_iter()
            .filter_map(|received| match received {
                Received::Aggregate { calls, .. } => Some(calls.len()),
                _ => None,
            })
            .collect()
    }

    fn record(&self, received: Received) {
        self.received.lock().unwrap().push(received);
    }

    fn execute(data: &Bytes, in_aggregate: bool) -> Result<Bytes, jsonrpc_core::Error> {
        match data.first() {
            Some(&REVERT) => Err(jsonrpc_core::Error {
                code: ErrorCode::ServerError(3),
                message: "execution reverted: TLU".to_string(),
                data: None,
            }),
            Some(&FAIL_IN_AGGREGATE) if in_aggregate => {
                Err(jsonrpc_core::Error::internal_error())
            }
            _ => Ok(data.clone()),
        }
    }

    fn eth_call(&self, params: Params) -> Result<Value, jsonrpc_core::Error> {
        let Params::Array(params) = params else {
            return Err(jsonrpc_core::Error::invalid_params("expected positional params"));
        };
        let to: Address = serde_json::from_value(params[0]["to"].clone())
            .map_err(|e| jsonrpc_core::Error::invalid_params(e.to_string()))?;
        let data: Bytes = serde_json::from_value(params[0]["data"].clone())
            .map_err(|e| jsonrpc_core::Error::invalid_params(e.to_string()))?;
        let block = params.get(1).cloned().unwrap_or(json!("latest"));

        if to == self.aggregator {
            if let Ok(aggregate) = tryAggregateCall::abi_decode(&data, true) {
                return self.try_aggregate(aggregate, block);
            }
        }

        self.record(Received::EthCall {
            to,
            data: data.clone(),
            block,
        });
        Self::execute(&data, false).map(|data| json!(data))
    }

    fn try_aggregate(
        &self,
        aggregate: tryAggregateCall,
        block: Value,
    ) -> Result<Value, jsonrpc_core::Error> {
        assert!(!aggregate.requireSuccess);

        let calls = aggregate
            .calls
            .into_iter()
            .map(|call| call.callData)
            .collect::<Vec<_>>();
        self.record(Received::Aggregate {
            block,
            calls: calls.clone(),
        });

        if self
            .max_aggregate_size
            .is_some_and(|max_size| calls.len() > max_size)
        {
            return Err(self.aggregate_error.clone());
        }

        let results = calls
            .iter()
            .map(|data| match Self::execute(data, true) {
                Ok(data) => AggregateResult {
                    success: true,
                    returnData: data,
                },
                Err(_) => AggregateResult {
                    success: false,
                    returnData: Bytes::new(),
                },
            })
            .collect::<Vec<_>>();

        let return_data = Bytes::from(tryAggregateCall::abi_encode_returns(&(results,)));
        Ok(json!(return_data))
    }

    fn handle(&self, call: MethodCall) -> Output {
        let result = match call.method.as_str() {
            "eth_call" => self.eth_call(call.params),
            "eth_blockNumber" => {
                self.record(Received::Other(call.method.clone()));
                Ok(json!("0x10"))
            }
            method => {
                self.record(Received::Other(method.to_string()));
                Err(jsonrpc_core::Error::method_not_found())
            }
        };

        Output::from(result, call.id, Some(Version::V2))
    }
}

impl Client for MockNode {
    fn send_rpc_request(
        &self,
        request: Request,
    ) -> Pin<Box<dyn Future<Output = JsonRpcResult<Response>> + Send>> {
        let response = match request {
            Request::Single(Call::MethodCall(call)) => Response::Single(self.handle(call)),
            request => panic!("unsupported request {request:?}"),
        };

        Box::pin(async move { Ok(response) })
    }
}

pub fn init_logger() {
    let _ = env_logger::Builder::new().parse_filters("debug").try_init();
}
