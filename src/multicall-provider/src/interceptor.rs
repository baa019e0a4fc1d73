//! Decides which outgoing requests can be folded into an aggregate.

use std::fmt;

use alloy::primitives::{Address, Bytes};
use jsonrpc_core::Params;
use serde_json::Value;

use crate::block::BlockNumber;
use crate::request::ETH_CALL_METHOD;

/// A read-only call that can be executed through the aggregator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallRequest {
    /// Destination contract.
    pub to: Address,
    /// Encoded call payload.
    pub data: Bytes,
    /// Block the call is evaluated against.
    pub block: BlockNumber,
}

impl CallRequest {
    pub fn new(to: Address, data: Bytes, block: BlockNumber) -> Self {
        Self { to, data, block }
    }
}

/// Reason why a request is sent to the transport as is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Exclusion {
    /// Only `eth_call` can be aggregated.
    Method(String),
    /// The call parameters are not exactly `{to, data}` with an optional block.
    ParamsShape(Vec<String>),
    /// The block context is not a tag or a block number.
    BlockContext(Value),
    /// The call targets the aggregator itself.
    SelfReference,
}

impl fmt::Display for Exclusion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Exclusion::Method(method) => write!(f, "method {method} cannot be multicalled"),
            Exclusion::ParamsShape(keys) => write!(
                f,
                "some params are not compatible: [{}]",
                keys.join(", ")
            ),
            Exclusion::BlockContext(block) => {
                write!(f, "block context {block} is not supported")
            }
            Exclusion::SelfReference => f.write_str("call is already to the multicall contract"),
        }
    }
}

/// Classifies an outgoing request.
///
/// Returns the call to batch, or the reason it must go straight to the transport.
pub fn classify(
    method: &str,
    params: &Params,
    aggregator: Address,
) -> Result<CallRequest, Exclusion> {
    if method != ETH_CALL_METHOD {
        return Err(Exclusion::Method(method.to_string()));
    }

    let (call, block) = match params {
        Params::Array(values) if matches!(values.len(), 1 | 2) => (&values[0], values.get(1)),
        Params::Array(values) => {
            return Err(Exclusion::ParamsShape(vec![format!(
                "{} positional params",
                values.len()
            )]))
        }
        Params::Map(map) => return Err(Exclusion::ParamsShape(map.keys().cloned().collect())),
        Params::None => return Err(Exclusion::ParamsShape(vec![])),
    };

    let Some(fields) = call.as_object() else {
        return Err(Exclusion::ParamsShape(vec![call.to_string()]));
    };
    let keys = || fields.keys().cloned().collect::<Vec<_>>();
    if fields.len() != 2 {
        return Err(Exclusion::ParamsShape(keys()));
    }

    let to = fields
        .get("to")
        .and_then(|to| serde_json::from_value::<Address>(to.clone()).ok());
    let data = fields
        .get("data")
        .and_then(|data| serde_json::from_value::<Bytes>(data.clone()).ok());
    let (Some(to), Some(data)) = (to, data) else {
        return Err(Exclusion::ParamsShape(keys()));
    };

    let block = match block {
        None => BlockNumber::Latest,
        Some(value) => serde_json::from_value(value.clone())
            .map_err(|_| Exclusion::BlockContext(value.clone()))?,
    };

    if to == aggregator {
        return Err(Exclusion::SelfReference);
    }

    Ok(CallRequest { to, data, block })
}
