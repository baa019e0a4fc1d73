use alloy::primitives::Bytes;
use jsonrpc_core::{Call, Id, MethodCall, Output, Params, Request, Response, Version};
use serde_json::{json, Value};

use crate::error::{JsonRpcError, JsonRpcResult};
use crate::interceptor::CallRequest;
use crate::Client;

pub const ETH_CALL_METHOD: &str = "eth_call";

/// Performs a single request and returns the `result` field of the response.
pub async fn single_request<C: Client>(
    client: &C,
    method: String,
    params: Params,
    id: Id,
) -> JsonRpcResult<Value> {
    let request = Request::Single(Call::MethodCall(MethodCall {
        jsonrpc: Some(Version::V2),
        method,
        params,
        id,
    }));

    let response = client.send_rpc_request(request).await?;

    match response {
        Response::Single(Output::Success(result)) => Ok(result.result),
        Response::Single(Output::Failure(failure)) => Err(failure.error.into()),
        Response::Batch(_) => Err(JsonRpcError::UnexpectedBatch),
    }
}

/// Executes the call with `eth_call` directly, without going through the aggregator.
pub async fn eth_call<C: Client>(client: &C, call: &CallRequest) -> JsonRpcResult<Bytes> {
    let params = Params::Array(vec![
        json!({ "to": call.to, "data": call.data }),
        serde_json::to_value(call.block)?,
    ]);

    let result = single_request(
        client,
        ETH_CALL_METHOD.to_string(),
        params,
        // For some reason some JSON RPC services fail to parse requests with null id
        Id::Str(ETH_CALL_METHOD.to_string()),
    )
    .await?;

    Ok(serde_json::from_value(result)?)
}
