use alloy::primitives::Bytes;

use crate::aggregator::AggregateResult;
use crate::error::{JsonRpcError, JsonRpcResult};
use crate::interceptor::CallRequest;
use crate::request::eth_call;
use crate::Client;

/// Turns the flattened aggregate results into one outcome per call, in call order.
///
/// With `debug_error` the failed calls are executed again without the aggregator
/// so that their caller gets the node's own error.
pub async fn demultiplex<C: Client>(
    client: &C,
    debug_error: bool,
    calls: &[CallRequest],
    results: Vec<AggregateResult>,
) -> Vec<JsonRpcResult<Bytes>> {
    debug_assert_eq!(calls.len(), results.len());

    let outcomes = calls.iter().zip(results).map(|(call, result)| async move {
        match result {
            AggregateResult {
                success: true,
                returnData: data,
            } => Ok(data),
            _ if debug_error => eth_call(client, call).await,
            _ => Err(JsonRpcError::CallFailed),
        }
    });

    futures::future::join_all(outcomes).await
}
