//! Client of the Multicall2 `tryAggregate` endpoint.

use alloy::primitives::{Address, Bytes};
use alloy::sol;
use alloy::sol_types::SolCall;

use crate::error::{JsonRpcError, JsonRpcResult};
use crate::group::Group;
use crate::interceptor::CallRequest;
use crate::request::eth_call;
use crate::Client;

sol! {
    /// A call of an aggregate.
    #[derive(Debug, PartialEq, Eq)]
    struct AggregateCall {
        address target;
        bytes callData;
    }

    /// Outcome of one call of an aggregate.
    #[derive(Debug, PartialEq, Eq)]
    struct AggregateResult {
        bool success;
        bytes returnData;
    }

    /// Executes every call, reverting only if `requireSuccess` is set and a call fails.
    function tryAggregate(bool requireSuccess, AggregateCall[] calls) external returns (AggregateResult[] returnData);
}

/// Issues one `tryAggregate` request per group.
#[derive(Clone)]
pub struct AggregatorClient<C: Client> {
    client: C,
    address: Address,
}

impl<C: Client> AggregatorClient<C> {
    pub fn new(client: C, address: Address) -> Self {
        Self { client, address }
    }

    /// Executes the calls of the group in one aggregate at the group's block.
    ///
    /// A reverting call does not fail the aggregate, it is reported in its result.
    /// An error is returned only if the aggregate request itself failed.
    pub async fn try_aggregate(&self, group: &Group<'_>) -> JsonRpcResult<Vec<AggregateResult>> {
        let data = encode_try_aggregate(group.calls);
        let request = CallRequest::new(self.address, data, group.block);

        log::trace!(
            "aggregating {} calls at block {} through {}",
            group.len(),
            group.block,
            self.address
        );

        let return_data = eth_call(&self.client, &request).await?;
        let results = tryAggregateCall::abi_decode_returns(&return_data, true)?.returnData;

        if results.len() != group.len() {
            return Err(JsonRpcError::UnexpectedResultsAmount {
                expected: group.len(),
                actual: results.len(),
            });
        }

        Ok(results)
    }

    /// Aggregates every group concurrently and flattens the results in group order.
    pub async fn aggregate_groups(
        &self,
        groups: &[Group<'_>],
    ) -> JsonRpcResult<Vec<AggregateResult>> {
        let results =
            futures::future::try_join_all(groups.iter().map(|group| self.try_aggregate(group)))
                .await?;

        Ok(results.into_iter().flatten().collect())
    }
}

/// Encodes the `tryAggregate` call data for the calls, allowing partial failures.
pub fn encode_try_aggregate(calls: &[CallRequest]) -> Bytes {
    tryAggregateCall {
        requireSuccess: false,
        calls: calls
            .iter()
            .map(|call| AggregateCall {
                target: call.to,
                callData: call.data.clone(),
            })
            .collect(),
    }
    .abi_encode()
    .into()
}

#[cfg(test)]
mod tests {
    use alloy::primitives::address;

    use super::*;
    use crate::block::BlockNumber;

    #[test]
    fn should_encode_try_aggregate_without_requiring_success() {
        let target = address!("8ad599c3a0ff1de082011efddc58f1908eb6e6d8");
        let calls = vec![
            CallRequest::new(target, Bytes::from(vec![1, 2, 3]), BlockNumber::Latest),
            CallRequest::new(target, Bytes::from(vec![4]), BlockNumber::Latest),
        ];

        let data = encode_try_aggregate(&calls);

        assert_eq!(&data[..4], tryAggregateCall::SELECTOR.as_slice());
        let decoded = tryAggregateCall::abi_decode(&data, true).unwrap();
        assert!(!decoded.requireSuccess);
        assert_eq!(
            decoded.calls,
            vec![
                AggregateCall {
                    target,
                    callData: Bytes::from(vec![1, 2, 3]),
                },
                AggregateCall {
                    target,
                    callData: Bytes::from(vec![4]),
                },
            ]
        );
    }

    #[test]
    fn should_use_the_multicall2_selector() {
        assert_eq!(
            tryAggregateCall::SIGNATURE,
            "tryAggregate(bool,(address,bytes)[])"
        );
    }
}
