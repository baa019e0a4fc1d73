//! Executes a batch and recovers transient aggregate failures by bisection.

use std::sync::Arc;

use alloy::primitives::Bytes;
use futures::future::BoxFuture;
use futures::FutureExt;

use crate::aggregator::AggregatorClient;
use crate::config::MulticallConfig;
use crate::demux::demultiplex;
use crate::error::{JsonRpcError, JsonRpcResult};
use crate::group::group_by_block;
use crate::interceptor::CallRequest;
use crate::Client;

/// Why a failed batch is not split.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unrecoverable {
    /// The error did not come from the transport.
    Unclassified,
    /// Recovery is disabled in the configuration.
    Disabled,
    /// The batch was already split `max_recover_depth` times.
    MaxDepth,
    /// The transport failed for a reason that splitting cannot fix.
    Kind,
    /// A single call cannot be split.
    SingleCall,
}

/// Decides whether a batch of `batch_size` calls that failed at `depth` with `error` is split.
pub fn check_recoverable(
    config: &MulticallConfig,
    error: &JsonRpcError,
    batch_size: usize,
    depth: u32,
) -> Result<(), Unrecoverable> {
    let kind = error.kind().ok_or(Unrecoverable::Unclassified)?;
    if !config.recover_batch_error {
        return Err(Unrecoverable::Disabled);
    }
    if depth >= config.max_recover_depth {
        return Err(Unrecoverable::MaxDepth);
    }
    if !kind.is_recoverable() {
        return Err(Unrecoverable::Kind);
    }
    if batch_size <= 1 {
        return Err(Unrecoverable::SingleCall);
    }

    Ok(())
}

/// Runs batches through grouping, aggregation and demultiplexing.
pub struct BatchExecutor<C: Client> {
    client: C,
    aggregator: AggregatorClient<C>,
    config: Arc<MulticallConfig>,
}

impl<C: Client> BatchExecutor<C> {
    pub fn new(client: C, config: Arc<MulticallConfig>) -> Self {
        Self {
            aggregator: AggregatorClient::new(client.clone(), config.aggregator_address),
            client,
            config,
        }
    }

    /// Returns exactly one outcome per call, in the order of the calls.
    ///
    /// When the aggregate request fails with a recoverable transport error, the batch
    /// is split in two halves that are executed concurrently at `depth + 1`.
    /// Otherwise the error is shared by every call of the batch.
    pub fn execute<'a>(
        &'a self,
        calls: &'a [CallRequest],
        depth: u32,
    ) -> BoxFuture<'a, Vec<JsonRpcResult<Bytes>>> {
        async move {
            let groups = group_by_block(calls);

            let error = match self.aggregator.aggregate_groups(&groups).await {
                Ok(results) => {
                    return demultiplex(&self.client, self.config.debug_error, calls, results)
                        .await
                }
                Err(error) => error,
            };

            match check_recoverable(&self.config, &error, calls.len(), depth) {
                Ok(()) => {
                    if self.config.verbose {
                        log::debug!(
                            "recovering batch of {} calls with depth of {depth}: {error}",
                            calls.len()
                        );
                    }

                    let (first, second) = calls.split_at(calls.len().div_ceil(2));
                    let (mut outcomes, second) = futures::join!(
                        self.execute(first, depth + 1),
                        self.execute(second, depth + 1)
                    );
                    outcomes.extend(second);
                    outcomes
                }
                Err(reason) => {
                    if self.config.verbose && reason == Unrecoverable::MaxDepth {
                        log::debug!("max halving reached. propagating error: {error}");
                    }
                    share_error(error, calls.len())
                }
            }
        }
        .boxed()
    }
}

fn share_error(error: JsonRpcError, count: usize) -> Vec<JsonRpcResult<Bytes>> {
    let error = match error {
        JsonRpcError::Batch(error) => error,
        error => Arc::new(error),
    };

    (0..count)
        .map(|_| Err(JsonRpcError::Batch(error.clone())))
        .collect()
}
