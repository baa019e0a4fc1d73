use alloy::primitives::{address, Address};
use serde::{Deserialize, Serialize};

use crate::error::{JsonRpcError, JsonRpcResult};

/// makerdao's Multicall2 deployment, see <https://github.com/makerdao/multicall>
pub const DEFAULT_AGGREGATOR_ADDRESS: Address =
    address!("5ba1e12693dc8f9c48aad8770482f4739beed696");

pub const DEFAULT_MAX_BATCH_SIZE: usize = 500;
pub const DEFAULT_MAX_RECOVER_DEPTH: u32 = 3;

/// Configuration of a [`crate::MulticallProvider`].
///
/// Every field is optional when deserializing; missing fields take the default value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MulticallConfig {
    /// Log why calls were not batched and how batch errors were recovered.
    pub verbose: bool,

    /// Maximum number of calls in one batch. `None` removes the limit, so a batch
    /// is only flushed once the callers stop enqueuing.
    pub max_batch_size: Option<usize>,

    /// Re-execute failed calls without the aggregator to get the real error.
    /// This doubles the requests for failing calls and is meant for development.
    pub debug_error: bool,

    /// Address of the Multicall2 contract.
    pub aggregator_address: Address,

    /// Retry timed out and server failed batches by splitting them in halves.
    pub recover_batch_error: bool,

    /// Maximum number of times a batch is split while recovering.
    pub max_recover_depth: u32,
}

impl Default for MulticallConfig {
    fn default() -> Self {
        Self {
            verbose: false,
            max_batch_size: Some(DEFAULT_MAX_BATCH_SIZE),
            debug_error: false,
            aggregator_address: DEFAULT_AGGREGATOR_ADDRESS,
            recover_batch_error: false,
            max_recover_depth: DEFAULT_MAX_RECOVER_DEPTH,
        }
    }
}

impl MulticallConfig {
    /// Checks that the configuration can drive a provider.
    pub fn validate(&self) -> JsonRpcResult<()> {
        if self.max_batch_size == Some(0) {
            return Err(JsonRpcError::InvalidConfig(
                "max_batch_size must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}
