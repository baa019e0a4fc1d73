//! Error types for the multicall provider.

use std::sync::Arc;

use jsonrpc_core::ErrorCode;
use thiserror::Error;

/// Result type for the multicall provider.
pub type JsonRpcResult<T> = std::result::Result<T, JsonRpcError>;

/// Message of the error synthesized for a call that failed inside an aggregate.
pub const CALL_FAILED_MESSAGE: &str = "an error occurred in a call. To get the full error of failed calls, enable `debug_error` in the multicall provider configuration";

/// JSON-RPC code used by nodes to report an `eth_call` revert.
const EXECUTION_REVERTED_CODE: i64 = 3;

/// Error type for the multicall provider.
#[derive(Error, Debug)]
pub enum JsonRpcError {
    /// Error while parsing the JSON response.
    #[error("Invalid JSON response: {0}")]
    Json(#[from] serde_json::Error),
    /// The node answered with a JSON-RPC failure.
    #[error("JSON-RPC error: {0}")]
    Rpc(jsonrpc_core::Error),
    /// HTTP error.
    #[cfg(feature = "reqwest")]
    #[error("HTTP error {code}: {text}")]
    Http {
        /// HTTP status code.
        code: reqwest::StatusCode,
        /// HTTP response text.
        text: String,
    },
    /// Reqwest error.
    #[cfg(feature = "reqwest")]
    #[error("Reqwest error: {0}")]
    Reqwest(#[from] reqwest::Error),
    /// The aggregate call could not be encoded or its return data could not be decoded.
    #[error("Invalid aggregate ABI data: {0}")]
    Abi(#[from] alloy::sol_types::Error),
    /// A single request was sent, but a batch response was received.
    #[error("unexpected batch response: expected single but got batch")]
    UnexpectedBatch,
    /// The aggregator returned a number of results different from the number of calls.
    #[error("unexpected response: expected {expected} but got {actual}")]
    UnexpectedResultsAmount { expected: usize, actual: usize },
    /// A call reverted inside a successful aggregate and `debug_error` is disabled.
    #[error("{}", CALL_FAILED_MESSAGE)]
    CallFailed,
    /// The task flushing the batch terminated without answering.
    #[error("the batch containing the call was dropped before it completed")]
    BatchDropped,
    /// The provider configuration is not usable.
    #[error("Invalid multicall configuration: {0}")]
    InvalidConfig(String),
    /// A transport error shared by every call of the batch it failed.
    #[error(transparent)]
    Batch(Arc<JsonRpcError>),
}

impl From<jsonrpc_core::Error> for JsonRpcError {
    fn from(err: jsonrpc_core::Error) -> Self {
        JsonRpcError::Rpc(err)
    }
}

/// Classification of a transport-level failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// The request did not complete in time.
    Timeout,
    /// The node or a proxy in front of it failed to serve the request.
    ServerError,
    /// The node executed the call and it reverted.
    CallException,
    /// The node refused the request as malformed.
    InvalidRequest,
}

impl TransportErrorKind {
    /// Whether a batch that failed with this kind may succeed once split.
    pub fn is_recoverable(self) -> bool {
        matches!(self, Self::Timeout | Self::ServerError)
    }
}

impl JsonRpcError {
    /// Returns the transport classification of the error,
    /// or `None` if the error did not come from the transport.
    pub fn kind(&self) -> Option<TransportErrorKind> {
        match self {
            JsonRpcError::Rpc(err) => rpc_error_kind(err),
            #[cfg(feature = "reqwest")]
            JsonRpcError::Http { code, .. } => Some(
                if *code == reqwest::StatusCode::REQUEST_TIMEOUT
                    || *code == reqwest::StatusCode::GATEWAY_TIMEOUT
                {
                    TransportErrorKind::Timeout
                } else {
                    TransportErrorKind::ServerError
                },
            ),
            #[cfg(feature = "reqwest")]
            JsonRpcError::Reqwest(err) => Some(if err.is_timeout() {
                TransportErrorKind::Timeout
            } else {
                TransportErrorKind::ServerError
            }),
            JsonRpcError::Batch(err) => err.kind(),
            _ => None,
        }
    }
}

/// Node-reported failures are answers, not transport failures: they are only
/// recoverable when the node says the request timed out.
fn rpc_error_kind(err: &jsonrpc_core::Error) -> Option<TransportErrorKind> {
    let message = err.message.to_lowercase();
    if err.code.code() == EXECUTION_REVERTED_CODE || message.contains("revert") {
        return Some(TransportErrorKind::CallException);
    }

    match err.code {
        ErrorCode::ParseError
        | ErrorCode::InvalidRequest
        | ErrorCode::MethodNotFound
        | ErrorCode::InvalidParams => Some(TransportErrorKind::InvalidRequest),
        ErrorCode::InternalError | ErrorCode::ServerError(_)
            if message.contains("timeout") || message.contains("timed out") =>
        {
            Some(TransportErrorKind::Timeout)
        }
        ErrorCode::InternalError | ErrorCode::ServerError(_) => None,
    }
}
