//! Accumulates eligible calls into batches and flushes them.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use alloy::primitives::Bytes;
use tokio::sync::oneshot;

use crate::error::{JsonRpcError, JsonRpcResult};
use crate::interceptor::CallRequest;
use crate::recovery::BatchExecutor;
use crate::Client;

type Responder = oneshot::Sender<JsonRpcResult<Bytes>>;

/// The batch being filled.
#[derive(Default)]
struct PendingBatch {
    /// Incremented every time the pending calls are taken for a flush.
    generation: u64,
    calls: Vec<CallRequest>,
    responders: Vec<Responder>,
}

/// Handle to the outcome of an enqueued call.
pub struct PendingResult {
    generation: u64,
    receiver: oneshot::Receiver<JsonRpcResult<Bytes>>,
}

impl PendingResult {
    /// Generation of the batch the call was added to.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Waits for the batch to be executed.
    pub async fn outcome(self) -> JsonRpcResult<Bytes> {
        self.receiver
            .await
            .map_err(|_| JsonRpcError::BatchDropped)?
    }
}

/// Batches the calls enqueued by the callers of one provider.
///
/// A batch is flushed as soon as it holds `max_batch_size` calls, or when one of its
/// callers resumes after yielding to the runtime, i.e. once the callers stop enqueuing.
pub struct BatchScheduler<C: Client> {
    executor: Arc<BatchExecutor<C>>,
    max_batch_size: Option<usize>,
    pending: Mutex<PendingBatch>,
}

impl<C: Client> BatchScheduler<C> {
    pub fn new(executor: BatchExecutor<C>, max_batch_size: Option<usize>) -> Self {
        Self {
            executor: Arc::new(executor),
            max_batch_size,
            pending: Mutex::default(),
        }
    }

    /// Enqueues the call and returns its outcome once the batch has been executed.
    ///
    /// If the returned future is dropped between the enqueue and the flush, the call
    /// stays in the pending batch: it is executed with the next flush and its
    /// outcome is discarded.
    pub async fn schedule(&self, call: CallRequest) -> JsonRpcResult<Bytes> {
        let pending = self.enqueue(call);

        // let the other callers of this unit of work join the batch
        tokio::task::yield_now().await;
        self.flush(pending.generation());

        pending.outcome().await
    }

    /// Adds the call to the pending batch without waiting for it.
    ///
    /// The batch is flushed immediately if it reached the maximum size.
    pub fn enqueue(&self, call: CallRequest) -> PendingResult {
        let (sender, receiver) = oneshot::channel();

        let mut pending = self.lock_pending();
        pending.calls.push(call);
        pending.responders.push(sender);
        let generation = pending.generation;

        if self
            .max_batch_size
            .is_some_and(|max_batch_size| pending.calls.len() >= max_batch_size)
        {
            self.dispatch(&mut pending);
        }

        PendingResult {
            generation,
            receiver,
        }
    }

    /// Flushes the pending batch if it is still the batch of the given generation.
    pub fn flush(&self, generation: u64) {
        let mut pending = self.lock_pending();
        if pending.generation == generation && !pending.calls.is_empty() {
            self.dispatch(&mut pending);
        }
    }

    /// Number of calls waiting for a flush.
    pub fn pending_calls(&self) -> usize {
        self.lock_pending().calls.len()
    }

    fn dispatch(&self, pending: &mut PendingBatch) {
        let calls = std::mem::take(&mut pending.calls);
        let responders = std::mem::take(&mut pending.responders);
        pending.generation += 1;

        log::trace!("flushing batch of {} calls", calls.len());

        let executor = self.executor.clone();
        tokio::spawn(async move {
            let outcomes = executor.execute(&calls, 0).await;
            debug_assert_eq!(outcomes.len(), responders.len());

            for (responder, outcome) in responders.into_iter().zip(outcomes) {
                // the caller may have stopped waiting
                let _ = responder.send(outcome);
            }
        });
    }

    fn lock_pending(&self) -> MutexGuard<'_, PendingBatch> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
