//! Batch processor shared by every layer.
//!
//! Items are split into fixed-size batches. Each batch runs its items
//! concurrently on the current task (`join_all`) and forms a barrier: the
//! next batch starts only after every item of the previous one finished and
//! the cooldown elapsed. There is no pause after the final batch.
//!
//! The worker returns a plain value, not a `Result`, so one failing item
//! can never abort its batch. Workers fold their own errors into the value.

use std::future::Future;
use std::time::Duration;

use futures::future::join_all;
use tracing::debug;

/// Batch size and inter-batch pause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchConfig {
    pub batch_size: usize,
    pub cooldown: Duration,
}

impl BatchConfig {
    pub fn new(batch_size: usize, cooldown: Duration) -> Self {
        Self {
            batch_size,
            cooldown,
        }
    }

    /// Batch size actually used; zero is treated as one.
    pub fn effective_batch_size(&self) -> usize {
        self.batch_size.max(1)
    }

    /// Number of batches `items` items split into.
    pub fn batch_count(&self, items: usize) -> usize {
        items.div_ceil(self.effective_batch_size())
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_size: 50,
            cooldown: Duration::from_millis(1000),
        }
    }
}

/// Run `worker` over `items` batch by batch.
///
/// Returns exactly one output per input, in input order.
pub async fn process_in_batches<T, R, F, Fut>(items: Vec<T>, config: BatchConfig, worker: F) -> Vec<R>
where
    F: Fn(T) -> Fut,
    Fut: Future<Output = R>,
{
    let batch_size = config.effective_batch_size();
    let total_batches = config.batch_count(items.len());
    let mut results = Vec::with_capacity(items.len());
    let mut remaining = items.into_iter().peekable();
    let mut batch_index = 0usize;

    while remaining.peek().is_some() {
        let batch: Vec<T> = remaining.by_ref().take(batch_size).collect();
        batch_index += 1;
        debug!(
            batch = batch_index,
            total_batches,
            items = batch.len(),
            "processing batch"
        );

        results.extend(join_all(batch.into_iter().map(&worker)).await);

        if remaining.peek().is_some() && !config.cooldown.is_zero() {
            tokio::time::sleep(config.cooldown).await;
        }
    }

    results
}
