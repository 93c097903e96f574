use std::sync::Arc;

use futures_lite::{Stream, StreamExt};
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

use super::handler::{Acknowledge, DeliveryProcessor};
use crate::notifier::Notifier;

/// Runs one handler task per delivery, with at most `max_in_flight` alive at once.
///
/// Once the limit is reached the loop stops pulling deliveries until a
/// handler finishes, so backpressure reaches the broker through the prefetch
/// window instead of piling up in memory.
pub struct Dispatcher<N> {
    processor: Arc<DeliveryProcessor<N>>,
    max_in_flight: usize,
}

impl<N> Dispatcher<N>
where
    N: Notifier + 'static,
{
    pub fn new(processor: DeliveryProcessor<N>, max_in_flight: usize) -> Self {
        Self {
            processor: Arc::new(processor),
            max_in_flight: max_in_flight.max(1),
        }
    }

    /// Consumes `deliveries` until the stream ends, then waits for the
    /// handlers still in flight. Returns how many deliveries were dispatched.
    pub async fn run<S, D>(&self, mut deliveries: S) -> usize
    where
        S: Stream<Item = Option<D>> + Unpin,
        D: Acknowledge + 'static,
    {
        let limit = Arc::new(Semaphore::new(self.max_in_flight));
        let mut dispatched = 0;

        loop {
            let Ok(permit) = limit.clone().acquire_owned().await else {
                break;
            };
            let Some(delivery) = deliveries.next().await else {
                break;
            };

            dispatched += 1;
            let processor = self.processor.clone();
            tokio::spawn(async move {
                if let Err(e) = processor.process(delivery).await {
                    error!(error = %e, "Failed to settle delivery");
                }
                drop(permit);
            });
        }

        info!(dispatched, "Delivery stream ended, draining in-flight handlers");
        // Every permit back means every spawned handler has finished.
        if limit.acquire_many(self.max_in_flight as u32).await.is_err() {
            warn!("Semaphore closed before in-flight handlers drained");
        }

        dispatched
    }
}
