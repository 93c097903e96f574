//! Per-delivery consume/acknowledge state machine.
//!
//! ```text
//! received -> decoding -> decoded -> notifying -> acked
//!                      \-> decode_failed -------> nacked_requeue
//!                                   \-> notify_failed -> nacked_requeue
//! ```
//!
//! A requeued message comes back later as a brand-new delivery. There is no
//! redelivery cap, so a message that can never be processed keeps cycling.

use async_trait::async_trait;
use lapin::{
    message::Delivery,
    options::{BasicAckOptions, BasicNackOptions},
};
use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, error, info};

use crate::message::PaymentCreatedEvent;
use crate::notifier::{NotificationError, Notifier};
use crate::rabbitmq::errors::{RabbitMQError, Result};

#[derive(Debug, Error)]
pub enum ProcessingError {
    #[error("Failed to decode payment event: {0}")]
    DecodeError(#[from] serde_json::Error),

    #[error(transparent)]
    NotificationError(#[from] NotificationError),
}

/// Terminal state of one delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// Nothing was delivered; no acknowledgement was sent.
    Skipped,
    Acked,
    Requeued,
}

/// A received message together with the means to settle it.
#[async_trait]
pub trait Acknowledge: Send + Sync {
    fn delivery_tag(&self) -> u64;

    fn body(&self) -> &[u8];

    fn redelivered(&self) -> bool;

    /// Positive acknowledgement; the broker drops the message.
    async fn acknowledge(&self) -> Result<()>;

    /// Negative acknowledgement with requeue; the broker redelivers the message.
    async fn requeue(&self) -> Result<()>;
}

#[async_trait]
impl Acknowledge for Delivery {
    fn delivery_tag(&self) -> u64 {
        self.delivery_tag
    }

    fn body(&self) -> &[u8] {
        &self.data
    }

    fn redelivered(&self) -> bool {
        self.redelivered
    }

    async fn acknowledge(&self) -> Result<()> {
        self.acker
            .ack(BasicAckOptions::default())
            .await
            .map_err(|e| RabbitMQError::AckError(format!("Failed to acknowledge message: {}", e)))
    }

    async fn requeue(&self) -> Result<()> {
        self.acker
            .nack(BasicNackOptions {
                requeue: true,
                ..BasicNackOptions::default()
            })
            .await
            .map_err(|e| {
                RabbitMQError::AckError(format!("Failed to negatively acknowledge message: {}", e))
            })
    }
}

pub struct DeliveryProcessor<N> {
    notifier: N,
    service_name: String,
}

impl<N: Notifier> DeliveryProcessor<N> {
    pub fn new(notifier: N, service_name: &str) -> Self {
        Self {
            notifier,
            service_name: service_name.to_string(),
        }
    }

    /// Drives one delivery to a terminal state.
    ///
    /// Decode and notification failures are contained here and turned into a
    /// requeue. Only a failure to talk to the broker while settling the
    /// message is returned as an error.
    pub async fn process<D: Acknowledge>(&self, delivery: Option<D>) -> Result<DeliveryOutcome> {
        let Some(delivery) = delivery else {
            debug!("Empty delivery, skipping");
            return Ok(DeliveryOutcome::Skipped);
        };

        let started = Instant::now();

        match self.handle(&delivery).await {
            Ok(event) => {
                delivery.acknowledge().await?;

                let latency_ms = started.elapsed().as_millis() as u64;
                info!(
                    service = %self.service_name,
                    latency_ms,
                    payment_id = %event.payment_id,
                    event = "processed",
                    "Notification processed"
                );
                Ok(DeliveryOutcome::Acked)
            }
            Err(e) => {
                error!(
                    delivery_tag = delivery.delivery_tag(),
                    redelivered = delivery.redelivered(),
                    error = %e,
                    "Error processing notification, requeueing"
                );
                delivery.requeue().await?;
                Ok(DeliveryOutcome::Requeued)
            }
        }
    }

    async fn handle<D: Acknowledge>(
        &self,
        delivery: &D,
    ) -> std::result::Result<PaymentCreatedEvent, ProcessingError> {
        let event = PaymentCreatedEvent::from_slice(delivery.body())?;
        debug!(
            payment_id = %event.payment_id,
            occurred_at = ?event.occurred_at(),
            "Decoded payment event"
        );

        self.notifier.notify(&event).await?;
        Ok(event)
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use rust_decimal_macros::dec;
    use std::sync::{Arc, Mutex};

    const VALID: &[u8] = br#"{"event":"payment.created","paymentId":"p1","accountId":"a1","amount":100,"currency":"USD","ts":1234567890}"#;

    fn expected_event() -> PaymentCreatedEvent {
        PaymentCreatedEvent {
            event: "payment.created".to_string(),
            payment_id: "p1".to_string(),
            account_id: "a1".to_string(),
            amount: dec!(100),
            currency: "USD".to_string(),
            ts: 1234567890,
        }
    }

    #[tokio::test]
    async fn test_success_acks_once() {
        let settlements = Arc::new(Mutex::new(Vec::new()));
        let processor = DeliveryProcessor::new(ScriptedNotifier::default(), "notification");

        let outcome = processor
            .process(Some(RecordedDelivery::new(1, VALID, &settlements)))
            .await
            .unwrap();

        assert_eq!(outcome, DeliveryOutcome::Acked);
        assert_eq!(*settlements.lock().unwrap(), vec![(1, Settlement::Ack)]);
        assert_eq!(*processor.notifier.seen.lock().unwrap(), vec![expected_event()]);
    }

    #[tokio::test]
    async fn test_decode_failure_requeues_without_notifying() {
        let settlements = Arc::new(Mutex::new(Vec::new()));
        let processor = DeliveryProcessor::new(ScriptedNotifier::default(), "notification");

        let outcome = processor
            .process(Some(RecordedDelivery::new(7, b"{not json", &settlements)))
            .await
            .unwrap();

        assert_eq!(outcome, DeliveryOutcome::Requeued);
        assert_eq!(*settlements.lock().unwrap(), vec![(7, Settlement::NackRequeue)]);
        assert!(processor.notifier.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_wrong_shape_requeues() {
        let settlements = Arc::new(Mutex::new(Vec::new()));
        let processor = DeliveryProcessor::new(ScriptedNotifier::default(), "notification");

        let outcome = processor
            .process(Some(RecordedDelivery::new(2, br#"{"paymentId":42}"#, &settlements)))
            .await
            .unwrap();

        assert_eq!(outcome, DeliveryOutcome::Requeued);
        assert!(processor.notifier.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_notification_failure_requeues() {
        let settlements = Arc::new(Mutex::new(Vec::new()));
        let notifier = ScriptedNotifier {
            fail: true,
            ..Default::default()
        };
        let processor = DeliveryProcessor::new(notifier, "notification");

        let outcome = processor
            .process(Some(RecordedDelivery::new(3, VALID, &settlements)))
            .await
            .unwrap();

        assert_eq!(outcome, DeliveryOutcome::Requeued);
        assert_eq!(*settlements.lock().unwrap(), vec![(3, Settlement::NackRequeue)]);
        assert_eq!(processor.notifier.seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_empty_delivery_is_not_settled() {
        let processor = DeliveryProcessor::new(ScriptedNotifier::default(), "notification");

        let outcome = processor.process(None::<RecordedDelivery>).await.unwrap();

        assert_eq!(outcome, DeliveryOutcome::Skipped);
        assert!(processor.notifier.seen.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_notification_timeout_requeues() {
        use crate::notifier::{SimulatedNotifier, TimeoutNotifier};
        use std::time::Duration;

        let settlements = Arc::new(Mutex::new(Vec::new()));
        let notifier = TimeoutNotifier::new(
            SimulatedNotifier::new(Duration::from_secs(120)),
            Duration::from_secs(30),
        );
        let processor = DeliveryProcessor::new(notifier, "notification");

        let outcome = processor
            .process(Some(RecordedDelivery::new(4, VALID, &settlements)))
            .await
            .unwrap();

        assert_eq!(outcome, DeliveryOutcome::Requeued);
        assert_eq!(*settlements.lock().unwrap(), vec![(4, Settlement::NackRequeue)]);
    }
}
