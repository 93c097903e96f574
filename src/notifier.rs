//! The notification side effect performed for every payment event.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

use crate::message::PaymentCreatedEvent;

#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("Notification dispatch failed: {0}")]
    Failed(String),

    #[error("Notification timed out after {0:?}")]
    Timeout(Duration),
}

/// Dispatches a notification (email, SMS, push, webhook) for a payment.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, event: &PaymentCreatedEvent) -> Result<(), NotificationError>;
}

#[async_trait]
impl<N: Notifier + ?Sized> Notifier for Arc<N> {
    async fn notify(&self, event: &PaymentCreatedEvent) -> Result<(), NotificationError> {
        (**self).notify(event).await
    }
}

/// Stand-in dispatcher that waits a fixed delay and logs the notification.
#[derive(Debug, Clone)]
pub struct SimulatedNotifier {
    delay: Duration,
}

impl SimulatedNotifier {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl Default for SimulatedNotifier {
    fn default() -> Self {
        Self::new(Duration::from_millis(100))
    }
}

#[async_trait]
impl Notifier for SimulatedNotifier {
    async fn notify(&self, event: &PaymentCreatedEvent) -> Result<(), NotificationError> {
        tokio::time::sleep(self.delay).await;

        info!(
            payment_id = %event.payment_id,
            account_id = %event.account_id,
            "Notification sent: Payment {} of {} {} for account {}",
            event.payment_id,
            event.amount,
            event.currency,
            event.account_id
        );
        Ok(())
    }
}

/// Bounds the latency of another notifier; an expired call becomes
/// `NotificationError::Timeout`.
pub struct TimeoutNotifier<N> {
    inner: N,
    timeout: Duration,
}

impl<N: Notifier> TimeoutNotifier<N> {
    pub fn new(inner: N, timeout: Duration) -> Self {
        Self { inner, timeout }
    }
}

#[async_trait]
impl<N: Notifier> Notifier for TimeoutNotifier<N> {
    async fn notify(&self, event: &PaymentCreatedEvent) -> Result<(), NotificationError> {
        tokio::time::timeout(self.timeout, self.inner.notify(event))
            .await
            .map_err(|_| NotificationError::Timeout(self.timeout))?
    }
}
