use lapin::{
    options::{BasicQosOptions, ExchangeDeclareOptions, QueueBindOptions, QueueDeclareOptions},
    types::FieldTable,
    Channel, ExchangeKind,
};
use tracing::{debug, info};
use uuid::Uuid;

use super::errors::{RabbitMQError, Result};

pub const NOTIFICATIONS_EXCHANGE: &str = "notifications";
pub const PAYMENT_CREATED_QUEUE: &str = "notifications.payment.created";
pub const PAYMENT_CREATED_ROUTING_KEY: &str = "payment.created";

/// Exchange, queue and binding the consumer depends on.
///
/// Every declaration is durable and uses fixed arguments, so declaring the
/// same topology twice against one broker is a no-op.
#[derive(Debug, Clone, PartialEq)]
pub struct Topology {
    pub exchange: String,
    pub exchange_kind: ExchangeKind,
    pub queue: String,
    pub routing_key: String,
}

impl Default for Topology {
    fn default() -> Self {
        Self {
            exchange: NOTIFICATIONS_EXCHANGE.to_string(),
            exchange_kind: ExchangeKind::Topic,
            queue: PAYMENT_CREATED_QUEUE.to_string(),
            routing_key: PAYMENT_CREATED_ROUTING_KEY.to_string(),
        }
    }
}

/// Configuration options for the consuming channel
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// Number of unacknowledged messages allowed, also the in-flight handler bound
    pub prefetch_count: u16,

    /// Consumer tag announced to the broker
    pub consumer_tag: String,
}

impl ChannelConfig {
    pub fn new(prefetch_count: u16, service_name: &str) -> Self {
        Self {
            prefetch_count,
            consumer_tag: format!("{}-{}", service_name, &Uuid::new_v4().to_string()[..8]),
        }
    }
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self::new(10, "notification")
    }
}

/// Declares the exchange, the queue, and the binding between them.
pub async fn declare_topology(channel: &Channel, topology: &Topology) -> Result<()> {
    channel
        .exchange_declare(
            &topology.exchange,
            topology.exchange_kind.clone(),
            ExchangeDeclareOptions {
                durable: true,
                ..ExchangeDeclareOptions::default()
            },
            FieldTable::default(),
        )
        .await
        .map_err(|e| RabbitMQError::TopologyError(format!("Failed to declare exchange: {}", e)))?;

    let queue = channel
        .queue_declare(
            &topology.queue,
            QueueDeclareOptions {
                durable: true,
                ..QueueDeclareOptions::default()
            },
            FieldTable::default(),
        )
        .await
        .map_err(|e| RabbitMQError::TopologyError(format!("Failed to declare queue: {}", e)))?;

    debug!(
        queue = %topology.queue,
        messages = queue.message_count(),
        consumers = queue.consumer_count(),
        "Queue declared"
    );

    channel
        .queue_bind(
            &topology.queue,
            &topology.exchange,
            &topology.routing_key,
            QueueBindOptions::default(),
            FieldTable::default(),
        )
        .await
        .map_err(|e| RabbitMQError::TopologyError(format!("Failed to bind queue: {}", e)))?;

    info!(
        exchange = %topology.exchange,
        queue = %topology.queue,
        routing_key = %topology.routing_key,
        "Queue and exchange are set up and bound"
    );
    Ok(())
}

/// Caps how many unacknowledged deliveries the broker pushes to this channel.
pub async fn apply_qos(channel: &Channel, config: &ChannelConfig) -> Result<()> {
    channel
        .basic_qos(config.prefetch_count, BasicQosOptions::default())
        .await
        .map_err(|e| RabbitMQError::ChannelError(format!("Failed to set prefetch: {}", e)))?;

    debug!(prefetch = config.prefetch_count, "QoS prefetch count set");
    Ok(())
}
