use futures_lite::{Stream, StreamExt};
use lapin::{message::Delivery, options::BasicConsumeOptions, types::FieldTable};
use tracing::{info, warn};

use super::channel_manager::{apply_qos, ChannelConfig, Topology};
use super::connection::ActiveChannel;
use super::errors::{RabbitMQError, Result};

/// Starts a manual-ack consumer on the bound queue.
///
/// Errors surfaced by the consumer stream carry no message to settle; they
/// are logged and handed on as empty deliveries.
pub async fn subscribe(
    session: &ActiveChannel,
    topology: &Topology,
    config: &ChannelConfig,
) -> Result<impl Stream<Item = Option<Delivery>> + Unpin + Send> {
    let channel = session.channel();
    apply_qos(channel, config).await?;

    let consumer = channel
        .basic_consume(
            &topology.queue,
            &config.consumer_tag,
            BasicConsumeOptions {
                no_ack: false,
                ..BasicConsumeOptions::default()
            },
            FieldTable::default(),
        )
        .await
        .map_err(|e| RabbitMQError::ConsumeError(e.to_string()))?;

    info!(
        queue = %topology.queue,
        consumer_tag = %config.consumer_tag,
        prefetch = config.prefetch_count,
        "Notification service listening for payment events..."
    );

    Ok(consumer.map(|delivery| match delivery {
        Ok(delivery) => Some(delivery),
        Err(e) => {
            warn!(error = %e, "Error receiving message");
            None
        }
    }))
}
