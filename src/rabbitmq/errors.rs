// src/rabbitmq/errors.rs

use thiserror::Error;
use tokio::time::error::Elapsed;

#[derive(Debug, Error)]
pub enum RabbitMQError {
    #[error("RabbitMQ connection error: {0}")]
    ConnectionError(String),

    #[error("RabbitMQ channel error: {0}")]
    ChannelError(String),

    #[error("RabbitMQ topology error: {0}")]
    TopologyError(String),

    #[error("RabbitMQ consume error: {0}")]
    ConsumeError(String),

    #[error("RabbitMQ acknowledge error: {0}")]
    AckError(String),

    #[error("Connection timeout: {0}")]
    TimeoutError(String),
}

// Custom Result type for RabbitMQ operations
pub type Result<T> = std::result::Result<T, RabbitMQError>;

impl RabbitMQError {
    /// Fatal error raised once the connect budget is spent.
    pub fn retries_exhausted(attempts: u32, last: &RabbitMQError) -> Self {
        RabbitMQError::ConnectionError(format!(
            "Failed to connect to RabbitMQ after {} attempts: {}",
            attempts, last
        ))
    }
}

impl From<Elapsed> for RabbitMQError {
    fn from(_: Elapsed) -> Self {
        RabbitMQError::TimeoutError("Connection attempt timed out".to_string())
    }
}
