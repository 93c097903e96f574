// src/rabbitmq/mod.rs
// Broker session: connection with retry, topology, subscription

pub mod channel_manager;
pub mod connection;
pub mod consumer;
pub mod errors;
pub mod retry;

// Re-export specific items to simplify imports elsewhere
pub use channel_manager::{ChannelConfig, Topology};
pub use connection::{shutdown, ActiveChannel, BrokerSession, ConnectionManager};
pub use consumer::subscribe;
pub use errors::{RabbitMQError, Result};
pub use retry::RetryPolicy;
