//! Payment notification consumer.
//!
//! Subscribes to `payment.created` events on the `notifications` topic
//! exchange, sends a notification per event, and settles each delivery with
//! an ack on success or a requeueing nack on failure.

pub mod env;
pub mod health;
pub mod message;
pub mod notifier;
pub mod processing;
pub mod rabbitmq;
pub mod telemetry;

pub use env::Config;
pub use message::PaymentCreatedEvent;
pub use notifier::{NotificationError, Notifier, SimulatedNotifier, TimeoutNotifier};
