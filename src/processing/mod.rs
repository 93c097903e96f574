// src/processing/mod.rs
// Consumer loop and per-delivery handling

pub mod dispatcher;
pub mod handler;

pub use dispatcher::Dispatcher;
pub use handler::{Acknowledge, DeliveryOutcome, DeliveryProcessor, ProcessingError};
