use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Event published by the payment service when a payment is created.
///
/// Decoded once per delivery and never mutated afterwards.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentCreatedEvent {
    pub event: String,
    pub payment_id: String,
    pub account_id: String,
    pub amount: Decimal,
    pub currency: String,
    /// Epoch milliseconds.
    pub ts: i64,
}

impl PaymentCreatedEvent {
    /// Decodes a UTF-8 JSON message body.
    pub fn from_slice(body: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(body)
    }

    /// The event timestamp, if `ts` is within chrono's representable range.
    pub fn occurred_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.ts)
    }
}
