use crate::domain::errors::{DomainError, DomainResult};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// Order codes are alphanumeric and slugs never contain `/`.
static ORDER_ID_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<organizer>.+)/(?P<event>.+)/(?P<code>.+)/(?P<payment>[0-9]+)$")
        .expect("order id pattern is valid")
});

/// The `orderid` sent to the gateway and echoed back in callbacks.
///
/// Order codes are only unique within an event, so the identifier carries the
/// organizer and event slugs alongside the order code and the payment's
/// sequence number within the order:
/// `organizer-slug/event-slug/order-code/payment-sequence`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CompositeOrderId {
    pub organizer: String,
    pub event: String,
    pub order_code: String,
    pub payment_seq: u32,
}

impl CompositeOrderId {
    pub fn new(
        organizer: impl Into<String>,
        event: impl Into<String>,
        order_code: impl Into<String>,
        payment_seq: u32,
    ) -> Self {
        Self {
            organizer: organizer.into(),
            event: event.into(),
            order_code: order_code.into(),
            payment_seq,
        }
    }

    pub fn encode(&self) -> String {
        format!(
            "{}/{}/{}/{}",
            self.organizer, self.event, self.order_code, self.payment_seq
        )
    }

    pub fn decode(order_id: &str) -> DomainResult<Self> {
        let captures = ORDER_ID_PATTERN.captures(order_id).ok_or_else(|| {
            DomainError::OrderNotFound(format!("Malformed order id: {}", order_id))
        })?;

        let payment_seq = captures["payment"].parse::<u32>().map_err(|_| {
            DomainError::OrderNotFound(format!("Invalid payment sequence in order id: {}", order_id))
        })?;

        Ok(Self {
            organizer: captures["organizer"].to_string(),
            event: captures["event"].to_string(),
            order_code: captures["code"].to_string(),
            payment_seq,
        })
    }
}

impl fmt::Display for CompositeOrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

impl FromStr for CompositeOrderId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::decode(s)
    }
}
