use crate::domain::entities::{PaymentInfo, PaymentRecord, RefundRecord};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Domain event trait
pub trait DomainEvent {
    fn event_type(&self) -> &'static str;
    fn occurred_at(&self) -> DateTime<Utc>;
}

/// A gateway callback that resolved to one of our payments, recorded on the
/// order's log whether or not it confirms the payment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallbackReceived {
    pub event_id: Uuid,
    pub occurred_at: DateTime<Utc>,
    pub payment_id: i64,
    pub order_code: String,
    pub status_code: i32,
    pub data: PaymentInfo,
}

impl DomainEvent for CallbackReceived {
    fn event_type(&self) -> &'static str {
        "pretix_paymentdibs.callback"
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }
}

impl CallbackReceived {
    pub fn new(payment: &PaymentRecord, status_code: i32, data: PaymentInfo) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            occurred_at: Utc::now(),
            payment_id: payment.id,
            order_code: payment.order_code.clone(),
            status_code,
            data,
        }
    }

    /// Line shown in the order's activity log
    pub fn display(&self) -> String {
        format!("DIBS reported a status code: {}", self.status_code)
    }
}

/// Refund rejected by the gateway
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefundFailed {
    pub event_id: Uuid,
    pub occurred_at: DateTime<Utc>,
    pub refund_id: i64,
    pub order_code: String,
    pub reason: String,
}

impl DomainEvent for RefundFailed {
    fn event_type(&self) -> &'static str {
        "pretix_paymentdibs.refund_failed"
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }
}

impl RefundFailed {
    pub fn new(refund: &RefundRecord, reason: String) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            occurred_at: Utc::now(),
            refund_id: refund.id,
            order_code: refund.payment.order_code.clone(),
            reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::fixtures;
    use crate::domain::value_objects::PaymentState;

    #[test]
    fn test_callback_received_display() {
        let payment = fixtures::payment(PaymentState::Pending);
        let event = CallbackReceived::new(&payment, 2, PaymentInfo::new());
        assert_eq!(event.event_type(), "pretix_paymentdibs.callback");
        assert_eq!(event.display(), "DIBS reported a status code: 2");
        assert_eq!(event.payment_id, 42);
    }
}
