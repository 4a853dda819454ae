use crate::domain::errors::DomainResult;
use crate::domain::{CallbackReceived, CompositeOrderId, PaymentInfo, PaymentRecord, RefundFailed, RefundRecord};
use async_trait::async_trait;
use serde_json::Value;

/// Result of the host's confirm transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmOutcome {
    /// Payment moved to confirmed, order marked paid, mail sent
    Confirmed,
    /// Payment was already confirmed, nothing happened
    AlreadyConfirmed,
}

/// The order-management platform this integration plugs into.
///
/// The host owns every record. Implementations must serialize
/// `confirm_payment` per payment and make it idempotent; the integration
/// relies on that rather than locking on its own.
#[async_trait]
pub trait HostPort: Send + Sync {
    /// Resolve a payment by organizer, event, order code and sequence number.
    async fn find_payment(&self, order_id: &CompositeOrderId) -> DomainResult<Option<PaymentRecord>>;

    /// Append a callback entry to the order's activity log.
    async fn log_callback(&self, event: &CallbackReceived) -> DomainResult<()>;

    /// Overwrite the payment's info blob.
    async fn set_payment_info(&self, payment_id: i64, info: &PaymentInfo) -> DomainResult<()>;

    /// Confirm the payment and mark the order paid.
    ///
    /// Fails with `QuotaExceeded` or `ConfirmationMailFailed` when the host
    /// cannot complete the transition, and with `InvalidState` when the
    /// payment is no longer open.
    async fn confirm_payment(&self, payment_id: i64) -> DomainResult<ConfirmOutcome>;

    async fn find_refund(&self, refund_id: i64) -> DomainResult<Option<RefundRecord>>;

    /// Atomically move the refund from created to transit. Fails with
    /// `InvalidState` when it is not in created, including when another
    /// request claimed it first.
    async fn begin_refund(&self, refund_id: i64) -> DomainResult<()>;

    /// Move a claimed refund back to created. Only for calls that never
    /// reached the gateway.
    async fn release_refund(&self, refund_id: i64) -> DomainResult<()>;

    /// Mark the refund done and store the gateway response.
    async fn complete_refund(&self, refund_id: i64, info: &Value) -> DomainResult<()>;

    /// Mark the refund failed, store the gateway response and log why.
    async fn fail_refund(&self, refund_id: i64, info: &Value, event: &RefundFailed) -> DomainResult<()>;
}
