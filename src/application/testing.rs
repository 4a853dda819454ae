//! In-memory host and canned refund gateway used by the application and API
//! tests.

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::{
    CallbackReceived, CompositeOrderId, PaymentInfo, PaymentRecord, RefundFailed, RefundRecord,
};
use crate::ports::host_port::{ConfirmOutcome, HostPort};
use crate::ports::{RefundGatewayPort, RefundRequest, RefundResult};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Default)]
pub struct InMemoryHost {
    pub payments: Mutex<HashMap<i64, PaymentRecord>>,
    pub refunds: Mutex<HashMap<i64, RefundRecord>>,
    pub callback_log: Mutex<Vec<CallbackReceived>>,
    pub refund_log: Mutex<Vec<RefundFailed>>,
    /// Calls to `confirm_payment`
    pub confirm_calls: Mutex<u32>,
    /// Confirmation mails sent, one per real transition
    pub mails_sent: Mutex<u32>,
    /// Next confirm fails with `QuotaExceeded`
    pub quota_exhausted: Mutex<bool>,
}

impl InMemoryHost {
    pub fn with_payment(payment: PaymentRecord) -> Self {
        let host = Self::default();
        host.payments.lock().unwrap().insert(payment.id, payment);
        host
    }

    pub fn add_refund(&self, refund: RefundRecord) {
        self.refunds.lock().unwrap().insert(refund.id, refund);
    }

    pub fn payment(&self, id: i64) -> PaymentRecord {
        self.payments.lock().unwrap()[&id].clone()
    }

    pub fn refund(&self, id: i64) -> RefundRecord {
        self.refunds.lock().unwrap()[&id].clone()
    }

    fn with_refund(
        &self,
        refund_id: i64,
        transition: impl FnOnce(&mut RefundRecord) -> DomainResult<()>,
    ) -> DomainResult<()> {
        let mut refunds = self.refunds.lock().unwrap();
        let refund = refunds
            .get_mut(&refund_id)
            .ok_or_else(|| DomainError::OrderNotFound(refund_id.to_string()))?;
        transition(refund)
    }

    pub fn confirm_calls(&self) -> u32 {
        *self.confirm_calls.lock().unwrap()
    }

    pub fn mails_sent(&self) -> u32 {
        *self.mails_sent.lock().unwrap()
    }
}

#[async_trait]
impl HostPort for InMemoryHost {
    async fn find_payment(&self, order_id: &CompositeOrderId) -> DomainResult<Option<PaymentRecord>> {
        Ok(self
            .payments
            .lock()
            .unwrap()
            .values()
            .find(|p| p.order_id() == *order_id)
            .cloned())
    }

    async fn log_callback(&self, event: &CallbackReceived) -> DomainResult<()> {
        self.callback_log.lock().unwrap().push(event.clone());
        Ok(())
    }

    async fn set_payment_info(&self, payment_id: i64, info: &PaymentInfo) -> DomainResult<()> {
        let mut payments = self.payments.lock().unwrap();
        let payment = payments
            .get_mut(&payment_id)
            .ok_or_else(|| DomainError::OrderNotFound(payment_id.to_string()))?;
        payment.set_info(info.clone());
        Ok(())
    }

    async fn confirm_payment(&self, payment_id: i64) -> DomainResult<ConfirmOutcome> {
        *self.confirm_calls.lock().unwrap() += 1;

        if std::mem::take(&mut *self.quota_exhausted.lock().unwrap()) {
            return Err(DomainError::QuotaExceeded(
                "No tickets left in quota".to_string(),
            ));
        }

        let mut payments = self.payments.lock().unwrap();
        let payment = payments
            .get_mut(&payment_id)
            .ok_or_else(|| DomainError::OrderNotFound(payment_id.to_string()))?;

        if payment.mark_as_confirmed()? {
            *self.mails_sent.lock().unwrap() += 1;
            Ok(ConfirmOutcome::Confirmed)
        } else {
            Ok(ConfirmOutcome::AlreadyConfirmed)
        }
    }

    async fn find_refund(&self, refund_id: i64) -> DomainResult<Option<RefundRecord>> {
        Ok(self.refunds.lock().unwrap().get(&refund_id).cloned())
    }

    async fn begin_refund(&self, refund_id: i64) -> DomainResult<()> {
        self.with_refund(refund_id, RefundRecord::mark_as_transit)
    }

    async fn release_refund(&self, refund_id: i64) -> DomainResult<()> {
        self.with_refund(refund_id, RefundRecord::release)
    }

    async fn complete_refund(&self, refund_id: i64, info: &Value) -> DomainResult<()> {
        self.with_refund(refund_id, |refund| refund.mark_as_done(info.clone()))
    }

    async fn fail_refund(&self, refund_id: i64, info: &Value, event: &RefundFailed) -> DomainResult<()> {
        self.with_refund(refund_id, |refund| refund.mark_as_failed(info.clone()))?;
        self.refund_log.lock().unwrap().push(event.clone());
        Ok(())
    }
}

enum Reply {
    Body(&'static str),
    Unconfigured,
    Unreachable,
}

/// Gateway double answering every refund the same way
pub struct CannedGateway {
    reply: Reply,
    pub requests: Mutex<Vec<RefundRequest>>,
}

impl CannedGateway {
    fn new(reply: Reply) -> Self {
        Self {
            reply,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn replying(body: &'static str) -> Self {
        Self::new(Reply::Body(body))
    }

    /// No API credentials configured
    pub fn unconfigured() -> Self {
        Self::new(Reply::Unconfigured)
    }

    /// The request is sent but no answer comes back
    pub fn unreachable() -> Self {
        Self::new(Reply::Unreachable)
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl RefundGatewayPort for CannedGateway {
    fn refund_supported(&self) -> bool {
        !matches!(self.reply, Reply::Unconfigured)
    }

    async fn refund(&self, request: RefundRequest) -> DomainResult<RefundResult> {
        if let Reply::Unconfigured = self.reply {
            return Err(DomainError::ConfigurationError(
                "Missing DIBS api username and password".to_string(),
            ));
        }
        self.requests.lock().unwrap().push(request);
        match self.reply {
            Reply::Body(body) => Ok(RefundResult::parse(body)),
            _ => Err(DomainError::InternalError("connection reset by peer".to_string())),
        }
    }
}
