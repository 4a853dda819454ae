use crate::domain::errors::DomainResult;
use crate::domain::{CompositeOrderId, PaymentSession, RedirectForm};
use crate::ports::refund_gateway_port::RefundResult;
use async_trait::async_trait;
use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;

/// Raw callback parameters, query string or form body
pub type CallbackParams = BTreeMap<String, String>;

/// Organizer and event the request was addressed to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventContext {
    pub organizer: String,
    pub event: String,
}

impl EventContext {
    pub fn new(organizer: impl Into<String>, event: impl Into<String>) -> Self {
        Self {
            organizer: organizer.into(),
            event: event.into(),
        }
    }
}

/// Why a callback was dropped without touching the payment
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
pub enum RejectReason {
    #[error("missing parameter {0}")]
    MissingParameter(&'static str),
    #[error("malformed order id")]
    MalformedOrderId,
    #[error("no such payment")]
    UnknownPayment,
    #[error("payment belongs to provider {0}")]
    ProviderMismatch(String),
    #[error("payment belongs to another event")]
    EventMismatch,
    #[error("malformed status code {0}")]
    MalformedStatusCode(String),
    #[error("unknown currency {0}")]
    UnknownCurrency(String),
    #[error("status code {0} does not confirm a payment")]
    NonActionableStatus(i32),
    #[error("authkey mismatch")]
    SignatureMismatch,
}

/// Terminal state of callback processing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum CallbackOutcome {
    /// The payment was confirmed, or already had been
    Applied { newly_confirmed: bool },
    Rejected(RejectReason),
}

/// Session plus the form that carries it to the gateway
#[derive(Debug, Clone, Serialize)]
pub struct PreparedRedirect {
    pub session: PaymentSession,
    pub form: RedirectForm,
}

/// A payment backend the host can route payments through
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    fn identifier(&self) -> &'static str;

    /// Prepare the redirect to the hosted payment page.
    async fn build_session(&self, order_id: &CompositeOrderId) -> DomainResult<PreparedRedirect>;

    /// Handle a gateway notification. Validation failures come back as
    /// `CallbackOutcome::Rejected`, only configuration and downstream errors
    /// are returned as `Err`.
    async fn process_callback(
        &self,
        context: &EventContext,
        params: &CallbackParams,
    ) -> DomainResult<CallbackOutcome>;

    async fn refund(&self, refund_id: i64) -> DomainResult<RefundResult>;

    fn refund_supported(&self) -> bool;

    fn partial_refund_supported(&self) -> bool {
        self.refund_supported()
    }
}
