use crate::domain::{CardType, PaymentRecord, RefundState};
use crate::ports::RefundResult;
use serde::Serialize;

/// Operator view of a payment
#[derive(Debug, Serialize)]
pub struct PaymentStatusResponse {
    /// Composite order identifier
    pub order_id: String,

    pub state: String,

    /// Amount in major units
    pub amount: String,

    pub currency: String,

    /// Gateway transaction id
    pub transaction_id: Option<String>,

    /// Last status code reported by the gateway
    pub status_code: Option<i64>,

    pub card_type: Option<CardType>,

    /// Whether the operator can refund through the gateway
    pub refund_supported: bool,
}

impl PaymentStatusResponse {
    pub fn from_payment(payment: &PaymentRecord, refund_supported: bool) -> Self {
        Self {
            order_id: payment.order_id().encode(),
            state: payment.state.to_string(),
            amount: format!("{:.2}", payment.amount),
            currency: payment.currency.clone(),
            transaction_id: payment.transaction_id().map(String::from),
            status_code: payment.status_code(),
            card_type: payment.card_type(),
            refund_supported,
        }
    }
}

/// Result of an operator refund
#[derive(Debug, Serialize)]
pub struct RefundResponse {
    pub refund_id: i64,
    pub state: RefundState,
    pub result: i32,
    pub status: Option<String>,
    pub message: Option<String>,
}

impl RefundResponse {
    pub fn accepted(refund_id: i64, result: &RefundResult) -> Self {
        Self {
            refund_id,
            state: RefundState::Done,
            result: result.result,
            status: result.status.clone(),
            message: result.message.clone(),
        }
    }
}

/// Error body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(error: String, message: String) -> Self {
        Self { error, message }
    }
}
