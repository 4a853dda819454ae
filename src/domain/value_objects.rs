use crate::domain::errors::{DomainError, DomainResult};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle of a host payment record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentState {
    /// Created, payer not yet redirected
    Created,
    /// Payer sent to the gateway
    Pending,
    /// Paid
    Confirmed,
    /// Failed
    Failed,
    /// Canceled
    Canceled,
    /// Refunded
    Refunded,
}

impl fmt::Display for PaymentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaymentState::Created => write!(f, "created"),
            PaymentState::Pending => write!(f, "pending"),
            PaymentState::Confirmed => write!(f, "confirmed"),
            PaymentState::Failed => write!(f, "failed"),
            PaymentState::Canceled => write!(f, "canceled"),
            PaymentState::Refunded => write!(f, "refunded"),
        }
    }
}

impl FromStr for PaymentState {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created" => Ok(PaymentState::Created),
            "pending" => Ok(PaymentState::Pending),
            "confirmed" => Ok(PaymentState::Confirmed),
            "failed" => Ok(PaymentState::Failed),
            "canceled" => Ok(PaymentState::Canceled),
            "refunded" => Ok(PaymentState::Refunded),
            other => Err(DomainError::InternalError(format!(
                "Invalid payment state: {}",
                other
            ))),
        }
    }
}

/// Lifecycle of a host refund record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefundState {
    Created,
    Transit,
    Done,
    Failed,
    Canceled,
}

impl fmt::Display for RefundState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RefundState::Created => write!(f, "created"),
            RefundState::Transit => write!(f, "transit"),
            RefundState::Done => write!(f, "done"),
            RefundState::Failed => write!(f, "failed"),
            RefundState::Canceled => write!(f, "canceled"),
        }
    }
}

impl FromStr for RefundState {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created" => Ok(RefundState::Created),
            "transit" => Ok(RefundState::Transit),
            "done" => Ok(RefundState::Done),
            "failed" => Ok(RefundState::Failed),
            "canceled" => Ok(RefundState::Canceled),
            other => Err(DomainError::InternalError(format!(
                "Invalid refund state: {}",
                other
            ))),
        }
    }
}

/// Amount in minor units (two decimals are assumed for every currency)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    /// Amount in minor units
    pub amount_cents: i64,
}

impl Money {
    /// Converts a decimal amount by multiplying by 100 and truncating toward zero.
    pub fn from_decimal(amount: Decimal) -> DomainResult<Self> {
        let cents = amount
            .checked_mul(Decimal::ONE_HUNDRED)
            .and_then(|minor| minor.trunc().to_i64())
            .ok_or_else(|| DomainError::InvalidAmount(amount.to_string()))?;
        Ok(Self {
            amount_cents: cents,
        })
    }

    pub fn from_cents(cents: i64) -> Self {
        Self { amount_cents: cents }
    }

    pub fn to_cents(&self) -> i64 {
        self.amount_cents
    }

    /// Major-unit value, used for display
    pub fn to_decimal(&self) -> Decimal {
        Decimal::new(self.amount_cents, 2)
    }

    /// The wire form the gateway expects: an integer in minor units.
    pub fn to_gateway_string(&self) -> String {
        self.amount_cents.to_string()
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.to_decimal())
    }
}

/// Conversions between ISO 4217 alphabetic codes and the numeric codes the
/// gateway uses on the wire.
pub mod currency {
    use crate::domain::errors::{DomainError, DomainResult};
    use iso_currency::Currency;

    /// `DKK` -> `208`. Codes below 100 keep their leading zeros (`ALL` -> `008`).
    pub fn to_numeric(alpha3: &str) -> DomainResult<String> {
        let currency = Currency::from_code(&alpha3.trim().to_ascii_uppercase())
            .ok_or_else(|| {
                DomainError::ValidationError(format!("Unknown currency code: {}", alpha3))
            })?;
        Ok(format!("{:03}", currency.numeric()))
    }

    /// `208` -> `DKK`
    pub fn to_alpha3(numeric: &str) -> DomainResult<&'static str> {
        let code: u16 = numeric.trim().parse().map_err(|_| {
            DomainError::ValidationError(format!("Invalid numeric currency code: {}", numeric))
        })?;
        Currency::from_numeric(code)
            .map(|c| c.code())
            .ok_or_else(|| {
                DomainError::ValidationError(format!("Unknown numeric currency code: {}", numeric))
            })
    }
}

/// Transaction status codes reported in gateway callbacks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DibsStatus {
    TransactionInserted,
    Declined,
    AuthorizationApproved,
    CaptureSentToAcquirer,
    CaptureDeclinedByAcquirer,
    CaptureCompleted,
    AuthorizationDeleted,
    CaptureBalanced,
    PartiallyRefundedAndBalanced,
    RefundSentToAcquirer,
    RefundDeclined,
    RefundCompleted,
    CapturePending,
    TicketTransaction,
    DeletedTicketTransaction,
    RefundPending,
    WaitingForShopApproval,
    DeclinedByDibs,
    MulticapTransactionOpen,
    MulticapTransactionClosed,
    Postponed,
}

impl DibsStatus {
    pub fn from_code(code: i32) -> Option<Self> {
        let status = match code {
            0 => DibsStatus::TransactionInserted,
            1 => DibsStatus::Declined,
            2 => DibsStatus::AuthorizationApproved,
            3 => DibsStatus::CaptureSentToAcquirer,
            4 => DibsStatus::CaptureDeclinedByAcquirer,
            5 => DibsStatus::CaptureCompleted,
            6 => DibsStatus::AuthorizationDeleted,
            7 => DibsStatus::CaptureBalanced,
            8 => DibsStatus::PartiallyRefundedAndBalanced,
            9 => DibsStatus::RefundSentToAcquirer,
            10 => DibsStatus::RefundDeclined,
            11 => DibsStatus::RefundCompleted,
            12 => DibsStatus::CapturePending,
            13 => DibsStatus::TicketTransaction,
            14 => DibsStatus::DeletedTicketTransaction,
            15 => DibsStatus::RefundPending,
            16 => DibsStatus::WaitingForShopApproval,
            17 => DibsStatus::DeclinedByDibs,
            18 => DibsStatus::MulticapTransactionOpen,
            19 => DibsStatus::MulticapTransactionClosed,
            26 => DibsStatus::Postponed,
            _ => return None,
        };
        Some(status)
    }

    /// Only an approved authorization or a completed capture confirms a payment.
    pub fn confirms_payment(&self) -> bool {
        matches!(
            self,
            DibsStatus::AuthorizationApproved | DibsStatus::CaptureCompleted
        )
    }
}

/// Result codes returned by the refund API
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefundResultCode {
    Accepted,
    NoResponseFromAcquirer,
    Timeout,
    CreditCardExpired,
    RejectedByAcquirer,
    AuthorisationOlderThan7Days,
    TransactionStatusDoesNotAllowFunction,
    AmountTooHigh,
    ErrorInParameters,
    OrderIdDoesNotMatchAuthorisation,
    ReAuthorisationRejected,
    NotAbleToCommunicateWithAcquirer,
    ConfirmRequestError,
    CaptureAlreadyPendingForBatch,
    BlockedByDibs,
    /// Missing from the response or not a documented code
    Unknown(i32),
}

impl RefundResultCode {
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => RefundResultCode::Accepted,
            1 => RefundResultCode::NoResponseFromAcquirer,
            2 => RefundResultCode::Timeout,
            3 => RefundResultCode::CreditCardExpired,
            4 => RefundResultCode::RejectedByAcquirer,
            5 => RefundResultCode::AuthorisationOlderThan7Days,
            6 => RefundResultCode::TransactionStatusDoesNotAllowFunction,
            7 => RefundResultCode::AmountTooHigh,
            8 => RefundResultCode::ErrorInParameters,
            9 => RefundResultCode::OrderIdDoesNotMatchAuthorisation,
            10 => RefundResultCode::ReAuthorisationRejected,
            11 => RefundResultCode::NotAbleToCommunicateWithAcquirer,
            12 => RefundResultCode::ConfirmRequestError,
            14 => RefundResultCode::CaptureAlreadyPendingForBatch,
            15 => RefundResultCode::BlockedByDibs,
            other => RefundResultCode::Unknown(other),
        }
    }

    pub fn is_accepted(&self) -> bool {
        *self == RefundResultCode::Accepted
    }

    pub fn description(&self) -> &'static str {
        match self {
            RefundResultCode::Accepted => "Accepted",
            RefundResultCode::NoResponseFromAcquirer => "No response from acquirer",
            RefundResultCode::Timeout => "Timeout",
            RefundResultCode::CreditCardExpired => "Credit card expired",
            RefundResultCode::RejectedByAcquirer => "Rejected by acquirer",
            RefundResultCode::AuthorisationOlderThan7Days => "Authorisation older than 7 days",
            RefundResultCode::TransactionStatusDoesNotAllowFunction => {
                "Transaction status on the DIBS server does not allow function"
            }
            RefundResultCode::AmountTooHigh => "Amount too high",
            RefundResultCode::ErrorInParameters => {
                "Error in the parameters sent to the DIBS server"
            }
            RefundResultCode::OrderIdDoesNotMatchAuthorisation => {
                "Order number (orderid) does not correspond to the authorisation order number"
            }
            RefundResultCode::ReAuthorisationRejected => {
                "Re-authorisation of the transaction was rejected"
            }
            RefundResultCode::NotAbleToCommunicateWithAcquirer => {
                "Not able to communicate with the acquirer"
            }
            RefundResultCode::ConfirmRequestError => "Confirm request error",
            RefundResultCode::CaptureAlreadyPendingForBatch => {
                "Capture is called for a transaction which is pending for batch"
            }
            RefundResultCode::BlockedByDibs => "Capture or refund was blocked by DIBS",
            RefundResultCode::Unknown(_) => "Unknown result",
        }
    }
}

/// Card category derived from the gateway's `paytype`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardType {
    Credit,
    Debit,
}

const CREDIT_PAYTYPES: &[&str] = &[
    "ELEC", "MC", "MC(DK)", "MC(SE)", "MC(YX)", "VISA", "VISA(DK)", "VISA(SE)",
];

const DEBIT_PAYTYPES: &[&str] = &["DK", "V-DK"];

impl CardType {
    pub fn from_paytype(paytype: &str) -> Option<Self> {
        if CREDIT_PAYTYPES.contains(&paytype) {
            Some(CardType::Credit)
        } else if DEBIT_PAYTYPES.contains(&paytype) {
            Some(CardType::Debit)
        } else {
            None
        }
    }
}

/// Look of the hosted payment window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decorator {
    #[default]
    Default,
    Basal,
    Rich,
    Responsive,
}

impl Decorator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Decorator::Default => "default",
            Decorator::Basal => "basal",
            Decorator::Rich => "rich",
            Decorator::Responsive => "responsive",
        }
    }
}

impl FromStr for Decorator {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "default" => Ok(Decorator::Default),
            "basal" => Ok(Decorator::Basal),
            "rich" => Ok(Decorator::Rich),
            "responsive" => Ok(Decorator::Responsive),
            other => Err(DomainError::ConfigurationError(format!(
                "Unknown decorator: {}",
                other
            ))),
        }
    }
}
