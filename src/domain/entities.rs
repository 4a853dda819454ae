use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::order_identifier::CompositeOrderId;
use crate::domain::value_objects::{
    currency, CardType, Decorator, Money, PaymentState, RefundState,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Normalised callback payload stored on the payment
pub type PaymentInfo = Map<String, Value>;

/// Host-owned payment record. The integration may only overwrite `info` and
/// ask the host to confirm it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentRecord {
    /// Host primary key
    pub id: i64,

    pub organizer: String,

    pub event: String,

    pub order_code: String,

    /// Capability token granting access to the order page
    #[serde(skip_serializing)]
    pub order_secret: String,

    /// Sequence number of the payment within its order
    pub local_id: u32,

    /// Identifier of the payment provider that created the payment
    pub provider: String,

    /// Amount in major units
    pub amount: Decimal,

    /// ISO 4217 alphabetic code of the event currency
    pub currency: String,

    pub state: PaymentState,

    /// Last validated callback payload
    pub info: Option<PaymentInfo>,

    pub created_at: DateTime<Utc>,

    pub payment_date: Option<DateTime<Utc>>,
}

impl PaymentRecord {
    pub fn order_id(&self) -> CompositeOrderId {
        CompositeOrderId::new(
            self.organizer.clone(),
            self.event.clone(),
            self.order_code.clone(),
            self.local_id,
        )
    }

    pub fn money(&self) -> DomainResult<Money> {
        Money::from_decimal(self.amount)
    }

    pub fn currency_numeric(&self) -> DomainResult<String> {
        currency::to_numeric(&self.currency)
    }

    pub fn belongs_to(&self, organizer: &str, event: &str) -> bool {
        self.organizer == organizer && self.event == event
    }

    pub fn set_info(&mut self, info: PaymentInfo) {
        self.info = Some(info);
    }

    /// Host-side confirm transition. Returns `false` when the payment was
    /// already confirmed.
    pub fn mark_as_confirmed(&mut self) -> DomainResult<bool> {
        match self.state {
            PaymentState::Confirmed => Ok(false),
            PaymentState::Created | PaymentState::Pending => {
                self.state = PaymentState::Confirmed;
                self.payment_date = Some(Utc::now());
                Ok(true)
            }
            other => Err(DomainError::InvalidState {
                expected: "created or pending".to_string(),
                actual: other.to_string(),
            }),
        }
    }

    pub fn is_confirmed(&self) -> bool {
        self.state == PaymentState::Confirmed
    }

    /// Whether the payer may still be sent to the payment window
    pub fn state_allows_payment(&self) -> bool {
        matches!(self.state, PaymentState::Created | PaymentState::Pending)
    }

    pub fn transaction_id(&self) -> Option<&str> {
        self.info_str("transact")
    }

    pub fn status_code(&self) -> Option<i64> {
        self.info.as_ref()?.get("statuscode")?.as_i64()
    }

    pub fn card_type(&self) -> Option<CardType> {
        self.info_str("paytype").and_then(CardType::from_paytype)
    }

    fn info_str(&self, key: &str) -> Option<&str> {
        self.info.as_ref()?.get(key)?.as_str()
    }
}

/// Host-owned refund record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefundRecord {
    pub id: i64,

    /// The payment being refunded
    pub payment: PaymentRecord,

    pub local_id: u32,

    /// Amount to refund in major units
    pub amount: Decimal,

    pub state: RefundState,

    /// Parsed gateway response
    pub info: Option<Value>,

    pub execution_date: Option<DateTime<Utc>>,
}

impl RefundRecord {
    /// Claim the refund before the gateway is called. Only a fresh refund can
    /// be claimed.
    pub fn mark_as_transit(&mut self) -> DomainResult<()> {
        if self.state != RefundState::Created {
            return Err(DomainError::InvalidState {
                expected: "created".to_string(),
                actual: self.state.to_string(),
            });
        }
        self.state = RefundState::Transit;
        Ok(())
    }

    /// Undo a claim when the gateway was never called.
    pub fn release(&mut self) -> DomainResult<()> {
        if self.state != RefundState::Transit {
            return Err(DomainError::InvalidState {
                expected: "transit".to_string(),
                actual: self.state.to_string(),
            });
        }
        self.state = RefundState::Created;
        Ok(())
    }

    pub fn mark_as_done(&mut self, info: Value) -> DomainResult<()> {
        self.ensure_open()?;
        self.state = RefundState::Done;
        self.info = Some(info);
        self.execution_date = Some(Utc::now());
        Ok(())
    }

    pub fn mark_as_failed(&mut self, info: Value) -> DomainResult<()> {
        self.ensure_open()?;
        self.state = RefundState::Failed;
        self.info = Some(info);
        self.execution_date = Some(Utc::now());
        Ok(())
    }

    fn ensure_open(&self) -> DomainResult<()> {
        match self.state {
            RefundState::Created | RefundState::Transit => Ok(()),
            other => Err(DomainError::InvalidState {
                expected: "created or transit".to_string(),
                actual: other.to_string(),
            }),
        }
    }
}

/// Parameters needed to send the payer to the hosted payment page. Lives in
/// the payer's session between redirect and return, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentSession {
    /// Composite order identifier
    pub order_id: String,

    pub order_code: String,

    #[serde(skip_serializing)]
    pub order_secret: String,

    /// Payment sequence number within the order
    pub payment_id: u32,

    /// Amount in minor units
    pub amount: i64,

    /// ISO 4217 numeric code
    pub currency: String,

    pub merchant_id: String,

    pub test_mode: bool,

    pub capture_now: bool,

    /// Absent when MD5 control is disabled
    pub md5key: Option<String>,

    pub decorator: Decorator,
}

/// Auto-submitting form the payer's browser posts to the gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedirectForm {
    /// Gateway payment window URL
    pub action: String,

    /// Form fields in submission order
    pub fields: Vec<(String, String)>,
}

impl RedirectForm {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}
