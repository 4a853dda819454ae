use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::value_objects::currency;
use crate::domain::{Money, PaymentInfo, RefundResultCode};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Refund of a captured transaction, built from the payment's stored info blob
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefundRequest {
    /// Gateway transaction id
    pub transact: String,

    /// ISO 4217 numeric code
    pub currency: String,

    /// Composite order identifier the transaction was authorised with
    pub order_id: String,

    pub amount: Money,
}

impl RefundRequest {
    pub fn from_payment_info(info: &PaymentInfo, amount: Money) -> DomainResult<Self> {
        let field = |key: &str| -> DomainResult<String> {
            info.get(key)
                .and_then(Value::as_str)
                .map(String::from)
                .ok_or_else(|| {
                    DomainError::ValidationError(format!("Missing {} in payment info", key))
                })
        };

        // `currency` holds the alphabetic code once a callback was processed.
        let currency = match field("currency_code") {
            Ok(numeric) => numeric,
            Err(_) => {
                let raw = field("currency")?;
                if raw.chars().all(|c| c.is_ascii_digit()) {
                    raw
                } else {
                    currency::to_numeric(&raw)?
                }
            }
        };

        Ok(Self {
            transact: field("transact")?,
            currency,
            order_id: field("orderid")?,
            amount,
        })
    }
}

/// Coded response of the refund API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefundResult {
    pub status: Option<String>,

    /// Result code, -1 when the response carried none
    pub result: i32,

    pub message: Option<String>,

    /// Every field of the response body
    pub raw: BTreeMap<String, Vec<String>>,
}

impl RefundResult {
    /// Parse a `status=..&result=..&message=..` body. Anything unparseable
    /// yields result -1.
    pub fn parse(body: &str) -> Self {
        let mut raw: BTreeMap<String, Vec<String>> = BTreeMap::new();
        let pairs: Vec<(String, String)> =
            serde_urlencoded::from_str(body.trim()).unwrap_or_default();
        for (key, value) in pairs {
            if value.is_empty() {
                continue;
            }
            raw.entry(key).or_default().push(value);
        }

        let first = |key: &str| raw.get(key).and_then(|values| values.first()).cloned();
        let result = first("result")
            .and_then(|r| r.trim().parse::<i32>().ok())
            .unwrap_or(-1);

        Self {
            status: first("status"),
            result,
            message: first("message").map(|m| m.trim().to_string()),
            raw,
        }
    }

    /// A transport failure, recorded the same way as a rejected refund.
    pub fn transport_failure(message: String) -> Self {
        Self {
            status: None,
            result: -1,
            message: Some(message),
            raw: BTreeMap::new(),
        }
    }

    pub fn code(&self) -> RefundResultCode {
        RefundResultCode::from_code(self.result)
    }

    pub fn is_accepted(&self) -> bool {
        self.code().is_accepted()
    }

    pub fn to_info(&self) -> Value {
        serde_json::to_value(&self.raw).unwrap_or(Value::Null)
    }

    pub fn to_error(&self) -> DomainError {
        DomainError::GatewayError {
            status: self.status.clone(),
            result: self.result,
            message: self.message.clone(),
        }
    }
}

/// The gateway's administrative refund API
#[async_trait]
pub trait RefundGatewayPort: Send + Sync {
    /// Whether API credentials are configured
    fn refund_supported(&self) -> bool;

    /// One synchronous call, never retried.
    async fn refund(&self, request: RefundRequest) -> DomainResult<RefundResult>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn info(value: Value) -> PaymentInfo {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn test_parse_accepted() {
        let result = RefundResult::parse("status=OK&result=0&message=Accepted");
        assert_eq!(result.status.as_deref(), Some("OK"));
        assert_eq!(result.result, 0);
        assert_eq!(result.message.as_deref(), Some("Accepted"));
        assert!(result.is_accepted());
    }

    #[test]
    fn test_parse_rejected_keeps_message() {
        let result = RefundResult::parse("status=DECLINED&result=4&message=Rejected+by+acquirer%0A");
        assert!(!result.is_accepted());
        assert_eq!(result.code(), RefundResultCode::RejectedByAcquirer);
        assert_eq!(result.message.as_deref(), Some("Rejected by acquirer"));
        assert_eq!(
            result.to_error().to_string(),
            "Error refunding in DIBS (DECLINED; 4; Rejected by acquirer)"
        );
    }

    #[test]
    fn test_parse_garbage() {
        let result = RefundResult::parse("<html>Internal error</html>");
        assert_eq!(result.result, -1);
        assert!(!result.is_accepted());

        let result = RefundResult::parse("status=OK&result=abc");
        assert_eq!(result.result, -1);
    }

    #[test]
    fn test_request_from_processed_info() {
        let info = info(json!({
            "transact": "123456789",
            "currency": "DKK",
            "currency_code": "208",
            "orderid": "acme/summit/ABC12/0",
        }));
        let request = RefundRequest::from_payment_info(&info, Money::from_cents(500)).unwrap();
        assert_eq!(request.transact, "123456789");
        assert_eq!(request.currency, "208");
        assert_eq!(request.order_id, "acme/summit/ABC12/0");
    }

    #[test]
    fn test_request_converts_alpha_currency() {
        let info = info(json!({
            "transact": "1",
            "currency": "EUR",
            "orderid": "acme/summit/ABC12/0",
        }));
        let request = RefundRequest::from_payment_info(&info, Money::from_cents(1)).unwrap();
        assert_eq!(request.currency, "978");
    }

    #[test]
    fn test_request_requires_transaction() {
        let info = info(json!({"currency": "208", "orderid": "acme/summit/ABC12/0"}));
        assert!(RefundRequest::from_payment_info(&info, Money::from_cents(1)).is_err());
    }
}
