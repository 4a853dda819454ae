use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::signing::canonical;
use crate::domain::value_objects::currency;
use crate::domain::{CallbackReceived, CompositeOrderId, DibsStatus, KeyedHashSigner, PaymentInfo};
use crate::infrastructure::config::DibsConfig;
use crate::ports::{
    CallbackOutcome, CallbackParams, ConfirmOutcome, EventContext, HostPort, RejectReason,
};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Identifier under which the host stores payments made through DIBS
pub const PROVIDER_ID: &str = "dibs";

/// Authenticates gateway callbacks and confirms the payment they report.
///
/// A callback goes Received -> Authenticated -> Resolved -> Applied, or stops
/// at Rejected without touching the payment. Rejections are regular outcomes;
/// only host failures come back as errors.
pub struct CallbackProcessor<H: HostPort> {
    signer: KeyedHashSigner,
    host: Arc<H>,
}

impl<H: HostPort> CallbackProcessor<H> {
    pub fn new(config: Arc<DibsConfig>, host: Arc<H>) -> Self {
        Self {
            signer: config.signer(),
            host,
        }
    }

    pub async fn process(
        &self,
        context: &EventContext,
        params: &CallbackParams,
    ) -> DomainResult<CallbackOutcome> {
        let Some(raw_order_id) = params.get("orderid") else {
            return Ok(reject(None, RejectReason::MissingParameter("orderid")));
        };

        // Authenticated: the order id must resolve to one of our payments in
        // the event the callback was addressed to.
        let Ok(order_id) = CompositeOrderId::decode(raw_order_id) else {
            return Ok(reject(Some(raw_order_id), RejectReason::MalformedOrderId));
        };
        let Some(payment) = self.host.find_payment(&order_id).await? else {
            return Ok(reject(Some(raw_order_id), RejectReason::UnknownPayment));
        };
        if payment.provider != PROVIDER_ID {
            return Ok(reject(
                Some(raw_order_id),
                RejectReason::ProviderMismatch(payment.provider.clone()),
            ));
        }
        if !payment.belongs_to(&context.organizer, &context.event) {
            return Ok(reject(Some(raw_order_id), RejectReason::EventMismatch));
        }

        // Resolved
        let Some(raw_status) = params.get("statuscode") else {
            return Ok(reject(Some(raw_order_id), RejectReason::MissingParameter("statuscode")));
        };
        let Ok(status_code) = raw_status.trim().parse::<i32>() else {
            return Ok(reject(
                Some(raw_order_id),
                RejectReason::MalformedStatusCode(raw_status.clone()),
            ));
        };
        let raw_currency = params.get("currency").map(String::as_str).unwrap_or_default();
        let Ok(alpha3) = currency::to_alpha3(raw_currency) else {
            return Ok(reject(
                Some(raw_order_id),
                RejectReason::UnknownCurrency(raw_currency.to_string()),
            ));
        };

        let info = normalize_info(params, alpha3, status_code);
        let event = CallbackReceived::new(&payment, status_code, info.clone());
        debug!(order_id = %raw_order_id, "{}", event.display());
        self.host.log_callback(&event).await?;

        if !DibsStatus::from_code(status_code).is_some_and(|s| s.confirms_payment()) {
            return Ok(reject(
                Some(raw_order_id),
                RejectReason::NonActionableStatus(status_code),
            ));
        }

        // Applied: the authkey covers the amount and currency we asked for,
        // never the ones the callback claims.
        let Some(transact) = params.get("transact") else {
            return Ok(reject(Some(raw_order_id), RejectReason::MissingParameter("transact")));
        };
        let authkey = params.get("authkey").map(String::as_str).unwrap_or_default();
        let amount = payment.money()?;
        let currency_numeric = payment.currency_numeric()?;
        let parameters =
            canonical::callback(transact, &amount.to_gateway_string(), &currency_numeric);
        if !self.signer.verify(&parameters, authkey) {
            return Ok(reject(Some(raw_order_id), RejectReason::SignatureMismatch));
        }

        if !is_redelivery(&payment.info, transact, status_code) {
            self.host.set_payment_info(payment.id, &info).await?;
        }

        // DIBS holds the funds from here on. Every confirm failure is downstream.
        let outcome = self.host.confirm_payment(payment.id).await.map_err(|e| {
            error!(
                order_id = %raw_order_id,
                transact = %transact,
                "DIBS captured funds but the payment could not be confirmed: {}", e
            );
            if e.is_downstream() {
                e
            } else {
                DomainError::ConfirmationFailed(e.to_string())
            }
        })?;

        match outcome {
            ConfirmOutcome::Confirmed => {
                info!(order_id = %raw_order_id, transact = %transact, "Payment confirmed via DIBS callback");
            }
            ConfirmOutcome::AlreadyConfirmed => {
                debug!(order_id = %raw_order_id, transact = %transact, "Payment already confirmed");
            }
        }

        Ok(CallbackOutcome::Applied {
            newly_confirmed: outcome == ConfirmOutcome::Confirmed,
        })
    }
}

fn reject(order_id: Option<&str>, reason: RejectReason) -> CallbackOutcome {
    warn!(order_id = order_id.unwrap_or("-"), "Rejected DIBS callback: {}", reason);
    CallbackOutcome::Rejected(reason)
}

/// The raw parameters plus `currency_code` (numeric, as received),
/// `currency` (alphabetic) and `statuscode` as an integer.
fn normalize_info(params: &CallbackParams, alpha3: &str, status_code: i32) -> PaymentInfo {
    let mut info: PaymentInfo = params
        .iter()
        .map(|(k, v)| (k.clone(), Value::String(v.clone())))
        .collect();
    if let Some(numeric) = info.remove("currency") {
        info.insert("currency_code".to_string(), numeric);
    }
    info.insert("currency".to_string(), Value::String(alpha3.to_string()));
    info.insert("statuscode".to_string(), Value::from(status_code));
    info
}

fn is_redelivery(stored: &Option<PaymentInfo>, transact: &str, status_code: i32) -> bool {
    stored.as_ref().is_some_and(|info| {
        info.get("transact").and_then(Value::as_str) == Some(transact)
            && info.get("statuscode").and_then(Value::as_i64) == Some(i64::from(status_code))
    })
}
