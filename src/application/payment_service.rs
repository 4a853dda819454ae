use crate::application::callback_processor::{CallbackProcessor, PROVIDER_ID};
use crate::application::dto::PaymentStatusResponse;
use crate::application::session_builder::PaymentSessionBuilder;
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::signing::{constant_time_eq, order_secret_hash};
use crate::domain::{CompositeOrderId, Money, PaymentRecord, RefundFailed, RefundState};
use crate::infrastructure::config::DibsConfig;
use crate::ports::{
    CallbackOutcome, CallbackParams, EventContext, HostPort, PaymentProvider, PreparedRedirect,
    RefundGatewayPort, RefundRequest, RefundResult,
};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{error, info, warn};

/// DIBS as a payment provider of the host platform
pub struct DibsPaymentService<R: RefundGatewayPort, H: HostPort> {
    config: Arc<DibsConfig>,
    refund_gateway: Arc<R>,
    host: Arc<H>,
    session_builder: PaymentSessionBuilder,
    callback_processor: CallbackProcessor<H>,
}

impl<R: RefundGatewayPort, H: HostPort> DibsPaymentService<R, H> {
    pub fn new(config: Arc<DibsConfig>, refund_gateway: Arc<R>, host: Arc<H>) -> Self {
        Self {
            session_builder: PaymentSessionBuilder::new(config.clone()),
            callback_processor: CallbackProcessor::new(config.clone(), host.clone()),
            config,
            refund_gateway,
            host,
        }
    }

    pub fn admin_api_key(&self) -> &str {
        &self.config.admin_api_key
    }

    async fn dibs_payment(&self, order_id: &CompositeOrderId) -> DomainResult<PaymentRecord> {
        self.host
            .find_payment(order_id)
            .await?
            .filter(|p| p.provider == PROVIDER_ID)
            .ok_or_else(|| DomainError::OrderNotFound(order_id.encode()))
    }

    /// Operator view of one payment
    pub async fn query_payment(&self, order_id: &CompositeOrderId) -> DomainResult<PaymentStatusResponse> {
        let payment = self.dibs_payment(order_id).await?;
        Ok(PaymentStatusResponse::from_payment(
            &payment,
            self.refund_supported(),
        ))
    }

    /// Where to send the payer coming back from the gateway.
    ///
    /// The link carries a hash of the order secret instead of the secret.
    /// Unknown orders and hash mismatches fail the same way.
    pub async fn resolve_return(
        &self,
        context: &EventContext,
        order_code: &str,
        hash: &str,
        payment_seq: u32,
    ) -> DomainResult<String> {
        let order_id = CompositeOrderId::new(
            context.organizer.clone(),
            context.event.clone(),
            order_code,
            payment_seq,
        );
        let not_found = || DomainError::OrderNotFound(order_code.to_string());

        let payment = self.dibs_payment(&order_id).await.map_err(|_| not_found())?;
        if !constant_time_eq(&order_secret_hash(&payment.order_secret), &hash.to_lowercase()) {
            warn!(order_code = %order_code, "Return link hash mismatch");
            return Err(not_found());
        }

        let mut url = format!(
            "{}/{}/{}/order/{}/{}/",
            self.config.host_base_url,
            context.organizer,
            context.event,
            payment.order_code,
            payment.order_secret
        );
        if payment.is_confirmed() {
            url.push_str("?paid=yes");
        }
        Ok(url)
    }
}

#[async_trait]
impl<R: RefundGatewayPort, H: HostPort> PaymentProvider for DibsPaymentService<R, H> {
    fn identifier(&self) -> &'static str {
        PROVIDER_ID
    }

    async fn build_session(&self, order_id: &CompositeOrderId) -> DomainResult<PreparedRedirect> {
        info!("Building DIBS session for {}", order_id);
        let payment = self.dibs_payment(order_id).await?;
        if !payment.state_allows_payment() {
            return Err(DomainError::InvalidState {
                expected: "created or pending".to_string(),
                actual: payment.state.to_string(),
            });
        }
        self.session_builder.prepare(&payment)
    }

    async fn process_callback(
        &self,
        context: &EventContext,
        params: &CallbackParams,
    ) -> DomainResult<CallbackOutcome> {
        self.callback_processor.process(context, params).await
    }

    async fn refund(&self, refund_id: i64) -> DomainResult<RefundResult> {
        let refund = self
            .host
            .find_refund(refund_id)
            .await?
            .ok_or_else(|| DomainError::OrderNotFound(format!("refund {}", refund_id)))?;

        if refund.state != RefundState::Created {
            return Err(DomainError::InvalidState {
                expected: "created".to_string(),
                actual: refund.state.to_string(),
            });
        }
        if refund.payment.provider != PROVIDER_ID {
            return Err(DomainError::ValidationError(format!(
                "Refund {} does not belong to a DIBS payment",
                refund_id
            )));
        }
        let info = refund.payment.info.as_ref().ok_or_else(|| {
            DomainError::ValidationError(format!(
                "Payment of refund {} has no DIBS transaction",
                refund_id
            ))
        })?;
        let request = RefundRequest::from_payment_info(info, Money::from_decimal(refund.amount)?)?;

        // Loses to a concurrent request for the same refund with InvalidState.
        self.host.begin_refund(refund_id).await?;

        let result = match self.refund_gateway.refund(request).await {
            Ok(result) => result,
            Err(e @ DomainError::ConfigurationError(_)) => {
                self.host.release_refund(refund_id).await?;
                return Err(e);
            }
            Err(e) => {
                // DIBS may have executed it. Stays in transit until reconciled.
                error!(
                    refund_id,
                    "DIBS refund outcome unknown, check the transaction in DIBS: {}", e
                );
                return Err(e);
            }
        };

        if result.is_accepted() {
            self.host.complete_refund(refund_id, &result.to_info()).await?;
            info!(refund_id, "DIBS refund accepted");
            return Ok(result);
        }

        let err = result.to_error();
        warn!(
            refund_id,
            result = result.result,
            "{} ({})", err, result.code().description()
        );
        let event = RefundFailed::new(&refund, err.to_string());
        self.host.fail_refund(refund_id, &result.to_info(), &event).await?;
        Err(err)
    }

    fn refund_supported(&self) -> bool {
        self.refund_gateway.refund_supported()
    }
}
