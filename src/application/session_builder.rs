use crate::domain::errors::DomainResult;
use crate::domain::signing::{canonical, order_secret_hash};
use crate::domain::{KeyedHashSigner, PaymentRecord, PaymentSession, RedirectForm};
use crate::infrastructure::config::DibsConfig;
use crate::ports::PreparedRedirect;
use std::sync::Arc;

/// Builds the parameters that send the payer to the hosted payment page.
pub struct PaymentSessionBuilder {
    config: Arc<DibsConfig>,
    signer: KeyedHashSigner,
}

impl PaymentSessionBuilder {
    pub fn new(config: Arc<DibsConfig>) -> Self {
        let signer = config.signer();
        Self { config, signer }
    }

    pub fn build(&self, payment: &PaymentRecord) -> DomainResult<PaymentSession> {
        let merchant_id = self.config.require_merchant_id()?;
        let order_id = payment.order_id().encode();
        let amount = payment.money()?;
        let currency = payment.currency_numeric()?;

        let md5key = self.signer.sign(&canonical::session(
            merchant_id,
            &order_id,
            &currency,
            &amount.to_gateway_string(),
        ));

        Ok(PaymentSession {
            order_id,
            order_code: payment.order_code.clone(),
            order_secret: payment.order_secret.clone(),
            payment_id: payment.local_id,
            amount: amount.to_cents(),
            currency,
            merchant_id: merchant_id.to_string(),
            test_mode: self.config.test_mode,
            capture_now: self.config.capture_now,
            md5key,
            decorator: self.config.decorator,
        })
    }

    pub fn prepare(&self, payment: &PaymentRecord) -> DomainResult<PreparedRedirect> {
        let session = self.build(payment)?;
        let form = self.redirect_form(&session, payment);
        Ok(PreparedRedirect { session, form })
    }

    fn redirect_form(&self, session: &PaymentSession, payment: &PaymentRecord) -> RedirectForm {
        let event_base = format!(
            "{}/dibs/{}/{}",
            self.config.public_base_url, payment.organizer, payment.event
        );
        let return_url = |action: &str| {
            format!(
                "{}/return/{}/{}/{}/{}",
                event_base,
                session.order_code,
                order_secret_hash(&session.order_secret),
                session.payment_id,
                action
            )
        };

        let mut fields = vec![
            ("merchant".to_string(), session.merchant_id.clone()),
            ("orderid".to_string(), session.order_id.clone()),
            ("amount".to_string(), session.amount.to_string()),
            ("currency".to_string(), session.currency.clone()),
        ];
        if let Some(md5key) = &session.md5key {
            fields.push(("md5key".to_string(), md5key.clone()));
        }
        if session.capture_now {
            fields.push(("capturenow".to_string(), "1".to_string()));
        }
        fields.push(("decorator".to_string(), session.decorator.as_str().to_string()));
        if session.test_mode {
            fields.push(("test".to_string(), "1".to_string()));
        }
        fields.push((
            "callbackurl".to_string(),
            format!("{}/webhook/{}", event_base, session.payment_id),
        ));
        fields.push(("accepturl".to_string(), return_url("success")));
        fields.push(("cancelurl".to_string(), return_url("cancel")));

        RedirectForm {
            action: self.config.payment_url.clone(),
            fields,
        }
    }
}
