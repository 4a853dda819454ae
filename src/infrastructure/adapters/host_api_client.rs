use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::PaymentRecord;
use crate::infrastructure::config::dibs_config::DibsConfig;
use reqwest::header::AUTHORIZATION;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

const INVALID_STATE_DETAIL: &str = "Invalid state of payment";

/// Answer of the host's payment confirm endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostConfirmation {
    Confirmed,
    /// The payment is not created or pending
    NotOpen,
    /// The host refused the transition, typically because a quota is sold out
    Refused(String),
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: Option<String>,
}

/// Client for the host's REST API. Confirming through it runs the host's
/// mark-paid logic: quota check, order status and confirmation mail.
#[derive(Clone)]
pub struct HostApiClient {
    base_url: String,
    token: String,
    client: Client,
}

impl HostApiClient {
    pub fn new(config: &DibsConfig) -> DomainResult<Self> {
        let client = Client::builder().timeout(config.http_timeout).build()?;
        Ok(Self {
            base_url: config.host_api_url.clone(),
            token: config.host_api_token.clone(),
            client,
        })
    }

    fn confirm_url(&self, payment: &PaymentRecord) -> String {
        format!(
            "{}/organizers/{}/events/{}/orders/{}/payments/{}/confirm/",
            self.base_url, payment.organizer, payment.event, payment.order_code, payment.local_id
        )
    }

    pub async fn confirm_payment(&self, payment: &PaymentRecord) -> DomainResult<HostConfirmation> {
        let response = self
            .client
            .post(self.confirm_url(payment))
            .header(AUTHORIZATION, format!("Token {}", self.token))
            .json(&json!({ "send_email": true, "force": false }))
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            debug!("Host confirmed payment {}", payment.id);
            return Ok(HostConfirmation::Confirmed);
        }

        let body = response.text().await?;
        if status == StatusCode::BAD_REQUEST {
            let detail = serde_json::from_str::<ErrorBody>(&body)
                .ok()
                .and_then(|b| b.detail)
                .unwrap_or(body);
            warn!("Host refused to confirm payment {}: {}", payment.id, detail);
            if detail == INVALID_STATE_DETAIL {
                return Ok(HostConfirmation::NotOpen);
            }
            return Ok(HostConfirmation::Refused(detail));
        }

        Err(DomainError::InternalError(format!(
            "Host API returned {} confirming payment {}: {}",
            status,
            payment.id,
            body.chars().take(200).collect::<String>()
        )))
    }
}
