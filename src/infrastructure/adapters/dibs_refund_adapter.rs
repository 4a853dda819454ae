use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::signing::canonical;
use crate::infrastructure::config::dibs_config::DibsConfig;
use crate::ports::refund_gateway_port::*;
use async_trait::async_trait;
use reqwest::Client;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Client for the gateway's `refund.cgi`
#[derive(Clone)]
pub struct DibsRefundAdapter {
    config: Arc<DibsConfig>,
    client: Client,
}

impl DibsRefundAdapter {
    pub fn new(config: Arc<DibsConfig>) -> DomainResult<Self> {
        let client = Client::builder().timeout(config.http_timeout).build()?;
        Ok(Self { config, client })
    }

    fn endpoint(&self) -> String {
        format!("{}/cgi-adm/refund.cgi", self.config.api_base_url.trim_end_matches('/'))
    }

    /// Form body of the refund call
    fn build_payload(&self, request: &RefundRequest) -> DomainResult<Vec<(&'static str, String)>> {
        let merchant = self.config.require_merchant_id()?;
        let amount = request.amount.to_gateway_string();

        let mut payload = vec![
            ("merchant", merchant.to_string()),
            ("transact", request.transact.clone()),
            ("amount", amount.clone()),
            ("currency", request.currency.clone()),
            ("orderid", request.order_id.clone()),
            ("textreply", "true".to_string()),
        ];

        if self.config.test_mode {
            payload.push(("test", "1".to_string()));
        }

        let parameters = canonical::refund(merchant, &request.order_id, &request.transact, &amount);
        if let Some(md5key) = self.config.signer().sign(&parameters) {
            payload.push(("md5key", md5key));
        }

        Ok(payload)
    }
}

#[async_trait]
impl RefundGatewayPort for DibsRefundAdapter {
    fn refund_supported(&self) -> bool {
        self.config.api_credentials.is_some()
    }

    async fn refund(&self, request: RefundRequest) -> DomainResult<RefundResult> {
        let credentials = self.config.api_credentials.as_ref().ok_or_else(|| {
            DomainError::ConfigurationError(format!(
                "Missing DIBS api username and password for merchant {}. Order cannot be refunded in DIBS.",
                self.config.merchant_id
            ))
        })?;

        let payload = self.build_payload(&request)?;

        info!(
            merchant = %self.config.merchant_id,
            transact = %request.transact,
            amount = request.amount.to_cents(),
            "Sending DIBS refund"
        );

        let response = self
            .client
            .post(self.endpoint())
            .basic_auth(&credentials.username, Some(&credentials.password))
            .form(&payload)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        debug!("DIBS refund response: {} - {}", status, body);

        if !status.is_success() {
            error!(
                transact = %request.transact,
                "DIBS refund API returned {}: {}", status, body
            );
            return Ok(RefundResult::transport_failure(format!(
                "API returned {}: {}",
                status,
                body.chars().take(200).collect::<String>()
            )));
        }

        Ok(RefundResult::parse(&body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Money;
    use crate::infrastructure::config::dibs_config::fixtures;
    use axum::extract::State;
    use axum::http::HeaderMap;
    use axum::routing::post;
    use axum::{Form, Router};
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Clone, Default)]
    struct Recorded {
        requests: Arc<Mutex<Vec<(Option<String>, HashMap<String, String>)>>>,
    }

    async fn fake_gateway(reply: &'static str) -> (String, Recorded) {
        let recorded = Recorded::default();
        let app = Router::new()
            .route(
                "/cgi-adm/refund.cgi",
                post(
                    move |State(recorded): State<Recorded>,
                          headers: HeaderMap,
                          Form(form): Form<HashMap<String, String>>| async move {
                        let auth = headers
                            .get("authorization")
                            .and_then(|h| h.to_str().ok())
                            .map(String::from);
                        recorded.requests.lock().unwrap().push((auth, form));
                        reply
                    },
                ),
            )
            .with_state(recorded.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{}", addr), recorded)
    }

    fn request() -> RefundRequest {
        RefundRequest {
            transact: "123456789".to_string(),
            currency: "208".to_string(),
            order_id: "acme/summit/ABC12/0".to_string(),
            amount: Money::from_cents(500),
        }
    }

    fn adapter(base_url: String) -> DibsRefundAdapter {
        let mut config = fixtures::config();
        config.api_base_url = base_url;
        DibsRefundAdapter::new(Arc::new(config)).unwrap()
    }

    #[test]
    fn test_payload_is_signed_without_currency() {
        let adapter = adapter("http://unused".to_string());
        let payload: HashMap<_, _> = adapter.build_payload(&request()).unwrap().into_iter().collect();

        let expected = crate::domain::signing::keyed_hash(
            &"a".repeat(32),
            &"b".repeat(32),
            "merchant=100000&orderid=acme/summit/ABC12/0&transact=123456789&amount=500",
        );
        assert_eq!(payload["md5key"], expected);
        assert_eq!(payload["amount"], "500");
        assert_eq!(payload["currency"], "208");
        assert_eq!(payload["textreply"], "true");
        assert_eq!(payload["test"], "1");
    }

    #[test]
    fn test_payload_without_md5_control() {
        let mut config = fixtures::config();
        config.md5_keys = None;
        config.test_mode = false;
        let adapter = DibsRefundAdapter::new(Arc::new(config)).unwrap();
        let payload: HashMap<_, _> = adapter.build_payload(&request()).unwrap().into_iter().collect();
        assert!(!payload.contains_key("md5key"));
        assert!(!payload.contains_key("test"));
    }

    #[tokio::test]
    async fn test_refund_accepted() {
        let (base_url, recorded) = fake_gateway("status=ACCEPTED&result=0&message=Accepted").await;
        let result = adapter(base_url).refund(request()).await.unwrap();

        assert!(result.is_accepted());
        let requests = recorded.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        let (auth, form) = &requests[0];
        assert!(auth.as_deref().unwrap().starts_with("Basic "));
        assert_eq!(form["transact"], "123456789");
        assert_eq!(form["orderid"], "acme/summit/ABC12/0");
    }

    #[tokio::test]
    async fn test_refund_rejected() {
        let (base_url, _) = fake_gateway("status=DECLINED&result=7&message=Amount too high").await;
        let result = adapter(base_url).refund(request()).await.unwrap();

        assert!(!result.is_accepted());
        assert_eq!(result.result, 7);
        assert_eq!(result.message.as_deref(), Some("Amount too high"));
    }

    #[tokio::test]
    async fn test_refund_without_credentials_never_calls_gateway() {
        let (base_url, recorded) = fake_gateway("result=0").await;
        let mut config = fixtures::config();
        config.api_base_url = base_url;
        config.api_credentials = None;
        let adapter = DibsRefundAdapter::new(Arc::new(config)).unwrap();

        assert!(!adapter.refund_supported());
        let err = adapter.refund(request()).await.unwrap_err();
        assert!(matches!(err, DomainError::ConfigurationError(_)));
        assert!(recorded.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_refund_times_out() {
        let app = Router::new().route(
            "/cgi-adm/refund.cgi",
            post(|| async {
                tokio::time::sleep(std::time::Duration::from_secs(2)).await;
                "result=0"
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let mut config = fixtures::config();
        config.api_base_url = format!("http://{}", addr);
        config.http_timeout = std::time::Duration::from_millis(200);
        let adapter = DibsRefundAdapter::new(Arc::new(config)).unwrap();

        match adapter.refund(request()).await {
            Err(DomainError::HttpError(e)) => assert!(e.is_timeout()),
            other => panic!("expected a timeout, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_refund_network_failure() {
        let adapter = adapter("http://127.0.0.1:1".to_string());
        let err = adapter.refund(request()).await.unwrap_err();
        assert!(matches!(err, DomainError::HttpError(_)));
    }
}
