use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::{Decorator, KeyedHashSigner, Md5Keys};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_PAYMENT_URL: &str = "https://payment.architrade.com/paymentweb/start.action";
const DEFAULT_API_BASE_URL: &str = "https://payment.architrade.com";
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// API user for the administrative endpoints (refunds)
#[derive(Clone)]
pub struct ApiCredentials {
    pub username: String,
    pub password: String,
}

/// Merchant configuration
#[derive(Clone)]
pub struct DibsConfig {
    /// Merchant id issued by DIBS
    pub merchant_id: String,

    /// Process payments in test mode
    pub test_mode: bool,

    /// Capture immediately instead of only authorizing
    pub capture_now: bool,

    /// MD5 control keys
    pub md5_keys: Option<Md5Keys>,

    /// Payment window look
    pub decorator: Decorator,

    /// Refund API user
    pub api_credentials: Option<ApiCredentials>,

    /// Hosted payment window
    pub payment_url: String,

    /// Base URL of the administrative API
    pub api_base_url: String,

    /// Externally visible URL of this service
    pub public_base_url: String,

    /// Public URL of the shop, for order page redirects
    pub host_base_url: String,

    /// Host REST API, used to confirm payments through the host's own logic
    pub host_api_url: String,

    /// Token for the host REST API
    pub host_api_token: String,

    /// Timeout for outbound calls to DIBS and the host
    pub http_timeout: Duration,

    /// Key for operator endpoints
    pub admin_api_key: String,
}

impl DibsConfig {
    pub fn from_env() -> DomainResult<Arc<Self>> {
        let vars: HashMap<String, String> = std::env::vars().collect();
        Self::from_vars(&vars).map(Arc::new)
    }

    pub fn from_vars(vars: &HashMap<String, String>) -> DomainResult<Self> {
        let get = |key: &str| {
            vars.get(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let require = |key: &str| {
            get(key).ok_or_else(|| DomainError::ConfigurationError(format!("{} must be set", key)))
        };
        let flag = |key: &str| -> DomainResult<bool> {
            match get(key) {
                None => Ok(false),
                Some(v) => parse_flag(&v).ok_or_else(|| {
                    DomainError::ConfigurationError(format!("{} is not a boolean: {}", key, v))
                }),
            }
        };

        let merchant_id = require("DIBS_MERCHANT_ID")?;
        if !(2..=16).contains(&merchant_id.len()) {
            return Err(DomainError::ConfigurationError(
                "DIBS_MERCHANT_ID must be 2-16 characters".to_string(),
            ));
        }

        let md5_keys = match (get("DIBS_MD5_KEY1"), get("DIBS_MD5_KEY2")) {
            (Some(key1), Some(key2)) => {
                if key1.len() != 32 || key2.len() != 32 {
                    return Err(DomainError::ConfigurationError(
                        "DIBS MD5 keys must be 32 characters".to_string(),
                    ));
                }
                Some(Md5Keys { key1, key2 })
            }
            (None, None) => None,
            _ => {
                return Err(DomainError::ConfigurationError(
                    "DIBS_MD5_KEY1 and DIBS_MD5_KEY2 must be set together".to_string(),
                ))
            }
        };
        if flag("DIBS_MD5_CONTROL")? && md5_keys.is_none() {
            return Err(DomainError::ConfigurationError(
                "DIBS_MD5_CONTROL requires DIBS_MD5_KEY1 and DIBS_MD5_KEY2".to_string(),
            ));
        }

        let api_credentials = match (get("DIBS_API_USER"), get("DIBS_API_PASSWORD")) {
            (Some(username), Some(password)) => Some(ApiCredentials { username, password }),
            _ => None,
        };

        let decorator = match get("DIBS_DECORATOR") {
            Some(v) => v.parse()?,
            None => Decorator::default(),
        };

        let http_timeout = match get("HTTP_TIMEOUT_SECS") {
            None => Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            Some(v) => v
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs)
                .ok_or_else(|| {
                    DomainError::ConfigurationError(format!(
                        "HTTP_TIMEOUT_SECS must be a positive number of seconds: {}",
                        v
                    ))
                })?,
        };

        let host_base_url = trim_slash(require("HOST_BASE_URL")?);
        let host_api_url = get("HOST_API_URL")
            .map(trim_slash)
            .unwrap_or_else(|| format!("{}/api/v1", host_base_url));

        Ok(Self {
            merchant_id,
            test_mode: flag("DIBS_TEST_MODE")?,
            capture_now: flag("DIBS_CAPTURE_NOW")?,
            md5_keys,
            decorator,
            api_credentials,
            payment_url: get("DIBS_PAYMENT_URL").unwrap_or_else(|| DEFAULT_PAYMENT_URL.to_string()),
            api_base_url: get("DIBS_API_BASE_URL")
                .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string()),
            public_base_url: trim_slash(require("PUBLIC_BASE_URL")?),
            host_base_url,
            host_api_url,
            host_api_token: require("HOST_API_TOKEN")?,
            http_timeout,
            admin_api_key: require("ADMIN_API_KEY")?,
        })
    }

    pub fn signer(&self) -> KeyedHashSigner {
        KeyedHashSigner::new(self.md5_keys.clone())
    }

    /// Merchant id, re-checked at use sites that talk to the gateway.
    pub fn require_merchant_id(&self) -> DomainResult<&str> {
        if self.merchant_id.is_empty() {
            return Err(DomainError::ConfigurationError(
                "Missing DIBS merchant id".to_string(),
            ));
        }
        Ok(&self.merchant_id)
    }
}

impl fmt::Debug for DibsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DibsConfig")
            .field("merchant_id", &self.merchant_id)
            .field("test_mode", &self.test_mode)
            .field("capture_now", &self.capture_now)
            .field("md5_control", &self.md5_keys.is_some())
            .field("decorator", &self.decorator)
            .field(
                "api_user",
                &self.api_credentials.as_ref().map(|c| c.username.as_str()),
            )
            .field("payment_url", &self.payment_url)
            .field("api_base_url", &self.api_base_url)
            .field("public_base_url", &self.public_base_url)
            .field("host_base_url", &self.host_base_url)
            .field("host_api_url", &self.host_api_url)
            .field("http_timeout", &self.http_timeout)
            .finish_non_exhaustive()
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn trim_slash(url: String) -> String {
    url.trim_end_matches('/').to_string()
}


#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        let mut vars: HashMap<String, String> = [
            ("DIBS_MERCHANT_ID", "100000"),
            ("PUBLIC_BASE_URL", "https://dibs.example.com/"),
            ("HOST_BASE_URL", "https://tickets.example.com"),
            ("ADMIN_API_KEY", "admin-key"),
            ("HOST_API_TOKEN", "host-token"),
        ]
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        for (k, v) in pairs {
            vars.insert(k.to_string(), v.to_string());
        }
        vars
    }

    #[test]
    fn test_minimal_config() {
        let config = DibsConfig::from_vars(&vars(&[])).unwrap();
        assert_eq!(config.merchant_id, "100000");
        assert!(!config.test_mode);
        assert!(config.md5_keys.is_none());
        assert!(config.api_credentials.is_none());
        assert_eq!(config.decorator, Decorator::Default);
        assert_eq!(config.public_base_url, "https://dibs.example.com");
        assert_eq!(config.api_base_url, DEFAULT_API_BASE_URL);
        assert_eq!(config.host_api_url, "https://tickets.example.com/api/v1");
        assert_eq!(config.http_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_host_api_and_timeout() {
        let config = DibsConfig::from_vars(&vars(&[
            ("HOST_API_URL", "https://api.tickets.example.com/v1/"),
            ("HTTP_TIMEOUT_SECS", "10"),
        ]))
        .unwrap();
        assert_eq!(config.host_api_url, "https://api.tickets.example.com/v1");
        assert_eq!(config.http_timeout, Duration::from_secs(10));

        assert!(DibsConfig::from_vars(&vars(&[("HTTP_TIMEOUT_SECS", "0")])).is_err());
        assert!(DibsConfig::from_vars(&vars(&[("HTTP_TIMEOUT_SECS", "soon")])).is_err());

        let mut vars = vars(&[]);
        vars.remove("HOST_API_TOKEN");
        assert!(DibsConfig::from_vars(&vars).is_err());
    }

    #[test]
    fn test_missing_merchant_id() {
        let mut vars = vars(&[]);
        vars.remove("DIBS_MERCHANT_ID");
        assert!(matches!(
            DibsConfig::from_vars(&vars),
            Err(DomainError::ConfigurationError(_))
        ));
    }

    #[test]
    fn test_md5_keys() {
        let a = "a".repeat(32);
        let b = "b".repeat(32);
        let config = DibsConfig::from_vars(&vars(&[
            ("DIBS_MD5_KEY1", a.as_str()),
            ("DIBS_MD5_KEY2", b.as_str()),
            ("DIBS_MD5_CONTROL", "true"),
        ]))
        .unwrap();
        assert!(config.signer().is_enabled());

        assert!(DibsConfig::from_vars(&vars(&[("DIBS_MD5_KEY1", a.as_str())])).is_err());
        assert!(DibsConfig::from_vars(&vars(&[("DIBS_MD5_KEY1", "short"), ("DIBS_MD5_KEY2", b.as_str())])).is_err());
        assert!(DibsConfig::from_vars(&vars(&[("DIBS_MD5_CONTROL", "1")])).is_err());
    }

    #[test]
    fn test_flags_and_decorator() {
        let config = DibsConfig::from_vars(&vars(&[
            ("DIBS_TEST_MODE", "yes"),
            ("DIBS_CAPTURE_NOW", "1"),
            ("DIBS_DECORATOR", "rich"),
        ]))
        .unwrap();
        assert!(config.test_mode);
        assert!(config.capture_now);
        assert_eq!(config.decorator, Decorator::Rich);

        assert!(DibsConfig::from_vars(&vars(&[("DIBS_TEST_MODE", "maybe")])).is_err());
        assert!(DibsConfig::from_vars(&vars(&[("DIBS_DECORATOR", "fancy")])).is_err());
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let debug = format!("{:?}", fixtures::config());
        assert!(!debug.contains(&"a".repeat(32)));
        assert!(!debug.contains("api-pass"));
        assert!(!debug.contains("admin-key"));
        assert!(!debug.contains("host-token"));
    }
}
