use thiserror::Error;

/// Domain error type
#[derive(Error, Debug)]
pub enum DomainError {
    /// Malformed input
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Payment, refund or order could not be resolved
    #[error("Not found: {0}")]
    OrderNotFound(String),

    /// Lifecycle transition not allowed from the current state
    #[error("Invalid state: expected {expected}, got {actual}")]
    InvalidState { expected: String, actual: String },

    /// Amount cannot be expressed in minor units
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Merchant configuration is missing or invalid
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// The host could not confirm the payment because the quota is exhausted
    #[error("Quota exceeded while confirming payment: {0}")]
    QuotaExceeded(String),

    /// The host confirmed the payment but could not deliver the confirmation mail
    #[error("There was an error sending the confirmation mail: {0}")]
    ConfirmationMailFailed(String),

    /// The gateway captured or authorised the payment but the host refused
    /// the confirm transition
    #[error("Payment captured in DIBS but could not be confirmed: {0}")]
    ConfirmationFailed(String),

    /// Refund rejected by the gateway or the refund call failed
    #[error("Error refunding in DIBS ({}; {result}; {})", .status.as_deref().unwrap_or("None"), .message.as_deref().unwrap_or("None"))]
    GatewayError {
        status: Option<String>,
        result: i32,
        message: Option<String>,
    },

    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("HTTP request error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl DomainError {
    /// Failures raised by the host after the gateway already authorised the
    /// payment. These need manual reconciliation.
    pub fn is_downstream(&self) -> bool {
        matches!(
            self,
            DomainError::QuotaExceeded(_)
                | DomainError::ConfirmationMailFailed(_)
                | DomainError::ConfirmationFailed(_)
        )
    }
}

/// Domain result type
pub type DomainResult<T> = Result<T, DomainError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gateway_error_display() {
        let err = DomainError::GatewayError {
            status: Some("DECLINED".to_string()),
            result: 4,
            message: Some("Rejected by acquirer".to_string()),
        };
        assert_eq!(
            err.to_string(),
            "Error refunding in DIBS (DECLINED; 4; Rejected by acquirer)"
        );
    }

    #[test]
    fn test_downstream_classification() {
        assert!(DomainError::QuotaExceeded("sold out".to_string()).is_downstream());
        assert!(DomainError::ConfirmationMailFailed("smtp".to_string()).is_downstream());
        assert!(DomainError::ConfirmationFailed("canceled".to_string()).is_downstream());
        assert!(!DomainError::ConfigurationError("merchant".to_string()).is_downstream());
    }
}
