use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::{
    CallbackReceived, CompositeOrderId, DomainEvent, PaymentInfo, PaymentRecord, RefundFailed,
    RefundRecord,
};
use crate::infrastructure::adapters::host_api_client::{HostApiClient, HostConfirmation};
use crate::ports::host_port::{ConfirmOutcome, HostPort};
use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use serde_json::Value;
use sqlx::{MySql, Pool};
use std::sync::Arc;
use tracing::{debug, error, warn};

const PAYMENT_COLUMNS: &str = r#"
    SELECT p.id, g.slug AS organizer, e.slug AS event, o.code AS order_code,
           o.secret AS order_secret, p.local_id, p.provider, p.amount,
           e.currency, p.state, p.info, p.created, p.payment_date
    FROM order_payments p
    JOIN orders o ON o.id = p.order_id
    JOIN events e ON e.id = o.event_id
    JOIN organizers g ON g.id = e.organizer_id
"#;

/// Reads the host's payment and refund records from its MySQL database.
/// Payments are confirmed through the host API so its mark-paid logic runs.
/// Refund state and log entries are written directly.
#[derive(Clone)]
pub struct MySqlHostRepository {
    pool: Arc<Pool<MySql>>,
    host_api: HostApiClient,
}

impl MySqlHostRepository {
    pub fn new(pool: Arc<Pool<MySql>>, host_api: HostApiClient) -> Self {
        Self { pool, host_api }
    }

    async fn payment_by_id(&self, payment_id: i64) -> DomainResult<Option<PaymentRecord>> {
        let query = format!("{} WHERE p.id = ?", PAYMENT_COLUMNS);

        let row = sqlx::query_as::<_, PaymentRow>(&query)
            .bind(payment_id)
            .fetch_optional(self.pool.as_ref())
            .await?;

        row.map(PaymentRow::into_payment).transpose()
    }

    async fn log_action(&self, payment_id: i64, action_type: &str, data: &Value) -> DomainResult<()> {
        let query = r#"
            INSERT INTO order_log_entries (order_id, action_type, data, datetime)
            SELECT order_id, ?, ?, ? FROM order_payments WHERE id = ?
        "#;

        sqlx::query(query)
            .bind(action_type)
            .bind(serde_json::to_string(data)?)
            .bind(Utc::now())
            .bind(payment_id)
            .execute(self.pool.as_ref())
            .await?;

        Ok(())
    }

    async fn refund_state(&self, refund_id: i64) -> DomainResult<String> {
        sqlx::query_scalar("SELECT state FROM order_refunds WHERE id = ?")
            .bind(refund_id)
            .fetch_optional(self.pool.as_ref())
            .await?
            .ok_or_else(|| DomainError::OrderNotFound(format!("refund {}", refund_id)))
    }

    /// Guarded state change. Zero affected rows means the refund is missing
    /// or in another state.
    async fn move_refund(&self, refund_id: i64, from: &str, to: &str) -> DomainResult<()> {
        let rows_affected = sqlx::query("UPDATE order_refunds SET state = ? WHERE id = ? AND state = ?")
            .bind(to)
            .bind(refund_id)
            .bind(from)
            .execute(self.pool.as_ref())
            .await?
            .rows_affected();

        if rows_affected == 1 {
            debug!("Refund {} moved from {} to {}", refund_id, from, to);
            return Ok(());
        }

        let actual = self.refund_state(refund_id).await?;
        Err(DomainError::InvalidState {
            expected: from.to_string(),
            actual,
        })
    }

    async fn finish_refund(&self, refund_id: i64, state: &str, info: &Value) -> DomainResult<()> {
        let query = r#"
            UPDATE order_refunds
            SET state = ?, info = ?, execution_date = ?
            WHERE id = ? AND state IN ('created', 'transit')
        "#;

        let rows_affected = sqlx::query(query)
            .bind(state)
            .bind(serde_json::to_string(info)?)
            .bind(Utc::now())
            .bind(refund_id)
            .execute(self.pool.as_ref())
            .await?
            .rows_affected();

        if rows_affected == 0 {
            error!("No open refund found to update: {}", refund_id);
            return Err(DomainError::OrderNotFound(format!("refund {}", refund_id)));
        }

        debug!("Refund {} marked {}", refund_id, state);
        Ok(())
    }
}

#[async_trait]
impl HostPort for MySqlHostRepository {
    async fn find_payment(&self, order_id: &CompositeOrderId) -> DomainResult<Option<PaymentRecord>> {
        let query = format!(
            "{} WHERE g.slug = ? AND e.slug = ? AND o.code = ? AND p.local_id = ?",
            PAYMENT_COLUMNS
        );

        let row = sqlx::query_as::<_, PaymentRow>(&query)
            .bind(&order_id.organizer)
            .bind(&order_id.event)
            .bind(&order_id.order_code)
            .bind(i64::from(order_id.payment_seq))
            .fetch_optional(self.pool.as_ref())
            .await?;

        row.map(PaymentRow::into_payment).transpose()
    }

    async fn log_callback(&self, event: &CallbackReceived) -> DomainResult<()> {
        let data = Value::Object(event.data.clone());
        self.log_action(event.payment_id, event.event_type(), &data).await
    }

    async fn set_payment_info(&self, payment_id: i64, info: &PaymentInfo) -> DomainResult<()> {
        sqlx::query("UPDATE order_payments SET info = ? WHERE id = ?")
            .bind(serde_json::to_string(info)?)
            .bind(payment_id)
            .execute(self.pool.as_ref())
            .await?;

        Ok(())
    }

    /// The host API swallows mail errors and only logs them on its side, so
    /// this adapter never returns `ConfirmationMailFailed`.
    async fn confirm_payment(&self, payment_id: i64) -> DomainResult<ConfirmOutcome> {
        let payment = self
            .payment_by_id(payment_id)
            .await?
            .ok_or_else(|| DomainError::OrderNotFound(format!("payment {}", payment_id)))?;

        if payment.is_confirmed() {
            return Ok(ConfirmOutcome::AlreadyConfirmed);
        }

        match self.host_api.confirm_payment(&payment).await? {
            HostConfirmation::Confirmed => {
                debug!("Payment confirmed: {}", payment_id);
                Ok(ConfirmOutcome::Confirmed)
            }
            HostConfirmation::NotOpen => {
                // A concurrent delivery may have confirmed it in between.
                let current = self
                    .payment_by_id(payment_id)
                    .await?
                    .ok_or_else(|| DomainError::OrderNotFound(format!("payment {}", payment_id)))?;
                if current.is_confirmed() {
                    return Ok(ConfirmOutcome::AlreadyConfirmed);
                }
                Err(DomainError::InvalidState {
                    expected: "created or pending".to_string(),
                    actual: current.state.to_string(),
                })
            }
            HostConfirmation::Refused(detail) => {
                warn!("Host refused to confirm payment {}: {}", payment_id, detail);
                Err(DomainError::QuotaExceeded(detail))
            }
        }
    }

    async fn find_refund(&self, refund_id: i64) -> DomainResult<Option<RefundRecord>> {
        let query = r#"
            SELECT id, payment_id, local_id, amount, state, info, execution_date
            FROM order_refunds
            WHERE id = ?
        "#;

        let row = sqlx::query_as::<_, RefundRow>(query)
            .bind(refund_id)
            .fetch_optional(self.pool.as_ref())
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let payment = self
            .payment_by_id(row.payment_id)
            .await?
            .ok_or_else(|| DomainError::OrderNotFound(format!("payment {}", row.payment_id)))?;

        row.into_refund(payment).map(Some)
    }

    async fn begin_refund(&self, refund_id: i64) -> DomainResult<()> {
        self.move_refund(refund_id, "created", "transit").await
    }

    async fn release_refund(&self, refund_id: i64) -> DomainResult<()> {
        self.move_refund(refund_id, "transit", "created").await
    }

    async fn complete_refund(&self, refund_id: i64, info: &Value) -> DomainResult<()> {
        self.finish_refund(refund_id, "done", info).await
    }

    async fn fail_refund(&self, refund_id: i64, info: &Value, event: &RefundFailed) -> DomainResult<()> {
        self.finish_refund(refund_id, "failed", info).await?;

        let data = serde_json::to_value(event)?;
        let payment_id: i64 = sqlx::query_scalar("SELECT payment_id FROM order_refunds WHERE id = ?")
            .bind(refund_id)
            .fetch_one(self.pool.as_ref())
            .await?;
        self.log_action(payment_id, event.event_type(), &data).await
    }
}

/// `INT` columns are signed on the host side.
fn local_id(table: &str, id: i64, local_id: i64) -> DomainResult<u32> {
    u32::try_from(local_id).map_err(|_| {
        DomainError::InternalError(format!("{} {} has local_id {} out of range", table, id, local_id))
    })
}

/// The host stores JSON blobs as text.
fn parse_json(table: &str, id: i64, text: Option<String>) -> DomainResult<Option<Value>> {
    match text.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(text) => serde_json::from_str(text).map(Some).map_err(|e| {
            DomainError::InternalError(format!("{} {} info is not valid JSON: {}", table, id, e))
        }),
    }
}

#[derive(Debug, sqlx::FromRow)]
struct PaymentRow {
    id: i64,
    organizer: String,
    event: String,
    order_code: String,
    order_secret: String,
    local_id: i64,
    provider: String,
    amount: Decimal,
    currency: String,
    state: String,
    info: Option<String>,
    created: chrono::DateTime<Utc>,
    payment_date: Option<chrono::DateTime<Utc>>,
}

impl PaymentRow {
    fn into_payment(self) -> DomainResult<PaymentRecord> {
        let info = match parse_json("payment", self.id, self.info)? {
            Some(Value::Object(map)) => Some(map),
            Some(Value::Null) | None => None,
            Some(other) => {
                return Err(DomainError::InternalError(format!(
                    "Payment {} info is not an object: {}",
                    self.id, other
                )))
            }
        };

        Ok(PaymentRecord {
            id: self.id,
            organizer: self.organizer,
            event: self.event,
            order_code: self.order_code,
            order_secret: self.order_secret,
            local_id: local_id("payment", self.id, self.local_id)?,
            provider: self.provider,
            amount: self.amount,
            currency: self.currency,
            state: self.state.parse()?,
            info,
            created_at: self.created,
            payment_date: self.payment_date,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct RefundRow {
    id: i64,
    payment_id: i64,
    local_id: i64,
    amount: Decimal,
    state: String,
    info: Option<String>,
    execution_date: Option<chrono::DateTime<Utc>>,
}

impl RefundRow {
    fn into_refund(self, payment: PaymentRecord) -> DomainResult<RefundRecord> {
        Ok(RefundRecord {
            id: self.id,
            payment,
            local_id: local_id("refund", self.id, self.local_id)?,
            amount: self.amount,
            state: self.state.parse()?,
            info: parse_json("refund", self.id, self.info)?,
            execution_date: self.execution_date,
        })
    }
}
