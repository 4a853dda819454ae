use crate::application::{DibsPaymentService, ErrorResponse, RefundResponse};
use crate::domain::errors::DomainError;
use crate::domain::CompositeOrderId;
use crate::ports::{
    CallbackOutcome, CallbackParams, EventContext, HostPort, PaymentProvider, RefundGatewayPort,
};
use axum::{
    extract::{Form, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Redirect},
};
use std::sync::Arc;
use tracing::{debug, error, info};

/// Shared state
pub struct AppState<R: RefundGatewayPort, H: HostPort> {
    pub payment_service: Arc<DibsPaymentService<R, H>>,
}

impl<R: RefundGatewayPort, H: HostPort> Clone for AppState<R, H> {
    fn clone(&self) -> Self {
        Self {
            payment_service: self.payment_service.clone(),
        }
    }
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn error_response(code: &str, e: DomainError) -> ApiError {
    let (status, code) = match &e {
        DomainError::OrderNotFound(_) => (StatusCode::NOT_FOUND, code),
        DomainError::ValidationError(_) | DomainError::InvalidAmount(_) => {
            (StatusCode::BAD_REQUEST, code)
        }
        DomainError::InvalidState { .. } => (StatusCode::CONFLICT, code),
        DomainError::GatewayError { .. } => (StatusCode::BAD_GATEWAY, "REFUND_FAILED"),
        e if e.is_downstream() => (StatusCode::INTERNAL_SERVER_ERROR, "CONFIRMATION_FAILED"),
        _ => (StatusCode::INTERNAL_SERVER_ERROR, code),
    };
    if status.is_server_error() {
        error!("{} error: {}", code, e);
    }
    (
        status,
        Json(ErrorResponse::new(code.to_string(), e.to_string())),
    )
}

/// Build the redirect form for a payment
pub async fn create_session<R: RefundGatewayPort, H: HostPort>(
    State(state): State<AppState<R, H>>,
    Path((organizer, event, code, payment)): Path<(String, String, String, u32)>,
) -> Result<impl IntoResponse, ApiError> {
    let order_id = CompositeOrderId::new(organizer, event, code, payment);
    info!("Received session request: {}", order_id);

    state
        .payment_service
        .build_session(&order_id)
        .await
        .map(|prepared| (StatusCode::OK, Json(prepared)))
        .map_err(|e| error_response("SESSION_ERROR", e))
}

/// Gateway callback delivered as a query string
pub async fn callback_get<R: RefundGatewayPort, H: HostPort>(
    State(state): State<AppState<R, H>>,
    Path((organizer, event, payment)): Path<(String, String, u32)>,
    Query(params): Query<CallbackParams>,
) -> Result<impl IntoResponse, ApiError> {
    handle_callback(state, EventContext::new(organizer, event), payment, params).await
}

/// Gateway callback delivered as a form body
pub async fn callback_post<R: RefundGatewayPort, H: HostPort>(
    State(state): State<AppState<R, H>>,
    Path((organizer, event, payment)): Path<(String, String, u32)>,
    Form(params): Form<CallbackParams>,
) -> Result<impl IntoResponse, ApiError> {
    handle_callback(state, EventContext::new(organizer, event), payment, params).await
}

/// Rejected callbacks still get a 200 so the gateway stops redelivering.
async fn handle_callback<R: RefundGatewayPort, H: HostPort>(
    state: AppState<R, H>,
    context: EventContext,
    payment: u32,
    params: CallbackParams,
) -> Result<Json<CallbackOutcome>, ApiError> {
    debug!(
        organizer = %context.organizer,
        event = %context.event,
        payment,
        "Received DIBS callback"
    );

    state
        .payment_service
        .process_callback(&context, &params)
        .await
        .map(Json)
        .map_err(|e| error_response("CALLBACK_ERROR", e))
}

/// Payer returning from the payment window. `action` is `success` or
/// `cancel` but both land on the order page.
pub async fn return_from_gateway<R: RefundGatewayPort, H: HostPort>(
    State(state): State<AppState<R, H>>,
    Path((organizer, event, order, hash, payment, action)): Path<(
        String,
        String,
        String,
        String,
        u32,
        String,
    )>,
) -> Result<Redirect, ApiError> {
    debug!(order = %order, action = %action, "Payer returned from DIBS");

    let context = EventContext::new(organizer, event);
    state
        .payment_service
        .resolve_return(&context, &order, &hash, payment)
        .await
        .map(|url| Redirect::to(&url))
        .map_err(|_| {
            error_response(
                "ORDER_NOT_FOUND",
                DomainError::OrderNotFound(
                    "Sorry, there was an error in the payment process. Please check the link in your emails to continue."
                        .to_string(),
                ),
            )
        })
}

/// Operator view of a payment
pub async fn query_payment<R: RefundGatewayPort, H: HostPort>(
    State(state): State<AppState<R, H>>,
    Path((organizer, event, code, payment)): Path<(String, String, String, u32)>,
) -> Result<impl IntoResponse, ApiError> {
    let order_id = CompositeOrderId::new(organizer, event, code, payment);
    info!("Received payment query request: {}", order_id);

    state
        .payment_service
        .query_payment(&order_id)
        .await
        .map(|response| (StatusCode::OK, Json(response)))
        .map_err(|e| error_response("QUERY_ERROR", e))
}

/// Refund through the gateway API
pub async fn execute_refund<R: RefundGatewayPort, H: HostPort>(
    State(state): State<AppState<R, H>>,
    Path(refund_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    info!("Received refund request: {}", refund_id);

    state
        .payment_service
        .refund(refund_id)
        .await
        .map(|result| (StatusCode::OK, Json(RefundResponse::accepted(refund_id, &result))))
        .map_err(|e| error_response("REFUND_ERROR", e))
}

/// Health check
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}
