use super::handlers::*;
use super::middleware::require_admin_api_key;
use crate::ports::{HostPort, RefundGatewayPort};
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub fn create_router<R: RefundGatewayPort + 'static, H: HostPort + 'static>(
    state: AppState<R, H>,
) -> Router {
    let admin_key: Arc<str> = Arc::from(state.payment_service.admin_api_key());

    let admin = Router::new()
        .route(
            "/dibs/:organizer/:event/payments/:code/:payment",
            get(query_payment::<R, H>),
        )
        .route("/admin/refunds/:refund_id", post(execute_refund::<R, H>))
        .route_layer(middleware::from_fn_with_state(
            admin_key,
            require_admin_api_key,
        ));

    Router::new()
        .route("/health", get(health_check))
        .route(
            "/dibs/:organizer/:event/payments/:code/:payment/session",
            post(create_session::<R, H>),
        )
        .route(
            "/dibs/:organizer/:event/webhook/:payment",
            get(callback_get::<R, H>).post(callback_post::<R, H>),
        )
        .route(
            "/dibs/:organizer/:event/return/:order/:hash/:payment/:action",
            get(return_from_gateway::<R, H>),
        )
        .merge(admin)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
