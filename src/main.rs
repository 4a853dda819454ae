mod api;
mod application;
mod domain;
mod infrastructure;
mod ports;

use anyhow::Context;
use api::AppState;
use application::DibsPaymentService;
use infrastructure::{DibsConfig, DibsRefundAdapter, HostApiClient, MySqlHostRepository};
use ports::RefundGatewayPort;
use sqlx::MySqlPool;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    info!("Starting DIBS payment service...");

    let config = DibsConfig::from_env().context("invalid DIBS configuration")?;
    info!(
        merchant_id = %config.merchant_id,
        test_mode = config.test_mode,
        md5_control = config.md5_keys.is_some(),
        host_api = %config.host_api_url,
        "DIBS configuration loaded"
    );

    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
    info!("Connecting to database...");
    let pool = MySqlPool::connect(&database_url).await?;
    info!("Database connected successfully");

    let refund_adapter = Arc::new(DibsRefundAdapter::new(config.clone())?);
    if !refund_adapter.refund_supported() {
        warn!("DIBS API credentials not configured, refunds are disabled");
    }
    let host_api = HostApiClient::new(&config)?;
    let host = Arc::new(MySqlHostRepository::new(Arc::new(pool), host_api));

    let payment_service = Arc::new(DibsPaymentService::new(config, refund_adapter, host));
    let app = api::create_router(AppState { payment_service });

    let host = std::env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port = std::env::var("SERVER_PORT").unwrap_or_else(|_| "3000".to_string());
    let addr = format!("{}:{}", host, port);

    info!("Server listening on {}", addr);
    info!("Available endpoints:");
    info!("  GET  /health - Health check");
    info!("  POST /dibs/:organizer/:event/payments/:code/:payment/session - Payment session");
    info!("  GET|POST /dibs/:organizer/:event/webhook/:payment - DIBS callback");
    info!("  GET  /dibs/:organizer/:event/return/:order/:hash/:payment/:action - Payer return");
    info!("  GET  /dibs/:organizer/:event/payments/:code/:payment - Payment status (admin)");
    info!("  POST /admin/refunds/:refund_id - Refund (admin)");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
