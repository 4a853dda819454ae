pub mod adapters;
pub mod config;

pub use adapters::{DibsRefundAdapter, HostApiClient, MySqlHostRepository};
pub use config::DibsConfig;
