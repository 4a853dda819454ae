pub mod dibs_refund_adapter;
pub mod host_api_client;
pub mod mysql_host_repository;

pub use dibs_refund_adapter::DibsRefundAdapter;
pub use host_api_client::HostApiClient;
pub use mysql_host_repository::MySqlHostRepository;
