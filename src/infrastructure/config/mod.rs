pub mod dibs_config;

pub use dibs_config::{ApiCredentials, DibsConfig};
