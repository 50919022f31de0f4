//! Configuration for lens-store hosts
//!
//! This crate provides:
//! - Config directory paths
//! - Configuration file discovery (TOML)
//! - Store configuration (StoreConfig)

pub mod config_file;
pub mod paths;
pub mod store_config;

pub use config_file::load_config_file;
pub use store_config::{ConfigSource, StoreConfig};
