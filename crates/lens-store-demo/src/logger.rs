//! Logging setup using env_logger
//!
//! `RUST_LOG` wins when set; otherwise the level comes from the store config.

use env_logger::{Builder, Env};

/// Initialize logging with `default_level` as fallback filter
pub fn init(default_level: &str) {
    Builder::from_env(Env::default().default_filter_or(default_level))
        .format_timestamp_millis()
        .init();
}
