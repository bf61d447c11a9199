//! One-time logger setup. Library code only talks to the `log` facade.

use log::LevelFilter;

use crate::config::env_vars;

/// Install `env_logger` at `level`. Later calls are ignored.
pub fn init_logging(level: LevelFilter) {
    let result = env_logger::Builder::new()
        .filter_level(level)
        .format_timestamp_millis()
        .try_init();
    if result.is_ok() {
        log::debug!("[Logging] Initialized at {}", level);
    }
}

/// Install `env_logger` with the filter from `NOTEBOOK_CATALOG_LOG`
/// (falling back to `RUST_LOG`, then `info`). Later calls are ignored.
pub fn init_from_env() {
    let env = env_logger::Env::new()
        .filter_or(env_vars::LOG, std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()));
    let _ = env_logger::Builder::from_env(env)
        .format_timestamp_millis()
        .try_init();
}
