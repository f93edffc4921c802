//! Structured logging setup. Maps `{DEBUG, INFO, WARNING, ERROR, CRITICAL}`
//! onto `tracing`'s filter levels (`tracing` has no `CRITICAL`; it is
//! treated as `ERROR`) and `{json, console}` onto `tracing-subscriber`'s
//! JSON and pretty-ish compact formatters.

use tracing_subscriber::fmt;
use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

pub fn init(config: &LoggingConfig) {
    let level = match config.log_level.to_ascii_uppercase().as_str() {
        "DEBUG" => "debug",
        "INFO" => "info",
        "WARNING" => "warn",
        "ERROR" | "CRITICAL" => "error",
        _ => "info",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    match config.log_format.as_str() {
        "json" => {
            fmt().with_env_filter(filter).json().init();
        }
        _ => {
            fmt().with_env_filter(filter).init();
        }
    }
}
