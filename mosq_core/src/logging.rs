//! Logging for plugins.
//!
//! With the `logging` feature the `liblogger` macros are re-exported at the
//! crate root and [`init_logger`] configures them from the plugin options.
//! By default records go to the broker's own log through the logging relay.
//! Without the feature the macros compile to nothing.

use crate::options::OptionList;

#[cfg(feature = "logging")]
use crate::abi::{MOSQ_LOG_DEBUG, MOSQ_LOG_ERR, MOSQ_LOG_INFO, MOSQ_LOG_WARNING};
#[cfg(feature = "logging")]
use libc::c_int;

#[cfg(feature = "logging")]
pub use liblogger::{LogConfig, LogLevel, LogType, Logger};

/// Broker log level for a `liblogger` level.
#[cfg(feature = "logging")]
pub fn broker_level(level: LogLevel) -> c_int {
    match level {
        LogLevel::Debug => MOSQ_LOG_DEBUG,
        LogLevel::Info => MOSQ_LOG_INFO,
        LogLevel::Warn => MOSQ_LOG_WARNING,
        LogLevel::Error => MOSQ_LOG_ERR,
    }
}

#[cfg(feature = "logging")]
fn broker_sink(level: LogLevel, line: &str) {
    crate::log_relay::log_str(broker_level(level), line);
}

/// Initialises the logger from the `log_*` plugin options.
///
/// Unknown keys are ignored, so the full option list can be passed as-is.
#[cfg(feature = "logging")]
pub fn init_logger(plugin_name: &str, options: &OptionList<'_>) -> Result<(), String> {
    let config = LogConfig::from_options(options.iter())
        .map_err(|e| format!("[{}] {}", plugin_name, e))?;
    Logger::set_broker_sink(broker_sink);
    Logger::init_with_config(config)
}

/// Flushes any queued records. Call from cleanup.
#[cfg(feature = "logging")]
pub fn shutdown_logger() {
    let _ = Logger::shutdown();
}

#[cfg(not(feature = "logging"))]
mod no_op_macros {
    #[macro_export]
    macro_rules! log_debug {
        ($($arg:tt)*) => {};
    }

    #[macro_export]
    macro_rules! log_info {
        ($($arg:tt)*) => {};
    }

    #[macro_export]
    macro_rules! log_warn {
        ($($arg:tt)*) => {};
    }

    #[macro_export]
    macro_rules! log_error {
        ($($arg:tt)*) => {};
    }
}

#[cfg(not(feature = "logging"))]
pub fn init_logger(_plugin_name: &str, _options: &OptionList<'_>) -> Result<(), String> {
    Ok(())
}

#[cfg(not(feature = "logging"))]
pub fn shutdown_logger() {}
