//! Host concerns of a supervised service: layered configuration, logging
//! and termination-signal handling.

pub mod config;
pub mod logging;
pub mod signals;

pub use config::{AppConfig, ConfigError, ENV_PREFIX, LogFormat, LoggingConfig, ServiceConfig};
pub use logging::init_logging;
pub use signals::{ShutdownSignal, cancel_on, shutdown_token, wait_for_shutdown};
