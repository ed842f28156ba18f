//! Logging setup shared by messaging binaries.
//! Libraries only emit through `tracing`; processes call [`install`] once at
//! start-up to decide where those events go.

mod config;
mod tracing_init;

pub use config::{LOG_FORMAT_ENV, LogFormat, LoggingConfig, SERVICE_NAME_ENV};
pub use tracing_init::{install, is_installed};

/// Reads [`LoggingConfig`] from the environment and installs it.
pub fn install_from_env(default_service_name: &str) -> anyhow::Result<()> {
    install(&LoggingConfig::from_env(default_service_name))
}
