use std::sync::OnceLock;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::layer::Layer;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{LogFormat, LoggingConfig};

static INIT: OnceLock<()> = OnceLock::new();

/// Installs the global subscriber. Only the first call has an effect; it
/// fails if a subscriber not installed here is already the global default.
pub fn install(cfg: &LoggingConfig) -> Result<()> {
    if INIT.get().is_some() {
        return Ok(());
    }

    let fmt_layer = match cfg.format {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .flatten_event(true)
            .boxed(),
        LogFormat::Text => tracing_subscriber::fmt::layer().boxed(),
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cfg.default_filter.as_str()));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .context("another global subscriber is already installed")?;

    INIT.set(()).ok();
    info!(service = %cfg.service_name, "logging initialised");
    Ok(())
}

pub fn is_installed() -> bool {
    INIT.get().is_some()
}
