use anyhow::{Context, Result};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

use crate::settings::HostSettings;

/// Install the global subscriber. `RUST_LOG` wins over the configured level.
pub fn init(settings: &HostSettings) -> Result<()> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&settings.log_level)
            .with_context(|| format!("invalid log level {:?}", settings.log_level))?,
    };

    let fmt_layer = fmt::layer()
        .with_thread_names(true)
        .with_target(true);

    Registry::default()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .context("a global tracing subscriber is already installed")?;

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "video host starting");
    Ok(())
}

pub fn log_settings(settings: &HostSettings) {
    tracing::info!(
        measure_timeout = ?settings.host.measure_timeout,
        elevate_priority = settings.host.elevate_priority,
        thread = %settings.host.thread_name,
        present_sync = ?settings.video.present_sync,
        refresh_hz = settings.video.refresh_hz,
        "settings loaded"
    );
}
