use anyhow::Result;
use std::sync::OnceLock;
use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter, Registry};

pub const LOG_FILTER_VAR: &str = "DATAVIBE_LOG";

static SUBSCRIBER_GUARD: OnceLock<()> = OnceLock::new();

/// Install the global tracing subscriber once; later calls are no-ops.
pub fn init_tracing(filter: EnvFilter) -> Result<()> {
    if SUBSCRIBER_GUARD.get().is_some() {
        return Ok(());
    }

    let subscriber = Registry::default()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr));
    tracing::subscriber::set_global_default(subscriber)?;
    SUBSCRIBER_GUARD.set(()).ok();

    Ok(())
}

/// Filter from `DATAVIBE_LOG`, or `info` when unset or invalid.
pub fn default_filter() -> EnvFilter {
    EnvFilter::try_from_env(LOG_FILTER_VAR).unwrap_or_else(|_| EnvFilter::new("info"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn filter_comes_from_environment() {
        std::env::set_var(LOG_FILTER_VAR, "datavibe_core=debug");
        assert_eq!(default_filter().to_string(), "datavibe_core=debug");
        std::env::remove_var(LOG_FILTER_VAR);
        assert_eq!(default_filter().to_string(), "info");
    }

    #[test]
    fn repeated_initialization_is_harmless() {
        init_tracing(EnvFilter::new("warn")).expect("first init");
        init_tracing(EnvFilter::new("warn")).expect("second init");
    }
}
