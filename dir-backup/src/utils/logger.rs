//! Logging configuration using tracing.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Pick the effective level: `--debug` wins over the configured level.
pub fn effective_level(debug: bool, configured: &str) -> &str {
    if debug {
        "debug"
    } else {
        configured
    }
}

/// Initialize logging with the specified level.
///
/// `RUST_LOG` still takes precedence when set.
pub fn init(level: &str) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_flag_overrides_config() {
        assert_eq!(effective_level(true, "warn"), "debug");
        assert_eq!(effective_level(false, "warn"), "warn");
    }
}
