//! Tracing-based structured logging, initialized identically by every
//! worker binary, trimmed to the stdout-only path each worker needs
//! (workers run as containerized sidecars; log shipping is the
//! deployment's job, not this crate's).

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use super::config::LogFormat;

/// Initializes the global tracing subscriber. Safe to call once per
/// process; a second call is a logic error in a binary's `main`, not
/// something workers need to guard against at runtime.
pub fn init(level: &str, format: LogFormat) -> anyhow::Result<()> {
    let default_level = parse_level(level)?;
    let env_filter = EnvFilter::builder()
        .with_default_directive(default_level.into())
        .from_env_lossy();

    match format {
        LogFormat::Json => {
            let layer = tracing_subscriber::fmt::layer()
                .json()
                .with_target(true)
                .with_current_span(true)
                .with_filter(env_filter);
            tracing_subscriber::registry().with(layer).init();
        }
        LogFormat::Pretty => {
            let layer = tracing_subscriber::fmt::layer()
                .pretty()
                .with_target(true)
                .with_filter(env_filter);
            tracing_subscriber::registry().with(layer).init();
        }
    }

    tracing::info!(level, format = ?format, "logger initialized");
    Ok(())
}

fn parse_level(level: &str) -> anyhow::Result<Level> {
    match level.to_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        other => anyhow::bail!("invalid log level: {other}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_level_accepts_known_levels_case_insensitively() {
        assert!(matches!(parse_level("INFO"), Ok(Level::INFO)));
        assert!(matches!(parse_level("warn"), Ok(Level::WARN)));
        assert!(parse_level("verbose").is_err());
    }
}
