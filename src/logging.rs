// src/logging.rs

//! Tracing setup: console output plus an optional non-blocking log file.

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::LoggingConfig;
use crate::error::Result;

/// Installs the global subscriber. `RUST_LOG` wins over the configured level.
/// Fails if a global subscriber is already set.
///
/// Keep the returned guard alive for the lifetime of the program, otherwise
/// buffered file output is lost.
pub fn init(config: &LoggingConfig, verbose: bool) -> Result<Option<WorkerGuard>> {
    let default_level = if verbose { "debug" } else { config.level.as_str() };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("ozon_tracker={default_level},warn")));

    let console = fmt::layer().with_target(false);

    if !config.file_enabled {
        tracing_subscriber::registry()
            .with(filter)
            .with(console)
            .try_init()?;
        return Ok(None);
    }

    std::fs::create_dir_all(&config.dir)?;
    let appender = tracing_appender::rolling::never(&config.dir, &config.file);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let file = fmt::layer().with_ansi(false).with_writer(writer);

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file)
        .try_init()?;

    Ok(Some(guard))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ScraperError;

    #[test]
    fn second_init_reports_the_existing_subscriber() {
        let config = LoggingConfig {
            file_enabled: false,
            ..LoggingConfig::default()
        };

        assert!(init(&config, false).unwrap().is_none());
        assert!(matches!(init(&config, false), Err(ScraperError::Logging(_))));
    }
}
