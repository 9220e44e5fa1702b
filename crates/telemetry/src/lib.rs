//! Tracing subscriber bootstrap.

use chatdb_kernel::settings::{LogFormat, TelemetrySettings};
use tracing_subscriber::EnvFilter;

/// Build the event filter: `RUST_LOG` wins, then the configured filter.
pub fn env_filter(settings: &TelemetrySettings) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.log_filter))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Initialize the global subscriber, writing to stderr so stdout stays free
/// for command output. Returns `false` if a subscriber was already set.
pub fn init(settings: &TelemetrySettings) -> bool {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter(settings))
        .with_writer(std::io::stderr);

    let installed = match settings.log_format {
        LogFormat::Pretty => builder.try_init().is_ok(),
        LogFormat::Json => builder.json().try_init().is_ok(),
    };

    if installed {
        tracing::debug!(
            target: "chatdb-telemetry",
            format = ?settings.log_format,
            "telemetry initialized"
        );
    }
    installed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_init_is_tolerated() {
        let settings = TelemetrySettings::default();
        init(&settings);
        assert!(!init(&settings));
    }

    #[test]
    fn invalid_configured_filter_falls_back() {
        let settings = TelemetrySettings {
            log_filter: "not a [valid filter".to_string(),
            ..TelemetrySettings::default()
        };
        // Only checks that construction does not panic.
        let _ = env_filter(&settings);
    }
}
