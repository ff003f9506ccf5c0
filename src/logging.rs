//! Log sink bootstrap.
//!
//! `RUST_LOG` wins when set; otherwise the filter is derived from
//! `logger.log_level`, or forced to trace for posterforge crates with
//! `--verbose`.

use posterforge_common::config::{LogFormat, LoggerConfig};
use posterforge_common::{Error, Result};
use tracing_subscriber::EnvFilter;

const CRATES: &[&str] = &["posterforge", "posterforge_common", "posterforge_overlay"];

/// Filter directives used when `RUST_LOG` is unset.
pub fn default_filter(level: &str, verbose: bool) -> String {
    let level = if verbose { "trace" } else { level };
    let mut directives: Vec<String> = CRATES.iter().map(|c| format!("{c}={level}")).collect();
    directives.push("warn".to_string());
    directives.join(",")
}

/// Install the global subscriber. Fails if one is already installed.
pub fn init(config: &LoggerConfig, verbose: bool) -> Result<()> {
    let filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| default_filter(&config.log_level.to_lowercase(), verbose));
    let env_filter = EnvFilter::try_new(&filter)
        .map_err(|e| Error::ConfigInvalid(format!("log filter '{filter}': {e}")))?;

    let builder = tracing_subscriber::fmt().with_env_filter(env_filter);
    let installed = match config.format {
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    installed.map_err(|e| Error::internal(format!("failed to install log subscriber: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_filter_scopes_our_crates() {
        assert_eq!(
            default_filter("info", false),
            "posterforge=info,posterforge_common=info,posterforge_overlay=info,warn"
        );
    }

    #[test]
    fn verbose_forces_trace() {
        assert!(default_filter("warn", true).starts_with("posterforge=trace,"));
    }

    #[test]
    fn default_filters_parse() {
        for level in ["trace", "debug", "info", "warn", "error"] {
            assert!(EnvFilter::try_new(default_filter(level, false)).is_ok());
        }
    }
}
