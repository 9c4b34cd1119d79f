//! Tracing setup
//!
//! Level priority: `KAFKA_PLEASE_LOG` > `RUST_LOG` > `info`. The legacy value
//! `KAFKA_PLEASE_LOG=verbose` means `debug`; any other value is used as an
//! `EnvFilter` directive.

use std::env;
use tracing_subscriber::EnvFilter;

pub const ENV_LOG: &str = "KAFKA_PLEASE_LOG";
const DEFAULT_LEVEL: &str = "info";

/// Filter directive from the environment.
pub fn resolve_level() -> String {
    match env::var(ENV_LOG) {
        Ok(value) if value.eq_ignore_ascii_case("verbose") => "debug".to_string(),
        Ok(value) if !value.trim().is_empty() => value,
        _ => env::var("RUST_LOG").unwrap_or_else(|_| DEFAULT_LEVEL.to_string()),
    }
}

/// Install a fmt subscriber filtered by `level`.
///
/// Safe to call more than once; only the first call installs anything.
/// Returns whether this call installed the subscriber.
pub fn init_logging(level: &str) -> bool {
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LEVEL));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbose_means_debug() {
        temp_env::with_vars([(ENV_LOG, Some("verbose")), ("RUST_LOG", Some("warn"))], || {
            assert_eq!(resolve_level(), "debug");
        });
    }

    #[test]
    fn test_kafka_please_log_wins_over_rust_log() {
        temp_env::with_vars(
            [(ENV_LOG, Some("kafka_please=trace")), ("RUST_LOG", Some("warn"))],
            || assert_eq!(resolve_level(), "kafka_please=trace"),
        );
    }

    #[test]
    fn test_falls_back_to_rust_log_then_info() {
        temp_env::with_vars([(ENV_LOG, None), ("RUST_LOG", Some("warn"))], || {
            assert_eq!(resolve_level(), "warn");
        });
        temp_env::with_vars([(ENV_LOG, None::<&str>), ("RUST_LOG", None)], || {
            assert_eq!(resolve_level(), "info");
        });
    }

    #[test]
    fn test_second_init_is_harmless() {
        init_logging("debug");
        assert!(!init_logging("info"));
    }
}
