//! Logging initialization for the depscope CLI.
//!
//! Configures `tracing-subscriber` from the `[general]` section of
//! `DepscopeConfig`. Log lines go to stderr so stdout carries only
//! command output.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use depscope_core::config::GeneralConfig;

use crate::error::CliError;

/// Initialize the global tracing subscriber.
///
/// Must be called exactly once, before any tracing macros are used.
/// `RUST_LOG` takes precedence over `config.log_level`.
///
/// # Formats
///
/// * `"json"` - Machine-parseable JSON lines
/// * `"pretty"` - Human-readable colored output
pub fn init_tracing(config: &GeneralConfig) -> Result<(), CliError> {
    let env_filter = build_filter(&config.log_level)?;

    match config.log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(std::io::stderr),
                )
                .try_init()
                .map_err(|e| {
                    CliError::Command(format!(
                        "failed to initialize JSON tracing subscriber: {}",
                        e
                    ))
                })?;
        }
        "pretty" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .pretty()
                        .with_writer(std::io::stderr),
                )
                .try_init()
                .map_err(|e| {
                    CliError::Command(format!(
                        "failed to initialize pretty tracing subscriber: {}",
                        e
                    ))
                })?;
        }
        other => {
            return Err(CliError::Config(format!(
                "unknown log format '{}', expected 'json' or 'pretty'",
                other
            )));
        }
    }

    Ok(())
}

fn build_filter(level: &str) -> Result<EnvFilter, CliError> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(level)
            .map_err(|e| CliError::Config(format!("invalid log level '{}': {}", level, e))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_build_filter_accepts_known_level() {
        // SAFETY: serialized test, no other thread reads RUST_LOG
        unsafe { std::env::remove_var("RUST_LOG") };
        assert!(build_filter("debug").is_ok());
    }

    #[test]
    #[serial]
    fn test_build_filter_rejects_garbage() {
        // SAFETY: serialized test, no other thread reads RUST_LOG
        unsafe { std::env::remove_var("RUST_LOG") };
        let err = build_filter("depscope=verbose").expect_err("should reject");
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_unknown_format_is_config_error() {
        let config = GeneralConfig {
            log_level: "info".to_owned(),
            log_format: "xml".to_owned(),
        };
        let err = init_tracing(&config).expect_err("xml is not a log format");
        assert_eq!(err.exit_code(), 2);
    }
}
