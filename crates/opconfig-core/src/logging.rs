/*!
 * Logging setup for opconfig.
 *
 * Everything in the workspace logs through `tracing`; this module installs a
 * `tracing-subscriber` formatter and offers span helpers for the store.
 */
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::LoggingSettings;
use crate::error::{Error, Result};

/// Initialize the logging system with default settings
pub fn init() -> Result<()> {
    init_with_settings(&LoggingSettings::default())
}

/// Initialize the logging system with a specific filter
///
/// `RUST_LOG` takes precedence when set.
pub fn init_with_filter(filter: &str) -> Result<()> {
    init_with_settings(&LoggingSettings {
        level: filter.to_string(),
        ..LoggingSettings::default()
    })
}

/// Initialize the logging system from [`LoggingSettings`]
///
/// The configured level must parse even when `RUST_LOG` overrides it.
pub fn init_with_settings(settings: &LoggingSettings) -> Result<()> {
    let configured = EnvFilter::try_new(&settings.level)
        .map_err(|e| Error::config(format!("Invalid log filter '{}': {}", settings.level, e)))?;
    let filter = EnvFilter::try_from_default_env().unwrap_or(configured);

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(settings.with_target))
        .with(filter)
        .try_init()
        .map_err(|e| Error::runtime(format!("Failed to initialize logging: {}", e)))?;

    Ok(())
}

/// A type alias for a tracing span
pub type Span = tracing::Span;

/// Span for work on one routine's configuration
pub fn opmode_span(opmode: &str) -> Span {
    tracing::info_span!("opmode", name = %opmode)
}

/// Span for a store operation, optionally scoped to a profile
pub fn operation_span(name: &str, profile: Option<&str>) -> Span {
    match profile {
        Some(profile) => tracing::info_span!("operation", name = %name, profile = %profile),
        None => tracing::info_span!("operation", name = %name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing::subscriber::{with_default, NoSubscriber};

    #[test]
    fn test_init() {
        // Another test may already have installed the global subscriber
        match init() {
            Ok(()) | Err(Error::Runtime(_)) => {}
            Err(e) => panic!("unexpected init error: {}", e),
        }
        assert!(matches!(init(), Err(Error::Runtime(_))));
    }

    #[test]
    fn test_invalid_filter() {
        assert!(matches!(
            init_with_filter("opconfig=loudest"),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_spans_without_subscriber() {
        with_default(NoSubscriber::default(), || {
            assert!(opmode_span("TeleOp").is_none());
            assert!(operation_span("load", Some("default")).is_none());
            assert!(operation_span("save", None).is_none());
        });
    }

    #[test]
    fn test_spans_with_subscriber() {
        with_default(tracing_subscriber::registry(), || {
            let span = opmode_span("TeleOp");
            let metadata = span.metadata().unwrap();
            assert_eq!(metadata.name(), "opmode");
            assert!(metadata.fields().field("name").is_some());

            let span = operation_span("configure", Some("default"));
            let metadata = span.metadata().unwrap();
            assert_eq!(metadata.name(), "operation");
            assert!(metadata.fields().field("profile").is_some());

            let span = operation_span("save", None);
            let metadata = span.metadata().unwrap();
            assert_eq!(metadata.name(), "operation");
            assert!(metadata.fields().field("profile").is_none());
        });
    }
}
