//! Tracing subscriber setup.
//!
//! Output format is config-driven: "json" for log shipping, anything else
//! falls back to the human-readable pretty printer. A `RUST_LOG`
//! environment variable overrides the configured directives entirely.

use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

/// Install the global subscriber. Call once at startup, before any
/// background job is spawned.
pub fn init_logging(config: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| build_filter(&config.level));
    let registry = tracing_subscriber::registry().with(filter);

    if config.format == "json" {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_events(FmtSpan::CLOSE)
                    .with_target(true),
            )
            .init();
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .pretty()
                    .with_span_events(FmtSpan::CLOSE)
                    .with_target(true),
            )
            .init();
    }
}

/// Expand a bare level like "info" into directives that keep sqlx's
/// per-query logging quiet. A level string that already carries its own
/// `target=level` directives is passed through untouched.
fn build_filter(level: &str) -> EnvFilter {
    if level.contains('=') {
        EnvFilter::new(level)
    } else {
        EnvFilter::new(format!("{level},sqlx=warn"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_level_quiets_sqlx() {
        let filter = build_filter("info");
        assert!(filter.to_string().contains("sqlx=warn"));
    }

    #[test]
    fn test_explicit_directives_pass_through() {
        let filter = build_filter("info,sqlx=debug");
        let rendered = filter.to_string();
        assert!(rendered.contains("sqlx=debug"));
        assert!(!rendered.contains("sqlx=warn"));
    }
}
