//! Tracing setup.

use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info";

/// Filter from `--log-level`, else `RUST_LOG`, else `info`.
pub fn filter(level: Option<&str>) -> EnvFilter {
    match level {
        Some(directives) => EnvFilter::try_new(directives).unwrap_or_else(|e| {
            eprintln!("Invalid log level '{}': {}; using {}", directives, e, DEFAULT_FILTER);
            EnvFilter::new(DEFAULT_FILTER)
        }),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER)),
    }
}

/// Install the global subscriber, logging to stderr so stdout stays clean for reports.
pub fn init(level: Option<&str>) {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter(level))
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_level() {
        assert_eq!(filter(Some("debug")).to_string(), "debug");
        assert_eq!(
            filter(Some("kgforge_builder=trace")).to_string(),
            "kgforge_builder=trace"
        );
    }

    #[test]
    fn test_invalid_level_falls_back() {
        assert_eq!(filter(Some("kgforge=loud")).to_string(), DEFAULT_FILTER);
    }
}
