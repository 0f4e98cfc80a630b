//! Tracing setup and decode instrumentation
//!
//! Decoders only emit events; installing a subscriber is left to the
//! binary, which calls [`init_with_config`] once at startup.

use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Subscriber settings
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Filter used when `RUST_LOG` is unset
    pub level: Level,
    /// Print module paths
    pub show_target: bool,
    /// Print thread ids, file and line
    pub show_location: bool,
}

impl TracingConfig {
    /// Map a `-v` count to a level: none is WARN, then INFO, DEBUG, TRACE
    pub fn for_verbosity(verbosity: u8) -> Self {
        let level = match verbosity {
            0 => Level::WARN,
            1 => Level::INFO,
            2 => Level::DEBUG,
            _ => Level::TRACE,
        };
        Self {
            level,
            show_target: verbosity >= 2,
            show_location: verbosity >= 3,
        }
    }
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self::for_verbosity(0)
    }
}

/// Install the default subscriber (warnings and errors)
pub fn init_default() -> bool {
    init_with_config(TracingConfig::default())
}

/// Install a stderr subscriber; `RUST_LOG` directives are added on top of
/// `config.level`. Returns false when a global subscriber already exists.
pub fn init_with_config(config: TracingConfig) -> bool {
    let filter = EnvFilter::from_default_env().add_directive(config.level.into());

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(config.show_target)
        .with_thread_ids(config.show_location)
        .with_file(config.show_location)
        .with_line_number(config.show_location);

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(filter)
        .try_init()
        .is_ok()
}

#[macro_export]
macro_rules! log_parse_start {
    ($parser:expr, $path:expr) => {
        tracing::debug!(parser = %$parser, path = %$path.display(), "Decoding file")
    };
}

#[macro_export]
macro_rules! log_parse_complete {
    ($parser:expr, $duration:expr, $items:expr) => {
        tracing::debug!(
            parser = %$parser,
            duration_ms = %$duration.as_millis(),
            items = %$items,
            "Decoded file"
        )
    };
}

#[macro_export]
macro_rules! log_parse_error {
    ($parser:expr, $error:expr) => {
        tracing::warn!(parser = %$parser, error = %$error, "Decode failed")
    };
}

/// Run `f` inside a `decode` span and report its elapsed time
pub fn instrument_parse<T, F>(name: &str, f: F) -> T
where
    F: FnOnce() -> T,
{
    let span = tracing::debug_span!("decode", parser = %name);
    let _guard = span.enter();

    let start = std::time::Instant::now();
    let result = f();
    tracing::trace!(duration_us = %start.elapsed().as_micros(), "Decode span closed");

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbosity_levels() {
        assert_eq!(TracingConfig::for_verbosity(0).level, Level::WARN);
        assert_eq!(TracingConfig::for_verbosity(1).level, Level::INFO);
        assert_eq!(TracingConfig::for_verbosity(2).level, Level::DEBUG);
        assert_eq!(TracingConfig::for_verbosity(9).level, Level::TRACE);
        assert!(!TracingConfig::default().show_location);
        assert!(TracingConfig::for_verbosity(3).show_location);
    }

    #[test]
    fn test_instrument_parse() {
        assert_eq!(instrument_parse("test", || 42), 42);
    }

    #[test]
    fn test_second_init_reports_existing_subscriber() {
        init_default();
        assert!(!init_default());
    }

    #[test]
    fn test_macros_in_expression_position() {
        let path = std::path::Path::new("hero.csf");
        let outcome: Result<u32, String> = Err("bad".to_string());
        match &outcome {
            Ok(_) => log_parse_complete!("Skeleton Parser", std::time::Duration::ZERO, 1),
            Err(e) => log_parse_error!("Skeleton Parser", e),
        }
        log_parse_start!("Skeleton Parser", path);
    }
}
