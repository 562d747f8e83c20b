//! Logging setup for corral.
//!
//! Library code only emits `tracing` events; nothing is printed until a
//! subscriber is installed. Binaries call [`init`] once at startup. Output
//! goes to stderr.
//!
//! # Environment Variables
//!
//! - `CORRAL_DEBUG=true|1|yes` - Enable debug logging
//! - `CORRAL_LOG_LEVEL=trace|debug|info|warn|error` - Set a specific level
//! - `CORRAL_LOG_FORMAT=json|pretty|compact` - Output format (default: compact)
//!
//! ```rust,no_run
//! use corral_core::logging;
//!
//! logging::init();
//! // or, ignoring the environment level:
//! logging::init_with_level("debug");
//! ```
//!
//! Installing a subscriber requires the `tracing-subscriber` feature.

use std::env;
use std::fmt;
use std::sync::Once;

static INIT: Once = Once::new();

/// Crates whose events the installed filter lets through.
const TARGETS: &[&str] = &["corral", "corral_core", "corral_postgres", "corral_cli"];

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Structured JSON lines.
    Json,
    /// Multi-line human output.
    Pretty,
    /// Single-line human output.
    #[default]
    Compact,
}

impl LogFormat {
    fn parse(value: &str) -> Self {
        match value.to_lowercase().as_str() {
            "json" => Self::Json,
            "pretty" => Self::Pretty,
            _ => Self::Compact,
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json => write!(f, "json"),
            Self::Pretty => write!(f, "pretty"),
            Self::Compact => write!(f, "compact"),
        }
    }
}

/// Resolved logging settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    /// Level applied to every corral crate.
    pub level: &'static str,
    /// Output format.
    pub format: LogFormat,
    /// Whether anything asked for logging at all.
    pub enabled: bool,
}

impl LogSettings {
    /// Read settings from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Read settings through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let debug = lookup("CORRAL_DEBUG")
            .map(|v| matches!(v.to_lowercase().as_str(), "true" | "1" | "yes"))
            .unwrap_or(false);
        let explicit = lookup("CORRAL_LOG_LEVEL").and_then(|v| parse_level(&v));
        let format = lookup("CORRAL_LOG_FORMAT")
            .map(|v| LogFormat::parse(&v))
            .unwrap_or_default();

        let level = match explicit {
            Some(level) => level,
            None if debug => "debug",
            None => "warn",
        };

        Self {
            level,
            format,
            enabled: debug || explicit.is_some(),
        }
    }

    /// The `EnvFilter` directive string for these settings.
    pub fn directives(&self) -> String {
        TARGETS
            .iter()
            .map(|target| format!("{target}={}", self.level))
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Normalize a level name, or `None` if it is not one.
pub fn parse_level(value: &str) -> Option<&'static str> {
    match value.to_lowercase().as_str() {
        "trace" => Some("trace"),
        "debug" => Some("debug"),
        "info" => Some("info"),
        "warn" | "warning" => Some("warn"),
        "error" => Some("error"),
        _ => None,
    }
}

/// Check if `CORRAL_DEBUG` is enabled.
#[inline]
pub fn is_debug_enabled() -> bool {
    env::var("CORRAL_DEBUG")
        .map(|v| matches!(v.to_lowercase().as_str(), "true" | "1" | "yes"))
        .unwrap_or(false)
}

/// Initialize logging from the environment.
///
/// Does nothing unless `CORRAL_DEBUG` or `CORRAL_LOG_LEVEL` is set.
/// Subsequent calls are no-ops.
pub fn init() {
    let settings = LogSettings::from_env();
    if settings.enabled {
        install(settings);
    }
}

/// Initialize logging at `level`, keeping the format from the environment.
///
/// Unknown levels fall back to `warn`.
pub fn init_with_level(level: &str) {
    let mut settings = LogSettings::from_env();
    settings.level = parse_level(level).unwrap_or("warn");
    settings.enabled = true;
    install(settings);
}

fn install(settings: LogSettings) {
    INIT.call_once(|| {
        #[cfg(feature = "tracing-subscriber")]
        {
            use tracing_subscriber::{EnvFilter, fmt, prelude::*};

            let filter = EnvFilter::try_new(settings.directives())
                .unwrap_or_else(|_| EnvFilter::new("warn"));
            let registry = tracing_subscriber::registry().with(filter);

            // Another subscriber may already be installed (e.g. by a test harness).
            let installed = match settings.format {
                LogFormat::Json => registry
                    .with(fmt::layer().json().with_writer(std::io::stderr))
                    .try_init(),
                LogFormat::Pretty => registry
                    .with(fmt::layer().pretty().with_writer(std::io::stderr))
                    .try_init(),
                LogFormat::Compact => registry
                    .with(fmt::layer().compact().with_writer(std::io::stderr))
                    .try_init(),
            };

            if installed.is_ok() {
                tracing::info!(
                    level = settings.level,
                    format = %settings.format,
                    "Corral logging initialized"
                );
            }
        }

        #[cfg(not(feature = "tracing-subscriber"))]
        {
            let _ = settings;
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn settings(vars: &[(&str, &str)]) -> LogSettings {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        LogSettings::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_disabled_by_default() {
        let s = settings(&[]);
        assert!(!s.enabled);
        assert_eq!(s.level, "warn");
        assert_eq!(s.format, LogFormat::Compact);
    }

    #[test]
    fn test_debug_flag() {
        let s = settings(&[("CORRAL_DEBUG", "YES")]);
        assert!(s.enabled);
        assert_eq!(s.level, "debug");
    }

    #[test]
    fn test_explicit_level_wins() {
        let s = settings(&[
            ("CORRAL_DEBUG", "1"),
            ("CORRAL_LOG_LEVEL", "Trace"),
            ("CORRAL_LOG_FORMAT", "json"),
        ]);
        assert_eq!(s.level, "trace");
        assert_eq!(s.format, LogFormat::Json);
    }

    #[test]
    fn test_unknown_level_is_ignored() {
        let s = settings(&[("CORRAL_LOG_LEVEL", "loud")]);
        assert!(!s.enabled);
        assert_eq!(s.level, "warn");
    }

    #[test]
    fn test_directives_cover_every_crate() {
        let s = settings(&[("CORRAL_LOG_LEVEL", "info")]);
        assert_eq!(
            s.directives(),
            "corral=info,corral_core=info,corral_postgres=info,corral_cli=info"
        );
    }
}
