//! `tracing` subscriber setup
//!
//! Events go to stderr so stdout carries only command output. `RUST_LOG`
//! replaces the computed filter entirely when set.
//!
//! ```no_run
//! use sitesmith::util::logging::{self, LoggingConfig};
//!
//! logging::init_logging(LoggingConfig::from_env());
//! tracing::info!(project_id = "f1c2", "Generation started");
//! ```

use std::env;
use std::sync::Once;
use tracing::Level;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static SUBSCRIBER: Once = Once::new();

/// Dependencies whose debug output drowns out ours.
const NOISY_TARGETS: &[&str] = &["h2", "hyper", "reqwest", "genai"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Applies to sitesmith's own targets only
    pub level: Level,
    pub format: LogFormat,
    /// Adds source location and thread ids to every event
    pub detailed: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            format: LogFormat::Text,
            detailed: false,
        }
    }
}

impl LoggingConfig {
    /// Reads `SITESMITH_LOG_LEVEL` and `SITESMITH_LOG_JSON`; unparseable values are ignored.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(level) = env::var("SITESMITH_LOG_LEVEL").ok().and_then(|v| parse_level(&v)) {
            config.level = level;
        }
        if let Ok(json) = env::var("SITESMITH_LOG_JSON") {
            if matches!(json.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes") {
                config.format = LogFormat::Json;
                config.detailed = true;
            }
        }

        config
    }

    fn filter(&self) -> EnvFilter {
        if env::var_os("RUST_LOG").is_some() {
            return EnvFilter::from_default_env();
        }

        let directives = std::iter::once(format!("sitesmith={}", self.level))
            .chain(NOISY_TARGETS.iter().map(|target| format!("{}=warn", target)))
            .collect::<Vec<_>>()
            .join(",");

        EnvFilter::builder()
            .with_default_directive(LevelFilter::WARN.into())
            .parse_lossy(directives)
    }
}

/// Case-insensitive level name; `None` when unrecognized.
pub fn parse_level(value: &str) -> Option<Level> {
    match value.trim().to_ascii_lowercase().as_str() {
        "trace" => Some(Level::TRACE),
        "debug" => Some(Level::DEBUG),
        "info" => Some(Level::INFO),
        "warn" | "warning" => Some(Level::WARN),
        "error" => Some(Level::ERROR),
        _ => None,
    }
}

/// Installs the global subscriber. Only the first call in a process has any effect.
pub fn init_logging(config: LoggingConfig) {
    SUBSCRIBER.call_once(|| {
        let layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_file(config.detailed)
            .with_line_number(config.detailed)
            .with_thread_ids(config.detailed);
        let registry = tracing_subscriber::registry().with(config.filter());

        let installed = match config.format {
            LogFormat::Json => registry.with(layer.json()).try_init(),
            LogFormat::Text => registry.with(layer).try_init(),
        };
        if let Err(e) = installed {
            eprintln!("tracing subscriber not installed: {}", e);
        }
    });
}

pub fn init_from_env() {
    init_logging(LoggingConfig::from_env());
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_level_names() {
        assert_eq!(parse_level("Debug"), Some(Level::DEBUG));
        assert_eq!(parse_level(" WARNING "), Some(Level::WARN));
        assert_eq!(parse_level("error"), Some(Level::ERROR));
        assert_eq!(parse_level("loud"), None);
        assert_eq!(parse_level(""), None);
    }

    #[test]
    #[serial]
    fn test_env_selects_json() {
        env::set_var("SITESMITH_LOG_LEVEL", "trace");
        env::set_var("SITESMITH_LOG_JSON", "1");
        let config = LoggingConfig::from_env();
        env::remove_var("SITESMITH_LOG_LEVEL");
        env::remove_var("SITESMITH_LOG_JSON");

        assert_eq!(config.level, Level::TRACE);
        assert_eq!(config.format, LogFormat::Json);
        assert!(config.detailed);
    }

    #[test]
    #[serial]
    fn test_env_garbage_keeps_defaults() {
        env::set_var("SITESMITH_LOG_LEVEL", "chatty");
        env::set_var("SITESMITH_LOG_JSON", "maybe");
        let config = LoggingConfig::from_env();
        env::remove_var("SITESMITH_LOG_LEVEL");
        env::remove_var("SITESMITH_LOG_JSON");

        assert_eq!(config.level, Level::INFO);
        assert_eq!(config.format, LogFormat::Text);
    }
}
