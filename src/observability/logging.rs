//! Structured logging configuration.

use crate::config::LoggingSettings;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Default filter directive.
pub const DEFAULT_FILTER: &str = "newsroom=info,tower_http=info";

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable multi-line output.
    #[default]
    Pretty,
    /// One JSON object per event.
    Json,
}

impl LogFormat {
    /// Parses a format name, falling back to pretty.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "json" => Self::Json,
            _ => Self::Pretty,
        }
    }
}

/// Resolved logging configuration.
#[derive(Debug)]
pub struct LoggingConfig {
    /// Output format.
    pub format: LogFormat,
    /// Event filter.
    pub filter: EnvFilter,
    /// Directive the filter was built from.
    pub directive: String,
    /// Append to this file instead of stderr.
    pub file: Option<PathBuf>,
}

impl LoggingConfig {
    /// Builds logging configuration from config settings with env overrides.
    ///
    /// The filter directive comes from, in order: `RUST_LOG`,
    /// `NEWSROOM_LOG_LEVEL`, `[logging] level`, then `newsroom=debug` when
    /// verbose or [`DEFAULT_FILTER`] otherwise. `NEWSROOM_LOG_FORMAT` and
    /// `NEWSROOM_LOG_FILE` override the format and file.
    #[must_use]
    pub fn from_settings(settings: Option<&LoggingSettings>, verbose: bool) -> Self {
        let fallback = if verbose {
            "newsroom=debug,tower_http=debug"
        } else {
            DEFAULT_FILTER
        };
        let directive = env_value("RUST_LOG")
            .or_else(|| env_value("NEWSROOM_LOG_LEVEL"))
            .or_else(|| settings.and_then(|s| s.level.clone()))
            .unwrap_or_else(|| fallback.to_string());

        let format = env_value("NEWSROOM_LOG_FORMAT")
            .or_else(|| settings.and_then(|s| s.format.clone()))
            .map_or_else(LogFormat::default, |f| LogFormat::parse(&f));

        let file = env_value("NEWSROOM_LOG_FILE")
            .or_else(|| settings.and_then(|s| s.file.clone()))
            .map(PathBuf::from);

        let filter = EnvFilter::try_new(&directive).unwrap_or_else(|_| EnvFilter::new(fallback));

        Self {
            format,
            filter,
            directive,
            file,
        }
    }
}

fn env_value(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_parse() {
        assert_eq!(LogFormat::parse("JSON"), LogFormat::Json);
        assert_eq!(LogFormat::parse("pretty"), LogFormat::Pretty);
        assert_eq!(LogFormat::parse("other"), LogFormat::Pretty);
    }

    #[test]
    fn test_settings_file_and_format() {
        let settings = LoggingSettings {
            format: Some("json".to_string()),
            level: None,
            file: Some("/tmp/newsroom.log".to_string()),
        };
        let config = LoggingConfig::from_settings(Some(&settings), false);
        if std::env::var_os("NEWSROOM_LOG_FORMAT").is_none() {
            assert_eq!(config.format, LogFormat::Json);
        }
        if std::env::var_os("NEWSROOM_LOG_FILE").is_none() {
            assert_eq!(config.file, Some(PathBuf::from("/tmp/newsroom.log")));
        }
    }
}
