//! Logging infrastructure for ado-migrator.
//!
//! This module provides tracing-based logging with support for:
//! - Multiple output targets (stderr, file)
//! - Configurable log levels (`off` disables logging entirely)
//! - Selectable format (text or JSON)
//!
//! Logging is set up before the full configuration is resolved, so the
//! relevant flags are read straight from the raw argument list. Logs go to
//! stderr or a file; stdout is reserved for progress output, and `--quiet`
//! without an explicit level drops routine per-item logs to `warn`.

use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

/// Log level configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Parse a log level from a string.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "trace" => Some(Self::Trace),
            "debug" => Some(Self::Debug),
            "info" => Some(Self::Info),
            "warn" | "warning" => Some(Self::Warn),
            "error" => Some(Self::Error),
            _ => None,
        }
    }

    /// Convert to a filter string for tracing-subscriber.
    #[must_use]
    pub fn as_filter_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable text format (default).
    #[default]
    Text,
    /// Structured JSON format.
    Json,
}

impl LogFormat {
    /// Parse a log format from a string.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "text" => Some(Self::Text),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Configuration for the logging system.
#[derive(Debug)]
pub struct LogConfig {
    /// Log level (None means logging is disabled).
    pub level: Option<LogLevel>,
    /// Output file path (None means stderr).
    pub file: Option<PathBuf>,
    /// Output format.
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Some(LogLevel::Info),
            file: None,
            format: LogFormat::Text,
        }
    }
}

/// Guard that must be held to ensure logs are flushed.
///
/// When this guard is dropped, all pending log messages are flushed.
/// Hold this until application exit.
pub struct LogGuard {
    _guard: WorkerGuard,
}

/// Initialize the logging system.
///
/// Returns `Some(LogGuard)` if logging was initialized, `None` if logging is
/// disabled or the log file could not be opened.
///
/// # Example
///
/// ```rust,no_run
/// use ado_migrator::logging::{LogConfig, LogLevel, LogFormat, init_logging};
/// use std::path::PathBuf;
///
/// let config = LogConfig {
///     level: Some(LogLevel::Debug),
///     file: Some(PathBuf::from("/tmp/ado-migrator.log")),
///     format: LogFormat::Text,
/// };
///
/// let _guard = init_logging(config);
/// ```
#[must_use = "the returned guard must be held until application exit"]
pub fn init_logging(config: LogConfig) -> Option<LogGuard> {
    let level = config.level?;

    // Only our own crate logs at the requested level; dependencies stay at warn
    let filter = EnvFilter::new(format!("warn,ado_migrator={}", level.as_filter_str()));

    let (non_blocking, guard) = match &config.file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .ok()?;
            tracing_appender::non_blocking(file)
        }
        None => tracing_appender::non_blocking(std::io::stderr()),
    };

    let to_file = config.file.is_some();
    match config.format {
        LogFormat::Json => {
            let layer = fmt::layer()
                .with_writer(non_blocking)
                .json()
                .with_span_events(FmtSpan::CLOSE)
                .with_file(to_file)
                .with_line_number(to_file);

            tracing_subscriber::registry()
                .with(filter)
                .with(layer)
                .init();
        }
        LogFormat::Text => {
            let layer = fmt::layer()
                .with_writer(non_blocking)
                .with_target(to_file)
                .with_level(true)
                .with_ansi(!to_file)
                .with_file(to_file)
                .with_line_number(to_file)
                .compact();

            tracing_subscriber::registry()
                .with(filter)
                .with(layer)
                .init();
        }
    }

    Some(LogGuard { _guard: guard })
}

/// Parse logging configuration from command-line arguments and environment.
///
/// This performs early parsing before full config resolution.
/// Precedence: CLI args > environment variables > defaults (info on stderr).
#[must_use]
pub fn parse_early_log_config(args: &[String]) -> LogConfig {
    let cli_level = extract_arg_value(args, "--log-level");
    let cli_file = extract_arg_value(args, "--log-file");
    let cli_format = extract_arg_value(args, "--log-format");

    let env_level = std::env::var("ADO_MIGRATOR_LOG_LEVEL").ok();
    let env_file = std::env::var("ADO_MIGRATOR_LOG_FILE").ok();
    let env_format = std::env::var("ADO_MIGRATOR_LOG_FORMAT").ok();

    let quiet = args.iter().any(|a| a == "--quiet" || a == "-q");
    let fallback = if quiet { LogLevel::Warn } else { LogLevel::default() };

    let level = match cli_level.or(env_level) {
        Some(s) if s.eq_ignore_ascii_case("off") => None,
        Some(s) => Some(LogLevel::parse(&s).unwrap_or(fallback)),
        None => Some(fallback),
    };

    LogConfig {
        level,
        file: cli_file.or(env_file).map(PathBuf::from),
        format: cli_format
            .or(env_format)
            .and_then(|s| LogFormat::parse(&s))
            .unwrap_or_default(),
    }
}

/// Extract a value following a flag in command-line arguments.
///
/// Both `--flag value` and `--flag=value` forms are accepted.
fn extract_arg_value(args: &[String], flag: &str) -> Option<String> {
    let prefix = format!("{}=", flag);
    args.iter()
        .find_map(|a| a.strip_prefix(&prefix).map(str::to_string))
        .or_else(|| args.windows(2).find(|w| w[0] == flag).map(|w| w[1].clone()))
}
