//! Logging infrastructure for ado-gitter.
//!
//! Logging is opt-in. When a level is configured, a `tracing-subscriber` registry is
//! installed that writes through a `tracing-appender` non-blocking writer to stderr or to a
//! file, as text or JSON.

use std::io::Write;
use std::path::PathBuf;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

/// Environment variable holding the log level.
pub const LOG_LEVEL_ENV: &str = "ADO_GITTER_LOG_LEVEL";
/// Environment variable holding the log file path.
pub const LOG_FILE_ENV: &str = "ADO_GITTER_LOG_FILE";
/// Environment variable holding the log format.
pub const LOG_FORMAT_ENV: &str = "ADO_GITTER_LOG_FORMAT";

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
        match s.trim().to_lowercase().as_str() {
            "trace" => Some(Self::Trace),
            "debug" => Some(Self::Debug),
            "info" => Some(Self::Info),
            "warn" | "warning" => Some(Self::Warn),
            "error" => Some(Self::Error),
            _ => None,
        }
    }

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
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "text" => Some(Self::Text),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Configuration for the logging system.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct LogConfig {
    /// Log level (None means logging is disabled).
    pub level: Option<LogLevel>,
    /// Output file path (None means stderr).
    pub file: Option<PathBuf>,
    pub format: LogFormat,
}

impl LogConfig {
    /// The filter directive: the crate at the configured level, and the Azure DevOps client
    /// crate at warn so transport failures stay visible without request noise.
    #[must_use]
    pub fn filter_directive(&self) -> Option<String> {
        self.level.map(|level| {
            format!(
                "ado_gitter={},azure_devops_rust_api=warn",
                level.as_filter_str()
            )
        })
    }
}

/// Guard that must be held to ensure logs are flushed.
///
/// Pending log lines are flushed when the guard is dropped.
pub struct LogGuard {
    _worker_guard: WorkerGuard,
}

/// Initialize the logging system.
///
/// Returns `None` when logging is disabled or the log file cannot be opened. The guard
/// must be held until exit.
///
/// # Example
///
/// ```rust,no_run
/// use ado_gitter::logging::{LogConfig, LogFormat, LogLevel, init_logging};
/// use std::path::PathBuf;
///
/// let config = LogConfig {
///     level: Some(LogLevel::Debug),
///     file: Some(PathBuf::from("/tmp/ado-gitter.log")),
///     format: LogFormat::Json,
/// };
///
/// let _guard = init_logging(config);
/// ```
#[must_use = "the returned guard must be held until application exit"]
pub fn init_logging(config: LogConfig) -> Option<LogGuard> {
    let filter = EnvFilter::new(config.filter_directive()?);

    let to_file = config.file.is_some();
    let sink: Box<dyn Write + Send> = match &config.file {
        Some(path) => Box::new(
            std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .ok()?,
        ),
        None => Box::new(std::io::stderr()),
    };
    let (writer, worker_guard) = tracing_appender::non_blocking(sink);

    install_subscriber(filter, writer, config.format, to_file);

    Some(LogGuard {
        _worker_guard: worker_guard,
    })
}

/// Installs the global subscriber. File output carries source locations, stderr stays compact.
fn install_subscriber(filter: EnvFilter, writer: NonBlocking, format: LogFormat, to_file: bool) {
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .with_writer(writer)
                    .json()
                    .with_span_events(FmtSpan::CLOSE)
                    .with_file(to_file)
                    .with_line_number(to_file),
            )
            .init(),
        LogFormat::Text if to_file => registry
            .with(
                fmt::layer()
                    .with_writer(writer)
                    .with_ansi(false)
                    .with_target(true)
                    .with_file(true)
                    .with_line_number(true),
            )
            .init(),
        LogFormat::Text => registry
            .with(
                fmt::layer()
                    .with_writer(writer)
                    .with_target(true)
                    .compact(),
            )
            .init(),
    }
}

/// Parse logging configuration from command-line arguments and environment.
///
/// Runs before clap so that configuration loading itself can be traced.
/// Precedence: CLI args > environment variables.
#[must_use]
pub fn parse_early_log_config(args: &[String]) -> LogConfig {
    let lookup = |flag: &str, env_var: &str| {
        extract_arg_value(args, flag).or_else(|| std::env::var(env_var).ok())
    };

    LogConfig {
        level: lookup("--log-level", LOG_LEVEL_ENV).and_then(|s| LogLevel::parse(&s)),
        file: lookup("--log-file", LOG_FILE_ENV)
            .filter(|s| !s.is_empty())
            .map(PathBuf::from),
        format: lookup("--log-format", LOG_FORMAT_ENV)
            .and_then(|s| LogFormat::parse(&s))
            .unwrap_or_default(),
    }
}

/// Extract the value of a flag, written either `--flag value` or `--flag=value`.
fn extract_arg_value(args: &[String], flag: &str) -> Option<String> {
    let prefix = format!("{flag}=");
    args.iter().enumerate().find_map(|(i, arg)| {
        if arg == flag {
            args.get(i + 1).cloned()
        } else {
            arg.strip_prefix(&prefix).map(str::to_string)
        }
    })
}
