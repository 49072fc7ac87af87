//! # Logging Utilities
//!
//! Logging infrastructure for pcfind using `tracing`.
//!
//! Resolution results go to stdout, so every log line goes to stderr (and,
//! optionally, a file). Supported:
//! - Multiple output formats (JSON for machines, pretty for people)
//! - Environment variable configuration
//! - Log level filtering, including per-crate `RUST_LOG` directives
//! - File output next to the console
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pcfind_utils::init_logging;
//!
//! // Reads RUST_LOG, PCFIND_LOG_FORMAT and PCFIND_LOG_FILE
//! let _guard = init_logging().expect("Failed to initialize logging");
//!
//! tracing::info!("Application started");
//! ```
//!
//! ## Environment Variables
//!
//! - `RUST_LOG`: Log level filter (e.g., `RUST_LOG=debug`, `RUST_LOG=pcfind_core=trace`)
//! - `PCFIND_LOG_FORMAT`: Output format (`json` or `pretty`, default: `pretty`)
//! - `PCFIND_LOG_FILE`: Optional log file. A directory gets a dated
//!   `YYYY-MM-DD-pcfind.log` inside it.
//!
//! The returned [`LoggingGuard`] flushes the file writer when dropped; keep
//! it alive for as long as the program logs.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::{env, io};

use chrono::Utc;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::time::ChronoUtc;
use tracing_subscriber::fmt::{self};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

/// Environment variable selecting the output format
pub const LOG_FORMAT_ENV: &str = "PCFIND_LOG_FORMAT";
/// Environment variable naming the log file or directory
pub const LOG_FILE_ENV: &str = "PCFIND_LOG_FILE";

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat
{
    /// Pretty-printed, human-readable format (default)
    #[default]
    Pretty,
    /// One JSON object per line
    Json,
}

impl FromStr for LogFormat
{
    type Err = LoggingError;

    fn from_str(s: &str) -> Result<Self, Self::Err>
    {
        match s.to_lowercase().as_str() {
            "pretty" | "dev" | "development" => Ok(LogFormat::Pretty),
            "json" | "prod" | "production" => Ok(LogFormat::Json),
            _ => Err(LoggingError::InvalidFormat(format!("{s}. Use 'pretty' or 'json'"))),
        }
    }
}

/// Log level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel
{
    /// Error level
    Error,
    /// Warning level
    Warn,
    /// Info level (default)
    Info,
    /// Debug level
    Debug,
    /// Trace level (most verbose)
    Trace,
}

impl From<LogLevel> for Level
{
    fn from(level: LogLevel) -> Self
    {
        match level {
            LogLevel::Error => Level::ERROR,
            LogLevel::Warn => Level::WARN,
            LogLevel::Info => Level::INFO,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Trace => Level::TRACE,
        }
    }
}

impl FromStr for LogLevel
{
    type Err = LoggingError;

    fn from_str(s: &str) -> Result<Self, Self::Err>
    {
        match s.to_lowercase().as_str() {
            "error" | "err" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" | "dbg" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            _ => Err(LoggingError::InvalidLevel(format!(
                "{s}. Use 'error', 'warn', 'info', 'debug', or 'trace'"
            ))),
        }
    }
}

/// Keeps the background file writer alive. Dropping it flushes pending lines.
#[derive(Debug, Default)]
#[must_use = "dropping the guard stops file logging"]
pub struct LoggingGuard
{
    file: Option<WorkerGuard>,
    path: Option<PathBuf>,
}

impl LoggingGuard
{
    /// Where file logging writes, if enabled.
    pub fn log_file(&self) -> Option<&Path>
    {
        self.path.as_deref()
    }

    pub fn is_file_logging(&self) -> bool
    {
        self.file.is_some()
    }
}

/// Initialize logging with default settings
///
/// Reads configuration from environment variables:
/// - `RUST_LOG`: Log level filter (e.g., `debug`, `pcfind_core=debug`)
/// - `PCFIND_LOG_FORMAT`: Output format (`json` or `pretty`, default: `pretty`)
/// - `PCFIND_LOG_FILE`: Optional path to a log file or directory
///
/// Without `RUST_LOG`, only warnings and errors are shown.
///
/// ## Errors
///
/// Returns an error if:
/// - Logging is already initialized
/// - `PCFIND_LOG_FORMAT` holds an unknown format
/// - File logging fails (if `PCFIND_LOG_FILE` is set)
pub fn init_logging() -> Result<LoggingGuard, LoggingError>
{
    let format = match env::var(LOG_FORMAT_ENV) {
        Ok(value) => value.parse()?,
        Err(_) => LogFormat::default(),
    };
    let directives = env::var(EnvFilter::DEFAULT_ENV).unwrap_or_else(|_| Level::WARN.to_string());

    init_logging_internal(format, &directives, log_file_from_env())
}

/// Initialize logging with explicit level and format
///
/// The level overrides `RUST_LOG`. `PCFIND_LOG_FILE` is still honoured.
///
/// ## Example
///
/// ```rust,no_run
/// use pcfind_utils::{LogFormat, LogLevel, init_logging_with_level};
///
/// let _guard = init_logging_with_level(LogLevel::Debug, LogFormat::Pretty)
///     .expect("Failed to initialize logging");
/// ```
///
/// ## Errors
///
/// Returns an error if logging is already initialized or file logging fails.
pub fn init_logging_with_level(level: LogLevel, format: LogFormat) -> Result<LoggingGuard, LoggingError>
{
    init_logging_internal(format, &Level::from(level).to_string(), log_file_from_env())
}

fn log_file_from_env() -> Option<PathBuf>
{
    env::var_os(LOG_FILE_ENV)
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
}

/// Filter for one layer. Unparseable directives fall back to warnings only.
fn make_filter(directives: &str) -> EnvFilter
{
    EnvFilter::try_new(directives).unwrap_or_else(|_| EnvFilter::new(Level::WARN.to_string()))
}

/// Resolve the configured log path: directories get a dated file name.
fn resolve_log_path(configured: &Path) -> PathBuf
{
    if configured.is_dir() {
        let today = Utc::now().format("%Y-%m-%d");
        configured.join(format!("{today}-pcfind.log"))
    } else {
        configured.to_path_buf()
    }
}

fn console_layer(format: LogFormat, filter: EnvFilter) -> BoxedLayer
{
    match format {
        LogFormat::Pretty => fmt::layer()
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .with_timer(ChronoUtc::rfc_3339())
            .with_ansi(true)
            .with_writer(io::stderr)
            .with_filter(filter)
            .boxed(),
        LogFormat::Json => fmt::layer()
            .json()
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .with_timer(ChronoUtc::rfc_3339())
            .with_current_span(true)
            .with_span_list(true)
            .with_writer(io::stderr)
            .with_filter(filter)
            .boxed(),
    }
}

fn file_layer(format: LogFormat, filter: EnvFilter, path: &Path) -> Result<(BoxedLayer, WorkerGuard), LoggingError>
{
    let directory = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&directory)?;
    let file_name = path
        .file_name()
        .ok_or_else(|| LoggingError::InitializationFailed(format!("{} has no file name", path.display())))?;

    // The date is already in directory-derived names, so never roll.
    let appender = RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(file_name.to_string_lossy())
        .build(&directory)
        .map_err(|err| LoggingError::InitializationFailed(err.to_string()))?;
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let layer = match format {
        LogFormat::Pretty => fmt::layer()
            .with_writer(writer)
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .with_timer(ChronoUtc::rfc_3339())
            .with_ansi(false)
            .with_filter(filter)
            .boxed(),
        LogFormat::Json => fmt::layer()
            .json()
            .with_writer(writer)
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .with_timer(ChronoUtc::rfc_3339())
            .with_current_span(true)
            .with_span_list(true)
            .with_filter(filter)
            .boxed(),
    };
    Ok((layer, guard))
}

fn init_logging_internal(format: LogFormat, directives: &str, log_file: Option<PathBuf>) -> Result<LoggingGuard, LoggingError>
{
    let mut layers = Vec::with_capacity(2);
    let mut guard = LoggingGuard::default();

    if let Some(configured) = log_file {
        let path = resolve_log_path(&configured);
        let (layer, worker) = file_layer(format, make_filter(directives), &path)?;
        layers.push(layer);
        guard.file = Some(worker);
        guard.path = Some(path);
    }
    layers.insert(0, console_layer(format, make_filter(directives)));

    Registry::default()
        .with(layers)
        .try_init()
        .map_err(|err| LoggingError::InitializationFailed(err.to_string()))?;

    Ok(guard)
}

/// Logging initialization error
#[derive(Debug, thiserror::Error)]
pub enum LoggingError
{
    /// Invalid log format
    #[error("Invalid log format: {0}")]
    InvalidFormat(String),

    /// Invalid log level
    #[error("Invalid log level: {0}")]
    InvalidLevel(String),

    /// Failed to initialize logging
    #[error("Failed to initialize logging: {0}")]
    InitializationFailed(String),

    /// File logging error
    #[error("File logging error: {0}")]
    FileError(#[from] io::Error),
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_log_format_from_str()
    {
        assert_eq!(LogFormat::from_str("pretty").unwrap(), LogFormat::Pretty);
        assert_eq!(LogFormat::from_str("JSON").unwrap(), LogFormat::Json);
        assert_eq!(LogFormat::from_str("dev").unwrap(), LogFormat::Pretty);
        assert_eq!(LogFormat::from_str("prod").unwrap(), LogFormat::Json);
        assert!(matches!(
            LogFormat::from_str("xml"),
            Err(LoggingError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_log_level_from_str()
    {
        assert_eq!(LogLevel::from_str("error").unwrap(), LogLevel::Error);
        assert_eq!(LogLevel::from_str("warning").unwrap(), LogLevel::Warn);
        assert_eq!(LogLevel::from_str("info").unwrap(), LogLevel::Info);
        assert_eq!(LogLevel::from_str("dbg").unwrap(), LogLevel::Debug);
        assert_eq!(LogLevel::from_str("trace").unwrap(), LogLevel::Trace);
        assert!(matches!(
            LogLevel::from_str("loud"),
            Err(LoggingError::InvalidLevel(_))
        ));
    }

    #[test]
    fn test_log_level_to_tracing_level()
    {
        assert_eq!(Level::from(LogLevel::Error), Level::ERROR);
        assert_eq!(Level::from(LogLevel::Warn), Level::WARN);
        assert_eq!(Level::from(LogLevel::Info), Level::INFO);
        assert_eq!(Level::from(LogLevel::Debug), Level::DEBUG);
        assert_eq!(Level::from(LogLevel::Trace), Level::TRACE);
    }

    #[test]
    fn test_log_levels_order_by_verbosity()
    {
        assert!(LogLevel::Error < LogLevel::Warn);
        assert!(LogLevel::Debug < LogLevel::Trace);
    }

    #[test]
    fn test_directory_log_path_gets_dated_name()
    {
        let dir = env::temp_dir();
        let path = resolve_log_path(&dir);
        assert_eq!(path.parent(), Some(dir.as_path()));
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.ends_with("-pcfind.log"), "{name}");
        assert_eq!(name.len(), "YYYY-MM-DD-pcfind.log".len());
    }

    #[test]
    fn test_file_log_path_is_kept()
    {
        let path = env::temp_dir().join("pcfind-test-does-not-exist").join("run.log");
        assert_eq!(resolve_log_path(&path), path);
    }

    #[test]
    fn test_bad_directives_fall_back()
    {
        // Must not panic.
        let _ = make_filter("pcfind_core=[");
        let _ = make_filter("pcfind_core=trace,warn");
    }

    #[test]
    fn test_dropping_guard_flushes_file_lines()
    {
        let dir = env::temp_dir().join(format!("pcfind-logging-{}", std::process::id()));
        let path = dir.join("flush.log");
        let (layer, worker) = file_layer(LogFormat::Pretty, make_filter("info"), &path).unwrap();

        tracing::subscriber::with_default(Registry::default().with(layer), || {
            for line in 0..200 {
                tracing::info!(line, "queued for the file writer");
            }
        });
        drop(worker);

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.matches("queued for the file writer").count(), 200);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_default_guard_has_no_file()
    {
        let guard = LoggingGuard::default();
        assert!(!guard.is_file_logging());
        assert!(guard.log_file().is_none());
    }
}
