/// Run logging for the escalation service
///
/// Tags every line with the subsystem it came from (feed, store, or the
/// run itself) and an optional zone or date context. Lines go to the
/// console for interactive runs and, when configured, to an append-only
/// file so unattended daily runs leave a trail.

use chrono::Local;
use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::model::ProviderError;

// ---------------------------------------------------------------------------
// Log Levels
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warning => "WARN",
            LogLevel::Error => "ERROR",
        })
    }
}

// ---------------------------------------------------------------------------
// Data Source Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataSource {
    /// The municipal hourly open-data feed.
    Feed,
    /// The date-keyed snapshot store.
    Store,
    /// The service itself (startup, scene resolution, shutdown).
    System,
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DataSource::Feed => "FEED",
            DataSource::Store => "STORE",
            DataSource::System => "SYS",
        })
    }
}

// ---------------------------------------------------------------------------
// Failure Classification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureType {
    /// Expected failure - a condition the feed is known to produce routinely
    Expected,
    /// Unexpected failure - indicates service degradation or a format change
    Unexpected,
    /// Unknown - could go either way, judge from the surrounding context
    Unknown,
}

impl fmt::Display for FailureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FailureType::Expected => "EXPECTED",
            FailureType::Unexpected => "UNEXPECTED",
            FailureType::Unknown => "UNKNOWN",
        })
    }
}

/// Classify a feed failure from its error variant.
///
/// Transport problems and 5xx answers recur whenever the municipal portal
/// has a bad night and usually clear on their own; a body that no longer
/// parses means the format changed and someone has to look at it.
pub fn classify_feed_failure(error: &ProviderError) -> FailureType {
    match error {
        ProviderError::Transport(_) => FailureType::Unknown,
        ProviderError::HttpStatus(code) if (500..=599).contains(code) => FailureType::Unknown,
        ProviderError::HttpStatus(_) => FailureType::Unexpected,
        ProviderError::Malformed(_) => FailureType::Unexpected,
    }
}

// ---------------------------------------------------------------------------
// Logger
// ---------------------------------------------------------------------------

/// Process-wide logger, set once by `init_logger`
static LOGGER: Mutex<Option<Logger>> = Mutex::new(None);

struct Logger {
    threshold: LogLevel,
    file: Option<PathBuf>,
}

impl Logger {
    fn emit(&self, level: LogLevel, source: &DataSource, context: Option<&str>, message: &str) {
        if level < self.threshold {
            return;
        }

        let context_part = context.map(|c| format!(" [{}]", c)).unwrap_or_default();

        // Warnings and errors go to stderr so cron mails them even when
        // stdout is discarded.
        match level {
            LogLevel::Error => eprintln!("✗ {}{}: {}", source, context_part, message),
            LogLevel::Warning => eprintln!("⚠ {}{}: {}", source, context_part, message),
            LogLevel::Info => println!("{}{}: {}", source, context_part, message),
            LogLevel::Debug => println!("  {}{}: {}", source, context_part, message),
        }

        if let Some(path) = &self.file {
            let line = format!(
                "{} {} {}{}: {}",
                Local::now().format("%Y-%m-%d %H:%M:%S"),
                level,
                source,
                context_part,
                message
            );
            if let Err(e) = append_line(path, &line) {
                eprintln!("Could not append to log file {}: {}", path.display(), e);
            }
        }
    }
}

fn append_line(path: &Path, line: &str) -> std::io::Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{}", line)
}

// ---------------------------------------------------------------------------
// Public Logging Functions
// ---------------------------------------------------------------------------

/// Installs the process-wide logger. Calling it again replaces the
/// previous configuration; until it is called, logging is a no-op.
pub fn init_logger(threshold: LogLevel, file: Option<&str>) {
    *LOGGER.lock().unwrap() = Some(Logger {
        threshold,
        file: file.map(PathBuf::from),
    });
}

fn dispatch(level: LogLevel, source: DataSource, context: Option<&str>, message: &str) {
    if let Some(logger) = LOGGER.lock().unwrap().as_ref() {
        logger.emit(level, &source, context, message);
    }
}

pub fn info(source: DataSource, context: Option<&str>, message: &str) {
    dispatch(LogLevel::Info, source, context, message);
}

pub fn warn(source: DataSource, context: Option<&str>, message: &str) {
    dispatch(LogLevel::Warning, source, context, message);
}

pub fn error(source: DataSource, context: Option<&str>, message: &str) {
    dispatch(LogLevel::Error, source, context, message);
}

pub fn debug(source: DataSource, context: Option<&str>, message: &str) {
    dispatch(LogLevel::Debug, source, context, message);
}

// ---------------------------------------------------------------------------
// Structured Failure Logging
// ---------------------------------------------------------------------------

/// Log a feed failure for one zone with automatic classification
pub fn log_feed_failure(zone_id: &str, operation: &str, err: &ProviderError) {
    let failure_type = classify_feed_failure(err);

    let message = format!("{} failed [{}]: {}", operation, failure_type, err);

    match failure_type {
        FailureType::Expected => debug(DataSource::Feed, Some(zone_id), &message),
        FailureType::Unexpected => error(DataSource::Feed, Some(zone_id), &message),
        FailureType::Unknown => warn(DataSource::Feed, Some(zone_id), &message),
    }
}

/// Log a summary of a retention sweep over the snapshot store
pub fn log_eviction_summary(deleted: usize, failed: usize) {
    let message = format!(
        "Retention sweep: {} record(s) deleted, {} failed",
        deleted, failed
    );

    if failed > 0 {
        // Not fatal: the next run sweeps again and the stale records are
        // never loaded in the meantime.
        warn(DataSource::Store, None, &message);
    } else if deleted > 0 {
        info(DataSource::Store, None, &message);
    } else {
        debug(DataSource::Store, None, &message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_ordering() {
        assert!(LogLevel::Debug < LogLevel::Info);
        assert!(LogLevel::Info < LogLevel::Warning);
        assert!(LogLevel::Warning < LogLevel::Error);
    }

    #[test]
    fn test_failure_classification() {
        let format_change = ProviderError::Malformed("no parseable rows".to_string());
        assert_eq!(classify_feed_failure(&format_change), FailureType::Unexpected);

        let bad_gateway = ProviderError::HttpStatus(502);
        assert_eq!(classify_feed_failure(&bad_gateway), FailureType::Unknown);

        let gone = ProviderError::HttpStatus(404);
        assert_eq!(classify_feed_failure(&gone), FailureType::Unexpected);

        let timeout = ProviderError::Transport("operation timed out".to_string());
        assert_eq!(classify_feed_failure(&timeout), FailureType::Unknown);
    }
}
