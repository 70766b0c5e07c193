//! Unit tests for log.rs
//!
//! Tests Logger trait, LogEntry, LogSeverity, DefaultLogger formatting and the log facade bridge.

use crate::log::{Logger, LogEntry, LogSeverity, DefaultLogger, LogFacadeLogger};
use std::time::SystemTime;

fn entry(severity: LogSeverity, file: Option<&'static str>, line: Option<u32>) -> LogEntry {
    LogEntry {
        severity,
        timestamp: SystemTime::now(),
        source: "lumen::RenderingContext".to_string(),
        message: "Swapchain rebuilt".to_string(),
        file,
        line,
    }
}

// ============================================================================
// LOG SEVERITY TESTS
// ============================================================================

#[test]
fn test_log_severity_ordering() {
    assert!(LogSeverity::Trace < LogSeverity::Debug);
    assert!(LogSeverity::Debug < LogSeverity::Info);
    assert!(LogSeverity::Info < LogSeverity::Warn);
    assert!(LogSeverity::Warn < LogSeverity::Error);
}

#[test]
fn test_log_severity_to_log_level() {
    assert_eq!(LogSeverity::Trace.to_log_level(), log::Level::Trace);
    assert_eq!(LogSeverity::Debug.to_log_level(), log::Level::Debug);
    assert_eq!(LogSeverity::Info.to_log_level(), log::Level::Info);
    assert_eq!(LogSeverity::Warn.to_log_level(), log::Level::Warn);
    assert_eq!(LogSeverity::Error.to_log_level(), log::Level::Error);
}

// ============================================================================
// DEFAULT LOGGER FORMAT TESTS
// ============================================================================

#[test]
fn test_format_plain_without_location() {
    let line = DefaultLogger::format_plain(&entry(LogSeverity::Info, None, None));
    assert!(line.contains("[INFO ]"));
    assert!(line.contains("[lumen::RenderingContext]"));
    assert!(line.ends_with("Swapchain rebuilt"));
}

#[test]
fn test_format_plain_with_location() {
    let line = DefaultLogger::format_plain(&entry(LogSeverity::Error, Some("context.rs"), Some(42)));
    assert!(line.contains("[ERROR]"));
    assert!(line.ends_with("Swapchain rebuilt (context.rs:42)"));
}

#[test]
fn test_format_plain_requires_both_file_and_line() {
    let line = DefaultLogger::format_plain(&entry(LogSeverity::Warn, Some("context.rs"), None));
    assert!(!line.contains("context.rs"));
}

#[test]
fn test_default_logger_does_not_panic() {
    let logger = DefaultLogger;
    logger.log(&entry(LogSeverity::Trace, None, None));
    logger.log(&entry(LogSeverity::Error, Some("file.rs"), Some(1)));
}

#[test]
fn test_facade_logger_does_not_panic_without_backend() {
    let logger = LogFacadeLogger;
    logger.log(&entry(LogSeverity::Debug, None, None));
    logger.log(&entry(LogSeverity::Error, Some("file.rs"), Some(7)));
}

#[test]
fn test_logger_trait_object() {
    let loggers: Vec<Box<dyn Logger>> = vec![Box::new(DefaultLogger), Box::new(LogFacadeLogger)];
    for logger in &loggers {
        logger.log(&entry(LogSeverity::Info, None, None));
    }
}
