//! Logging support
//!
//! Two layers: process-level logging bootstrap on `flexi_logger` (text/json
//! formats, optional file sink, runtime level reconfiguration), and the
//! `Logger` collaborator trait injected into the plugin registry and the
//! interaction manager. The console implementation forwards to the `log`
//! facade so host applications keep a single log pipeline.

use std::sync::OnceLock;
use std::time::Duration;

// Global static logger handle for flexi_logger
static LOGGER_HANDLE: OnceLock<std::sync::Mutex<flexi_logger::LoggerHandle>> = OnceLock::new();

/// Injected logging collaborator
///
/// `source` identifies the emitting component ("registry",
/// "interaction-manager"), `category` the event class ("lifecycle",
/// "capability", "mode").
pub trait Logger: Send + Sync {
    fn is_enabled(&self, level: log::Level) -> bool;
    fn debug(&self, source: &str, category: &str, message: &str);
    fn info(&self, source: &str, category: &str, message: &str);
    fn warn(&self, source: &str, category: &str, message: &str);
    fn error(&self, source: &str, category: &str, message: &str);
    fn perf(&self, source: &str, category: &str, message: &str, elapsed: Duration);
}

/// Logger that discards everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopLogger;

impl Logger for NoopLogger {
    fn is_enabled(&self, _level: log::Level) -> bool {
        false
    }
    fn debug(&self, _source: &str, _category: &str, _message: &str) {}
    fn info(&self, _source: &str, _category: &str, _message: &str) {}
    fn warn(&self, _source: &str, _category: &str, _message: &str) {}
    fn error(&self, _source: &str, _category: &str, _message: &str) {}
    fn perf(&self, _source: &str, _category: &str, _message: &str, _elapsed: Duration) {}
}

/// Logger backed by the `log` facade
///
/// Uses the emitting component as the log target so hosts can filter per
/// subsystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleLogger;

impl Logger for ConsoleLogger {
    fn is_enabled(&self, level: log::Level) -> bool {
        log::log_enabled!(level)
    }

    fn debug(&self, source: &str, category: &str, message: &str) {
        log::debug!(target: source, "[{}] {}", category, message);
    }

    fn info(&self, source: &str, category: &str, message: &str) {
        log::info!(target: source, "[{}] {}", category, message);
    }

    fn warn(&self, source: &str, category: &str, message: &str) {
        log::warn!(target: source, "[{}] {}", category, message);
    }

    fn error(&self, source: &str, category: &str, message: &str) {
        log::error!(target: source, "[{}] {}", category, message);
    }

    fn perf(&self, source: &str, category: &str, message: &str, elapsed: Duration) {
        log::info!(target: source, "[perf:{}] {} ({:?})", category, message, elapsed);
    }
}

/// Initialize process-level logging with flexi_logger
///
/// `log_format` selects "text" (default), "ext" (with target) or "json".
/// When `log_file` is set, output goes to that file instead of stderr.
pub fn init_logging(
    log_level: Option<&str>,
    log_format: Option<&str>,
    log_file: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    use flexi_logger::{FileSpec, Logger};

    let level_str = log_level.unwrap_or("info");
    let format_type = log_format.unwrap_or("text");

    let mut logger = Logger::try_with_str(level_str)?;

    logger = match format_type {
        "json" => logger.format(json_format),
        "ext" => logger.format(extended_format),
        _ => logger.format(simple_format),
    };

    if let Some(file_path) = log_file {
        let file_spec = FileSpec::try_from(std::path::Path::new(file_path))?;
        logger = logger.log_to_file(file_spec);
    }

    let handle = logger.start()?;
    let _ = LOGGER_HANDLE.set(std::sync::Mutex::new(handle));

    Ok(())
}

/// Reconfigure the log level at runtime
///
/// Format and file sink are fixed at initialization; only the level spec can
/// change afterwards.
pub fn reconfigure_log_level(log_level: &str) -> Result<(), Box<dyn std::error::Error>> {
    match LOGGER_HANDLE.get() {
        Some(handle_mutex) => {
            let mut handle = handle_mutex
                .lock()
                .map_err(|_| "Could not acquire logger handle lock")?;
            handle.parse_and_push_temp_spec(log_level)?;
            Ok(())
        }
        None => Err("Logging has not been initialized".into()),
    }
}

fn simple_format(
    w: &mut dyn std::io::Write,
    now: &mut flexi_logger::DeferredNow,
    record: &log::Record,
) -> Result<(), std::io::Error> {
    write!(
        w,
        "{} [{}] {}",
        now.format("%Y-%m-%d %H:%M:%S%.3f"),
        record.level(),
        record.args()
    )
}

fn extended_format(
    w: &mut dyn std::io::Write,
    now: &mut flexi_logger::DeferredNow,
    record: &log::Record,
) -> Result<(), std::io::Error> {
    write!(
        w,
        "{} [{}] {}: {}",
        now.format("%Y-%m-%d %H:%M:%S%.3f"),
        record.level(),
        record.target(),
        record.args()
    )
}

fn json_format(
    w: &mut dyn std::io::Write,
    now: &mut flexi_logger::DeferredNow,
    record: &log::Record,
) -> Result<(), std::io::Error> {
    let entry = serde_json::json!({
        "timestamp": now.format("%Y-%m-%dT%H:%M:%S%.3f%:z").to_string(),
        "level": record.level().to_string(),
        "target": record.target(),
        "message": record.args().to_string(),
    });
    write!(w, "{}", entry)
}
