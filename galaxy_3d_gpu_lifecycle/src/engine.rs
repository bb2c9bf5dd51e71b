/// Galaxy3D Engine - global logging facade for the GPU lifecycle core
///
/// Descriptor heaps, command units and the headless backend all report through
/// the `engine_*` macros, which forward here. The logger is a process-wide
/// singleton stored behind an RwLock so it can be swapped at runtime
/// (e.g. by tests capturing entries).

use std::sync::{OnceLock, RwLock};
use std::time::SystemTime;
use crate::log::{Logger, LogEntry, LogSeverity, DefaultLogger};

// ===== INTERNAL STATE =====

/// Global logger (initialized with DefaultLogger)
static LOGGER: OnceLock<RwLock<Box<dyn Logger>>> = OnceLock::new();

fn logger() -> &'static RwLock<Box<dyn Logger>> {
    LOGGER.get_or_init(|| RwLock::new(Box::new(DefaultLogger::default())))
}

// ===== PUBLIC API =====

/// Engine-wide services shared by every component of the core
///
/// # Example
///
/// ```no_run
/// use galaxy_3d_gpu_lifecycle::galaxy3d::Engine;
/// use galaxy_3d_gpu_lifecycle::galaxy3d::log::{DefaultLogger, LogSeverity};
///
/// // Show per-frame diagnostics while debugging a stall
/// Engine::set_logger(DefaultLogger::new(LogSeverity::Debug));
/// ```
pub struct Engine;

impl Engine {
    /// Replace the global logger
    ///
    /// # Arguments
    ///
    /// * `new_logger` - Any type implementing the Logger trait
    pub fn set_logger<L: Logger + 'static>(new_logger: L) {
        if let Ok(mut lock) = logger().write() {
            *lock = Box::new(new_logger);
        }
    }

    /// Restore the default console logger
    pub fn reset_logger() {
        if let Ok(mut lock) = logger().write() {
            *lock = Box::new(DefaultLogger::default());
        }
    }

    /// Log an entry without source location
    ///
    /// Used by engine_trace!, engine_debug!, engine_info!, engine_warn!.
    ///
    /// # Arguments
    ///
    /// * `severity` - Log severity level
    /// * `source` - Emitting component (e.g., "galaxy3d::RenderingCommandUnit")
    /// * `message` - Log message
    pub fn log(severity: LogSeverity, source: &str, message: String) {
        Self::dispatch(LogEntry {
            severity,
            timestamp: SystemTime::now(),
            source: source.to_string(),
            message,
            file: None,
            line: None,
        });
    }

    /// Log an entry with file:line information
    ///
    /// Used by engine_error! and engine_err!.
    pub fn log_detailed(
        severity: LogSeverity,
        source: &str,
        message: String,
        file: &'static str,
        line: u32,
    ) {
        Self::dispatch(LogEntry {
            severity,
            timestamp: SystemTime::now(),
            source: source.to_string(),
            message,
            file: Some(file),
            line: Some(line),
        });
    }

    fn dispatch(entry: LogEntry) {
        // A poisoned lock means a logger panicked; drop the entry rather than propagate
        if let Ok(lock) = logger().read() {
            lock.log(&entry);
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
