//! File-based debug log
//!
//! A process-wide log file in the temp directory. Off unless
//! `GRIDAGENT_DEBUG` is set; useful when the tool server runs as a child
//! process and its stderr is not visible.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::time::SystemTime;

use once_cell::sync::Lazy;
use parking_lot::Mutex;

use super::traits::{LogLevel, Logger};

pub const ENV_DEBUG: &str = "GRIDAGENT_DEBUG";
pub const ENV_LOG_LEVEL: &str = "GRIDAGENT_LOG_LEVEL";

struct FileLoggerState {
    file: Option<File>,
    min_level: LogLevel,
    enabled: bool,
}

impl FileLoggerState {
    fn from_env() -> Self {
        let enabled = std::env::var(ENV_DEBUG)
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);
        let min_level = std::env::var(ENV_LOG_LEVEL)
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(LogLevel::Debug);
        let file = if enabled {
            OpenOptions::new()
                .create(true)
                .append(true)
                .open(log_file_path())
                .ok()
        } else {
            None
        };
        Self {
            file,
            min_level,
            enabled,
        }
    }

    fn write(&mut self, level: LogLevel, module: &str, message: &str) {
        if !self.enabled || level < self.min_level {
            return;
        }
        if let Some(file) = self.file.as_mut() {
            let _ = writeln!(file, "[{}] [{}] [{}] {}", timestamp(), level, module, message);
            let _ = file.flush();
        }
    }
}

fn timestamp() -> String {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| {
            let secs = d.as_secs();
            format!(
                "{:02}:{:02}:{:02}.{:03}",
                (secs % 86400) / 3600,
                (secs % 3600) / 60,
                secs % 60,
                d.subsec_millis()
            )
        })
        .unwrap_or_else(|_| "??:??:??.???".to_string())
}

static STATE: Lazy<Mutex<FileLoggerState>> = Lazy::new(|| Mutex::new(FileLoggerState::from_env()));

pub fn log(level: LogLevel, module: &str, message: &str) {
    STATE.lock().write(level, module, message);
}

pub fn is_enabled() -> bool {
    STATE.lock().enabled
}

pub fn log_file_path() -> PathBuf {
    std::env::temp_dir().join("gridagent-debug.log")
}

/// `Logger` that writes into the debug log file under a module tag
#[derive(Debug, Clone)]
pub struct FileLogger {
    module: String,
}

impl FileLogger {
    pub fn new(module: impl Into<String>) -> Self {
        Self {
            module: module.into(),
        }
    }
}

impl Logger for FileLogger {
    fn log(&self, level: LogLevel, message: &str) {
        log(level, &self.module, message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_logger() {
        let logger = FileLogger::new("test");
        logger.debug("test message");
        logger.error("test message");
        assert!(log_file_path().ends_with("gridagent-debug.log"));
    }
}
