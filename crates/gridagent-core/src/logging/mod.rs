//! Logging abstractions

mod console;
pub mod file_logger;
mod noop;
mod traits;

pub use console::ConsoleLogger;
pub use file_logger::{log_file_path, FileLogger};
pub use noop::NoOpLogger;
pub use traits::{LogLevel, Logger, SharedLogger};
