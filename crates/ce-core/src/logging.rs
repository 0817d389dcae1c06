//! Logging infrastructure

use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::{Config, LogLevel};

impl LogLevel {
    /// Tracing level for this setting, `None` when logging is off
    pub fn as_level(self) -> Option<Level> {
        match self {
            LogLevel::Off => None,
            LogLevel::Error => Some(Level::ERROR),
            LogLevel::Warn => Some(Level::WARN),
            LogLevel::Info => Some(Level::INFO),
            LogLevel::Debug => Some(Level::DEBUG),
            LogLevel::Trace => Some(Level::TRACE),
        }
    }
}

/// Initialize the logging system based on configuration
pub fn init(config: &Config) {
    let Some(level) = config.debug.log_level.as_level() else {
        return;
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    let subscriber = tracing_subscriber::registry().with(filter).with(
        fmt::layer()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true),
    );

    if config.debug.log_to_file {
        match std::fs::File::create(&config.debug.log_path) {
            Ok(file) => {
                let file_layer = fmt::layer().with_writer(file).with_ansi(false);
                let _ = subscriber.with(file_layer).try_init();
            }
            Err(e) => {
                let _ = subscriber.try_init();
                tracing::warn!("Could not open log file {}: {}", config.debug.log_path.display(), e);
            }
        }
    } else {
        let _ = subscriber.try_init();
    }
}

/// Initialize logging with default settings (for tests and quick starts)
pub fn init_default() {
    let filter = EnvFilter::from_default_env().add_directive(Level::INFO.into());

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .try_init();
}

// Component-specific logging

/// Log a PPU trace message
#[macro_export]
macro_rules! ppu_trace {
    ($($arg:tt)*) => {
        tracing::trace!(target: "ppu", $($arg)*)
    };
}

/// Log a PPU debug message
#[macro_export]
macro_rules! ppu_debug {
    ($($arg:tt)*) => {
        tracing::debug!(target: "ppu", $($arg)*)
    };
}

/// Log a PPU warning
#[macro_export]
macro_rules! ppu_warn {
    ($($arg:tt)*) => {
        tracing::warn!(target: "ppu", $($arg)*)
    };
}

/// Log a memory subsystem trace message
#[macro_export]
macro_rules! mem_trace {
    ($($arg:tt)*) => {
        tracing::trace!(target: "memory", $($arg)*)
    };
}

/// Log a kernel trace message
#[macro_export]
macro_rules! kernel_trace {
    ($($arg:tt)*) => {
        tracing::trace!(target: "kernel", $($arg)*)
    };
}

/// Log a kernel debug message
#[macro_export]
macro_rules! kernel_debug {
    ($($arg:tt)*) => {
        tracing::debug!(target: "kernel", $($arg)*)
    };
}
