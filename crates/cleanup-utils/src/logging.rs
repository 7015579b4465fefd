/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! # Cleanup Logging Module
//!
//! Process-wide logger behind the `log` facade.
//!
//! Every component of the cleanup service logs through the macros re-exported
//! from [`prelude`]. The logger writes to stderr, either as a single
//! timestamped text line or as one JSON object per record, and its level can
//! be changed while the service is running.
//!
//! ```rust,ignore
//! use cleanup_utils::logging::{self, prelude::*};
//!
//! logging::init_with_format("info", "json")?;
//! info!("deleted orphaned kafka topic {}", topic);
//! logging::update_log_level("debug")?;
//! ```

use log::{LevelFilter, Metadata, Record, SetLoggerError};
use once_cell::sync::OnceCell;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

pub use log::{debug, error, info, trace, warn};

static LOGGER: CleanupLogger = CleanupLogger;
static CURRENT_LEVEL: AtomicUsize = AtomicUsize::new(LevelFilter::Info as usize);
static JSON_FORMAT: AtomicBool = AtomicBool::new(false);
static INIT: OnceCell<()> = OnceCell::new();

/// Output format of the process logger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

impl LogFormat {
    /// Anything other than `json` (case-insensitive) falls back to text.
    pub fn parse(format: &str) -> Self {
        if format.eq_ignore_ascii_case("json") {
            LogFormat::Json
        } else {
            LogFormat::Text
        }
    }
}

/// Logger installed once per process by [`init`] or [`init_with_format`].
pub struct CleanupLogger;

impl CleanupLogger {
    fn render(record: &Record) -> String {
        if JSON_FORMAT.load(Ordering::Relaxed) {
            serde_json::json!({
                "timestamp": chrono::Utc::now().to_rfc3339(),
                "level": record.level().to_string().to_lowercase(),
                "target": record.target(),
                "message": record.args().to_string(),
                "module": record.module_path(),
                "line": record.line(),
            })
            .to_string()
        } else {
            format!(
                "{} - {} [{}]: {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.target(),
                record.args()
            )
        }
    }
}

impl log::Log for CleanupLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= current_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            eprintln!("{}", Self::render(record));
        }
    }

    fn flush(&self) {}
}

/// Initializes the process logger with text output.
pub fn init(level: &str) -> Result<(), SetLoggerError> {
    init_with_format(level, "text")
}

/// Initializes the process logger with the given level and format.
///
/// Calling this more than once is allowed; later calls only change the level
/// and the output format.
///
/// # Arguments
/// * `level` - "off", "error", "warn", "info", "debug" or "trace"; unknown values mean "info"
/// * `format` - "text" or "json"
pub fn init_with_format(level: &str, format: &str) -> Result<(), SetLoggerError> {
    let mut result = Ok(());
    INIT.get_or_init(|| {
        result = log::set_logger(&LOGGER);
    });
    result?;

    JSON_FORMAT.store(LogFormat::parse(format) == LogFormat::Json, Ordering::Relaxed);
    apply_level(str_to_level_filter(level));
    Ok(())
}

/// Changes the active log level at runtime.
///
/// Unknown level names leave the level at "info", matching [`init`].
pub fn update_log_level(level: &str) -> Result<(), String> {
    apply_level(str_to_level_filter(level));
    Ok(())
}

fn apply_level(filter: LevelFilter) {
    CURRENT_LEVEL.store(filter as usize, Ordering::Relaxed);
    log::set_max_level(filter);
}

fn current_level() -> LevelFilter {
    match CURRENT_LEVEL.load(Ordering::Relaxed) {
        0 => LevelFilter::Off,
        1 => LevelFilter::Error,
        2 => LevelFilter::Warn,
        3 => LevelFilter::Info,
        4 => LevelFilter::Debug,
        5 => LevelFilter::Trace,
        _ => LevelFilter::Off,
    }
}

fn str_to_level_filter(level: &str) -> LevelFilter {
    match level.to_lowercase().as_str() {
        "off" => LevelFilter::Off,
        "error" => LevelFilter::Error,
        "warn" => LevelFilter::Warn,
        "debug" => LevelFilter::Debug,
        "trace" => LevelFilter::Trace,
        _ => LevelFilter::Info,
    }
}

pub mod prelude {
    pub use log::{debug, error, info, trace, warn};
}
