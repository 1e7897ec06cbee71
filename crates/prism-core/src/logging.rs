//! Logging system for the Prism presentation foundation
//!
//! Messages are emitted through `tracing`. On top of the subscriber's own
//! filter this module adds per-category levels and rate limiting, which keeps
//! per-frame failures (a broken trigger action re-firing every update) from
//! flooding the log.

use crate::config::LoggingConfig;
use crate::error::{PrismError, Result};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

/// Log levels, least severe first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl FromStr for LogLevel {
    type Err = PrismError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            other => Err(PrismError::configuration(format!("Unknown log level '{}'", other))),
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Subsystem a message belongs to. Levels and rate limits are kept per category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LogCategory {
    Core,
    Properties,
    Uvml,
    Styles,
    /// Trigger evaluation runs every update; defaults to `warn`
    Triggers,
    Content,
}

impl LogCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogCategory::Core => "core",
            LogCategory::Properties => "properties",
            LogCategory::Uvml => "uvml",
            LogCategory::Styles => "styles",
            LogCategory::Triggers => "triggers",
            LogCategory::Content => "content",
        }
    }
}

impl fmt::Display for LogCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Fixed window admitting at most `limit` messages per `length`
#[derive(Debug)]
struct RateWindow {
    opened: Instant,
    admitted: u32,
}

impl RateWindow {
    fn new(now: Instant) -> Self {
        Self {
            opened: now,
            admitted: 0,
        }
    }

    fn admit(&mut self, now: Instant, limit: u32, length: Duration) -> bool {
        if now.saturating_duration_since(self.opened) >= length {
            *self = Self::new(now);
        }
        if self.admitted >= limit {
            return false;
        }
        self.admitted += 1;
        true
    }
}

/// Category thresholds resolved from a [`LoggingConfig`], plus rate-limit windows
#[derive(Debug)]
pub struct CategoryFilter {
    default_level: LogLevel,
    levels: HashMap<String, LogLevel>,
    limit: u32,
    window: Duration,
    windows: Mutex<HashMap<String, RateWindow>>,
}

impl CategoryFilter {
    /// Resolve every level string of `config` up front
    pub fn new(config: &LoggingConfig) -> Result<Self> {
        let default_level: LogLevel = config.default_level.parse()?;
        let levels = config
            .category_levels
            .iter()
            .map(|(category, level)| -> Result<(String, LogLevel)> {
                Ok((category.clone(), level.parse()?))
            })
            .collect::<Result<HashMap<_, _>>>()?;

        Ok(Self {
            default_level,
            levels,
            limit: config.max_rate_limit_count,
            window: Duration::from_secs(config.rate_limit_seconds),
            windows: Mutex::new(HashMap::new()),
        })
    }

    pub fn threshold(&self, category: &str) -> LogLevel {
        self.levels.get(category).copied().unwrap_or(self.default_level)
    }

    pub fn is_enabled(&self, category: &str, level: LogLevel) -> bool {
        level >= self.threshold(category)
    }

    /// Count a rate-limited message against the window of `category`
    pub fn admit(&self, category: &str) -> bool {
        self.admit_at(category, Instant::now())
    }

    fn admit_at(&self, category: &str, now: Instant) -> bool {
        let mut windows = self.windows.lock();
        let window = windows
            .entry(category.to_string())
            .or_insert_with(|| RateWindow::new(now));
        window.admit(now, self.limit, self.window)
    }
}

static FILTER: OnceLock<RwLock<CategoryFilter>> = OnceLock::new();

/// Install the category filter and a `tracing` subscriber.
///
/// `RUST_LOG` takes precedence over `default_level` for the subscriber. Calling
/// this again replaces the category filter and keeps the existing subscriber.
pub fn init(config: &LoggingConfig) -> Result<()> {
    reconfigure(config)?;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.default_level))
        .map_err(|e| PrismError::configuration(format!("Invalid log filter: {}", e)))?;

    if let Err(e) = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
    {
        tracing::debug!("Keeping existing tracing subscriber: {}", e);
    }

    Ok(())
}

/// Replace the category filter without touching the subscriber
pub fn reconfigure(config: &LoggingConfig) -> Result<()> {
    let filter = CategoryFilter::new(config)?;
    if let Err(filter) = FILTER.set(RwLock::new(filter)) {
        if let Some(current) = FILTER.get() {
            *current.write() = filter.into_inner();
        }
    }
    Ok(())
}

/// Backend of the `prism_*` macros
pub fn emit(level: LogLevel, category: LogCategory, message: fmt::Arguments<'_>, rate_limited: bool) {
    let name = category.as_str();
    if let Some(filter) = FILTER.get() {
        let filter = filter.read();
        if !filter.is_enabled(name, level) || (rate_limited && !filter.admit(name)) {
            return;
        }
    }

    match level {
        LogLevel::Trace => tracing::trace!(target: "prism", category = name, "{}", message),
        LogLevel::Debug => tracing::debug!(target: "prism", category = name, "{}", message),
        LogLevel::Info => tracing::info!(target: "prism", category = name, "{}", message),
        LogLevel::Warn => tracing::warn!(target: "prism", category = name, "{}", message),
        LogLevel::Error => tracing::error!(target: "prism", category = name, "{}", message),
    }
}

#[macro_export]
macro_rules! prism_trace {
    ($category:expr, $($arg:tt)*) => {
        $crate::logging::emit($crate::logging::LogLevel::Trace, $category, format_args!($($arg)*), false)
    };
}

#[macro_export]
macro_rules! prism_debug {
    ($category:expr, $($arg:tt)*) => {
        $crate::logging::emit($crate::logging::LogLevel::Debug, $category, format_args!($($arg)*), false)
    };
}

#[macro_export]
macro_rules! prism_info {
    ($category:expr, $($arg:tt)*) => {
        $crate::logging::emit($crate::logging::LogLevel::Info, $category, format_args!($($arg)*), false)
    };
}

#[macro_export]
macro_rules! prism_warn {
    ($category:expr, $($arg:tt)*) => {
        $crate::logging::emit($crate::logging::LogLevel::Warn, $category, format_args!($($arg)*), false)
    };
}

#[macro_export]
macro_rules! prism_error {
    ($category:expr, $($arg:tt)*) => {
        $crate::logging::emit($crate::logging::LogLevel::Error, $category, format_args!($($arg)*), false)
    };
}

// Rate-limited variants for messages that can repeat every update
#[macro_export]
macro_rules! prism_warn_rate_limited {
    ($category:expr, $($arg:tt)*) => {
        $crate::logging::emit($crate::logging::LogLevel::Warn, $category, format_args!($($arg)*), true)
    };
}

#[macro_export]
macro_rules! prism_error_rate_limited {
    ($category:expr, $($arg:tt)*) => {
        $crate::logging::emit($crate::logging::LogLevel::Error, $category, format_args!($($arg)*), true)
    };
}
