//! Import settings shared by the library and the command line.

use std::time::Duration;

use crate::error::{ImportError, Result};

pub const DEFAULT_BATCH_SIZE: usize = 5000;

pub const DEFAULT_TIMESTAMP_COLUMN: &str = "timestamp";

/// Default timestamp layout (`YYYY-MM-DD hh:mm:ss`).
pub const DEFAULT_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub const DEFAULT_MEASUREMENT: &str = "data";
pub const DEFAULT_SEPARATOR: char = ',';
pub const DEFAULT_SERVER: &str = "http://localhost:8086";
pub const DEFAULT_DATABASE: &str = "test";

#[derive(Debug, Clone)]
pub struct ImportConfig {
    pub measurement: String,
    pub batch_size: usize,
    // header and data rows share one separator
    pub separator: u8,
    pub tag_columns: Vec<String>,
    pub timestamp_column: String,
    /// strftime-style layout of every timestamp in the file.
    pub timestamp_format: String,
    pub retry: RetryPolicy,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            measurement: DEFAULT_MEASUREMENT.to_string(),
            batch_size: DEFAULT_BATCH_SIZE,
            separator: DEFAULT_SEPARATOR as u8,
            tag_columns: Vec::new(),
            timestamp_column: DEFAULT_TIMESTAMP_COLUMN.to_string(),
            timestamp_format: DEFAULT_TIMESTAMP_FORMAT.to_string(),
            retry: RetryPolicy::default(),
        }
    }
}

impl ImportConfig {
    /// Check invariants that would otherwise surface mid-run.
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(ImportError::config("batch size must be at least 1"));
        }
        if self.timestamp_column.is_empty() {
            return Err(ImportError::config("timestamp column name is empty"));
        }
        self.retry.validate()
    }
}

/// Exponential backoff between batch writes. There is no attempt cap.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(10),
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    fn validate(&self) -> Result<()> {
        if self.multiplier.is_nan() || self.multiplier < 1.0 {
            return Err(ImportError::config(format!(
                "retry multiplier must be >= 1.0, got {}",
                self.multiplier
            )));
        }
        if self.max_delay < self.initial_delay {
            return Err(ImportError::config(
                "retry max delay is shorter than the initial delay",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct InfluxConfig {
    pub server: String,
    pub database: String,
    /// Create the database when `SHOW DATABASES` does not list it.
    pub auto_create: bool,
}

impl Default for InfluxConfig {
    fn default() -> Self {
        Self {
            server: DEFAULT_SERVER.to_string(),
            database: DEFAULT_DATABASE.to_string(),
            auto_create: true,
        }
    }
}

/// Convert a user supplied separator into the single byte the reader needs.
pub fn parse_separator(raw: &str) -> Result<u8> {
    let mut chars = raw.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_ascii() => Ok(c as u8),
        _ => Err(ImportError::config(format!(
            "separator must be a single ASCII character, got '{}'",
            raw
        ))),
    }
}

/// Split a separator-delimited list of tag names. Names are trimmed and
/// empty entries are dropped.
pub fn parse_tag_columns(raw: &str, separator: u8) -> Vec<String> {
    raw.split(separator as char)
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}
