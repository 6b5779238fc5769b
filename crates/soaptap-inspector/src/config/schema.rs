use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use soaptap_core::error::{Result, TapError};

use super::source::LayeredConfig;

/// Recognised configuration keys.
pub mod keys {
    pub const ENABLE_LOGGING: &str = "EnableLogging";
    pub const LOGGING_PATH: &str = "LoggingPath";
    pub const MAX_MESSAGE_SIZE: &str = "MaxMessageSize";
    pub const RAW_CONSOLE: &str = "RawConsole";
    pub const CANONICAL_CONSOLE: &str = "CanonicalConsole";
    pub const RAW_FILE: &str = "RawFile";
    pub const CANONICAL_FILE: &str = "CanonicalFile";
}

pub const DEFAULT_MAX_MESSAGE_SIZE: i64 = 5_242_880;

/// Directory (under the base path) holding per-day log folders.
pub const LOG_ROOT: &str = "MessageLogs";

/// Replaced by the resolution date (`16Oct2026`) in `LoggingPath`.
pub const DATE_PLACEHOLDER: &str = "{date}";

/// Per-variant, per-destination output switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SinkToggles {
    pub raw_console: bool,
    pub canonical_console: bool,
    pub raw_file: bool,
    pub canonical_file: bool,
}

impl SinkToggles {
    pub fn any_console(&self) -> bool {
        self.raw_console || self.canonical_console
    }

    pub fn any_file(&self) -> bool {
        self.raw_file || self.canonical_file
    }

    /// Whether any enabled output needs the canonical rewrite.
    pub fn wants_canonical(&self) -> bool {
        self.canonical_console || self.canonical_file
    }
}

/// Immutable configuration snapshot, resolved once at startup.
#[derive(Debug, Clone)]
pub struct Settings {
    pub logging_enabled: bool,
    pub log_directory_template: String,
    /// `log_directory_template` with the date expanded.
    pub log_directory: PathBuf,
    /// Used when `log_directory` cannot be created.
    pub fallback_directory: PathBuf,
    pub max_buffer_bytes: usize,
    pub sinks: SinkToggles,
}

impl Settings {
    pub fn from_lookup(config: &LayeredConfig, base_dir: &Path, today: NaiveDate) -> Result<Self> {
        let default_template = base_dir
            .join(LOG_ROOT)
            .join(DATE_PLACEHOLDER)
            .to_string_lossy()
            .into_owned();
        let log_directory_template = config.get_string(keys::LOGGING_PATH, &default_template);

        let max = config.get_int(keys::MAX_MESSAGE_SIZE, DEFAULT_MAX_MESSAGE_SIZE);
        let max_buffer_bytes = usize::try_from(max)
            .map_err(|_| TapError::Config(format!("{} must not be negative (got {max})", keys::MAX_MESSAGE_SIZE)))?;

        let settings = Self {
            logging_enabled: config.get_bool(keys::ENABLE_LOGGING, true),
            log_directory: expand_template(&log_directory_template, today),
            log_directory_template,
            fallback_directory: base_dir.join(LOG_ROOT),
            max_buffer_bytes,
            sinks: SinkToggles {
                raw_console: config.get_bool(keys::RAW_CONSOLE, false),
                canonical_console: config.get_bool(keys::CANONICAL_CONSOLE, false),
                raw_file: config.get_bool(keys::RAW_FILE, false),
                canonical_file: config.get_bool(keys::CANONICAL_FILE, true),
            },
        };
        settings.validate()?;
        Ok(settings)
    }

    /// All defaults, rooted at `base_dir`.
    pub fn with_defaults(base_dir: &Path, today: NaiveDate) -> Result<Self> {
        Self::from_lookup(&LayeredConfig::new(), base_dir, today)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_buffer_bytes == 0 {
            return Err(TapError::Config(format!("{} must be greater than 0", keys::MAX_MESSAGE_SIZE)));
        }
        if self.log_directory_template.trim().is_empty() {
            return Err(TapError::Config(format!("{} must not be empty", keys::LOGGING_PATH)));
        }
        Ok(())
    }
}

fn expand_template(template: &str, today: NaiveDate) -> PathBuf {
    let date = today.format("%d%b%Y").to_string();
    PathBuf::from(template.replace(DATE_PLACEHOLDER, &date))
}
