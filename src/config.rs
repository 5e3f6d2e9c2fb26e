use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::duration::{deserialize_duration, serialize_duration};
use crate::ledger::{CalendarEnd, NormalizeOptions, WeekStart, WindowRules, DEFAULT_EXPENSE_CATEGORY};

/// Default reporting currency.
fn default_reporting_currency() -> String {
    "USD".to_string()
}

fn default_timezone() -> String {
    "UTC".to_string()
}

/// Display/output formatting configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// If set, money values are rounded to this many decimal places when
    /// rendered. Calculations always use full precision.
    pub currency_decimals: Option<u32>,

    /// Render thousands separators in `*_display` fields.
    pub currency_grouping: bool,

    /// Optional currency symbol (e.g. "$") for `*_display` fields.
    pub currency_symbol: Option<String>,

    /// Pad display values to exactly `currency_decimals` places.
    pub currency_fixed_decimals: bool,
}

/// How reports are windowed, bucketed and ranked.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportingConfig {
    /// End of "this week/month/quarter/year" windows: `to_date` or `period_end`.
    pub calendar_end: CalendarEnd,

    pub week_start: WeekStart,

    /// Category for expenses without tags.
    pub default_expense_category: String,

    /// Size of top-client and top-category rankings.
    pub top: usize,

    /// Window used when a report does not name one, in days.
    pub trailing_days: u32,

    /// Emit zero rows for months without activity inside the monthly series.
    pub include_empty_months: bool,
}

impl Default for ReportingConfig {
    fn default() -> Self {
        Self {
            calendar_end: CalendarEnd::default(),
            week_start: WeekStart::default(),
            default_expense_category: DEFAULT_EXPENSE_CATEGORY.to_string(),
            top: 5,
            trailing_days: 30,
            include_empty_months: false,
        }
    }
}

fn default_lookup_timeout() -> Duration {
    Duration::from_secs(5)
}

/// Payment-history lookup settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PaymentsConfig {
    /// Base URL of the payment API. When unset, payments come from the
    /// snapshot file in the data directory.
    pub base_url: Option<String>,

    /// Upper bound for a single repair's lookup.
    #[serde(
        default = "default_lookup_timeout",
        deserialize_with = "deserialize_duration",
        serialize_with = "serialize_duration"
    )]
    pub lookup_timeout: Duration,

    pub max_concurrent_lookups: usize,
}

impl Default for PaymentsConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            lookup_timeout: default_lookup_timeout(),
            max_concurrent_lookups: 8,
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Path to data directory. If relative, resolved from config file location.
    /// If not specified, defaults to the config file's directory.
    pub data_dir: Option<PathBuf>,

    /// Currency label attached to report output. No conversion is done.
    #[serde(default = "default_reporting_currency")]
    pub reporting_currency: String,

    /// IANA zone used for calendar windows and month buckets.
    #[serde(default = "default_timezone")]
    pub timezone: String,

    #[serde(default)]
    pub display: DisplayConfig,

    #[serde(default)]
    pub reporting: ReportingConfig,

    #[serde(default)]
    pub payments: PaymentsConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: None,
            reporting_currency: default_reporting_currency(),
            timezone: default_timezone(),
            display: DisplayConfig::default(),
            reporting: ReportingConfig::default(),
            payments: PaymentsConfig::default(),
        }
    }
}

impl Config {
    /// Load config from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Resolve the data directory path.
    ///
    /// If `data_dir` is set and relative, it's resolved relative to `config_dir`.
    /// If `data_dir` is not set, returns `config_dir`.
    pub fn resolve_data_dir(&self, config_dir: &Path) -> PathBuf {
        match &self.data_dir {
            Some(data_dir) if data_dir.is_absolute() => data_dir.clone(),
            Some(data_dir) => config_dir.join(data_dir),
            None => config_dir.to_path_buf(),
        }
    }
}

fn parse_timezone(name: &str) -> Result<Tz> {
    let trimmed = name.trim();
    if trimmed.eq_ignore_ascii_case("utc") {
        return Ok(chrono_tz::UTC);
    }
    trimmed.parse().map_err(|_| {
        anyhow::anyhow!("Invalid timezone '{trimmed}' (expected IANA name, e.g. America/New_York)")
    })
}

/// Loaded configuration with resolved paths and time zone.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub data_dir: PathBuf,
    pub reporting_currency: String,
    pub timezone: Tz,
    pub display: DisplayConfig,
    pub reporting: ReportingConfig,
    pub payments: PaymentsConfig,
}

impl ResolvedConfig {
    pub fn from_config(config: Config, data_dir: PathBuf) -> Result<Self> {
        let timezone = parse_timezone(&config.timezone)?;
        if config.payments.max_concurrent_lookups == 0 {
            anyhow::bail!("payments.max_concurrent_lookups must be at least 1");
        }
        if config.payments.lookup_timeout.is_zero() {
            anyhow::bail!("payments.lookup_timeout must be greater than zero");
        }
        if config.reporting.trailing_days == 0 {
            anyhow::bail!("reporting.trailing_days must be at least 1");
        }
        Ok(Self {
            data_dir,
            reporting_currency: config.reporting_currency.trim().to_uppercase(),
            timezone,
            display: config.display,
            reporting: config.reporting,
            payments: config.payments,
        })
    }

    /// Load and resolve config from a file path.
    ///
    /// The data directory is resolved relative to the config file's parent directory.
    pub fn load(config_path: &Path) -> Result<Self> {
        let config_path = config_path
            .canonicalize()
            .with_context(|| format!("Config file not found: {}", config_path.display()))?;

        let config_dir = config_path
            .parent()
            .context("Config file has no parent directory")?;

        let config = Config::load(&config_path)?;
        let data_dir = config.resolve_data_dir(config_dir);
        Self::from_config(config, data_dir)
    }

    /// Load config, falling back to defaults if the file doesn't exist.
    ///
    /// Without a file, the intended config directory doubles as the data directory.
    pub fn load_or_default(config_path: &Path) -> Result<Self> {
        if config_path.exists() {
            return Self::load(config_path);
        }

        let config_path = if config_path.is_relative() {
            std::env::current_dir()
                .context("Failed to get current directory")?
                .join(config_path)
        } else {
            config_path.to_path_buf()
        };

        let config_dir = config_path
            .parent()
            .context("Config path has no parent directory")?;

        Self::from_config(Config::default(), config_dir.to_path_buf())
    }

    pub fn window_rules(&self) -> WindowRules {
        WindowRules {
            tz: self.timezone,
            calendar_end: self.reporting.calendar_end,
            week_start: self.reporting.week_start,
        }
    }

    pub fn normalize_options(&self) -> NormalizeOptions {
        NormalizeOptions {
            default_category: self.reporting.default_expense_category.clone(),
            max_concurrent_lookups: self.payments.max_concurrent_lookups,
            lookup_timeout: self.payments.lookup_timeout,
        }
    }
}

/// Returns the default config file path.
///
/// Resolution order:
/// 1. `./shopledger.toml` if it exists in current directory
/// 2. `~/.local/share/shopledger/shopledger.toml` (XDG data directory)
pub fn default_config_path() -> PathBuf {
    let local_config = PathBuf::from("shopledger.toml");
    if local_config.exists() {
        return local_config;
    }

    if let Some(data_dir) = dirs::data_dir() {
        return data_dir.join("shopledger").join("shopledger.toml");
    }

    local_config
}
