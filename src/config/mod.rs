//! Configuration management for stormwatch
//!
//! This module handles loading and validating configuration from environment
//! variables and TOML files. Every section has defaults matching the
//! Atlantic basin and the NHC advisory cadence, so a partial file is valid.

use anyhow::{Context, Result};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::models::{StrengthFilter, DEFAULT_RETRY_BUDGET};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Feed endpoints and admission filter
    pub feed: FeedConfig,

    /// Scan and retry timing
    pub schedule: ScheduleConfig,

    /// Post rendering
    pub display: DisplayConfig,

    /// HTTP client
    pub http: HttpConfig,

    /// Notification delivery
    pub notify: NotifyConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Feed endpoints and strength filter
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    /// Basin-wide feed polled by every scan
    pub basin_url: String,

    /// Advisory endpoint; `{wallet}` is replaced by the storm's wallet id
    pub advisory_url_template: String,

    /// Storm types admitted by automatic scans
    pub strengths: Vec<String>,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            basin_url: String::from("https://www.nhc.noaa.gov/index-at.xml"),
            advisory_url_template: String::from("https://www.nhc.noaa.gov/xml/TCP{wallet}.xml"),
            strengths: vec![String::from("tropical storm"), String::from("hurricane")],
        }
    }
}

impl FeedConfig {
    /// Advisory endpoint for a wallet id
    pub fn advisory_url(&self, wallet: &str) -> String {
        self.advisory_url_template.replace("{wallet}", wallet)
    }

    pub fn strength_filter(&self) -> StrengthFilter {
        StrengthFilter::new(&self.strengths)
    }
}

/// Scan and retry timing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Time between basin scans
    pub scan_interval_secs: u64,

    /// Time between attempts after a failed update
    pub retry_interval_secs: u64,

    /// Consecutive failed updates before a cyclone is dropped
    pub retry_budget: u32,

    /// Scans after which the blacklist is cleared
    pub blacklist_purge_cycles: u32,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            scan_interval_secs: 6 * 60 * 60,
            retry_interval_secs: 60,
            retry_budget: DEFAULT_RETRY_BUDGET,
            blacklist_purge_cycles: 30,
        }
    }
}

/// Post rendering
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// IANA timezone advisory times are rendered in
    pub timezone: String,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            timezone: String::from("America/New_York"),
        }
    }
}

/// HTTP client settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Request timeout in seconds
    pub request_timeout_secs: u64,

    /// User agent string
    pub user_agent: String,

    /// Upper bound on outgoing requests per second
    pub requests_per_second: u32,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: 30,
            user_agent: format!("stormwatch/{}", env!("CARGO_PKG_VERSION")),
            requests_per_second: 5,
        }
    }
}

/// Notification delivery
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifyConfig {
    /// Chat relay endpoint; posts go to stdout when absent
    pub webhook_url: Option<String>,

    /// Bearer token for the relay
    pub webhook_token: Option<String>,

    /// Destination used until `init` sets one
    pub destination: Option<String>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (text or json)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: String::from("info"),
            format: String::from("text"),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse::<T>().ok())
}

impl Config {
    /// Load configuration from `STORMWATCH_*` environment variables
    ///
    /// Unset or unparsable variables fall back to the defaults.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let strengths = std::env::var("STORMWATCH_STRENGTHS")
            .map(|v| {
                v.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or(defaults.feed.strengths);

        Ok(Self {
            feed: FeedConfig {
                basin_url: std::env::var("STORMWATCH_BASIN_URL")
                    .unwrap_or(defaults.feed.basin_url),
                advisory_url_template: std::env::var("STORMWATCH_ADVISORY_URL_TEMPLATE")
                    .unwrap_or(defaults.feed.advisory_url_template),
                strengths,
            },
            schedule: ScheduleConfig {
                scan_interval_secs: env_parse("STORMWATCH_SCAN_INTERVAL")
                    .unwrap_or(defaults.schedule.scan_interval_secs),
                retry_interval_secs: env_parse("STORMWATCH_RETRY_INTERVAL")
                    .unwrap_or(defaults.schedule.retry_interval_secs),
                retry_budget: env_parse("STORMWATCH_RETRY_BUDGET")
                    .unwrap_or(defaults.schedule.retry_budget),
                blacklist_purge_cycles: env_parse("STORMWATCH_BLACKLIST_PURGE_CYCLES")
                    .unwrap_or(defaults.schedule.blacklist_purge_cycles),
            },
            display: DisplayConfig {
                timezone: std::env::var("STORMWATCH_DISPLAY_TIMEZONE")
                    .unwrap_or(defaults.display.timezone),
            },
            http: HttpConfig {
                request_timeout_secs: env_parse("STORMWATCH_REQUEST_TIMEOUT")
                    .unwrap_or(defaults.http.request_timeout_secs),
                user_agent: std::env::var("STORMWATCH_USER_AGENT")
                    .unwrap_or(defaults.http.user_agent),
                requests_per_second: env_parse("STORMWATCH_RATE_LIMIT")
                    .unwrap_or(defaults.http.requests_per_second),
            },
            notify: NotifyConfig {
                webhook_url: std::env::var("STORMWATCH_WEBHOOK_URL").ok(),
                webhook_token: std::env::var("STORMWATCH_WEBHOOK_TOKEN").ok(),
                destination: std::env::var("STORMWATCH_DESTINATION").ok(),
            },
            logging: LoggingConfig {
                level: std::env::var("STORMWATCH_LOG_LEVEL").unwrap_or(defaults.logging.level),
                format: std::env::var("STORMWATCH_LOG_FORMAT").unwrap_or(defaults.logging.format),
            },
        })
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config file: {}", path.display()))?;

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.feed.basin_url.trim().is_empty() {
            anyhow::bail!("feed.basin_url must not be empty");
        }

        if !self.feed.advisory_url_template.contains("{wallet}") {
            anyhow::bail!("feed.advisory_url_template must contain {{wallet}}");
        }

        if self.schedule.scan_interval_secs == 0 {
            anyhow::bail!("schedule.scan_interval_secs must be greater than 0");
        }

        if self.schedule.retry_interval_secs == 0 {
            anyhow::bail!("schedule.retry_interval_secs must be greater than 0");
        }

        if self.schedule.retry_budget == 0 {
            anyhow::bail!("schedule.retry_budget must be greater than 0");
        }

        if self.http.request_timeout_secs == 0 {
            anyhow::bail!("http.request_timeout_secs must be greater than 0");
        }

        self.display_timezone()?;

        Ok(())
    }

    /// Parsed display timezone
    pub fn display_timezone(&self) -> Result<Tz> {
        self.display
            .timezone
            .parse::<Tz>()
            .map_err(|e| anyhow::anyhow!("Unknown display timezone {:?}: {e}", self.display.timezone))
    }

    #[must_use]
    pub fn scan_interval(&self) -> Duration {
        Duration::from_secs(self.schedule.scan_interval_secs)
    }

    #[must_use]
    pub fn retry_interval(&self) -> Duration {
        Duration::from_secs(self.schedule.retry_interval_secs)
    }

    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.http.request_timeout_secs)
    }
}
