//! Configuration loading and management.

use std::path::{Path, PathBuf};

use chrono::Weekday;
use chrono_tz::Tz;
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// IANA timezone name used to align calendar ticks.
    pub time_zone: String,
    /// First day of the week (e.g. "monday", "sunday").
    pub week_starts_on: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            time_zone: system_time_zone(),
            week_starts_on: "monday".to_string(),
        }
    }
}

impl Config {
    /// Loads configuration from default locations.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load() -> Result<Self, figment::Error> {
        Self::load_from(None)
    }

    /// Loads configuration, optionally from a specific file.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        // Load from default config location
        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        // Load from specified config file
        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        // Load from environment variables (ZL_*)
        figment = figment.merge(Env::prefixed("ZL_"));

        figment.extract()
    }

    /// Parses the configured timezone, falling back to UTC on garbage.
    pub fn parsed_time_zone(&self) -> Tz {
        self.time_zone.parse().unwrap_or_else(|_| {
            tracing::warn!(zone = %self.time_zone, "unknown timezone in config, using UTC");
            Tz::UTC
        })
    }

    /// Parses the configured week start, falling back to Monday.
    pub fn parsed_week_starts_on(&self) -> Weekday {
        self.week_starts_on.parse().unwrap_or_else(|_| {
            tracing::warn!(
                day = %self.week_starts_on,
                "unknown week start in config, using monday"
            );
            Weekday::Mon
        })
    }
}

/// The system's IANA timezone, or UTC when it cannot be determined.
fn system_time_zone() -> String {
    iana_time_zone::get_timezone().unwrap_or_else(|_| "UTC".to_string())
}

/// Returns the platform-specific config directory for zl.
fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("zl"))
}
