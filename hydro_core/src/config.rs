//! Configuration file support for Hydro.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/hydro/config.toml`.

use crate::goal::{GoalMode, GoalPolicy};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Recognized defaults, shared by config, state and the goal policy
pub mod defaults {
    pub const WEIGHT_KG: u32 = 65;
    pub const MIN_WEIGHT_KG: u32 = 30;
    pub const MAX_WEIGHT_KG: u32 = 200;
    pub const DAILY_GOAL_ML: u32 = 1700;
    pub const MIN_CUSTOM_GOAL_ML: u32 = 500;
    pub const MAX_CUSTOM_GOAL_ML: u32 = 5000;
    pub const RETENTION_DAYS: u32 = 30;
    pub const MAX_RETENTION_DAYS: u32 = 36_500;
    pub const MAX_RECORD_AMOUNT_ML: u32 = 5000;
    pub const BACKUP_THRESHOLD: u32 = 10;
    pub const REMINDER_INTERVAL_MINUTES: u32 = 60;
    pub const MIN_REMINDER_INTERVAL_MINUTES: u32 = 15;
    pub const MAX_REMINDER_INTERVAL_MINUTES: u32 = 120;
    pub const REMINDER_TICK_SECONDS: u64 = 30;
    pub const DEFAULT_AMOUNT_ML: u32 = 200;
    pub const MIN_DEFAULT_AMOUNT_ML: u32 = 50;
    pub const MAX_DEFAULT_AMOUNT_ML: u32 = 500;
}

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub goal: GoalConfig,

    #[serde(default)]
    pub reminder: ReminderConfig,

    #[serde(default)]
    pub retention: RetentionConfig,

    #[serde(default)]
    pub backup: BackupConfig,
}

/// Data storage configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DataConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

/// Which goal policy the settings layer selected
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GoalConfig {
    #[serde(default)]
    pub mode: GoalMode,

    #[serde(default = "default_custom_goal")]
    pub custom_goal: u32,
}

impl Default for GoalConfig {
    fn default() -> Self {
        Self {
            mode: GoalMode::default(),
            custom_goal: default_custom_goal(),
        }
    }
}

impl GoalConfig {
    pub fn policy(&self) -> GoalPolicy {
        GoalPolicy::from_mode(self.mode, self.custom_goal)
    }
}

/// Reminder timing configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReminderConfig {
    #[serde(default = "default_interval_minutes")]
    pub interval_minutes: u32,

    /// How often the watch loop wakes up to advance the scheduler
    #[serde(default = "default_tick_seconds")]
    pub tick_seconds: u64,

    /// Amount logged by `hydro add` when none is given
    #[serde(default = "default_amount_ml")]
    pub default_amount_ml: u32,
}

impl Default for ReminderConfig {
    fn default() -> Self {
        Self {
            interval_minutes: default_interval_minutes(),
            tick_seconds: default_tick_seconds(),
            default_amount_ml: default_amount_ml(),
        }
    }
}

/// Record retention configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetentionConfig {
    #[serde(default = "default_retention_days")]
    pub days: u32,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            days: default_retention_days(),
        }
    }
}

/// Backup rotation configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BackupConfig {
    #[serde(default = "default_backup_threshold")]
    pub threshold: u32,
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            threshold: default_backup_threshold(),
        }
    }
}

// Default value functions
fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".hydro")
}

fn default_custom_goal() -> u32 {
    defaults::DAILY_GOAL_ML
}

fn default_interval_minutes() -> u32 {
    defaults::REMINDER_INTERVAL_MINUTES
}

fn default_tick_seconds() -> u64 {
    defaults::REMINDER_TICK_SECONDS
}

fn default_amount_ml() -> u32 {
    defaults::DEFAULT_AMOUNT_ML
}

fn default_retention_days() -> u32 {
    defaults::RETENTION_DAYS
}

fn default_backup_threshold() -> u32 {
    defaults::BACKUP_THRESHOLD
}

impl Config {
    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        let base = dirs::config_dir().unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config")
        });
        base.join("hydro").join("config.toml")
    }

    /// Reject values outside the ranges the settings layer allows
    pub fn validate(&self) -> Result<()> {
        let reminder = &self.reminder;
        if !(defaults::MIN_REMINDER_INTERVAL_MINUTES..=defaults::MAX_REMINDER_INTERVAL_MINUTES)
            .contains(&reminder.interval_minutes)
        {
            return Err(Error::Config(format!(
                "reminder.interval_minutes = {} is outside {}..={}",
                reminder.interval_minutes,
                defaults::MIN_REMINDER_INTERVAL_MINUTES,
                defaults::MAX_REMINDER_INTERVAL_MINUTES
            )));
        }
        if reminder.tick_seconds == 0 {
            return Err(Error::Config("reminder.tick_seconds must be positive".into()));
        }
        if !(defaults::MIN_DEFAULT_AMOUNT_ML..=defaults::MAX_DEFAULT_AMOUNT_ML)
            .contains(&reminder.default_amount_ml)
        {
            return Err(Error::Config(format!(
                "reminder.default_amount_ml = {} is outside {}..={}",
                reminder.default_amount_ml,
                defaults::MIN_DEFAULT_AMOUNT_ML,
                defaults::MAX_DEFAULT_AMOUNT_ML
            )));
        }
        if self.goal.mode == GoalMode::Custom {
            self.goal
                .policy()
                .validate()
                .map_err(|e| Error::Config(format!("goal: {}", e)))?;
        }
        if !(1..=defaults::MAX_RETENTION_DAYS).contains(&self.retention.days) {
            return Err(Error::Config(format!(
                "retention.days = {} is outside 1..={}",
                self.retention.days,
                defaults::MAX_RETENTION_DAYS
            )));
        }
        if self.backup.threshold == 0 {
            return Err(Error::Config("backup.threshold must be positive".into()));
        }
        Ok(())
    }

    /// Save the current configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)?;
        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }
}
