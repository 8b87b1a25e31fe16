//! Core domain types for the Hydro system.
//!
//! This module defines the persisted aggregate and its parts:
//! - User profile (weight, gender, activity level)
//! - Water records and the per-day ledger
//! - The backup write counter
//! - Weekly statistics rows

use crate::config::defaults;
use crate::{Error, Result};
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Profile Types
// ============================================================================

/// Gender as used by the standard goal policy
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    #[default]
    Male,
    Female,
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Gender::Male => f.write_str("male"),
            Gender::Female => f.write_str("female"),
        }
    }
}

impl FromStr for Gender {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "male" | "m" => Ok(Gender::Male),
            "female" | "f" => Ok(Gender::Female),
            other => Err(Error::InvalidProfile(format!("unknown gender '{}'", other))),
        }
    }
}

/// Self-reported activity level, stored as its ordinal (0..=3)
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(try_from = "u8", into = "u8")]
pub enum ActivityLevel {
    #[default]
    Sedentary,
    Light,
    Moderate,
    High,
}

impl From<ActivityLevel> for u8 {
    fn from(level: ActivityLevel) -> Self {
        match level {
            ActivityLevel::Sedentary => 0,
            ActivityLevel::Light => 1,
            ActivityLevel::Moderate => 2,
            ActivityLevel::High => 3,
        }
    }
}

impl TryFrom<u8> for ActivityLevel {
    type Error = String;

    fn try_from(value: u8) -> std::result::Result<Self, Self::Error> {
        match value {
            0 => Ok(ActivityLevel::Sedentary),
            1 => Ok(ActivityLevel::Light),
            2 => Ok(ActivityLevel::Moderate),
            3 => Ok(ActivityLevel::High),
            other => Err(format!("activity level {} out of range 0..=3", other)),
        }
    }
}

impl fmt::Display for ActivityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ActivityLevel::Sedentary => "sedentary",
            ActivityLevel::Light => "light",
            ActivityLevel::Moderate => "moderate",
            ActivityLevel::High => "high",
        };
        f.write_str(label)
    }
}

impl FromStr for ActivityLevel {
    type Err = Error;

    /// Accepts either the ordinal (`0`..`3`) or the level name
    fn from_str(s: &str) -> Result<Self> {
        let lowered = s.to_lowercase();
        if let Ok(ordinal) = lowered.parse::<u8>() {
            return ActivityLevel::try_from(ordinal).map_err(Error::InvalidProfile);
        }
        match lowered.as_str() {
            "sedentary" => Ok(ActivityLevel::Sedentary),
            "light" => Ok(ActivityLevel::Light),
            "moderate" => Ok(ActivityLevel::Moderate),
            "high" => Ok(ActivityLevel::High),
            other => Err(Error::InvalidProfile(format!(
                "unknown activity level '{}'",
                other
            ))),
        }
    }
}

/// The user's body profile, input to the goal policy
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserProfile {
    pub weight: u32,
    pub gender: Gender,
    pub activity_level: ActivityLevel,
}

impl Default for UserProfile {
    fn default() -> Self {
        Self {
            weight: defaults::WEIGHT_KG,
            gender: Gender::Male,
            activity_level: ActivityLevel::Sedentary,
        }
    }
}

impl UserProfile {
    /// Reject profiles the settings boundary would never produce
    pub fn validate(&self) -> Result<()> {
        if !(defaults::MIN_WEIGHT_KG..=defaults::MAX_WEIGHT_KG).contains(&self.weight) {
            return Err(Error::InvalidProfile(format!(
                "weight {} kg outside {}..={}",
                self.weight,
                defaults::MIN_WEIGHT_KG,
                defaults::MAX_WEIGHT_KG
            )));
        }
        Ok(())
    }
}

// ============================================================================
// Ledger Types
// ============================================================================

/// A single intake event, stamped to the minute
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct WaterRecord {
    #[serde(with = "hhmm")]
    pub time: NaiveTime,
    pub amount: u32,
}

impl WaterRecord {
    /// Whether `amount` is in 1..=MAX_RECORD_AMOUNT_ML
    pub fn is_valid_amount(amount: u32) -> bool {
        (1..=defaults::MAX_RECORD_AMOUNT_ML).contains(&amount)
    }

    pub fn has_valid_amount(&self) -> bool {
        Self::is_valid_amount(self.amount)
    }
}

/// Per-day records, keyed by calendar date
pub type DayLedger = BTreeMap<NaiveDate, Vec<WaterRecord>>;

/// Saves per day since the last backup refresh
pub type BackupCounter = BTreeMap<NaiveDate, u32>;

/// One row of the weekly statistics series
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct DayStat {
    pub date: NaiveDate,
    pub total: u32,
    pub goal: u32,
}

impl DayStat {
    pub fn goal_met(&self) -> bool {
        self.total >= self.goal
    }
}

/// Everything that is written to disk, as one unit
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct PersistedState {
    #[serde(rename = "user_info", default)]
    pub profile: UserProfile,

    #[serde(default = "default_daily_goal")]
    pub daily_goal: u32,

    #[serde(default)]
    pub records: DayLedger,

    #[serde(default)]
    pub backup_info: BackupCounter,
}

fn default_daily_goal() -> u32 {
    defaults::DAILY_GOAL_ML
}

impl Default for PersistedState {
    fn default() -> Self {
        Self {
            profile: UserProfile::default(),
            daily_goal: defaults::DAILY_GOAL_ML,
            records: DayLedger::new(),
            backup_info: BackupCounter::new(),
        }
    }
}

impl PersistedState {
    /// Check the invariants a loaded file must satisfy
    ///
    /// Date keys are already guaranteed valid by deserialization.
    pub fn validate(&self) -> Result<()> {
        if self.daily_goal == 0 {
            return Err(Error::State("daily goal must be positive".into()));
        }
        if self.profile.weight == 0 {
            return Err(Error::State("profile weight must be positive".into()));
        }
        for (date, records) in &self.records {
            if let Some(bad) = records.iter().find(|r| !r.has_valid_amount()) {
                return Err(Error::State(format!(
                    "record at {} {} has amount {} ml",
                    date,
                    bad.time.format("%H:%M"),
                    bad.amount
                )));
            }
        }
        Ok(())
    }

    /// Sum of amounts recorded on `date`, saturating at `u32::MAX`
    pub fn total_on(&self, date: NaiveDate) -> u32 {
        self.records
            .get(&date)
            .map(|records| {
                records
                    .iter()
                    .fold(0u32, |total, r| total.saturating_add(r.amount))
            })
            .unwrap_or(0)
    }
}

/// `"HH:MM"` (de)serialization for record times
mod hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%H:%M";

    pub fn serialize<S>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(&time.format(FORMAT))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        NaiveTime::parse_from_str(&raw, FORMAT).map_err(serde::de::Error::custom)
    }
}
