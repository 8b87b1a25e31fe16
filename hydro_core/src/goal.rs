//! Daily goal policy.
//!
//! Maps the selected mode and the user's profile to a target intake:
//! - Standard: fixed per gender (1700 ml male, 1500 ml female)
//! - Formula: 35 ml per kg of body weight
//! - Custom: a user-supplied value within 500..=5000 ml

use crate::config::defaults;
use crate::{Error, Gender, Result, UserProfile};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const STANDARD_MALE_ML: u32 = 1700;
const STANDARD_FEMALE_ML: u32 = 1500;
const ML_PER_KG: u32 = 35;

/// Goal mode as chosen in settings
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum GoalMode {
    #[default]
    Standard,
    Formula,
    Custom,
}

impl fmt::Display for GoalMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GoalMode::Standard => f.write_str("standard"),
            GoalMode::Formula => f.write_str("formula"),
            GoalMode::Custom => f.write_str("custom"),
        }
    }
}

impl FromStr for GoalMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "standard" => Ok(GoalMode::Standard),
            "formula" => Ok(GoalMode::Formula),
            "custom" => Ok(GoalMode::Custom),
            other => Err(Error::InvalidGoal(format!("unknown goal mode '{}'", other))),
        }
    }
}

/// A fully specified goal policy
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GoalPolicy {
    Standard,
    Formula,
    Custom(u32),
}

impl GoalPolicy {
    pub fn from_mode(mode: GoalMode, custom_goal: u32) -> Self {
        match mode {
            GoalMode::Standard => GoalPolicy::Standard,
            GoalMode::Formula => GoalPolicy::Formula,
            GoalMode::Custom => GoalPolicy::Custom(custom_goal),
        }
    }

    pub fn mode(&self) -> GoalMode {
        match self {
            GoalPolicy::Standard => GoalMode::Standard,
            GoalPolicy::Formula => GoalMode::Formula,
            GoalPolicy::Custom(_) => GoalMode::Custom,
        }
    }

    /// Check the custom value range; other modes are always valid
    pub fn validate(&self) -> Result<()> {
        if let GoalPolicy::Custom(goal) = *self {
            if !(defaults::MIN_CUSTOM_GOAL_ML..=defaults::MAX_CUSTOM_GOAL_ML).contains(&goal) {
                return Err(Error::InvalidGoal(format!(
                    "custom goal {} ml outside {}..={}",
                    goal,
                    defaults::MIN_CUSTOM_GOAL_ML,
                    defaults::MAX_CUSTOM_GOAL_ML
                )));
            }
        }
        Ok(())
    }

    /// Compute the daily goal in milliliters for `profile`
    pub fn daily_goal(&self, profile: &UserProfile) -> Result<u32> {
        self.validate()?;
        let goal = match self {
            GoalPolicy::Standard => match profile.gender {
                Gender::Male => STANDARD_MALE_ML,
                Gender::Female => STANDARD_FEMALE_ML,
            },
            GoalPolicy::Formula => profile.weight.saturating_mul(ML_PER_KG),
            GoalPolicy::Custom(goal) => *goal,
        };
        if goal == 0 {
            return Err(Error::InvalidGoal(format!(
                "{} mode produced a zero goal",
                self.mode()
            )));
        }
        Ok(goal)
    }
}

/// Compute the daily goal for `profile` under `policy`
pub fn daily_goal(policy: GoalPolicy, profile: &UserProfile) -> Result<u32> {
    policy.daily_goal(profile)
}
