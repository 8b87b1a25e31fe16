//! In-memory hydration ledger backed by the persistent store.
//!
//! The ledger holds the single authoritative copy of the state for the
//! process. Every mutator validates its input, applies the change and saves
//! through [`PersistentStore`] before returning. A failed save is logged by
//! the store and the in-memory state stays authoritative until the next
//! successful one.

use crate::clock::{Clock, SystemClock};
use crate::goal::GoalPolicy;
use crate::reminder::HydrationStatus;
use crate::store::{PersistentStore, StateSource};
use crate::{
    DayLedger, DayStat, Error, PersistedState, Result, UserProfile, WaterRecord,
};
use chrono::{Duration, NaiveDate, NaiveTime, Timelike};

const WEEK_DAYS: i64 = 7;

pub struct RecordLedger {
    store: PersistentStore,
    state: PersistedState,
    source: StateSource,
    clock: Box<dyn Clock>,
    last_save_ok: bool,
}

impl RecordLedger {
    /// Load the ledger from `store`, reading time from the system clock
    pub fn open(store: PersistentStore) -> Self {
        Self::with_clock(store, Box::new(SystemClock))
    }

    pub fn with_clock(store: PersistentStore, clock: Box<dyn Clock>) -> Self {
        let (state, source) = store.load_with_source();
        Self {
            store,
            state,
            source,
            clock,
            last_save_ok: true,
        }
    }

    /// Which file the state was loaded from
    pub fn source(&self) -> StateSource {
        self.source
    }

    pub fn state(&self) -> &PersistedState {
        &self.state
    }

    pub fn store(&self) -> &PersistentStore {
        &self.store
    }

    /// Whether the most recent save reached disk
    pub fn store_healthy(&self) -> bool {
        self.last_save_ok
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    /// Append a record for today, stamped with the current minute
    ///
    /// An amount outside 1..=5000 ml is rejected and leaves the ledger
    /// untouched.
    pub fn add_water(&mut self, amount: u32) -> Result<WaterRecord> {
        if !WaterRecord::is_valid_amount(amount) {
            return Err(Error::InvalidAmount(amount));
        }

        let now = self.clock.now();
        let today = now.date();
        let time = now.time();
        let record = WaterRecord {
            time: NaiveTime::from_hms_opt(time.hour(), time.minute(), 0).unwrap_or(time),
            amount,
        };
        self.state
            .records
            .entry(today)
            .or_default()
            .push(record.clone());

        tracing::info!("Recorded {} ml at {}", amount, record.time.format("%H:%M"));
        self.persist(today);
        Ok(record)
    }

    pub fn today_total(&self) -> u32 {
        self.state.total_on(self.today())
    }

    pub fn total_on(&self, date: NaiveDate) -> u32 {
        self.state.total_on(date)
    }

    /// Fraction of today's goal reached, capped at 1.0
    pub fn progress(&self) -> f64 {
        progress_fraction(self.today_total(), self.daily_goal())
    }

    pub fn records_today(&self) -> &[WaterRecord] {
        self.state
            .records
            .get(&self.today())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn records(&self) -> &DayLedger {
        &self.state.records
    }

    /// Totals for the seven days ending today, oldest first
    ///
    /// Every row carries the current goal; historical goals are not kept.
    pub fn weekly_stats(&self) -> Vec<DayStat> {
        let today = self.today();
        let goal = self.daily_goal();
        (0..WEEK_DAYS)
            .rev()
            .map(|offset| {
                let date = today - Duration::days(offset);
                DayStat {
                    date,
                    total: self.state.total_on(date),
                    goal,
                }
            })
            .collect()
    }

    /// Clear today's records; other days are untouched
    ///
    /// Returns the number of records removed.
    pub fn reset_today(&mut self) -> usize {
        let today = self.today();
        let removed = match self.state.records.get_mut(&today) {
            Some(records) if !records.is_empty() => {
                let removed = records.len();
                records.clear();
                removed
            }
            _ => return 0,
        };

        tracing::info!("Cleared {} records for {}", removed, today);
        self.persist(today);
        removed
    }

    /// Drop every day strictly older than `today - retention_days`
    ///
    /// Backup counters for the dropped range go too. Returns the number of
    /// days removed; nothing is saved when there is nothing to remove. A
    /// window reaching past the earliest representable date keeps everything.
    pub fn cleanup_old_records(&mut self, retention_days: u32) -> usize {
        let today = self.today();
        let Some(cutoff) = today.checked_sub_signed(Duration::days(i64::from(retention_days)))
        else {
            tracing::debug!("Retention of {} days keeps every record", retention_days);
            return 0;
        };

        let before = self.state.records.len();
        self.state.records.retain(|date, _| *date >= cutoff);
        let removed = before - self.state.records.len();

        let counters_before = self.state.backup_info.len();
        self.state.backup_info.retain(|date, _| *date >= cutoff);
        let counters_removed = counters_before - self.state.backup_info.len();

        if removed == 0 && counters_removed == 0 {
            return 0;
        }

        tracing::info!("Removed {} days of records older than {}", removed, cutoff);
        self.persist(today);
        removed
    }

    pub fn daily_goal(&self) -> u32 {
        self.state.daily_goal
    }

    pub fn set_goal(&mut self, goal: u32) -> Result<()> {
        if goal == 0 {
            return Err(Error::InvalidGoal("daily goal must be positive".into()));
        }
        self.state.daily_goal = goal;
        tracing::info!("Daily goal set to {} ml", goal);
        self.persist(self.today());
        Ok(())
    }

    pub fn user_profile(&self) -> &UserProfile {
        &self.state.profile
    }

    pub fn set_user_profile(&mut self, profile: UserProfile) -> Result<()> {
        profile.validate()?;
        tracing::info!(
            "Profile set to {} kg, {}, activity {}",
            profile.weight,
            profile.gender,
            profile.activity_level
        );
        self.state.profile = profile;
        self.persist(self.today());
        Ok(())
    }

    /// Store a new profile and the goal `policy` derives from it, in one save
    pub fn apply_settings(&mut self, profile: UserProfile, policy: GoalPolicy) -> Result<u32> {
        profile.validate()?;
        let goal = policy.daily_goal(&profile)?;

        self.state.profile = profile;
        self.state.daily_goal = goal;
        tracing::info!("Applied {} goal policy: {} ml", policy.mode(), goal);
        self.persist(self.today());
        Ok(goal)
    }

    /// Save, counting the write against `today`
    fn persist(&mut self, today: NaiveDate) {
        self.last_save_ok = self.store.save(&mut self.state, today);
    }
}

impl HydrationStatus for RecordLedger {
    fn today_total(&self) -> u32 {
        RecordLedger::today_total(self)
    }

    fn daily_goal(&self) -> u32 {
        RecordLedger::daily_goal(self)
    }
}

/// `total / goal`, capped at 1.0; 0.0 for a zero goal
pub fn progress_fraction(total: u32, goal: u32) -> f64 {
    if goal == 0 {
        return 0.0;
    }
    (f64::from(total) / f64::from(goal)).min(1.0)
}
