#![forbid(unsafe_code)]

//! Core domain model and business logic for the Hydro water tracker.
//!
//! This crate provides:
//! - Domain types (profile, water records, persisted state)
//! - Persistence (primary file with rotating backup)
//! - The record ledger and its aggregate queries
//! - Goal policy
//! - Reminder scheduling
//! - CSV export

pub mod types;
pub mod error;
pub mod config;
pub mod logging;
pub mod clock;
pub mod store;
pub mod ledger;
pub mod goal;
pub mod reminder;
pub mod export;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use config::Config;
pub use clock::{Clock, ManualClock, SystemClock};
pub use store::{PersistentStore, SaveReport, StateSource};
pub use ledger::{progress_fraction, RecordLedger};
pub use goal::{daily_goal, GoalMode, GoalPolicy};
pub use reminder::{HydrationStatus, ReminderEvent, ReminderScheduler, ReminderSink, TickOutcome};
