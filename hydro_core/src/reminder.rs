//! Periodic drink reminders.
//!
//! [`ReminderScheduler`] is a two-state machine (`Idle`, `Due`) driven by
//! whatever tick source the caller has. Each tick adds elapsed time; once a
//! full interval has passed the scheduler is `Due`, decides whether to
//! remind, and drops back to `Idle` with the counter at zero before the tick
//! returns. `Due` is never observable between ticks. A reminder is
//! suppressed when today's goal is already met.
//!
//! The decision ([`decide`]) is pure. Emission goes to subscribed
//! [`ReminderSink`]s and never waits on them.

use crate::config::defaults;
use crate::{Error, Result};
use std::sync::mpsc::Sender;
use std::time::Duration;

/// Read-only view of today's hydration, as needed by the scheduler
pub trait HydrationStatus {
    fn today_total(&self) -> u32;
    fn daily_goal(&self) -> u32;

    fn goal_met(&self) -> bool {
        self.today_total() >= self.daily_goal()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ReminderState {
    Idle,
    Due,
}

/// A reminder that should be shown to the user
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReminderEvent {
    pub interval_minutes: u32,
    pub today_total: u32,
    pub daily_goal: u32,
}

impl ReminderEvent {
    pub fn remaining_ml(&self) -> u32 {
        self.daily_goal.saturating_sub(self.today_total)
    }
}

/// What a tick did
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    /// The interval has not elapsed yet
    Waiting,
    /// Goal already met; nothing emitted
    Suppressed,
    Reminded(ReminderEvent),
}

/// Receiver of reminder-due events
pub trait ReminderSink {
    fn notify(&mut self, event: &ReminderEvent);
}

impl ReminderSink for Sender<ReminderEvent> {
    fn notify(&mut self, event: &ReminderEvent) {
        if self.send(event.clone()).is_err() {
            tracing::debug!("Reminder receiver dropped; event discarded");
        }
    }
}

/// Decide what a due reminder turns into
pub fn decide(interval_minutes: u32, status: &dyn HydrationStatus) -> Option<ReminderEvent> {
    if status.goal_met() {
        return None;
    }
    Some(ReminderEvent {
        interval_minutes,
        today_total: status.today_total(),
        daily_goal: status.daily_goal(),
    })
}

pub struct ReminderScheduler {
    interval_minutes: u32,
    elapsed: Duration,
    sinks: Vec<Box<dyn ReminderSink>>,
}

impl ReminderScheduler {
    pub fn new(interval_minutes: u32) -> Result<Self> {
        validate_interval(interval_minutes)?;
        Ok(Self {
            interval_minutes,
            elapsed: Duration::ZERO,
            sinks: Vec::new(),
        })
    }

    pub fn interval_minutes(&self) -> u32 {
        self.interval_minutes
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(u64::from(self.interval_minutes) * 60)
    }

    /// Time counted towards the next reminder
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    fn state(&self) -> ReminderState {
        if self.elapsed < self.interval() {
            ReminderState::Idle
        } else {
            ReminderState::Due
        }
    }

    pub fn subscribe(&mut self, sink: impl ReminderSink + 'static) {
        self.sinks.push(Box::new(sink));
    }

    /// Switch to a new interval, discarding any time already counted
    pub fn set_interval(&mut self, interval_minutes: u32) -> Result<()> {
        validate_interval(interval_minutes)?;
        self.interval_minutes = interval_minutes;
        self.elapsed = Duration::ZERO;
        tracing::debug!("Reminder interval set to {} minutes", interval_minutes);
        Ok(())
    }

    /// Advance by `elapsed` and fire if a full interval has passed
    ///
    /// Several intervals passing in one tick still yield a single reminder.
    pub fn tick(&mut self, elapsed: Duration, status: &dyn HydrationStatus) -> TickOutcome {
        self.elapsed += elapsed;
        if self.state() == ReminderState::Idle {
            return TickOutcome::Waiting;
        }

        self.elapsed = Duration::ZERO;
        match decide(self.interval_minutes, status) {
            Some(event) => {
                tracing::info!(
                    "Reminder due: {} of {} ml",
                    event.today_total,
                    event.daily_goal
                );
                for sink in &mut self.sinks {
                    sink.notify(&event);
                }
                TickOutcome::Reminded(event)
            }
            None => {
                tracing::debug!("Reminder suppressed: goal met");
                TickOutcome::Suppressed
            }
        }
    }
}

fn validate_interval(interval_minutes: u32) -> Result<()> {
    if (defaults::MIN_REMINDER_INTERVAL_MINUTES..=defaults::MAX_REMINDER_INTERVAL_MINUTES)
        .contains(&interval_minutes)
    {
        Ok(())
    } else {
        Err(Error::InvalidInterval(interval_minutes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc::channel;

    struct Status {
        total: u32,
        goal: u32,
    }

    impl HydrationStatus for Status {
        fn today_total(&self) -> u32 {
            self.total
        }

        fn daily_goal(&self) -> u32 {
            self.goal
        }
    }

    fn minutes(m: u64) -> Duration {
        Duration::from_secs(m * 60)
    }

    #[test]
    fn test_waits_until_interval_elapses() {
        let mut scheduler = ReminderScheduler::new(60).unwrap();
        let status = Status { total: 0, goal: 1700 };

        assert_eq!(scheduler.tick(minutes(30), &status), TickOutcome::Waiting);
        assert_eq!(scheduler.tick(minutes(29), &status), TickOutcome::Waiting);
        assert_eq!(scheduler.elapsed(), minutes(59));
        assert_eq!(scheduler.state(), ReminderState::Idle);

        let outcome = scheduler.tick(minutes(1), &status);
        assert!(matches!(outcome, TickOutcome::Reminded(_)));
        assert_eq!(scheduler.elapsed(), Duration::ZERO);
        assert_eq!(scheduler.state(), ReminderState::Idle);
    }

    #[test]
    fn test_due_only_lasts_within_a_tick() {
        let mut scheduler = ReminderScheduler::new(15).unwrap();
        scheduler.elapsed = minutes(15);
        assert_eq!(scheduler.state(), ReminderState::Due);

        scheduler.elapsed = Duration::ZERO;
        scheduler.tick(minutes(20), &Status { total: 0, goal: 1000 });
        assert_eq!(scheduler.state(), ReminderState::Idle);
    }

    #[test]
    fn test_goal_met_suppresses_reminder() {
        let (tx, rx) = channel();
        let mut scheduler = ReminderScheduler::new(60).unwrap();
        scheduler.subscribe(tx);
        let status = Status {
            total: 1700,
            goal: 1700,
        };

        assert_eq!(scheduler.tick(minutes(60), &status), TickOutcome::Suppressed);
        assert!(rx.try_recv().is_err());
        assert_eq!(scheduler.state(), ReminderState::Idle);
    }

    #[test]
    fn test_event_delivered_to_every_subscriber() {
        let (tx1, rx1) = channel();
        let (tx2, rx2) = channel();
        let mut scheduler = ReminderScheduler::new(15).unwrap();
        scheduler.subscribe(tx1);
        scheduler.subscribe(tx2);

        scheduler.tick(minutes(15), &Status { total: 500, goal: 1700 });

        let expected = ReminderEvent {
            interval_minutes: 15,
            today_total: 500,
            daily_goal: 1700,
        };
        assert_eq!(rx1.try_recv().unwrap(), expected);
        assert_eq!(rx2.try_recv().unwrap(), expected);
        assert_eq!(expected.remaining_ml(), 1200);
    }

    #[test]
    fn test_dropped_receiver_does_not_block() {
        let (tx, rx) = channel();
        drop(rx);
        let mut scheduler = ReminderScheduler::new(15).unwrap();
        scheduler.subscribe(tx);

        let outcome = scheduler.tick(minutes(15), &Status { total: 0, goal: 1000 });
        assert!(matches!(outcome, TickOutcome::Reminded(_)));
    }

    #[test]
    fn test_long_gap_yields_single_reminder() {
        let (tx, rx) = channel();
        let mut scheduler = ReminderScheduler::new(30).unwrap();
        scheduler.subscribe(tx);

        scheduler.tick(minutes(200), &Status { total: 0, goal: 1000 });

        assert_eq!(rx.try_iter().count(), 1);
        assert_eq!(scheduler.elapsed(), Duration::ZERO);
    }

    #[test]
    fn test_set_interval_restarts_count() {
        let mut scheduler = ReminderScheduler::new(60).unwrap();
        let status = Status { total: 0, goal: 1700 };

        scheduler.tick(minutes(50), &status);
        scheduler.set_interval(30).unwrap();
        assert_eq!(scheduler.elapsed(), Duration::ZERO);

        // 50 minutes already counted are not carried over
        assert_eq!(scheduler.tick(minutes(20), &status), TickOutcome::Waiting);
        assert!(matches!(
            scheduler.tick(minutes(10), &status),
            TickOutcome::Reminded(_)
        ));
    }

    #[test]
    fn test_interval_bounds() {
        assert!(matches!(
            ReminderScheduler::new(14),
            Err(Error::InvalidInterval(14))
        ));
        assert!(ReminderScheduler::new(121).is_err());
        assert!(ReminderScheduler::new(15).is_ok());
        assert!(ReminderScheduler::new(120).is_ok());

        let mut scheduler = ReminderScheduler::new(60).unwrap();
        assert!(scheduler.set_interval(5).is_err());
        assert_eq!(scheduler.interval_minutes(), 60);
    }

    #[test]
    fn test_decide_is_pure() {
        let below = Status { total: 1699, goal: 1700 };
        let above = Status { total: 2000, goal: 1700 };
        assert!(decide(60, &below).is_some());
        assert!(decide(60, &above).is_none());
    }
}
