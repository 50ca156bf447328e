//! Daily completion streak tracking
//!
//! A streak counts the consecutive calendar days on which a user completed at
//! least one qualifying item. The state lives on the user record; this module
//! only decides how it moves when a new completion happens. Loading and
//! persisting the state, and serializing concurrent updates for the same
//! user, are the caller's job.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Streak fields of a user record
///
/// Invariant: `current_streak == 0` if and only if `last_completed_date` is
/// `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StreakState {
    /// Number of consecutive days with at least one completion
    pub current_streak: u32,
    /// Most recent day on which a completion occurred
    pub last_completed_date: Option<NaiveDate>,
}

/// Which rule fired when a completion was applied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreakTransition {
    /// First completion ever recorded
    Started,
    /// Completion on the day right after the last one
    Extended,
    /// Another completion on the same day
    Unchanged,
    /// Completion after a gap of two or more days, or before the last date
    Reset,
}

impl StreakState {
    /// State of a user who never completed anything
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a state from the values stored in the `users` table
    ///
    /// Rows that break the invariant are normalized: without a date the state
    /// is empty, with a date the streak is at least 1.
    pub fn from_stored(current_streak: i32, last_completed_date: Option<NaiveDate>) -> Self {
        match last_completed_date {
            None => Self::default(),
            Some(date) => Self {
                current_streak: u32::try_from(current_streak).unwrap_or(0).max(1),
                last_completed_date: Some(date),
            },
        }
    }

    /// Streak value as stored in an `INTEGER` column
    pub fn stored_streak(&self) -> i32 {
        i32::try_from(self.current_streak).unwrap_or(i32::MAX)
    }

    /// Apply a completion that happened on `today`
    ///
    /// Returns the new state together with the rule that produced it. The
    /// function is total: a `today` earlier than the last completion is
    /// treated like a gap and resets the streak to 1.
    pub fn apply(self, today: NaiveDate) -> (Self, StreakTransition) {
        let (current_streak, transition) = match self.last_completed_date {
            None => (1, StreakTransition::Started),
            Some(last) if last == today => return (self, StreakTransition::Unchanged),
            Some(last) if last.succ_opt() == Some(today) => (
                self.current_streak.saturating_add(1),
                StreakTransition::Extended,
            ),
            Some(_) => (1, StreakTransition::Reset),
        };

        (
            Self {
                current_streak,
                last_completed_date: Some(today),
            },
            transition,
        )
    }

    /// Apply a completion and keep only the resulting state
    pub fn advance(self, today: NaiveDate) -> Self {
        self.apply(today).0
    }

    /// Whether the streak can still be extended by a completion on `today`
    ///
    /// True when the last completion was today or yesterday. Read-only: the
    /// stored counter is never decayed outside of a completion event.
    pub fn is_active(&self, today: NaiveDate) -> bool {
        match self.last_completed_date {
            Some(last) => last == today || last.succ_opt() == Some(today),
            None => false,
        }
    }
}
