//! Dashboard, streak and leaderboard payloads

use chrono::NaiveDate;
use common::StreakState;
use serde::{Deserialize, Serialize};

pub const DEFAULT_LEADERBOARD_LIMIT: i64 = 10;
pub const MAX_LEADERBOARD_LIMIT: i64 = 100;

/// Streak as shown to the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StreakSummary {
    pub current_streak: u32,
    pub last_completed_date: Option<NaiveDate>,
    /// Whether a completion today would extend the streak rather than reset it
    pub active: bool,
}

impl StreakSummary {
    pub fn new(state: StreakState, today: NaiveDate) -> Self {
        Self {
            current_streak: state.current_streak,
            last_completed_date: state.last_completed_date,
            active: state.is_active(today),
        }
    }
}

/// Task completion counts
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressSummary {
    pub total_tasks: i64,
    pub completed_tasks: i64,
    pub pending_tasks: i64,
    pub completion_percentage: f64,
}

impl ProgressSummary {
    pub fn new(total_tasks: i64, completed_tasks: i64) -> Self {
        let completion_percentage = if total_tasks > 0 {
            let ratio = completed_tasks as f64 / total_tasks as f64 * 100.0;
            (ratio * 100.0).round() / 100.0
        } else {
            0.0
        };

        Self {
            total_tasks,
            completed_tasks,
            pending_tasks: total_tasks - completed_tasks,
            completion_percentage,
        }
    }
}

/// Plan counts
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanSummary {
    pub total_plans: i64,
    pub completed_plans: i64,
}

/// Raw per-kind counts loaded for the dashboard
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ItemCounts {
    pub total_tasks: i64,
    pub completed_tasks: i64,
    pub total_plans: i64,
    pub completed_plans: i64,
}

/// Response for `GET /dashboard`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardResponse {
    pub progress: ProgressSummary,
    pub streak: StreakSummary,
    pub plans: PlanSummary,
}

impl DashboardResponse {
    pub fn new(counts: ItemCounts, streak: StreakState, today: NaiveDate) -> Self {
        Self {
            progress: ProgressSummary::new(counts.total_tasks, counts.completed_tasks),
            streak: StreakSummary::new(streak, today),
            plans: PlanSummary {
                total_plans: counts.total_plans,
                completed_plans: counts.completed_plans,
            },
        }
    }
}

/// Query parameters for the leaderboard
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LeaderboardQuery {
    pub limit: Option<i64>,
}

impl LeaderboardQuery {
    /// Requested size, clamped to 1..=100
    pub fn limit(&self) -> i64 {
        self.limit
            .unwrap_or(DEFAULT_LEADERBOARD_LIMIT)
            .clamp(1, MAX_LEADERBOARD_LIMIT)
    }
}

/// One row of the leaderboard
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeaderboardEntry {
    pub rank: u32,
    pub user: String,
    pub streak: u32,
}

/// Number rows already ordered by streak
pub fn rank_entries(rows: Vec<(String, StreakState)>) -> Vec<LeaderboardEntry> {
    rows.into_iter()
        .zip(1u32..)
        .map(|((user, state), rank)| LeaderboardEntry {
            rank,
            user,
            streak: state.current_streak,
        })
        .collect()
}
