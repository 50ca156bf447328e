//! Read access to the streak fields of the users table

use anyhow::{Context, Result};
use common::StreakState;
use sqlx::{PgPool, Row};
use uuid::Uuid;

/// User repository for database operations
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    /// Create a new user repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Stored streak of a user
    pub async fn streak(&self, user_id: Uuid) -> Result<Option<StreakState>> {
        let row = sqlx::query(
            r#"
            SELECT current_streak, last_completed_date
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to load streak")?;

        row.map(|row| -> Result<StreakState> {
            Ok(StreakState::from_stored(
                row.try_get("current_streak")?,
                row.try_get("last_completed_date")?,
            ))
        })
        .transpose()
    }

    /// Users with the longest streaks, ties broken by email
    pub async fn leaderboard(&self, limit: i64) -> Result<Vec<(String, StreakState)>> {
        let rows = sqlx::query(
            r#"
            SELECT email, current_streak, last_completed_date
            FROM users
            ORDER BY current_streak DESC, email ASC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .context("Failed to load leaderboard")?;

        rows.into_iter()
            .map(|row| -> Result<(String, StreakState)> {
                let state = StreakState::from_stored(
                    row.try_get("current_streak")?,
                    row.try_get("last_completed_date")?,
                );
                Ok((row.try_get("email")?, state))
            })
            .collect()
    }
}
