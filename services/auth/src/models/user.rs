//! User model and related functionality

use chrono::{DateTime, NaiveDate, Utc};
use common::streak::StreakState;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// User entity
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub current_streak: i32,
    pub last_completed_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Streak fields of this user
    pub fn streak(&self) -> StreakState {
        StreakState::from_stored(self.current_streak, self.last_completed_date)
    }
}

/// New user creation payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewUser {
    pub email: String,
    pub password: String,
}

/// User login credentials
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginCredentials {
    pub email: String,
    pub password: String,
}

/// Public view of a user returned by `/auth/me`
#[derive(Debug, Clone, Serialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub email: String,
    pub current_streak: u32,
    pub last_completed_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserProfile {
    fn from(user: User) -> Self {
        let streak = user.streak();
        Self {
            id: user.id,
            email: user.email,
            current_streak: streak.current_streak,
            last_completed_date: streak.last_completed_date,
            created_at: user.created_at,
        }
    }
}
