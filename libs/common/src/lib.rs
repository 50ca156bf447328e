//! Common library for the study planner
//!
//! This crate provides shared functionality used across the services of the
//! study planner: the daily completion streak rules, database connectivity,
//! the Redis cache, JWT issuing and validation, listen address and CORS
//! configuration, and error handling.

pub mod cache;
pub mod config;
pub mod database;
pub mod error;
pub mod jwt;
pub mod streak;

pub use streak::{StreakState, StreakTransition};

/// Example usage of the streak tracker
///
/// ```rust
/// use chrono::NaiveDate;
/// use common::streak::{StreakState, StreakTransition};
///
/// let monday = NaiveDate::from_ymd_opt(2024, 1, 8).unwrap();
/// let tuesday = NaiveDate::from_ymd_opt(2024, 1, 9).unwrap();
///
/// let (state, transition) = StreakState::new().apply(monday);
/// assert_eq!(transition, StreakTransition::Started);
///
/// let (state, transition) = state.apply(tuesday);
/// assert_eq!(transition, StreakTransition::Extended);
/// assert_eq!(state.current_streak, 2);
/// ```
pub fn example_usage() {}
