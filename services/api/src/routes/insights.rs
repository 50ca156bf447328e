//! Streak, dashboard and leaderboard endpoints

use axum::{
    Extension, Json,
    extract::{Query, State},
    response::IntoResponse,
};

use crate::{
    error::{ApiError, ApiResult},
    middleware::AuthUser,
    models::{DashboardResponse, LeaderboardQuery, StreakSummary, insights::rank_entries},
    state::AppState,
};

/// Current streak of the caller
pub async fn get_streak(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<impl IntoResponse> {
    let streak = state
        .user_repository
        .streak(user.id)
        .await
        .map_err(|e| ApiError::internal("Failed to load streak", e))?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(Json(StreakSummary::new(streak, state.clock.today())))
}

/// Progress, streak and plan counts of the caller
pub async fn get_dashboard(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<impl IntoResponse> {
    let (counts, streak) = tokio::try_join!(
        state.study_item_repository.counts(user.id),
        state.user_repository.streak(user.id),
    )
    .map_err(|e| ApiError::internal("Failed to load dashboard", e))?;

    let streak = streak.ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(Json(DashboardResponse::new(counts, streak, state.clock.today())))
}

/// Users ranked by current streak
pub async fn get_leaderboard(
    State(state): State<AppState>,
    Query(query): Query<LeaderboardQuery>,
) -> ApiResult<impl IntoResponse> {
    let rows = state
        .user_repository
        .leaderboard(query.limit())
        .await
        .map_err(|e| ApiError::internal("Failed to load leaderboard", e))?;

    Ok(Json(rank_entries(rows)))
}
