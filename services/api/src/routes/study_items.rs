//! CRUD and completion endpoints for tasks and plans

use axum::{
    Extension, Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, patch},
};
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::{
    error::{ApiError, ApiResult},
    middleware::AuthUser,
    models::{
        CompletionResponse, CreateStudyItemRequest, ItemScope, StudyItemQuery,
        UpdateStudyItemRequest,
        study_item::{validate_description, validate_title},
    },
    repositories::study_item::ItemChanges,
    state::AppState,
};

/// Routes mounted under `/study-items`, `/tasks` and `/plans`
pub fn routes(scope: ItemScope) -> Router<AppState> {
    Router::new()
        .route("/", get(list_items).post(create_item))
        .route("/:id", get(get_item).put(update_item).delete(delete_item))
        .route("/:id/complete", patch(complete_item))
        .layer(Extension(scope))
}

fn not_found() -> ApiError {
    ApiError::NotFound("Item not found".to_string())
}

/// Create a study item
pub async fn create_item(
    State(state): State<AppState>,
    Extension(scope): Extension<ItemScope>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<CreateStudyItemRequest>,
) -> ApiResult<impl IntoResponse> {
    let kind = scope
        .kind_for_create(payload.kind.as_deref())
        .map_err(ApiError::BadRequest)?;
    let title = validate_title(&payload.title).map_err(ApiError::Validation)?;
    let description =
        validate_description(payload.description.as_deref()).map_err(ApiError::Validation)?;

    let item = state
        .study_item_repository
        .create(user.id, kind, &title, description.as_deref())
        .await
        .map_err(|e| ApiError::internal("Failed to create study item", e))?;

    info!("User {} created {} {}", user.id, item.kind, item.id);
    Ok((StatusCode::CREATED, Json(item)))
}

/// List the caller's items, newest first
pub async fn list_items(
    State(state): State<AppState>,
    Extension(scope): Extension<ItemScope>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<StudyItemQuery>,
) -> ApiResult<impl IntoResponse> {
    let scope = scope
        .narrow(query.kind.as_deref())
        .map_err(ApiError::BadRequest)?;

    let items = state
        .study_item_repository
        .list(user.id, scope.kind())
        .await
        .map_err(|e| ApiError::internal("Failed to list study items", e))?;

    Ok(Json(items))
}

/// Get one of the caller's items
pub async fn get_item(
    State(state): State<AppState>,
    Extension(scope): Extension<ItemScope>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let item = state
        .study_item_repository
        .find(user.id, id, scope.kind())
        .await
        .map_err(|e| ApiError::internal("Failed to get study item", e))?
        .ok_or_else(not_found)?;

    Ok(Json(item))
}

/// Validate an update request into repository changes
fn item_changes(payload: &UpdateStudyItemRequest) -> ApiResult<ItemChanges> {
    let title = payload
        .title
        .as_deref()
        .map(validate_title)
        .transpose()
        .map_err(ApiError::Validation)?;
    let description = payload
        .description
        .as_deref()
        .map(|d| validate_description(Some(d)))
        .transpose()
        .map_err(ApiError::Validation)?;

    Ok(ItemChanges { title, description })
}

/// Update title and/or description
pub async fn update_item(
    State(state): State<AppState>,
    Extension(scope): Extension<ItemScope>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateStudyItemRequest>,
) -> ApiResult<impl IntoResponse> {
    let changes = item_changes(&payload)?;

    let item = state
        .study_item_repository
        .update(user.id, id, scope.kind(), &changes)
        .await
        .map_err(|e| ApiError::internal("Failed to update study item", e))?
        .ok_or_else(not_found)?;

    Ok(Json(item))
}

/// Delete one of the caller's items
pub async fn delete_item(
    State(state): State<AppState>,
    Extension(scope): Extension<ItemScope>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let deleted = state
        .study_item_repository
        .delete(user.id, id, scope.kind())
        .await
        .map_err(|e| ApiError::internal("Failed to delete study item", e))?;

    if !deleted {
        return Err(not_found());
    }

    Ok(Json(json!({ "message": "Item deleted" })))
}

/// Mark an item complete; completing a task advances the caller's streak
pub async fn complete_item(
    State(state): State<AppState>,
    Extension(scope): Extension<ItemScope>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let today = state.clock.today();

    let outcome = state
        .study_item_repository
        .complete(user.id, id, scope.kind(), today)
        .await
        .map_err(|e| ApiError::internal("Failed to complete study item", e))?
        .ok_or_else(not_found)?;

    Ok(Json(CompletionResponse::from(outcome)))
}
