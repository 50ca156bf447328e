//! Authentication service routes

use axum::{
    Extension, Json, Router,
    extract::State,
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use common::jwt::{Claims, TokenType};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{
    AppState,
    middleware::{AuthUser, auth_middleware},
    models::{LoginCredentials, NewUser, UserProfile},
    repositories::{UserRepositoryError, user::check_password},
    validation::{normalize_email, validate_email, validate_password},
};

/// Response for token generation
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: u64,
}

/// Request carrying a refresh token
#[derive(Debug, Deserialize)]
pub struct RefreshTokenRequest {
    pub refresh_token: String,
}

/// Response for user registration
#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub message: String,
    pub user_id: Uuid,
}

/// Create the router for the authentication service
pub fn create_router(state: AppState) -> Router {
    let cors = state.cors.layer();

    let protected_routes = Router::new()
        .route("/auth/me", get(me))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .route("/health", get(health_check))
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh_token))
        .route("/auth/logout", post(logout))
        .merge(protected_routes)
        .layer(cors)
        .with_state(state)
}

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let database = common::database::health_check(&state.db_pool)
        .await
        .unwrap_or(false);
    let cache = state.session_manager.health_check().await.unwrap_or(false);

    let status = if database && cache {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(serde_json::json!({
            "status": if status == StatusCode::OK { "ok" } else { "degraded" },
            "service": "auth-service",
            "database": database,
            "cache": cache,
        })),
    )
}

/// User registration endpoint
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<NewUser>,
) -> Result<impl IntoResponse, AuthError> {
    let new_user = NewUser {
        email: normalize_email(&payload.email),
        password: payload.password,
    };

    validate_email(&new_user.email).map_err(AuthError::Validation)?;
    validate_password(&new_user.password).map_err(AuthError::Validation)?;

    let user = state
        .user_repository
        .create(&new_user)
        .await
        .map_err(|e| match e {
            UserRepositoryError::DuplicateEmail => {
                AuthError::Conflict("Email already registered".to_string())
            }
            e => {
                error!("Failed to create user: {}", e);
                AuthError::InternalServerError
            }
        })?;

    info!("Registered user {}", user.id);

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "User registered successfully".to_string(),
            user_id: user.id,
        }),
    ))
}

/// Issue an access/refresh token pair and open a session for the refresh token
async fn issue_tokens(
    state: &AppState,
    user_id: Uuid,
    email: &str,
) -> Result<TokenResponse, AuthError> {
    let access_token = state
        .jwt_service
        .generate_access_token(user_id, email)
        .map_err(|e| {
            error!("Failed to generate access token: {}", e);
            AuthError::InternalServerError
        })?;

    let refresh_token = state
        .jwt_service
        .generate_refresh_token(user_id, email)
        .map_err(|e| {
            error!("Failed to generate refresh token: {}", e);
            AuthError::InternalServerError
        })?;

    let refresh_claims = state
        .jwt_service
        .validate_token(&refresh_token)
        .map_err(|e| {
            error!("Failed to decode freshly issued refresh token: {}", e);
            AuthError::InternalServerError
        })?;

    state
        .session_manager
        .create_session(&refresh_claims)
        .await
        .map_err(|e| {
            error!("Failed to store session in Redis: {}", e);
            AuthError::InternalServerError
        })?;

    Ok(TokenResponse {
        access_token,
        refresh_token,
        token_type: "bearer".to_string(),
        expires_in: state.jwt_service.access_token_expiry(),
    })
}

/// User login endpoint
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginCredentials>,
) -> Result<impl IntoResponse, AuthError> {
    let email = normalize_email(&payload.email);
    info!("Login attempt for user: {}", email);

    if !state.rate_limiter.is_allowed(&email).await {
        return Err(AuthError::TooManyRequests {
            retry_after: state.rate_limiter.config().ban_duration_seconds,
        });
    }

    let user = state
        .user_repository
        .find_by_email(&email)
        .await
        .map_err(|e| {
            error!("Failed to look up user: {}", e);
            AuthError::InternalServerError
        })?;

    let verified = match &user {
        Some(user) => check_password(payload.password.clone(), user.password_hash.clone())
            .await
            .map_err(|e| {
                error!("Failed to verify password: {}", e);
                AuthError::InternalServerError
            })?,
        None => false,
    };

    let user = match user {
        Some(user) if verified => user,
        _ => {
            state.rate_limiter.record_failure(&email).await;
            return Err(AuthError::InvalidCredentials);
        }
    };

    state.rate_limiter.reset(&email).await;

    let response = issue_tokens(&state, user.id, &user.email).await?;
    Ok((StatusCode::OK, Json(response)))
}

/// Validate a refresh token and check that its session is still open
async fn open_refresh_session(state: &AppState, token: &str) -> Result<Claims, AuthError> {
    let claims = state
        .jwt_service
        .validate_token_of_type(token, TokenType::Refresh)
        .map_err(|e| {
            warn!("Rejected refresh token: {}", e);
            AuthError::Unauthorized
        })?;

    let valid = state
        .session_manager
        .is_session_valid(&claims)
        .await
        .map_err(|e| {
            error!("Failed to read session from Redis: {}", e);
            AuthError::InternalServerError
        })?;

    if !valid {
        return Err(AuthError::Unauthorized);
    }

    Ok(claims)
}

/// Revoke the session of a refresh token that passed `open_refresh_session`
///
/// Only one request can remove a session, so when the same token is presented
/// twice concurrently the slower request is rejected.
async fn close_refresh_session(state: &AppState, claims: &Claims) -> Result<(), AuthError> {
    let revoked = state
        .session_manager
        .revoke_session(claims)
        .await
        .map_err(|e| {
            error!("Failed to revoke session: {}", e);
            AuthError::InternalServerError
        })?;

    if !revoked {
        warn!("Refresh token {} was already used", claims.jti);
        return Err(AuthError::Unauthorized);
    }

    Ok(())
}

/// Refresh token endpoint
///
/// The presented refresh token is revoked and replaced by a new one.
pub async fn refresh_token(
    State(state): State<AppState>,
    Json(payload): Json<RefreshTokenRequest>,
) -> Result<impl IntoResponse, AuthError> {
    info!("Token refresh request");

    let claims = open_refresh_session(&state, &payload.refresh_token).await?;
    close_refresh_session(&state, &claims).await?;

    let response = issue_tokens(&state, claims.sub, &claims.email).await?;
    Ok((StatusCode::OK, Json(response)))
}

/// Logout endpoint
pub async fn logout(
    State(state): State<AppState>,
    Json(payload): Json<RefreshTokenRequest>,
) -> Result<impl IntoResponse, AuthError> {
    info!("Logout request");

    let claims = open_refresh_session(&state, &payload.refresh_token).await?;
    close_refresh_session(&state, &claims).await?;

    Ok((
        StatusCode::OK,
        Json(serde_json::json!({"message": "Logged out successfully"})),
    ))
}

/// Profile of the authenticated user
pub async fn me(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> Result<impl IntoResponse, AuthError> {
    let user = state
        .user_repository
        .find_by_id(auth_user.id)
        .await
        .map_err(|e| {
            error!("Failed to load user {}: {}", auth_user.id, e);
            AuthError::InternalServerError
        })?
        .ok_or(AuthError::NotFound)?;

    Ok(Json(UserProfile::from(user)))
}

/// Custom error type for authentication errors
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Unauthorized")]
    Unauthorized,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Too many login attempts")]
    TooManyRequests { retry_after: u64 },

    #[error("User not found")]
    NotFound,

    #[error("Internal server error")]
    InternalServerError,
}

impl AuthError {
    fn status(&self) -> StatusCode {
        match self {
            AuthError::Unauthorized | AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AuthError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AuthError::Conflict(_) => StatusCode::CONFLICT,
            AuthError::TooManyRequests { .. } => StatusCode::TOO_MANY_REQUESTS,
            AuthError::NotFound => StatusCode::NOT_FOUND,
            AuthError::InternalServerError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(serde_json::json!({
            "error": self.to_string(),
        }));

        match self {
            AuthError::TooManyRequests { retry_after } => (
                status,
                [(axum::http::header::RETRY_AFTER, retry_after.to_string())],
                body,
            )
                .into_response(),
            _ => (status, body).into_response(),
        }
    }
}
