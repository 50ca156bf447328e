//! Middleware for JWT access token validation

use axum::{
    body::Body,
    extract::State,
    http::{Request, header::AUTHORIZATION},
    middleware::Next,
    response::Response,
};
use common::jwt::TokenType;
use tracing::warn;
use uuid::Uuid;

use crate::{AppState, routes::AuthError};

/// Identity of the caller, inserted into request extensions
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
}

/// Extract and validate the bearer access token
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AuthError> {
    let token = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|header| header.to_str().ok())
        .and_then(|header| header.strip_prefix("Bearer "))
        .ok_or(AuthError::Unauthorized)?;

    let claims = state
        .jwt_service
        .validate_token_of_type(token, TokenType::Access)
        .map_err(|e| {
            warn!("Rejected access token: {}", e);
            AuthError::Unauthorized
        })?;

    req.extensions_mut().insert(AuthUser { id: claims.sub });

    Ok(next.run(req).await)
}
