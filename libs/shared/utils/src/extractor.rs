use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};

use shared_models::auth::User;
use shared_models::error::AppError;

use crate::jwt::validate_token;
use crate::state::AppState;

/// Middleware for authentication: validates the bearer token and injects
/// the resulting [`User`] into request extensions.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let auth_header = request
        .headers()
        .get("Authorization")
        .ok_or_else(|| AppError::Auth("Missing authorization header".to_string()))?;

    let auth_value = auth_header
        .to_str()
        .map_err(|_| AppError::Auth("Invalid authorization header format".to_string()))?;

    if !auth_value.starts_with("Bearer ") {
        return Err(AppError::Auth("Invalid authorization header format".to_string()));
    }

    let token = &auth_value[7..];

    let user = validate_token(token, &state.config.jwt_secret).map_err(AppError::Auth)?;

    request.extensions_mut().insert(user);

    Ok(next.run(request).await)
}

/// Staff-only middleware, layered after [`auth_middleware`] on agenda and
/// schedule management routes.
pub async fn require_staff(
    request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let is_staff = request
        .extensions()
        .get::<User>()
        .map(User::is_staff)
        .unwrap_or(false);
    if !is_staff {
        return Err(AppError::Auth("Staff role required".to_string()));
    }
    Ok(next.run(request).await)
}
