use std::sync::Arc;

use axum::{extract::State, Extension, Json};
use serde_json::{json, Value};

use shared_models::auth::User;
use shared_models::error::AppError;
use shared_utils::state::AppState;

use crate::models::UpdateProfileRequest;
use crate::services::profile::ProfileService;

#[axum::debug_handler]
pub async fn get_my_profile(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let service = ProfileService::new(Arc::clone(&state.store));
    let profile = service
        .get_profile(&user.id)
        .await
        .map_err(|e| AppError::Storage(e.to_string()))?;

    Ok(Json(json!({
        "profile": profile,
        "complete": profile.is_complete(),
        "missingFields": profile.missing_fields(),
    })))
}

#[axum::debug_handler]
pub async fn update_my_profile(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Json(request): Json<UpdateProfileRequest>,
) -> Result<Json<Value>, AppError> {
    let service = ProfileService::new(Arc::clone(&state.store));
    let profile = service
        .upsert(&user.id, &request)
        .await
        .map_err(|e| AppError::Storage(e.to_string()))?;

    Ok(Json(json!({
        "profile": profile,
        "complete": profile.is_complete(),
        "missingFields": profile.missing_fields(),
    })))
}
