use axum::{extract::State, http::StatusCode, Extension, Json};
use std::sync::Arc;
use tracing::{info, instrument};

use super::{
    service::UserService,
    types::{
        AuthResponse, AuthUser, ChangeSubscriptionRequest, LoginRequest, RegisterUserRequest,
        UserResponse,
    },
};
use crate::shared::{AppError, AppJson, AppState};

fn user_service(state: &AppState) -> UserService {
    UserService::new(
        Arc::clone(&state.user_repository),
        state.token_config.clone(),
    )
}

/// POST /auth/register
#[instrument(name = "register_user", skip(state, request))]
pub async fn register_user(
    State(state): State<AppState>,
    AppJson(request): AppJson<RegisterUserRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), AppError> {
    let response = user_service(&state).register_user(request).await?;

    info!(user_id = %response.user.id, "Registration completed");
    Ok((StatusCode::CREATED, Json(response)))
}

/// POST /auth/login
#[instrument(name = "login", skip(state, request))]
pub async fn login(
    State(state): State<AppState>,
    AppJson(request): AppJson<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let response = user_service(&state).login(request).await?;
    Ok(Json(response))
}

/// GET /auth/me
#[instrument(name = "current_user", skip(state, user), fields(user_id = %user.id))]
pub async fn current_user(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<UserResponse>, AppError> {
    let response = user_service(&state).current_user(user.id).await?;
    Ok(Json(response))
}

/// PUT /auth/subscription
#[instrument(name = "change_subscription", skip(state, user, request), fields(user_id = %user.id))]
pub async fn change_subscription(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    AppJson(request): AppJson<ChangeSubscriptionRequest>,
) -> Result<Json<UserResponse>, AppError> {
    let response = user_service(&state)
        .change_subscription(user.id, request.tier)
        .await?;
    Ok(Json(response))
}
