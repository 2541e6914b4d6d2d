use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use tracing::{debug, instrument, warn};

use super::types::AuthUser;
use crate::shared::{AppError, AppState};

/// JWT authentication middleware - validates the Bearer header, loads the user
/// and adds `AuthUser` to request extensions.
/// Usage: .layer(middleware::from_fn_with_state(app_state.clone(), user::auth_middleware))
#[instrument(skip(state, req, next))]
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let auth_header = req
        .headers()
        .get("Authorization")
        .and_then(|header| header.to_str().ok())
        .ok_or_else(|| {
            warn!("Missing Authorization header in request");
            AppError::Unauthorized("Missing authorization header".to_string())
        })?;

    let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
        warn!("Invalid Authorization header format (expected Bearer token)");
        AppError::Unauthorized("Invalid authorization header format".to_string())
    })?;

    let claims = match state.token_config.validate_token(token) {
        Ok(claims) => claims,
        Err(e) => {
            warn!("JWT authentication failed: {}", e);
            return Err(e);
        }
    };

    // Tier must reflect the stored plan, not the one at token issue time
    let user = state
        .user_repository
        .get_user(claims.user_id)
        .await?
        .ok_or_else(|| {
            warn!(user_id = %claims.user_id, "Token refers to a user that no longer exists");
            AppError::Unauthorized("User not found".to_string())
        })?;

    debug!(user_id = %user.id, tier = %user.tier, "Authentication successful");

    req.extensions_mut().insert(AuthUser::from(&user));
    Ok(next.run(req).await)
}
