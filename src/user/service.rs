use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::{
    models::UserModel,
    password::{hash_password, verify_password},
    repository::UserRepository,
    token::TokenConfig,
    types::{AuthResponse, LoginRequest, RegisterUserRequest, UserResponse},
};
use crate::shared::{normalize_email, require_text, AppError};
use crate::tier::SubscriptionTier;

const MIN_PASSWORD_LEN: usize = 8;
const MAX_NAME_LEN: usize = 100;

/// Service for account registration, login and plan changes
pub struct UserService {
    repository: Arc<dyn UserRepository + Send + Sync>,
    token_config: TokenConfig,
}

impl UserService {
    pub fn new(repository: Arc<dyn UserRepository + Send + Sync>, token_config: TokenConfig) -> Self {
        Self {
            repository,
            token_config,
        }
    }

    /// Creates a trial account and returns a token for it
    #[instrument(skip(self, request))]
    pub async fn register_user(&self, request: RegisterUserRequest) -> Result<AuthResponse, AppError> {
        let email = normalize_email(&request.email)?;
        let first_name = require_text("first_name", &request.first_name, MAX_NAME_LEN)?;
        let last_name = require_text("last_name", &request.last_name, MAX_NAME_LEN)?;
        if request.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AppError::Validation(format!(
                "password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }

        let password_hash = hash_password(&request.password)?;
        let user = UserModel::new(email, first_name, last_name, password_hash);
        self.repository.create_user(&user).await?;

        info!(user_id = %user.id, tier = %user.tier, "User registered");

        let token = self.token_config.create_token(user.id, &user.email)?;
        Ok(AuthResponse {
            token,
            user: user.into(),
        })
    }

    /// Checks credentials and issues a fresh token
    #[instrument(skip(self, request))]
    pub async fn login(&self, request: LoginRequest) -> Result<AuthResponse, AppError> {
        let invalid = || AppError::Unauthorized("Invalid email or password".to_string());

        let email = normalize_email(&request.email).map_err(|_| invalid())?;
        let Some(user) = self.repository.get_user_by_email(&email).await? else {
            warn!("Login attempt for unknown email");
            return Err(invalid());
        };

        if !verify_password(&request.password, &user.password_hash)? {
            warn!(user_id = %user.id, "Login attempt with wrong password");
            return Err(invalid());
        }

        info!(user_id = %user.id, "User logged in");

        let token = self.token_config.create_token(user.id, &user.email)?;
        Ok(AuthResponse {
            token,
            user: user.into(),
        })
    }

    #[instrument(skip(self))]
    pub async fn current_user(&self, user_id: Uuid) -> Result<UserResponse, AppError> {
        self.repository
            .get_user(user_id)
            .await?
            .map(UserResponse::from)
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))
    }

    /// Moves the user to another plan. Existing events are kept on downgrade;
    /// the new limits apply from the next create.
    #[instrument(skip(self))]
    pub async fn change_subscription(
        &self,
        user_id: Uuid,
        tier: SubscriptionTier,
    ) -> Result<UserResponse, AppError> {
        let user = self.repository.update_tier(user_id, tier).await?;
        info!(user_id = %user.id, tier = %user.tier, "Subscription changed");
        Ok(user.into())
    }
}
