use async_trait::async_trait;
use chrono::Utc;
use sqlx::{postgres::PgRow, PgPool, Row};
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use super::models::UserModel;
use crate::shared::{AppError, ConflictKind};
use crate::tier::SubscriptionTier;

/// Trait for user repository operations
#[async_trait]
pub trait UserRepository {
    /// Fails with `Conflict(EmailTaken)` if the email is already registered
    async fn create_user(&self, user: &UserModel) -> Result<(), AppError>;
    async fn get_user(&self, user_id: Uuid) -> Result<Option<UserModel>, AppError>;
    async fn get_user_by_email(&self, email: &str) -> Result<Option<UserModel>, AppError>;
    async fn update_tier(&self, user_id: Uuid, tier: SubscriptionTier) -> Result<UserModel, AppError>;
}

/// In-memory implementation of UserRepository for development and testing
pub struct InMemoryUserRepository {
    users: Mutex<HashMap<Uuid, UserModel>>,
}

impl Default for InMemoryUserRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryUserRepository {
    /// Creates a new empty in-memory repository
    pub fn new() -> Self {
        Self {
            users: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<Uuid, UserModel>>, AppError> {
        self.users
            .lock()
            .map_err(|_| AppError::DatabaseError("In-memory store poisoned".to_string()))
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    #[instrument(skip(self, user))]
    async fn create_user(&self, user: &UserModel) -> Result<(), AppError> {
        debug!(user_id = %user.id, "Creating user in memory");

        let mut users = self.lock()?;
        if users.values().any(|u| u.email == user.email) {
            warn!(user_id = %user.id, "Email already registered in memory");
            return Err(AppError::Conflict(ConflictKind::EmailTaken));
        }
        users.insert(user.id, user.clone());

        Ok(())
    }

    #[instrument(skip(self))]
    async fn get_user(&self, user_id: Uuid) -> Result<Option<UserModel>, AppError> {
        let users = self.lock()?;
        Ok(users.get(&user_id).cloned())
    }

    #[instrument(skip(self))]
    async fn get_user_by_email(&self, email: &str) -> Result<Option<UserModel>, AppError> {
        let users = self.lock()?;
        Ok(users.values().find(|u| u.email == email).cloned())
    }

    #[instrument(skip(self))]
    async fn update_tier(&self, user_id: Uuid, tier: SubscriptionTier) -> Result<UserModel, AppError> {
        let mut users = self.lock()?;
        let user = users
            .get_mut(&user_id)
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        user.tier = tier;
        user.updated_at = Utc::now();

        Ok(user.clone())
    }
}

const USER_COLUMNS: &str =
    "id, email, first_name, last_name, password_hash, tier, created_at, updated_at";

fn user_from_row(row: &PgRow) -> Result<UserModel, AppError> {
    let tier: String = row.try_get("tier")?;
    let tier = tier.parse::<SubscriptionTier>().map_err(|e| {
        warn!(error = %e, "Stored user has unknown tier");
        AppError::DatabaseError(e.to_string())
    })?;

    Ok(UserModel {
        id: row.try_get("id")?,
        email: row.try_get("email")?,
        first_name: row.try_get("first_name")?,
        last_name: row.try_get("last_name")?,
        password_hash: row.try_get("password_hash")?,
        tier,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

/// PostgreSQL implementation of user repository
pub struct PostgresUserRepository {
    pool: PgPool,
}

impl PostgresUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    #[instrument(skip(self, user))]
    async fn create_user(&self, user: &UserModel) -> Result<(), AppError> {
        debug!(user_id = %user.id, "Creating user in database");

        let result = sqlx::query(&format!(
            "INSERT INTO users ({USER_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             ON CONFLICT (email) DO NOTHING"
        ))
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.password_hash)
        .bind(user.tier.as_str())
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, "Failed to create user in database");
            AppError::DatabaseError(e.to_string())
        })?;

        if result.rows_affected() == 0 {
            return Err(AppError::Conflict(ConflictKind::EmailTaken));
        }

        Ok(())
    }

    #[instrument(skip(self))]
    async fn get_user(&self, user_id: Uuid) -> Result<Option<UserModel>, AppError> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                warn!(error = %e, user_id = %user_id, "Failed to fetch user from database");
                AppError::DatabaseError(e.to_string())
            })?;

        row.as_ref().map(user_from_row).transpose()
    }

    #[instrument(skip(self))]
    async fn get_user_by_email(&self, email: &str) -> Result<Option<UserModel>, AppError> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1"))
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                warn!(error = %e, "Failed to fetch user by email from database");
                AppError::DatabaseError(e.to_string())
            })?;

        row.as_ref().map(user_from_row).transpose()
    }

    #[instrument(skip(self))]
    async fn update_tier(&self, user_id: Uuid, tier: SubscriptionTier) -> Result<UserModel, AppError> {
        let row = sqlx::query(&format!(
            "UPDATE users SET tier = $2, updated_at = $3 WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(user_id)
        .bind(tier.as_str())
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, user_id = %user_id, "Failed to update user tier");
            AppError::DatabaseError(e.to_string())
        })?;

        match row {
            Some(row) => user_from_row(&row),
            None => Err(AppError::NotFound("User not found".to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_user(email: &str) -> UserModel {
        UserModel::new(
            email.to_string(),
            "Test".to_string(),
            "User".to_string(),
            "hash".to_string(),
        )
    }

    #[tokio::test]
    async fn test_create_and_get_user() {
        let repo = InMemoryUserRepository::new();
        let user = create_test_user("a@example.com");

        repo.create_user(&user).await.unwrap();

        assert_eq!(repo.get_user(user.id).await.unwrap(), Some(user.clone()));
        assert_eq!(
            repo.get_user_by_email("a@example.com").await.unwrap(),
            Some(user)
        );
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let repo = InMemoryUserRepository::new();
        repo.create_user(&create_test_user("a@example.com"))
            .await
            .unwrap();

        let result = repo.create_user(&create_test_user("a@example.com")).await;
        assert!(matches!(
            result,
            Err(AppError::Conflict(ConflictKind::EmailTaken))
        ));
    }

    #[tokio::test]
    async fn test_update_tier() {
        let repo = InMemoryUserRepository::new();
        let user = create_test_user("a@example.com");
        repo.create_user(&user).await.unwrap();

        let updated = repo
            .update_tier(user.id, SubscriptionTier::Pro)
            .await
            .unwrap();
        assert_eq!(updated.tier, SubscriptionTier::Pro);

        let stored = repo.get_user(user.id).await.unwrap().unwrap();
        assert_eq!(stored.tier, SubscriptionTier::Pro);
    }

    #[tokio::test]
    async fn test_update_tier_unknown_user() {
        let repo = InMemoryUserRepository::new();
        let result = repo.update_tier(Uuid::new_v4(), SubscriptionTier::Pro).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }
}
