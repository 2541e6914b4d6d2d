use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::tier::SubscriptionTier;

/// Database model for users table
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct UserModel {
    pub id: Uuid,
    pub email: String, // Stored lowercased, unique
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub tier: SubscriptionTier,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserModel {
    /// Creates a new user on the trial plan
    pub fn new(email: String, first_name: String, last_name: String, password_hash: String) -> Self {
        let now = Utc::now();

        Self {
            id: Uuid::new_v4(),
            email,
            first_name,
            last_name,
            password_hash,
            tier: SubscriptionTier::default(),
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_user_starts_on_trial() {
        let user = UserModel::new(
            "a@example.com".to_string(),
            "A".to_string(),
            "B".to_string(),
            "hash".to_string(),
        );

        assert_eq!(user.tier, SubscriptionTier::Trial);
        assert_eq!(user.created_at, user.updated_at);
    }

    #[test]
    fn test_password_hash_not_serialized() {
        let user = UserModel::new(
            "a@example.com".to_string(),
            "A".to_string(),
            "B".to_string(),
            "secret-hash".to_string(),
        );

        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("secret-hash"));
        assert!(json.contains("\"tier\":\"trial\""));
    }
}
