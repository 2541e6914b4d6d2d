use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::models::UserModel;
use crate::tier::SubscriptionTier;

/// JWT claims identifying an account holder
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserClaims {
    pub user_id: Uuid,
    pub email: String,
    pub exp: usize, // Expiration timestamp (standard JWT claim)
    pub iat: usize, // Issued at timestamp (standard JWT claim)
}

/// Authenticated caller, inserted into request extensions by the auth middleware
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
    pub tier: SubscriptionTier,
}

impl From<&UserModel> for AuthUser {
    fn from(user: &UserModel) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            tier: user.tier,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RegisterUserRequest {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct ChangeSubscriptionRequest {
    pub tier: SubscriptionTier,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub tier: SubscriptionTier,
    pub created_at: DateTime<Utc>,
}

impl From<UserModel> for UserResponse {
    fn from(user: UserModel) -> Self {
        Self {
            id: user.id,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            tier: user.tier,
            created_at: user.created_at,
        }
    }
}

/// Returned by register and login
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserResponse,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_claims_serialization() {
        let claims = UserClaims {
            user_id: Uuid::new_v4(),
            email: "a@example.com".to_string(),
            exp: 1234567890,
            iat: 1234567800,
        };

        let json = serde_json::to_string(&claims).unwrap();
        let deserialized: UserClaims = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, claims);
    }

    #[test]
    fn test_change_subscription_request_rejects_unknown_tier() {
        assert!(serde_json::from_str::<ChangeSubscriptionRequest>(r#"{"tier":"gold"}"#).is_err());

        let request: ChangeSubscriptionRequest =
            serde_json::from_str(r#"{"tier":"standard"}"#).unwrap();
        assert_eq!(request.tier, SubscriptionTier::Standard);
    }
}
