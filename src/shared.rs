use async_trait::async_trait;
use axum::{
    extract::{rejection::JsonRejection, FromRequest, Request},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::de::DeserializeOwned;
use serde_json::{json, Map, Value};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use crate::events::repository::EventRepository;
use crate::meeting::MeetingProvider;
use crate::tier::LimitViolation;
use crate::user::repository::UserRepository;
use crate::user::token::TokenConfig;

/// Shared application state containing all dependencies
#[derive(Clone)]
pub struct AppState {
    pub user_repository: Arc<dyn UserRepository + Send + Sync>,
    pub event_repository: Arc<dyn EventRepository + Send + Sync>,
    pub meeting_provider: Arc<dyn MeetingProvider>,
    pub token_config: TokenConfig,
}

impl AppState {
    pub fn new(
        user_repository: Arc<dyn UserRepository + Send + Sync>,
        event_repository: Arc<dyn EventRepository + Send + Sync>,
        meeting_provider: Arc<dyn MeetingProvider>,
        token_config: TokenConfig,
    ) -> Self {
        Self {
            user_repository,
            event_repository,
            meeting_provider,
            token_config,
        }
    }
}

/// Conflicts with existing state that a client can resolve
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConflictKind {
    EventFull { limit: i32 },
    DuplicateRegistration,
    EmailTaken,
}

impl ConflictKind {
    pub fn code(&self) -> &'static str {
        match self {
            ConflictKind::EventFull { .. } => "EVENT_FULL",
            ConflictKind::DuplicateRegistration => "DUPLICATE_REGISTRATION",
            ConflictKind::EmailTaken => "EMAIL_TAKEN",
        }
    }
}

impl fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConflictKind::EventFull { limit } => {
                write!(f, "event is full ({} attendees)", limit)
            }
            ConflictKind::DuplicateRegistration => {
                f.write_str("email is already registered for this event")
            }
            ConflictKind::EmailTaken => f.write_str("email is already in use"),
        }
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("JWT error: {0}")]
    JwtError(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Limit exceeded: {0}")]
    LimitExceeded(LimitViolation),

    #[error("Conflict: {0}")]
    Conflict(ConflictKind),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal server error")]
    Internal,
}

/// Trims and lowercases an email address, rejecting obviously malformed ones
pub fn normalize_email(raw: &str) -> Result<String, AppError> {
    let email = raw.trim().to_lowercase();

    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.contains(char::is_whitespace)
        }
        None => false,
    };

    if !valid {
        return Err(AppError::Validation(format!(
            "'{}' is not a valid email address",
            raw.trim()
        )));
    }

    Ok(email)
}

/// Rejects blank required text fields, returning the trimmed value
pub fn require_text(field: &str, value: &str, max_len: usize) -> Result<String, AppError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AppError::Validation(format!("{} is required", field)));
    }
    if value.chars().count() > max_len {
        return Err(AppError::Validation(format!(
            "{} must be at most {} characters",
            field, max_len
        )));
    }
    Ok(value.to_string())
}

impl From<LimitViolation> for AppError {
    fn from(violation: LimitViolation) -> Self {
        AppError::LimitExceeded(violation)
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        AppError::DatabaseError(e.to_string())
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

/// JSON body extractor whose rejections render as `AppError` bodies
pub struct AppJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for AppJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(AppJson(value))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let mut details = Map::new();

        let (status, code, message) = match &self {
            AppError::JwtError(msg) | AppError::Unauthorized(msg) => {
                (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg.clone())
            }
            AppError::Validation(msg) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
            }
            AppError::LimitExceeded(violation) => {
                if let Ok(Value::Object(fields)) = serde_json::to_value(violation) {
                    details = fields;
                }
                (StatusCode::FORBIDDEN, violation.code(), violation.to_string())
            }
            AppError::Conflict(kind) => {
                if let ConflictKind::EventFull { limit } = kind {
                    details.insert("limit".to_string(), json!(limit));
                }
                (StatusCode::CONFLICT, kind.code(), kind.to_string())
            }
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::DatabaseError(msg) => {
                tracing::error!("Database error: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "A database error occurred".to_string(),
                )
            }
            AppError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "Internal server error".to_string(),
            ),
        };

        let mut error = Map::new();
        error.insert("code".to_string(), json!(code));
        error.insert("message".to_string(), json!(message));
        error.extend(details);

        let body = Json(json!({ "error": error }));

        (status, body).into_response()
    }
}

#[cfg(test)]
pub mod test_utils {
    use super::*;
    use crate::events::repository::InMemoryEventRepository;
    use crate::meeting::DisabledMeetingProvider;
    use crate::user::repository::InMemoryUserRepository;

    /// Builder for creating AppState with overrides for testing
    pub struct AppStateBuilder {
        user_repository: Option<Arc<dyn UserRepository + Send + Sync>>,
        event_repository: Option<Arc<dyn EventRepository + Send + Sync>>,
        meeting_provider: Option<Arc<dyn MeetingProvider>>,
    }

    impl AppStateBuilder {
        pub fn new() -> Self {
            Self {
                user_repository: None,
                event_repository: None,
                meeting_provider: None,
            }
        }

        pub fn with_user_repository(mut self, repo: Arc<dyn UserRepository + Send + Sync>) -> Self {
            self.user_repository = Some(repo);
            self
        }

        pub fn with_event_repository(
            mut self,
            repo: Arc<dyn EventRepository + Send + Sync>,
        ) -> Self {
            self.event_repository = Some(repo);
            self
        }

        pub fn with_meeting_provider(mut self, provider: Arc<dyn MeetingProvider>) -> Self {
            self.meeting_provider = Some(provider);
            self
        }

        pub fn build(self) -> AppState {
            AppState {
                user_repository: self
                    .user_repository
                    .unwrap_or_else(|| Arc::new(InMemoryUserRepository::new())),
                event_repository: self
                    .event_repository
                    .unwrap_or_else(|| Arc::new(InMemoryEventRepository::new())),
                meeting_provider: self
                    .meeting_provider
                    .unwrap_or_else(|| Arc::new(DisabledMeetingProvider)),
                token_config: TokenConfig::new("test-secret".to_string(), 7),
            }
        }
    }

    impl Default for AppStateBuilder {
        fn default() -> Self {
            Self::new()
        }
    }
}
