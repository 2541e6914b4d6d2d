use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

use super::types::{MeetingInfo, MeetingRequest, MeetingUpdate};

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Unexpected response: {0}")]
    Decode(String),

    #[error("Meeting provider is not configured")]
    Disabled,
}

/// Remote conferencing backend. Implementations never retry; callers decide
/// what a failure means.
#[async_trait]
pub trait MeetingProvider: Send + Sync {
    async fn create_meeting(&self, request: &MeetingRequest) -> Result<MeetingInfo, ProviderError>;

    async fn get_meeting(&self, meeting_id: &str) -> Result<MeetingInfo, ProviderError>;

    async fn update_meeting(
        &self,
        meeting_id: &str,
        update: &MeetingUpdate,
    ) -> Result<(), ProviderError>;

    async fn delete_meeting(&self, meeting_id: &str) -> Result<(), ProviderError>;
}

/// Used when no provider credentials are configured. Every call fails, so
/// events are stored without meeting linkage.
pub struct DisabledMeetingProvider;

#[async_trait]
impl MeetingProvider for DisabledMeetingProvider {
    async fn create_meeting(&self, request: &MeetingRequest) -> Result<MeetingInfo, ProviderError> {
        debug!(topic = %request.topic, "Meeting provider disabled, skipping create");
        Err(ProviderError::Disabled)
    }

    async fn get_meeting(&self, _meeting_id: &str) -> Result<MeetingInfo, ProviderError> {
        Err(ProviderError::Disabled)
    }

    async fn update_meeting(
        &self,
        _meeting_id: &str,
        _update: &MeetingUpdate,
    ) -> Result<(), ProviderError> {
        Err(ProviderError::Disabled)
    }

    async fn delete_meeting(&self, _meeting_id: &str) -> Result<(), ProviderError> {
        Err(ProviderError::Disabled)
    }
}
