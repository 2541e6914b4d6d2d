use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use super::provider::{MeetingProvider, ProviderError};
use super::token::AccessTokenCache;
use super::types::{format_start_time, MeetingInfo, MeetingRequest, MeetingUpdate};

pub const DEFAULT_API_BASE: &str = "https://api.zoom.us/v2";
pub const DEFAULT_OAUTH_URL: &str = "https://zoom.us/oauth/token";

/// Scheduled meeting, as opposed to instant or recurring
const SCHEDULED_MEETING: u8 = 2;

/// Server-to-server OAuth app credentials and endpoints
#[derive(Debug, Clone)]
pub struct ZoomConfig {
    pub account_id: String,
    pub client_id: String,
    pub client_secret: String,
    pub api_base: String,
    pub oauth_url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

#[derive(Debug, Deserialize)]
struct ZoomMeeting {
    id: u64,
    join_url: String,
    start_url: String,
    #[serde(default)]
    password: Option<String>,
}

impl From<ZoomMeeting> for MeetingInfo {
    fn from(meeting: ZoomMeeting) -> Self {
        MeetingInfo {
            id: meeting.id.to_string(),
            join_url: meeting.join_url,
            host_url: meeting.start_url,
            secret: meeting.password.filter(|p| !p.is_empty()),
        }
    }
}

#[derive(Debug, Serialize)]
struct CreateMeetingBody<'a> {
    topic: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    agenda: Option<&'a str>,
    #[serde(rename = "type")]
    meeting_type: u8,
    start_time: String,
    duration: i64,
    timezone: &'a str,
}

#[derive(Debug, Deserialize)]
struct ZoomErrorBody {
    message: String,
}

/// Zoom meetings API client
pub struct ZoomClient {
    client: Client,
    config: ZoomConfig,
    tokens: AccessTokenCache,
}

impl ZoomClient {
    pub fn new(config: ZoomConfig) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            config,
            tokens: AccessTokenCache::new(),
        })
    }

    fn meeting_url(&self, meeting_id: &str) -> String {
        format!("{}/meetings/{}", self.config.api_base, meeting_id)
    }

    /// Returns a cached token or fetches a new one with the account credentials grant
    #[instrument(skip(self))]
    async fn access_token(&self) -> Result<String, ProviderError> {
        if let Some(token) = self.tokens.get(Utc::now()).await {
            return Ok(token);
        }

        debug!("Requesting new Zoom access token");
        let response = self
            .client
            .post(&self.config.oauth_url)
            .query(&[
                ("grant_type", "account_credentials"),
                ("account_id", self.config.account_id.as_str()),
            ])
            .basic_auth(&self.config.client_id, Some(&self.config.client_secret))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!(status = %status, "Zoom token request rejected");
            return Err(ProviderError::Auth(format!("HTTP {} - {}", status, body)));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Decode(e.to_string()))?;

        self.tokens
            .store(token.access_token.clone(), token.expires_in, Utc::now())
            .await;

        info!(expires_in = token.expires_in, "Zoom access token refreshed");
        Ok(token.access_token)
    }

    /// Turns a non-2xx response into a ProviderError
    async fn check(&self, response: Response) -> Result<Response, ProviderError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        if status == StatusCode::UNAUTHORIZED {
            // Token was revoked or rotated; next call fetches a fresh one
            self.tokens.invalidate().await;
        }

        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ZoomErrorBody>(&text)
            .map(|body| body.message)
            .unwrap_or(text);

        Err(ProviderError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl MeetingProvider for ZoomClient {
    #[instrument(skip(self, request), fields(topic = %request.topic))]
    async fn create_meeting(&self, request: &MeetingRequest) -> Result<MeetingInfo, ProviderError> {
        let token = self.access_token().await?;

        let body = CreateMeetingBody {
            topic: &request.topic,
            agenda: request.agenda.as_deref(),
            meeting_type: SCHEDULED_MEETING,
            start_time: format_start_time(&request.start_time),
            duration: request.duration_minutes,
            timezone: &request.timezone,
        };

        let response = self
            .client
            .post(format!("{}/users/me/meetings", self.config.api_base))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?;

        let meeting: ZoomMeeting = self
            .check(response)
            .await?
            .json()
            .await
            .map_err(|e| ProviderError::Decode(e.to_string()))?;

        info!(meeting_id = meeting.id, "Zoom meeting created");
        Ok(meeting.into())
    }

    #[instrument(skip(self))]
    async fn get_meeting(&self, meeting_id: &str) -> Result<MeetingInfo, ProviderError> {
        let token = self.access_token().await?;

        let response = self
            .client
            .get(self.meeting_url(meeting_id))
            .bearer_auth(token)
            .send()
            .await?;

        let meeting: ZoomMeeting = self
            .check(response)
            .await?
            .json()
            .await
            .map_err(|e| ProviderError::Decode(e.to_string()))?;

        Ok(meeting.into())
    }

    #[instrument(skip(self, update))]
    async fn update_meeting(
        &self,
        meeting_id: &str,
        update: &MeetingUpdate,
    ) -> Result<(), ProviderError> {
        let token = self.access_token().await?;

        let response = self
            .client
            .patch(self.meeting_url(meeting_id))
            .bearer_auth(token)
            .json(update)
            .send()
            .await?;

        self.check(response).await?;
        info!(meeting_id = %meeting_id, "Zoom meeting updated");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete_meeting(&self, meeting_id: &str) -> Result<(), ProviderError> {
        let token = self.access_token().await?;

        let response = self
            .client
            .delete(self.meeting_url(meeting_id))
            .bearer_auth(token)
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            debug!(meeting_id = %meeting_id, "Zoom meeting already gone");
            return Ok(());
        }

        self.check(response).await?;
        info!(meeting_id = %meeting_id, "Zoom meeting deleted");
        Ok(())
    }
}
