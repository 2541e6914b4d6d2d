use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};

/// Meeting record as seen by the rest of the service, independent of provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeetingInfo {
    pub id: String,
    pub join_url: String,
    pub host_url: String,
    pub secret: Option<String>,
}

/// Parameters for a new scheduled meeting
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeetingRequest {
    pub topic: String,
    pub agenda: Option<String>,
    pub start_time: DateTime<Utc>,
    pub duration_minutes: i64,
    pub timezone: String,
}

/// Partial update; only populated fields are sent to the provider
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MeetingUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agenda: Option<String>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_start_time"
    )]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(rename = "duration", skip_serializing_if = "Option::is_none")]
    pub duration_minutes: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
}

impl MeetingUpdate {
    pub fn is_empty(&self) -> bool {
        self.topic.is_none()
            && self.agenda.is_none()
            && self.start_time.is_none()
            && self.duration_minutes.is_none()
            && self.timezone.is_none()
    }
}

/// Zoom expects `yyyy-MM-ddTHH:mm:ssZ` for UTC start times
pub fn format_start_time(start_time: &DateTime<Utc>) -> String {
    start_time.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

fn serialize_start_time<S>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match value {
        Some(start_time) => serializer.serialize_str(&format_start_time(start_time)),
        None => serializer.serialize_none(),
    }
}
