use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::models::{AttendeeModel, EventModel};
use super::sync::RemoteOutcome;
use crate::meeting::MeetingInfo;

/// Request payload for creating an event
#[derive(Debug, Clone, Deserialize)]
pub struct CreateEventRequest {
    pub title: String,
    pub description: Option<String>,
    pub scheduled_start: DateTime<Utc>,
    pub scheduled_end: DateTime<Utc>,
    pub timezone: Option<String>,
    pub max_attendees: i32,
}

/// Request payload for updating an event. Absent fields are left unchanged;
/// an empty description clears it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateEventRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub scheduled_start: Option<DateTime<Utc>>,
    pub scheduled_end: Option<DateTime<Utc>>,
    pub timezone: Option<String>,
    pub max_attendees: Option<i32>,
}

/// Request payload for public attendee registration
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterAttendeeRequest {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

/// Event as seen by its owner, including host-only meeting fields
#[derive(Debug, Serialize, Deserialize)]
pub struct EventResponse {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub scheduled_start: DateTime<Utc>,
    pub scheduled_end: DateTime<Utc>,
    pub timezone: String,
    pub max_attendees: i32,
    pub current_attendees: i32,
    pub meeting: Option<MeetingInfo>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<EventModel> for EventResponse {
    fn from(event: EventModel) -> Self {
        let meeting = event.meeting_info();
        Self {
            id: event.id,
            title: event.title,
            description: event.description,
            scheduled_start: event.scheduled_start,
            scheduled_end: event.scheduled_end,
            timezone: event.timezone,
            max_attendees: event.max_attendees,
            current_attendees: event.current_attendees,
            meeting,
            created_at: event.created_at,
            updated_at: event.updated_at,
        }
    }
}

/// Event as shown on a public registration page
#[derive(Debug, Serialize, Deserialize)]
pub struct PublicEventResponse {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub scheduled_start: DateTime<Utc>,
    pub scheduled_end: DateTime<Utc>,
    pub timezone: String,
    pub spots_remaining: i32,
    pub has_meeting: bool,
}

impl From<EventModel> for PublicEventResponse {
    fn from(event: EventModel) -> Self {
        Self {
            spots_remaining: (event.max_attendees - event.current_attendees).max(0),
            has_meeting: event.has_meeting(),
            id: event.id,
            title: event.title,
            description: event.description,
            scheduled_start: event.scheduled_start,
            scheduled_end: event.scheduled_end,
            timezone: event.timezone,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateEventResponse {
    pub event: EventResponse,
    pub meeting_attached: bool,
    pub meeting: Option<MeetingInfo>,
}

/// Response for operations that may touch the remote meeting
#[derive(Debug, Serialize)]
pub struct SyncedEventResponse {
    pub event: EventResponse,
    pub meeting_sync: RemoteOutcome,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AttendeeResponse {
    pub id: Uuid,
    pub event_id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub join_url: Option<String>,
    pub registered_at: DateTime<Utc>,
}

impl From<AttendeeModel> for AttendeeResponse {
    fn from(attendee: AttendeeModel) -> Self {
        Self {
            id: attendee.id,
            event_id: attendee.event_id,
            email: attendee.email,
            first_name: attendee.first_name,
            last_name: attendee.last_name,
            join_url: attendee.join_url,
            registered_at: attendee.registered_at,
        }
    }
}
