use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::meeting::MeetingInfo;

/// Database model for events table
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq)]
pub struct EventModel {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub scheduled_start: DateTime<Utc>,
    pub scheduled_end: DateTime<Utc>,
    pub timezone: String,
    pub max_attendees: i32,
    pub current_attendees: i32,
    // Linkage to the remote meeting, all absent when no meeting is attached
    pub meeting_id: Option<String>,
    pub meeting_join_url: Option<String>,
    pub meeting_secret: Option<String>,
    pub meeting_host_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl EventModel {
    /// Creates a new event with no attendees and no meeting attached
    pub fn new(
        owner_id: Uuid,
        title: String,
        description: Option<String>,
        scheduled_start: DateTime<Utc>,
        scheduled_end: DateTime<Utc>,
        timezone: String,
        max_attendees: i32,
    ) -> Self {
        let now = Utc::now();

        Self {
            id: Uuid::new_v4(),
            owner_id,
            title,
            description,
            scheduled_start,
            scheduled_end,
            timezone,
            max_attendees,
            current_attendees: 0,
            meeting_id: None,
            meeting_join_url: None,
            meeting_secret: None,
            meeting_host_url: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn has_meeting(&self) -> bool {
        self.meeting_id.is_some()
    }

    pub fn is_full(&self) -> bool {
        self.current_attendees >= self.max_attendees
    }

    pub fn attach_meeting(&mut self, meeting: &MeetingInfo) {
        self.meeting_id = Some(meeting.id.clone());
        self.meeting_join_url = Some(meeting.join_url.clone());
        self.meeting_secret = meeting.secret.clone();
        self.meeting_host_url = Some(meeting.host_url.clone());
    }

    /// Meeting linkage as a provider-neutral record, if one is attached
    pub fn meeting_info(&self) -> Option<MeetingInfo> {
        Some(MeetingInfo {
            id: self.meeting_id.clone()?,
            join_url: self.meeting_join_url.clone().unwrap_or_default(),
            host_url: self.meeting_host_url.clone().unwrap_or_default(),
            secret: self.meeting_secret.clone(),
        })
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// Database model for attendees table
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq)]
pub struct AttendeeModel {
    pub id: Uuid,
    pub event_id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub join_url: Option<String>, // Copied from the event when the attendee registers
    pub registered_at: DateTime<Utc>,
}

impl AttendeeModel {
    /// Creates an attendee; the join URL is filled in by the repository on registration
    pub fn new(event_id: Uuid, email: String, first_name: String, last_name: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            event_id,
            email,
            first_name,
            last_name,
            join_url: None,
            registered_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn sample_event() -> EventModel {
        let start = Utc::now() + Duration::days(1);
        EventModel::new(
            Uuid::new_v4(),
            "Quarterly review".to_string(),
            None,
            start,
            start + Duration::minutes(30),
            "UTC".to_string(),
            2,
        )
    }

    #[test]
    fn test_new_event_has_no_meeting() {
        let event = sample_event();
        assert!(!event.has_meeting());
        assert!(event.meeting_info().is_none());
        assert_eq!(event.current_attendees, 0);
        assert!(!event.is_full());
    }

    #[test]
    fn test_attach_meeting_populates_linkage() {
        let mut event = sample_event();
        let meeting = MeetingInfo {
            id: "991".to_string(),
            join_url: "https://zoom.us/j/991".to_string(),
            host_url: "https://zoom.us/s/991".to_string(),
            secret: Some("pw".to_string()),
        };

        event.attach_meeting(&meeting);

        assert!(event.has_meeting());
        assert_eq!(event.meeting_info(), Some(meeting));
    }

    #[test]
    fn test_is_full() {
        let mut event = sample_event();
        event.current_attendees = 2;
        assert!(event.is_full());
    }
}
