use serde::Serialize;

use super::models::EventModel;
use crate::meeting::{MeetingInfo, MeetingUpdate, ProviderError};
use crate::tier::duration_minutes;

/// What happened on the remote side of a synchronized operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RemoteOutcome {
    /// No remote call was needed (no linkage, or nothing relevant changed)
    Skipped,
    /// Remote call succeeded; carries the meeting when the call returns one
    Applied { meeting: Option<MeetingInfo> },
    /// Remote call failed; the local operation went ahead regardless
    Failed { reason: String },
}

impl RemoteOutcome {
    pub fn applied(meeting: Option<MeetingInfo>) -> Self {
        RemoteOutcome::Applied { meeting }
    }

    pub fn failed(error: &ProviderError) -> Self {
        RemoteOutcome::Failed {
            reason: error.to_string(),
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, RemoteOutcome::Failed { .. })
    }

    pub fn meeting(&self) -> Option<&MeetingInfo> {
        match self {
            RemoteOutcome::Applied { meeting } => meeting.as_ref(),
            _ => None,
        }
    }
}

/// Local result paired with the remote outcome. The local part is only
/// produced when the store succeeded; remote failures never replace it.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncOutcome<T> {
    pub local: T,
    pub remote: RemoteOutcome,
}

impl<T> SyncOutcome<T> {
    pub fn new(local: T, remote: RemoteOutcome) -> Self {
        Self { local, remote }
    }
}

/// Translates local edits into a remote meeting patch. Returns None when none
/// of title, description, start or end changed.
pub fn meeting_update_for(before: &EventModel, after: &EventModel) -> Option<MeetingUpdate> {
    let mut update = MeetingUpdate::default();

    if before.title != after.title {
        update.topic = Some(after.title.clone());
    }

    if before.description != after.description {
        update.agenda = Some(after.description.clone().unwrap_or_default());
    }

    let start_changed = before.scheduled_start != after.scheduled_start;
    let end_changed = before.scheduled_end != after.scheduled_end;
    if start_changed || end_changed {
        update.start_time = Some(after.scheduled_start);
        update.duration_minutes = Some(duration_minutes(
            after.scheduled_start,
            after.scheduled_end,
        ));
        update.timezone = Some(after.timezone.clone());
    }

    if update.is_empty() {
        None
    } else {
        Some(update)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use uuid::Uuid;

    fn event() -> EventModel {
        let start = Utc::now() + Duration::days(3);
        EventModel::new(
            Uuid::new_v4(),
            "Town hall".to_string(),
            Some("Q&A".to_string()),
            start,
            start + Duration::minutes(60),
            "America/New_York".to_string(),
            50,
        )
    }

    #[test]
    fn test_no_relevant_change_means_no_update() {
        let before = event();
        let mut after = before.clone();
        after.max_attendees = 10;

        assert_eq!(meeting_update_for(&before, &after), None);
    }

    #[test]
    fn test_title_maps_to_topic() {
        let before = event();
        let mut after = before.clone();
        after.title = "All hands".to_string();

        let update = meeting_update_for(&before, &after).unwrap();
        assert_eq!(update.topic, Some("All hands".to_string()));
        assert_eq!(update.agenda, None);
        assert_eq!(update.start_time, None);
    }

    #[test]
    fn test_cleared_description_sends_empty_agenda() {
        let before = event();
        let mut after = before.clone();
        after.description = None;

        let update = meeting_update_for(&before, &after).unwrap();
        assert_eq!(update.agenda, Some(String::new()));
    }

    #[test]
    fn test_end_change_recomputes_duration() {
        let before = event();
        let mut after = before.clone();
        after.scheduled_end = after.scheduled_start + Duration::seconds(90 * 60 + 1);

        let update = meeting_update_for(&before, &after).unwrap();
        assert_eq!(update.start_time, Some(after.scheduled_start));
        assert_eq!(update.duration_minutes, Some(91));
        assert_eq!(update.timezone, Some("America/New_York".to_string()));
    }

    #[test]
    fn test_remote_outcome_accessors() {
        let meeting = MeetingInfo {
            id: "1".to_string(),
            join_url: "j".to_string(),
            host_url: "h".to_string(),
            secret: None,
        };

        assert_eq!(
            RemoteOutcome::applied(Some(meeting.clone())).meeting(),
            Some(&meeting)
        );
        assert!(RemoteOutcome::failed(&ProviderError::Disabled).is_failed());
        assert_eq!(RemoteOutcome::Skipped.meeting(), None);
    }
}
