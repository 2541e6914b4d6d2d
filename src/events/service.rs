use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::{
    models::{AttendeeModel, EventModel},
    repository::{EventRepository, RegisterAttendeeResult},
    sync::{meeting_update_for, RemoteOutcome, SyncOutcome},
    types::{CreateEventRequest, RegisterAttendeeRequest, UpdateEventRequest},
};
use crate::{
    meeting::{MeetingProvider, MeetingRequest},
    shared::{normalize_email, require_text, AppError, ConflictKind},
    tier::{duration_minutes, evaluate, LimitRequest, SubscriptionTier},
    user::AuthUser,
};

const MAX_TITLE_LEN: usize = 200;
const MAX_NAME_LEN: usize = 100;
const DEFAULT_TIMEZONE: &str = "UTC";

/// Coordinates local event records with their remote meetings.
///
/// The store is authoritative: its failures fail the operation. Meeting
/// provider failures are logged and reported as `RemoteOutcome::Failed`.
pub struct EventService {
    repository: Arc<dyn EventRepository + Send + Sync>,
    meeting_provider: Arc<dyn MeetingProvider>,
}

impl EventService {
    pub fn new(
        repository: Arc<dyn EventRepository + Send + Sync>,
        meeting_provider: Arc<dyn MeetingProvider>,
    ) -> Self {
        Self {
            repository,
            meeting_provider,
        }
    }

    /// Creates an event for the caller, attaching a remote meeting when the
    /// provider cooperates
    #[instrument(skip(self, owner, request), fields(owner_id = %owner.id))]
    pub async fn create_event_with_meeting(
        &self,
        owner: &AuthUser,
        request: CreateEventRequest,
    ) -> Result<SyncOutcome<EventModel>, AppError> {
        let now = Utc::now();
        let title = require_text("title", &request.title, MAX_TITLE_LEN)?;
        let description = clean_description(request.description);
        let timezone = clean_timezone(request.timezone)?;
        validate_schedule(request.scheduled_start, request.scheduled_end)?;
        if request.scheduled_start <= now {
            return Err(AppError::Validation(
                "scheduled_start must be in the future".to_string(),
            ));
        }
        validate_capacity(request.max_attendees)?;

        let existing_event_count = self.repository.count_events_by_owner(owner.id).await?;
        check_tier(
            owner.tier,
            existing_event_count,
            request.max_attendees,
            request.scheduled_start,
            request.scheduled_end,
        )?;

        let mut event = EventModel::new(
            owner.id,
            title,
            description,
            request.scheduled_start,
            request.scheduled_end,
            timezone,
            request.max_attendees,
        );

        let meeting_request = MeetingRequest {
            topic: event.title.clone(),
            agenda: event.description.clone(),
            start_time: event.scheduled_start,
            duration_minutes: duration_minutes(event.scheduled_start, event.scheduled_end),
            timezone: event.timezone.clone(),
        };

        let remote = match self.meeting_provider.create_meeting(&meeting_request).await {
            Ok(meeting) => {
                debug!(meeting_id = %meeting.id, "Remote meeting created");
                event.attach_meeting(&meeting);
                RemoteOutcome::applied(Some(meeting))
            }
            Err(e) => {
                warn!(error = %e, "Meeting creation failed, storing event without meeting");
                RemoteOutcome::failed(&e)
            }
        };

        if let Err(e) = self.repository.create_event(&event).await {
            // Don't leave a meeting behind for an event that was never stored
            if let Some(meeting_id) = &event.meeting_id {
                if let Err(cleanup) = self.meeting_provider.delete_meeting(meeting_id).await {
                    warn!(meeting_id = %meeting_id, error = %cleanup, "Failed to remove orphaned meeting");
                }
            }
            return Err(e);
        }

        info!(
            event_id = %event.id,
            meeting_attached = event.has_meeting(),
            "Event created"
        );

        Ok(SyncOutcome::new(event, remote))
    }

    /// Applies edits locally, then pushes relevant changes to the remote meeting
    #[instrument(skip(self, owner, request), fields(owner_id = %owner.id))]
    pub async fn update_event_and_meeting(
        &self,
        owner: &AuthUser,
        event_id: Uuid,
        request: UpdateEventRequest,
    ) -> Result<SyncOutcome<EventModel>, AppError> {
        let existing = self.get_event(owner, event_id).await?;
        let mut updated = existing.clone();

        if let Some(title) = request.title {
            updated.title = require_text("title", &title, MAX_TITLE_LEN)?;
        }
        if request.description.is_some() {
            updated.description = clean_description(request.description);
        }
        if let Some(timezone) = request.timezone {
            updated.timezone = clean_timezone(Some(timezone))?;
        }
        if let Some(start) = request.scheduled_start {
            if start != existing.scheduled_start && start <= Utc::now() {
                return Err(AppError::Validation(
                    "scheduled_start must be in the future".to_string(),
                ));
            }
            updated.scheduled_start = start;
        }
        if let Some(end) = request.scheduled_end {
            updated.scheduled_end = end;
        }
        validate_schedule(updated.scheduled_start, updated.scheduled_end)?;

        if let Some(max_attendees) = request.max_attendees {
            validate_capacity(max_attendees)?;
            if max_attendees < existing.current_attendees {
                return Err(AppError::Validation(format!(
                    "max_attendees cannot be lower than the {} already registered",
                    existing.current_attendees
                )));
            }
            updated.max_attendees = max_attendees;
        }

        // The event already exists, so only the attendee and duration caps apply
        check_tier(
            owner.tier,
            0,
            updated.max_attendees,
            updated.scheduled_start,
            updated.scheduled_end,
        )?;

        updated.touch();
        self.repository.update_event(&updated).await?;

        let remote = match (&existing.meeting_id, meeting_update_for(&existing, &updated)) {
            (Some(meeting_id), Some(update)) => {
                match self.meeting_provider.update_meeting(meeting_id, &update).await {
                    Ok(()) => RemoteOutcome::applied(None),
                    Err(e) => {
                        // Local record stays authoritative; drift is left for a later refresh
                        warn!(meeting_id = %meeting_id, error = %e, "Meeting update failed");
                        RemoteOutcome::failed(&e)
                    }
                }
            }
            _ => RemoteOutcome::Skipped,
        };

        let stored = self
            .repository
            .get_event(event_id)
            .await?
            .unwrap_or(updated);

        info!(event_id = %event_id, meeting_sync = ?remote, "Event updated");
        Ok(SyncOutcome::new(stored, remote))
    }

    /// Removes the remote meeting if there is one, then always removes the event
    #[instrument(skip(self, owner), fields(owner_id = %owner.id))]
    pub async fn delete_event_and_meeting(
        &self,
        owner: &AuthUser,
        event_id: Uuid,
    ) -> Result<SyncOutcome<()>, AppError> {
        let existing = self.get_event(owner, event_id).await?;

        let remote = match &existing.meeting_id {
            Some(meeting_id) => match self.meeting_provider.delete_meeting(meeting_id).await {
                Ok(()) => RemoteOutcome::applied(None),
                Err(e) => {
                    warn!(meeting_id = %meeting_id, error = %e, "Meeting deletion failed, deleting event anyway");
                    RemoteOutcome::failed(&e)
                }
            },
            None => RemoteOutcome::Skipped,
        };

        self.repository.delete_event(event_id).await?;

        info!(event_id = %event_id, "Event deleted");
        Ok(SyncOutcome::new((), remote))
    }

    /// Re-reads the remote meeting and overwrites the local linkage fields
    #[instrument(skip(self, owner), fields(owner_id = %owner.id))]
    pub async fn refresh_meeting(
        &self,
        owner: &AuthUser,
        event_id: Uuid,
    ) -> Result<SyncOutcome<EventModel>, AppError> {
        let event = self.get_event(owner, event_id).await?;

        let meeting_id = match event.meeting_id.clone() {
            Some(meeting_id) => meeting_id,
            None => return Ok(SyncOutcome::new(event, RemoteOutcome::Skipped)),
        };

        match self.meeting_provider.get_meeting(&meeting_id).await {
            Ok(meeting) => {
                // Linkage only; other fields stay as stored
                let event = self
                    .repository
                    .set_meeting_linkage(event_id, &meeting)
                    .await?;

                info!(event_id = %event_id, meeting_id = %meeting.id, "Meeting linkage refreshed");
                Ok(SyncOutcome::new(event, RemoteOutcome::applied(Some(meeting))))
            }
            Err(e) => {
                warn!(meeting_id = %meeting_id, error = %e, "Meeting refresh failed");
                Ok(SyncOutcome::new(event, RemoteOutcome::failed(&e)))
            }
        }
    }

    /// Returns an event owned by the caller. Events owned by someone else are
    /// reported as missing.
    #[instrument(skip(self, owner), fields(owner_id = %owner.id))]
    pub async fn get_event(&self, owner: &AuthUser, event_id: Uuid) -> Result<EventModel, AppError> {
        match self.repository.get_event(event_id).await? {
            Some(event) if event.owner_id == owner.id => Ok(event),
            Some(_) => {
                debug!(event_id = %event_id, "Event belongs to another user");
                Err(AppError::NotFound("Event not found".to_string()))
            }
            None => Err(AppError::NotFound("Event not found".to_string())),
        }
    }

    #[instrument(skip(self, owner), fields(owner_id = %owner.id))]
    pub async fn list_events(&self, owner: &AuthUser) -> Result<Vec<EventModel>, AppError> {
        self.repository.list_events_by_owner(owner.id).await
    }

    #[instrument(skip(self))]
    pub async fn get_public_event(&self, event_id: Uuid) -> Result<EventModel, AppError> {
        self.repository
            .get_event(event_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Event not found".to_string()))
    }

    /// Registers an attendee. Capacity check and counter increment happen as
    /// one store operation.
    #[instrument(skip(self, request))]
    pub async fn register_attendee(
        &self,
        event_id: Uuid,
        request: RegisterAttendeeRequest,
    ) -> Result<AttendeeModel, AppError> {
        let email = normalize_email(&request.email)?;
        let first_name = require_text("first_name", &request.first_name, MAX_NAME_LEN)?;
        let last_name = require_text("last_name", &request.last_name, MAX_NAME_LEN)?;

        let attendee = AttendeeModel::new(event_id, email, first_name, last_name);

        match self.repository.try_register_attendee(attendee).await? {
            RegisterAttendeeResult::Success(attendee) => {
                info!(event_id = %event_id, attendee_id = %attendee.id, "Attendee registered");
                Ok(attendee)
            }
            RegisterAttendeeResult::EventFull { limit } => {
                info!(event_id = %event_id, limit, "Registration rejected, event full");
                Err(AppError::Conflict(ConflictKind::EventFull { limit }))
            }
            RegisterAttendeeResult::DuplicateRegistration => {
                info!(event_id = %event_id, "Registration rejected, duplicate email");
                Err(AppError::Conflict(ConflictKind::DuplicateRegistration))
            }
            RegisterAttendeeResult::EventNotFound => {
                Err(AppError::NotFound("Event not found".to_string()))
            }
        }
    }

    #[instrument(skip(self, owner), fields(owner_id = %owner.id))]
    pub async fn list_attendees(
        &self,
        owner: &AuthUser,
        event_id: Uuid,
    ) -> Result<Vec<AttendeeModel>, AppError> {
        self.get_event(owner, event_id).await?;
        self.repository.list_attendees(event_id).await
    }

    #[instrument(skip(self, owner), fields(owner_id = %owner.id))]
    pub async fn unregister_attendee(
        &self,
        owner: &AuthUser,
        event_id: Uuid,
        attendee_id: Uuid,
    ) -> Result<(), AppError> {
        self.get_event(owner, event_id).await?;

        if !self.repository.remove_attendee(event_id, attendee_id).await? {
            return Err(AppError::NotFound("Attendee not found".to_string()));
        }

        info!(event_id = %event_id, attendee_id = %attendee_id, "Attendee removed");
        Ok(())
    }
}

fn check_tier(
    tier: SubscriptionTier,
    existing_event_count: i64,
    max_attendees: i32,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<(), AppError> {
    let request = LimitRequest {
        existing_event_count,
        requested_attendees: i64::from(max_attendees),
        requested_duration_minutes: duration_minutes(start, end),
    };

    evaluate(tier, &request).into_result().map_err(|violation| {
        info!(tier = %tier, violation = %violation, "Tier limit check failed");
        AppError::LimitExceeded(violation)
    })
}

fn validate_schedule(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<(), AppError> {
    if end <= start {
        return Err(AppError::Validation(
            "scheduled_end must be after scheduled_start".to_string(),
        ));
    }
    Ok(())
}

fn validate_capacity(max_attendees: i32) -> Result<(), AppError> {
    if max_attendees < 1 {
        return Err(AppError::Validation(
            "max_attendees must be at least 1".to_string(),
        ));
    }
    Ok(())
}

fn clean_description(description: Option<String>) -> Option<String> {
    description
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty())
}

fn clean_timezone(timezone: Option<String>) -> Result<String, AppError> {
    match timezone.as_deref().map(str::trim) {
        None | Some("") => Ok(DEFAULT_TIMEZONE.to_string()),
        Some(tz) if tz.len() <= 64 && !tz.contains(char::is_whitespace) => Ok(tz.to_string()),
        Some(tz) => Err(AppError::Validation(format!("'{}' is not a valid timezone", tz))),
    }
}
