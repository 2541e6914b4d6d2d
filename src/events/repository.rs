use async_trait::async_trait;
use chrono::Utc;
use sqlx::{postgres::PgRow, PgPool, Row};
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::models::{AttendeeModel, EventModel};
use crate::meeting::MeetingInfo;
use crate::shared::AppError;

fn capacity_below_registered(registered: i32) -> AppError {
    AppError::Validation(format!(
        "max_attendees cannot be lower than the {} already registered",
        registered
    ))
}

/// Result of attempting to register an attendee
#[derive(Debug, Clone, PartialEq)]
pub enum RegisterAttendeeResult {
    /// Attendee stored and counter incremented, returns the stored attendee
    Success(AttendeeModel),
    /// Event is at capacity
    EventFull { limit: i32 },
    /// Email already registered for this event
    DuplicateRegistration,
    /// Event does not exist
    EventNotFound,
}

/// Trait for event and attendee storage
#[async_trait]
pub trait EventRepository {
    async fn create_event(&self, event: &EventModel) -> Result<(), AppError>;
    async fn get_event(&self, event_id: Uuid) -> Result<Option<EventModel>, AppError>;
    async fn list_events_by_owner(&self, owner_id: Uuid) -> Result<Vec<EventModel>, AppError>;
    async fn count_events_by_owner(&self, owner_id: Uuid) -> Result<i64, AppError>;

    /// Writes the editable fields. Never touches the attendee counter or the
    /// meeting linkage. Fails with `Validation` if `max_attendees` is below the
    /// stored counter.
    async fn update_event(&self, event: &EventModel) -> Result<(), AppError>;

    /// Overwrites only the meeting linkage fields and returns the stored event
    async fn set_meeting_linkage(
        &self,
        event_id: Uuid,
        meeting: &MeetingInfo,
    ) -> Result<EventModel, AppError>;

    /// Deletes the event together with its attendees
    async fn delete_event(&self, event_id: Uuid) -> Result<(), AppError>;

    async fn list_attendees(&self, event_id: Uuid) -> Result<Vec<AttendeeModel>, AppError>;

    /// Atomically checks capacity, rejects duplicates, stores the attendee with
    /// the event's current join URL and increments the attendee counter
    async fn try_register_attendee(
        &self,
        attendee: AttendeeModel,
    ) -> Result<RegisterAttendeeResult, AppError>;

    /// Removes an attendee and decrements the counter. Returns false if absent.
    async fn remove_attendee(&self, event_id: Uuid, attendee_id: Uuid) -> Result<bool, AppError>;
}

#[derive(Default)]
struct InMemoryState {
    events: HashMap<Uuid, EventModel>,
    attendees: HashMap<Uuid, AttendeeModel>,
}

/// In-memory implementation of EventRepository for development and testing
///
/// Events and attendees share one lock so registration is atomic in the same
/// way the database transaction is.
pub struct InMemoryEventRepository {
    state: Mutex<InMemoryState>,
}

impl Default for InMemoryEventRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryEventRepository {
    /// Creates a new empty in-memory repository
    pub fn new() -> Self {
        Self {
            state: Mutex::new(InMemoryState::default()),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, InMemoryState>, AppError> {
        self.state
            .lock()
            .map_err(|_| AppError::DatabaseError("In-memory store poisoned".to_string()))
    }

    /// Returns the current number of events in the repository
    pub fn event_count(&self) -> usize {
        self.lock().map(|state| state.events.len()).unwrap_or(0)
    }
}

#[async_trait]
impl EventRepository for InMemoryEventRepository {
    #[instrument(skip(self, event))]
    async fn create_event(&self, event: &EventModel) -> Result<(), AppError> {
        debug!(event_id = %event.id, owner_id = %event.owner_id, "Creating event in memory");

        let mut state = self.lock()?;
        if state.events.contains_key(&event.id) {
            warn!(event_id = %event.id, "Event already exists in memory");
            return Err(AppError::DatabaseError("Event already exists".to_string()));
        }
        state.events.insert(event.id, event.clone());

        Ok(())
    }

    #[instrument(skip(self))]
    async fn get_event(&self, event_id: Uuid) -> Result<Option<EventModel>, AppError> {
        let state = self.lock()?;
        Ok(state.events.get(&event_id).cloned())
    }

    #[instrument(skip(self))]
    async fn list_events_by_owner(&self, owner_id: Uuid) -> Result<Vec<EventModel>, AppError> {
        let state = self.lock()?;
        let mut events: Vec<EventModel> = state
            .events
            .values()
            .filter(|e| e.owner_id == owner_id)
            .cloned()
            .collect();
        events.sort_by_key(|e| e.scheduled_start);

        Ok(events)
    }

    #[instrument(skip(self))]
    async fn count_events_by_owner(&self, owner_id: Uuid) -> Result<i64, AppError> {
        let state = self.lock()?;
        let count = state
            .events
            .values()
            .filter(|e| e.owner_id == owner_id)
            .count();

        Ok(count as i64)
    }

    #[instrument(skip(self, event))]
    async fn update_event(&self, event: &EventModel) -> Result<(), AppError> {
        debug!(event_id = %event.id, "Updating event in memory");

        let mut state = self.lock()?;
        let stored = match state.events.get_mut(&event.id) {
            Some(stored) => stored,
            None => {
                warn!(event_id = %event.id, "Event not found for update in memory");
                return Err(AppError::NotFound("Event not found".to_string()));
            }
        };

        let current_attendees = stored.current_attendees;
        if event.max_attendees < current_attendees {
            warn!(event_id = %event.id, current_attendees, "Capacity below registered attendees");
            return Err(capacity_below_registered(current_attendees));
        }
        stored.title = event.title.clone();
        stored.description = event.description.clone();
        stored.scheduled_start = event.scheduled_start;
        stored.scheduled_end = event.scheduled_end;
        stored.timezone = event.timezone.clone();
        stored.max_attendees = event.max_attendees;
        stored.updated_at = event.updated_at;

        Ok(())
    }

    #[instrument(skip(self, meeting))]
    async fn set_meeting_linkage(
        &self,
        event_id: Uuid,
        meeting: &MeetingInfo,
    ) -> Result<EventModel, AppError> {
        let mut state = self.lock()?;
        let stored = state
            .events
            .get_mut(&event_id)
            .ok_or_else(|| AppError::NotFound("Event not found".to_string()))?;

        stored.attach_meeting(meeting);
        stored.touch();

        Ok(stored.clone())
    }

    #[instrument(skip(self))]
    async fn delete_event(&self, event_id: Uuid) -> Result<(), AppError> {
        debug!(event_id = %event_id, "Deleting event from memory");

        let mut state = self.lock()?;
        if state.events.remove(&event_id).is_none() {
            warn!(event_id = %event_id, "Event not found for deletion in memory");
            return Err(AppError::NotFound("Event not found".to_string()));
        }
        state.attendees.retain(|_, a| a.event_id != event_id);

        Ok(())
    }

    #[instrument(skip(self))]
    async fn list_attendees(&self, event_id: Uuid) -> Result<Vec<AttendeeModel>, AppError> {
        let state = self.lock()?;
        let mut attendees: Vec<AttendeeModel> = state
            .attendees
            .values()
            .filter(|a| a.event_id == event_id)
            .cloned()
            .collect();
        attendees.sort_by_key(|a| a.registered_at);

        Ok(attendees)
    }

    #[instrument(skip(self, attendee), fields(event_id = %attendee.event_id))]
    async fn try_register_attendee(
        &self,
        mut attendee: AttendeeModel,
    ) -> Result<RegisterAttendeeResult, AppError> {
        debug!(email = %attendee.email, "Attempting to register attendee atomically");

        let mut state = self.lock()?;

        let (is_full, max_attendees, join_url) = match state.events.get(&attendee.event_id) {
            Some(event) => (
                event.is_full(),
                event.max_attendees,
                event.meeting_join_url.clone(),
            ),
            None => return Ok(RegisterAttendeeResult::EventNotFound),
        };

        if is_full {
            debug!(limit = max_attendees, "Event is full");
            return Ok(RegisterAttendeeResult::EventFull {
                limit: max_attendees,
            });
        }

        let duplicate = state
            .attendees
            .values()
            .any(|a| a.event_id == attendee.event_id && a.email == attendee.email);
        if duplicate {
            debug!(email = %attendee.email, "Attendee already registered");
            return Ok(RegisterAttendeeResult::DuplicateRegistration);
        }

        attendee.join_url = join_url;
        state.attendees.insert(attendee.id, attendee.clone());
        if let Some(event) = state.events.get_mut(&attendee.event_id) {
            event.current_attendees += 1;
        }

        info!(attendee_id = %attendee.id, "Attendee registered (atomic)");
        Ok(RegisterAttendeeResult::Success(attendee))
    }

    #[instrument(skip(self))]
    async fn remove_attendee(&self, event_id: Uuid, attendee_id: Uuid) -> Result<bool, AppError> {
        let mut state = self.lock()?;

        let belongs_to_event = state
            .attendees
            .get(&attendee_id)
            .map(|a| a.event_id == event_id)
            .unwrap_or(false);
        if !belongs_to_event {
            return Ok(false);
        }

        state.attendees.remove(&attendee_id);
        if let Some(event) = state.events.get_mut(&event_id) {
            event.current_attendees = (event.current_attendees - 1).max(0);
        }

        Ok(true)
    }
}

const EVENT_COLUMNS: &str = "id, owner_id, title, description, scheduled_start, scheduled_end, \
     timezone, max_attendees, current_attendees, meeting_id, meeting_join_url, meeting_secret, \
     meeting_host_url, created_at, updated_at";

const ATTENDEE_COLUMNS: &str =
    "id, event_id, email, first_name, last_name, join_url, registered_at";

fn db_error(context: &str, e: sqlx::Error) -> AppError {
    warn!(error = %e, "{}", context);
    AppError::DatabaseError(e.to_string())
}

fn event_from_row(row: &PgRow) -> Result<EventModel, sqlx::Error> {
    Ok(EventModel {
        id: row.try_get("id")?,
        owner_id: row.try_get("owner_id")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        scheduled_start: row.try_get("scheduled_start")?,
        scheduled_end: row.try_get("scheduled_end")?,
        timezone: row.try_get("timezone")?,
        max_attendees: row.try_get("max_attendees")?,
        current_attendees: row.try_get("current_attendees")?,
        meeting_id: row.try_get("meeting_id")?,
        meeting_join_url: row.try_get("meeting_join_url")?,
        meeting_secret: row.try_get("meeting_secret")?,
        meeting_host_url: row.try_get("meeting_host_url")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

/// PostgreSQL implementation of event repository
pub struct PostgresEventRepository {
    pool: PgPool,
}

impl PostgresEventRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EventRepository for PostgresEventRepository {
    #[instrument(skip(self, event))]
    async fn create_event(&self, event: &EventModel) -> Result<(), AppError> {
        debug!(event_id = %event.id, "Creating event in database");

        sqlx::query(&format!(
            "INSERT INTO events ({EVENT_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)"
        ))
        .bind(event.id)
        .bind(event.owner_id)
        .bind(&event.title)
        .bind(&event.description)
        .bind(event.scheduled_start)
        .bind(event.scheduled_end)
        .bind(&event.timezone)
        .bind(event.max_attendees)
        .bind(event.current_attendees)
        .bind(&event.meeting_id)
        .bind(&event.meeting_join_url)
        .bind(&event.meeting_secret)
        .bind(&event.meeting_host_url)
        .bind(event.created_at)
        .bind(event.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("Failed to create event in database", e))?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn get_event(&self, event_id: Uuid) -> Result<Option<EventModel>, AppError> {
        let row = sqlx::query(&format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = $1"))
            .bind(event_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("Failed to fetch event from database", e))?;

        row.as_ref()
            .map(event_from_row)
            .transpose()
            .map_err(|e| db_error("Failed to decode event row", e))
    }

    #[instrument(skip(self))]
    async fn list_events_by_owner(&self, owner_id: Uuid) -> Result<Vec<EventModel>, AppError> {
        let rows = sqlx::query(&format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE owner_id = $1 ORDER BY scheduled_start"
        ))
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("Failed to list events from database", e))?;

        rows.iter()
            .map(event_from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| db_error("Failed to decode event row", e))
    }

    #[instrument(skip(self))]
    async fn count_events_by_owner(&self, owner_id: Uuid) -> Result<i64, AppError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM events WHERE owner_id = $1")
            .bind(owner_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| db_error("Failed to count events", e))?;

        Ok(count)
    }

    #[instrument(skip(self, event))]
    async fn update_event(&self, event: &EventModel) -> Result<(), AppError> {
        debug!(event_id = %event.id, "Updating event in database");

        let result = sqlx::query(
            "UPDATE events SET title = $2, description = $3, scheduled_start = $4, \
             scheduled_end = $5, timezone = $6, max_attendees = $7, updated_at = $8 \
             WHERE id = $1 AND current_attendees <= $7",
        )
        .bind(event.id)
        .bind(&event.title)
        .bind(&event.description)
        .bind(event.scheduled_start)
        .bind(event.scheduled_end)
        .bind(&event.timezone)
        .bind(event.max_attendees)
        .bind(event.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("Failed to update event in database", e))?;

        if result.rows_affected() == 0 {
            // Either the event is gone or registrations outgrew the new capacity
            let registered: Option<i32> =
                sqlx::query_scalar("SELECT current_attendees FROM events WHERE id = $1")
                    .bind(event.id)
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(|e| db_error("Failed to look up attendee count", e))?;

            return Err(match registered {
                Some(registered) => {
                    warn!(event_id = %event.id, registered, "Capacity below registered attendees");
                    capacity_below_registered(registered)
                }
                None => {
                    warn!(event_id = %event.id, "Event not found for update");
                    AppError::NotFound("Event not found".to_string())
                }
            });
        }

        Ok(())
    }

    #[instrument(skip(self, meeting))]
    async fn set_meeting_linkage(
        &self,
        event_id: Uuid,
        meeting: &MeetingInfo,
    ) -> Result<EventModel, AppError> {
        let row = sqlx::query(&format!(
            "UPDATE events SET meeting_id = $2, meeting_join_url = $3, meeting_secret = $4, \
             meeting_host_url = $5, updated_at = $6 WHERE id = $1 RETURNING {EVENT_COLUMNS}"
        ))
        .bind(event_id)
        .bind(&meeting.id)
        .bind(&meeting.join_url)
        .bind(&meeting.secret)
        .bind(&meeting.host_url)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to update meeting linkage", e))?;

        match row {
            Some(row) => event_from_row(&row).map_err(|e| db_error("Failed to decode event row", e)),
            None => Err(AppError::NotFound("Event not found".to_string())),
        }
    }

    #[instrument(skip(self))]
    async fn delete_event(&self, event_id: Uuid) -> Result<(), AppError> {
        // Attendees go with the event through ON DELETE CASCADE
        let result = sqlx::query("DELETE FROM events WHERE id = $1")
            .bind(event_id)
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("Failed to delete event from database", e))?;

        if result.rows_affected() == 0 {
            warn!(event_id = %event_id, "Event not found for deletion");
            return Err(AppError::NotFound("Event not found".to_string()));
        }

        Ok(())
    }

    #[instrument(skip(self))]
    async fn list_attendees(&self, event_id: Uuid) -> Result<Vec<AttendeeModel>, AppError> {
        sqlx::query_as::<_, AttendeeModel>(&format!(
            "SELECT {ATTENDEE_COLUMNS} FROM attendees WHERE event_id = $1 ORDER BY registered_at"
        ))
        .bind(event_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("Failed to list attendees", e))
    }

    #[instrument(skip(self, attendee), fields(event_id = %attendee.event_id))]
    async fn try_register_attendee(
        &self,
        mut attendee: AttendeeModel,
    ) -> Result<RegisterAttendeeResult, AppError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| db_error("Failed to start registration transaction", e))?;

        // Conditional increment: only one of two racing registrations can take the last seat
        let claimed: Option<Option<String>> = sqlx::query_scalar(
            "UPDATE events SET current_attendees = current_attendees + 1 \
             WHERE id = $1 AND current_attendees < max_attendees \
             RETURNING meeting_join_url",
        )
        .bind(attendee.event_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| db_error("Failed to claim attendee seat", e))?;

        let join_url = match claimed {
            Some(join_url) => join_url,
            None => {
                let limit: Option<i32> =
                    sqlx::query_scalar("SELECT max_attendees FROM events WHERE id = $1")
                        .bind(attendee.event_id)
                        .fetch_optional(&mut *tx)
                        .await
                        .map_err(|e| db_error("Failed to look up event capacity", e))?;

                tx.rollback()
                    .await
                    .map_err(|e| db_error("Failed to roll back registration", e))?;

                return Ok(match limit {
                    Some(limit) => RegisterAttendeeResult::EventFull { limit },
                    None => RegisterAttendeeResult::EventNotFound,
                });
            }
        };

        attendee.join_url = join_url;
        let inserted = sqlx::query(&format!(
            "INSERT INTO attendees ({ATTENDEE_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7) \
             ON CONFLICT (email, event_id) DO NOTHING"
        ))
        .bind(attendee.id)
        .bind(attendee.event_id)
        .bind(&attendee.email)
        .bind(&attendee.first_name)
        .bind(&attendee.last_name)
        .bind(&attendee.join_url)
        .bind(attendee.registered_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| db_error("Failed to insert attendee", e))?;

        if inserted.rows_affected() == 0 {
            tx.rollback()
                .await
                .map_err(|e| db_error("Failed to roll back registration", e))?;
            return Ok(RegisterAttendeeResult::DuplicateRegistration);
        }

        tx.commit()
            .await
            .map_err(|e| db_error("Failed to commit registration", e))?;

        info!(attendee_id = %attendee.id, "Attendee registered in database");
        Ok(RegisterAttendeeResult::Success(attendee))
    }

    #[instrument(skip(self))]
    async fn remove_attendee(&self, event_id: Uuid, attendee_id: Uuid) -> Result<bool, AppError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| db_error("Failed to start unregister transaction", e))?;

        let deleted = sqlx::query("DELETE FROM attendees WHERE id = $1 AND event_id = $2")
            .bind(attendee_id)
            .bind(event_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| db_error("Failed to delete attendee", e))?;

        if deleted.rows_affected() == 0 {
            tx.rollback()
                .await
                .map_err(|e| db_error("Failed to roll back unregister", e))?;
            return Ok(false);
        }

        sqlx::query(
            "UPDATE events SET current_attendees = GREATEST(current_attendees - 1, 0) WHERE id = $1",
        )
        .bind(event_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| db_error("Failed to decrement attendee count", e))?;

        tx.commit()
            .await
            .map_err(|e| db_error("Failed to commit unregister", e))?;

        Ok(true)
    }
}
