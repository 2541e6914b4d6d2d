use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use eventmeet::events::models::{AttendeeModel, EventModel};
use eventmeet::events::repository::{
    EventRepository, InMemoryEventRepository, RegisterAttendeeResult,
};
use eventmeet::meeting::{
    MeetingInfo, MeetingProvider, MeetingRequest, MeetingUpdate, ProviderError,
};
use eventmeet::AppError;

// ============================================================================
// Mock Meeting Provider
// ============================================================================

/// Records every call and can be switched into failure mode
#[derive(Clone)]
pub struct MockMeetingProvider {
    failing: Arc<AtomicBool>,
    next_id: Arc<AtomicUsize>,
    pub created: Arc<RwLock<Vec<MeetingRequest>>>,
    pub fetched: Arc<RwLock<Vec<String>>>,
    pub updated: Arc<RwLock<Vec<(String, MeetingUpdate)>>>,
    pub deleted: Arc<RwLock<Vec<String>>>,
}

impl MockMeetingProvider {
    pub fn new() -> Self {
        Self {
            failing: Arc::new(AtomicBool::new(false)),
            next_id: Arc::new(AtomicUsize::new(1000)),
            created: Arc::new(RwLock::new(Vec::new())),
            fetched: Arc::new(RwLock::new(Vec::new())),
            updated: Arc::new(RwLock::new(Vec::new())),
            deleted: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub async fn total_calls(&self) -> usize {
        self.created.read().await.len()
            + self.fetched.read().await.len()
            + self.updated.read().await.len()
            + self.deleted.read().await.len()
    }

    fn check(&self) -> Result<(), ProviderError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(ProviderError::Api {
                status: 503,
                message: "Service unavailable".to_string(),
            });
        }
        Ok(())
    }

    fn meeting(id: &str) -> MeetingInfo {
        MeetingInfo {
            id: id.to_string(),
            join_url: format!("https://meet.example.com/j/{id}"),
            host_url: format!("https://meet.example.com/s/{id}"),
            secret: Some("pass".to_string()),
        }
    }
}

#[async_trait]
impl MeetingProvider for MockMeetingProvider {
    async fn create_meeting(&self, request: &MeetingRequest) -> Result<MeetingInfo, ProviderError> {
        self.created.write().await.push(request.clone());
        self.check()?;
        let id = self.next_id.fetch_add(1, Ordering::SeqCst).to_string();
        Ok(Self::meeting(&id))
    }

    async fn get_meeting(&self, meeting_id: &str) -> Result<MeetingInfo, ProviderError> {
        self.fetched.write().await.push(meeting_id.to_string());
        self.check()?;
        Ok(Self::meeting(meeting_id))
    }

    async fn update_meeting(
        &self,
        meeting_id: &str,
        update: &MeetingUpdate,
    ) -> Result<(), ProviderError> {
        self.updated
            .write()
            .await
            .push((meeting_id.to_string(), update.clone()));
        self.check()
    }

    async fn delete_meeting(&self, meeting_id: &str) -> Result<(), ProviderError> {
        self.deleted.write().await.push(meeting_id.to_string());
        self.check()
    }
}

// ============================================================================
// Counting Event Repository
// ============================================================================

/// In-memory repository that counts write operations
pub struct CountingEventRepository {
    inner: InMemoryEventRepository,
    writes: AtomicUsize,
}

impl CountingEventRepository {
    pub fn new() -> Self {
        Self {
            inner: InMemoryEventRepository::new(),
            writes: AtomicUsize::new(0),
        }
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn record_write(&self) {
        self.writes.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl EventRepository for CountingEventRepository {
    async fn create_event(&self, event: &EventModel) -> Result<(), AppError> {
        self.record_write();
        self.inner.create_event(event).await
    }

    async fn get_event(&self, event_id: Uuid) -> Result<Option<EventModel>, AppError> {
        self.inner.get_event(event_id).await
    }

    async fn list_events_by_owner(&self, owner_id: Uuid) -> Result<Vec<EventModel>, AppError> {
        self.inner.list_events_by_owner(owner_id).await
    }

    async fn count_events_by_owner(&self, owner_id: Uuid) -> Result<i64, AppError> {
        self.inner.count_events_by_owner(owner_id).await
    }

    async fn update_event(&self, event: &EventModel) -> Result<(), AppError> {
        self.record_write();
        self.inner.update_event(event).await
    }

    async fn set_meeting_linkage(
        &self,
        event_id: Uuid,
        meeting: &MeetingInfo,
    ) -> Result<EventModel, AppError> {
        self.record_write();
        self.inner.set_meeting_linkage(event_id, meeting).await
    }

    async fn delete_event(&self, event_id: Uuid) -> Result<(), AppError> {
        self.record_write();
        self.inner.delete_event(event_id).await
    }

    async fn list_attendees(&self, event_id: Uuid) -> Result<Vec<AttendeeModel>, AppError> {
        self.inner.list_attendees(event_id).await
    }

    async fn try_register_attendee(
        &self,
        attendee: AttendeeModel,
    ) -> Result<RegisterAttendeeResult, AppError> {
        self.record_write();
        self.inner.try_register_attendee(attendee).await
    }

    async fn remove_attendee(&self, event_id: Uuid, attendee_id: Uuid) -> Result<bool, AppError> {
        self.record_write();
        self.inner.remove_attendee(event_id, attendee_id).await
    }
}
