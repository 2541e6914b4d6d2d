use chrono::{Duration, Utc};
use std::sync::Arc;
use uuid::Uuid;

use eventmeet::events::models::EventModel;
use eventmeet::events::repository::EventRepository;
use eventmeet::events::types::CreateEventRequest;
use eventmeet::user::repository::InMemoryUserRepository;
use eventmeet::user::token::TokenConfig;
use eventmeet::{AppState, AuthUser, EventService, SubscriptionTier};

use super::mocks::{CountingEventRepository, MockMeetingProvider};

// ============================================================================
// Test Setup Infrastructure
// ============================================================================

pub struct TestSetup {
    pub owner: AuthUser,
    pub provider: Arc<MockMeetingProvider>,
    pub repository: Arc<CountingEventRepository>,
    pub service: EventService,
}

pub struct TestSetupBuilder {
    tier: SubscriptionTier,
    existing_events: usize,
    failing_provider: bool,
}

impl TestSetupBuilder {
    pub fn new() -> Self {
        Self {
            tier: SubscriptionTier::Trial,
            existing_events: 0,
            failing_provider: false,
        }
    }

    pub fn with_tier(mut self, tier: SubscriptionTier) -> Self {
        self.tier = tier;
        self
    }

    /// Seeds events owned by the test user directly in the store
    pub fn with_existing_events(mut self, count: usize) -> Self {
        self.existing_events = count;
        self
    }

    pub fn with_failing_provider(mut self) -> Self {
        self.failing_provider = true;
        self
    }

    pub async fn build(self) -> TestSetup {
        let owner = AuthUser {
            id: Uuid::new_v4(),
            email: "owner@example.com".to_string(),
            tier: self.tier,
        };
        let provider = Arc::new(MockMeetingProvider::new());
        let repository = Arc::new(CountingEventRepository::new());

        for i in 0..self.existing_events {
            let start = Utc::now() + Duration::days(1 + i as i64);
            let event = EventModel::new(
                owner.id,
                format!("Seeded event {i}"),
                None,
                start,
                start + Duration::minutes(30),
                "UTC".to_string(),
                5,
            );
            repository.create_event(&event).await.unwrap();
        }

        provider.set_failing(self.failing_provider);

        let service = EventService::new(repository.clone(), provider.clone());

        TestSetup {
            owner,
            provider,
            repository,
            service,
        }
    }
}

impl TestSetup {
    /// Valid request for a 30 minute event tomorrow
    pub fn create_request(&self, max_attendees: i32) -> CreateEventRequest {
        let start = Utc::now() + Duration::days(1);
        CreateEventRequest {
            title: "Quarterly review".to_string(),
            description: Some("Numbers and plans".to_string()),
            scheduled_start: start,
            scheduled_end: start + Duration::minutes(30),
            timezone: None,
            max_attendees,
        }
    }

    /// App state sharing this setup's store and provider, for router-level tests
    pub fn app_state(&self) -> AppState {
        AppState::new(
            Arc::new(InMemoryUserRepository::new()),
            self.repository.clone(),
            self.provider.clone(),
            TokenConfig::new("integration-secret".to_string(), 7),
        )
    }
}
