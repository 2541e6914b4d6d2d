// Library crate for the eventmeet server
// This file exposes the public API for integration tests

pub mod config;
pub mod db;
pub mod events;
pub mod meeting;
pub mod routes;
pub mod shared;
pub mod tier;
pub mod user;

// Re-export commonly used types for easier access in tests
pub use events::{EventService, RemoteOutcome, SyncOutcome};
pub use meeting::{MeetingInfo, MeetingProvider, ProviderError};
pub use routes::build_router;
pub use shared::{AppError, AppState};
pub use tier::{evaluate_tier_limits, Decision, LimitViolation, SubscriptionTier};
pub use user::AuthUser;
