// Public API - what other modules can use
pub use handlers::{
    create_event, delete_event, get_event, get_public_event, list_attendees, list_events,
    refresh_meeting, register_attendee, unregister_attendee, update_event,
};
pub use service::EventService;
pub use sync::{RemoteOutcome, SyncOutcome};

// Internal modules
mod handlers;
pub mod models;
pub mod repository;
pub mod service;
pub mod sync;
pub mod types;
