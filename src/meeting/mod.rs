// Public API - what other modules can use
pub use provider::{DisabledMeetingProvider, MeetingProvider, ProviderError};
pub use types::{MeetingInfo, MeetingRequest, MeetingUpdate};
pub use zoom::{ZoomClient, ZoomConfig};

// Internal modules
mod provider;
pub mod token;
pub mod types;
pub mod zoom;
