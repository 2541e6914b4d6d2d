// Public API - what other modules can use
pub use handlers::{change_subscription, current_user, login, register_user};
pub use middleware::auth_middleware;
pub use types::AuthUser;

// Internal modules
mod handlers;
mod middleware;
pub mod models;
mod password;
pub mod repository;
pub mod service;
pub mod token;
pub mod types;
