// Subscription tiers and the pure limit checks applied to event requests
pub mod models;
pub mod policy;

pub use models::{SubscriptionTier, TierLimits, UNLIMITED};
pub use policy::{
    duration_minutes, evaluate, evaluate_tier_limits, Decision, LimitRequest, LimitViolation,
};
