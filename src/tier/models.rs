use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Sentinel used in limit tables for "no cap"
pub const UNLIMITED: i64 = -1;

/// Subscription plan a user is on
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionTier {
    #[default]
    Trial,
    Standard,
    Pro,
}

/// Fixed caps attached to a tier. `UNLIMITED` (-1) disables a cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TierLimits {
    pub max_events: i64,
    pub max_attendees: i64,
    pub max_duration_minutes: i64,
}

const TRIAL_LIMITS: TierLimits = TierLimits {
    max_events: 3,
    max_attendees: 10,
    max_duration_minutes: 40,
};

const STANDARD_LIMITS: TierLimits = TierLimits {
    max_events: 20,
    max_attendees: 100,
    max_duration_minutes: 240,
};

const PRO_LIMITS: TierLimits = TierLimits {
    max_events: UNLIMITED,
    max_attendees: 1000,
    max_duration_minutes: UNLIMITED,
};

impl SubscriptionTier {
    pub const ALL: [SubscriptionTier; 3] = [
        SubscriptionTier::Trial,
        SubscriptionTier::Standard,
        SubscriptionTier::Pro,
    ];

    pub fn limits(&self) -> &'static TierLimits {
        match self {
            SubscriptionTier::Trial => &TRIAL_LIMITS,
            SubscriptionTier::Standard => &STANDARD_LIMITS,
            SubscriptionTier::Pro => &PRO_LIMITS,
        }
    }

    /// Name used for storage and in JSON payloads
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionTier::Trial => "trial",
            SubscriptionTier::Standard => "standard",
            SubscriptionTier::Pro => "pro",
        }
    }
}

impl fmt::Display for SubscriptionTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown subscription tier: {0}")]
pub struct UnknownTier(pub String);

impl FromStr for SubscriptionTier {
    type Err = UnknownTier;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trial" => Ok(SubscriptionTier::Trial),
            "standard" => Ok(SubscriptionTier::Standard),
            "pro" => Ok(SubscriptionTier::Pro),
            other => Err(UnknownTier(other.to_string())),
        }
    }
}
