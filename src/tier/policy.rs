use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::fmt;

use super::models::{SubscriptionTier, UNLIMITED};

/// What a caller wants to do, expressed in the units the tier caps use
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LimitRequest {
    pub existing_event_count: i64,
    pub requested_attendees: i64,
    pub requested_duration_minutes: i64,
}

/// Reason a request was denied, carrying the cap and the offending value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LimitViolation {
    EventLimitExceeded { limit: i64, current_count: i64 },
    AttendeeLimitExceeded { limit: i64, requested: i64 },
    DurationLimitExceeded { limit: i64, requested: i64 },
}

impl LimitViolation {
    /// Machine-readable code for API error bodies
    pub fn code(&self) -> &'static str {
        match self {
            LimitViolation::EventLimitExceeded { .. } => "EVENT_LIMIT_EXCEEDED",
            LimitViolation::AttendeeLimitExceeded { .. } => "ATTENDEE_LIMIT_EXCEEDED",
            LimitViolation::DurationLimitExceeded { .. } => "DURATION_LIMIT_EXCEEDED",
        }
    }
}

impl fmt::Display for LimitViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LimitViolation::EventLimitExceeded {
                limit,
                current_count,
            } => write!(
                f,
                "event limit of {} reached ({} events exist)",
                limit, current_count
            ),
            LimitViolation::AttendeeLimitExceeded { limit, requested } => write!(
                f,
                "{} attendees requested but the plan allows {}",
                requested, limit
            ),
            LimitViolation::DurationLimitExceeded { limit, requested } => write!(
                f,
                "{} minute event exceeds the plan cap of {} minutes",
                requested, limit
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(LimitViolation),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }

    pub fn into_result(self) -> Result<(), LimitViolation> {
        match self {
            Decision::Allow => Ok(()),
            Decision::Deny(violation) => Err(violation),
        }
    }
}

/// Checks a request against the tier caps. Rules run in a fixed order and the
/// first failing one decides: event count, then attendees, then duration.
pub fn evaluate(tier: SubscriptionTier, request: &LimitRequest) -> Decision {
    let limits = tier.limits();

    if limits.max_events != UNLIMITED && request.existing_event_count >= limits.max_events {
        return Decision::Deny(LimitViolation::EventLimitExceeded {
            limit: limits.max_events,
            current_count: request.existing_event_count,
        });
    }

    if request.requested_attendees > limits.max_attendees {
        return Decision::Deny(LimitViolation::AttendeeLimitExceeded {
            limit: limits.max_attendees,
            requested: request.requested_attendees,
        });
    }

    if limits.max_duration_minutes != UNLIMITED
        && request.requested_duration_minutes > limits.max_duration_minutes
    {
        return Decision::Deny(LimitViolation::DurationLimitExceeded {
            limit: limits.max_duration_minutes,
            requested: request.requested_duration_minutes,
        });
    }

    Decision::Allow
}

/// Convenience wrapper over [`evaluate`] taking the individual values
pub fn evaluate_tier_limits(
    tier: SubscriptionTier,
    existing_event_count: i64,
    requested_attendees: i64,
    requested_duration_minutes: i64,
) -> Decision {
    evaluate(
        tier,
        &LimitRequest {
            existing_event_count,
            requested_attendees,
            requested_duration_minutes,
        },
    )
}

/// Whole minutes between two instants, rounded up. 60.5 minutes counts as 61.
pub fn duration_minutes(start: DateTime<Utc>, end: DateTime<Utc>) -> i64 {
    let length = end - start;
    if length <= Duration::zero() {
        return 0;
    }

    let seconds = length.num_seconds();
    let subsec_nanos = (length - Duration::seconds(seconds))
        .num_nanoseconds()
        .unwrap_or(0);

    let minutes = seconds / 60;
    if seconds % 60 != 0 || subsec_nanos > 0 {
        minutes + 1
    } else {
        minutes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use rstest::rstest;

    fn request(events: i64, attendees: i64, minutes: i64) -> LimitRequest {
        LimitRequest {
            existing_event_count: events,
            requested_attendees: attendees,
            requested_duration_minutes: minutes,
        }
    }

    #[rstest]
    #[case(SubscriptionTier::Trial, 0)]
    #[case(SubscriptionTier::Trial, 2)]
    #[case(SubscriptionTier::Standard, 0)]
    #[case(SubscriptionTier::Standard, 19)]
    fn test_event_count_below_limit_is_allowed(#[case] tier: SubscriptionTier, #[case] count: i64) {
        assert_eq!(evaluate(tier, &request(count, 1, 10)), Decision::Allow);
    }

    #[rstest]
    #[case(SubscriptionTier::Trial, 3, 3)]
    #[case(SubscriptionTier::Trial, 7, 3)]
    #[case(SubscriptionTier::Standard, 20, 20)]
    #[case(SubscriptionTier::Standard, 25, 20)]
    fn test_event_count_at_or_above_limit_is_denied(
        #[case] tier: SubscriptionTier,
        #[case] count: i64,
        #[case] limit: i64,
    ) {
        assert_eq!(
            evaluate(tier, &request(count, 1, 10)),
            Decision::Deny(LimitViolation::EventLimitExceeded {
                limit,
                current_count: count
            })
        );
    }

    #[rstest]
    #[case(0)]
    #[case(1_000)]
    #[case(i64::MAX)]
    fn test_pro_never_denies_on_event_count(#[case] count: i64) {
        assert!(evaluate(SubscriptionTier::Pro, &request(count, 1, 10)).is_allowed());
    }

    #[rstest]
    #[case(SubscriptionTier::Trial, 10)]
    #[case(SubscriptionTier::Standard, 100)]
    #[case(SubscriptionTier::Pro, 1000)]
    fn test_attendee_cap_is_inclusive(#[case] tier: SubscriptionTier, #[case] cap: i64) {
        assert!(evaluate(tier, &request(0, cap, 10)).is_allowed());
        assert_eq!(
            evaluate(tier, &request(0, cap + 1, 10)),
            Decision::Deny(LimitViolation::AttendeeLimitExceeded {
                limit: cap,
                requested: cap + 1
            })
        );
    }

    #[rstest]
    #[case(SubscriptionTier::Trial, 40)]
    #[case(SubscriptionTier::Standard, 240)]
    fn test_duration_cap_is_inclusive(#[case] tier: SubscriptionTier, #[case] cap: i64) {
        assert!(evaluate(tier, &request(0, 1, cap)).is_allowed());
        assert_eq!(
            evaluate(tier, &request(0, 1, cap + 1)),
            Decision::Deny(LimitViolation::DurationLimitExceeded {
                limit: cap,
                requested: cap + 1
            })
        );
    }

    #[test]
    fn test_pro_has_no_duration_cap() {
        assert!(evaluate(SubscriptionTier::Pro, &request(0, 1, 24 * 60 * 7)).is_allowed());
    }

    #[test]
    fn test_first_failing_rule_wins() {
        // Every rule fails here; the event count rule is reported
        let decision = evaluate(SubscriptionTier::Trial, &request(3, 500, 500));
        assert!(matches!(
            decision,
            Decision::Deny(LimitViolation::EventLimitExceeded { .. })
        ));

        // Attendees and duration fail; attendees is reported
        let decision = evaluate(SubscriptionTier::Trial, &request(0, 500, 500));
        assert!(matches!(
            decision,
            Decision::Deny(LimitViolation::AttendeeLimitExceeded { .. })
        ));
    }

    #[test]
    fn test_evaluate_tier_limits_matches_evaluate() {
        assert_eq!(
            evaluate_tier_limits(SubscriptionTier::Trial, 3, 5, 30),
            Decision::Deny(LimitViolation::EventLimitExceeded {
                limit: 3,
                current_count: 3
            })
        );
    }

    #[rstest]
    #[case(Duration::minutes(60), 60)]
    #[case(Duration::seconds(60 * 60 + 30), 61)]
    #[case(Duration::milliseconds(240 * 60_000 + 12_000), 241)]
    #[case(Duration::seconds(1), 1)]
    #[case(Duration::minutes(40) + Duration::microseconds(500), 41)]
    #[case(Duration::nanoseconds(1), 1)]
    #[case(Duration::zero(), 0)]
    #[case(Duration::seconds(-30), 0)]
    fn test_duration_minutes_rounds_up(#[case] length: Duration, #[case] expected: i64) {
        let start = Utc.with_ymd_and_hms(2030, 1, 1, 9, 0, 0).unwrap();
        assert_eq!(duration_minutes(start, start + length), expected);
    }

    #[test]
    fn test_fractional_duration_denied_after_rounding() {
        let start = Utc.with_ymd_and_hms(2030, 1, 1, 9, 0, 0).unwrap();
        let end = start + Duration::milliseconds(240 * 60_000 + 12_000); // 240.2 minutes
        let minutes = duration_minutes(start, end);

        assert_eq!(
            evaluate(SubscriptionTier::Standard, &request(0, 1, minutes)),
            Decision::Deny(LimitViolation::DurationLimitExceeded {
                limit: 240,
                requested: 241
            })
        );
    }

    #[test]
    fn test_sub_millisecond_overrun_denied_on_trial() {
        let start = Utc.with_ymd_and_hms(2030, 1, 1, 9, 0, 0).unwrap();
        let end = start + Duration::minutes(40) + Duration::microseconds(500);

        assert_eq!(
            evaluate_tier_limits(SubscriptionTier::Trial, 0, 1, duration_minutes(start, end)),
            Decision::Deny(LimitViolation::DurationLimitExceeded {
                limit: 40,
                requested: 41
            })
        );
    }

    #[test]
    fn test_violation_serializes_with_kind() {
        let violation = LimitViolation::EventLimitExceeded {
            limit: 3,
            current_count: 3,
        };
        let json = serde_json::to_value(violation).unwrap();
        assert_eq!(json["kind"], "event_limit_exceeded");
        assert_eq!(json["limit"], 3);
        assert_eq!(json["current_count"], 3);
        assert_eq!(violation.code(), "EVENT_LIMIT_EXCEEDED");
    }
}
