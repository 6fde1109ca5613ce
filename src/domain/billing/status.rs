//! Subscription status as reported by Stripe.
//!
//! The store caches the provider's status verbatim, so this enum mirrors
//! Stripe's vocabulary rather than modelling a local state machine.

use serde::{Deserialize, Serialize};

/// Stripe subscription status.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SubscriptionStatus {
    /// Subscription is active and current.
    Active,

    /// Latest invoice payment failed; Stripe is retrying.
    PastDue,

    /// Subscription is canceled.
    Canceled,

    /// Initial payment has not completed yet.
    Incomplete,

    /// Initial payment never completed within 23 hours.
    IncompleteExpired,

    /// Subscription is in trial period.
    Trialing,

    /// Retries exhausted, invoices left open.
    Unpaid,

    /// Subscription is paused.
    Paused,

    /// A status this service does not know about, kept verbatim.
    Unknown(String),
}

impl SubscriptionStatus {
    /// Parses Stripe's status string. Unrecognized values are kept as `Unknown`.
    pub fn parse(s: &str) -> Self {
        match s {
            "active" => Self::Active,
            "past_due" => Self::PastDue,
            "canceled" => Self::Canceled,
            "incomplete" => Self::Incomplete,
            "incomplete_expired" => Self::IncompleteExpired,
            "trialing" => Self::Trialing,
            "unpaid" => Self::Unpaid,
            "paused" => Self::Paused,
            other => Self::Unknown(other.to_string()),
        }
    }

    /// Stripe's status string.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Active => "active",
            Self::PastDue => "past_due",
            Self::Canceled => "canceled",
            Self::Incomplete => "incomplete",
            Self::IncompleteExpired => "incomplete_expired",
            Self::Trialing => "trialing",
            Self::Unpaid => "unpaid",
            Self::Paused => "paused",
            Self::Unknown(raw) => raw,
        }
    }

    /// Check if subscription grants access to paid features.
    pub fn has_access(&self) -> bool {
        matches!(
            self,
            SubscriptionStatus::Active | SubscriptionStatus::Trialing | SubscriptionStatus::PastDue
        )
    }
}

impl From<String> for SubscriptionStatus {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}

impl From<SubscriptionStatus> for String {
    fn from(status: SubscriptionStatus) -> Self {
        status.as_str().to_string()
    }
}

impl std::fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_known_statuses() {
        let statuses = [
            SubscriptionStatus::Active,
            SubscriptionStatus::PastDue,
            SubscriptionStatus::Canceled,
            SubscriptionStatus::Incomplete,
            SubscriptionStatus::IncompleteExpired,
            SubscriptionStatus::Trialing,
            SubscriptionStatus::Unpaid,
            SubscriptionStatus::Paused,
        ];

        for status in statuses {
            assert_eq!(SubscriptionStatus::parse(status.as_str()), status);
        }
    }

    #[test]
    fn parse_unrecognized_status_keeps_raw_value() {
        let status = SubscriptionStatus::parse("something_new");

        assert_eq!(status, SubscriptionStatus::Unknown("something_new".to_string()));
        assert_eq!(status.as_str(), "something_new");
    }

    #[test]
    fn unrecognized_status_serializes_back_verbatim() {
        let status: SubscriptionStatus = serde_json::from_str("\"frozen\"").unwrap();

        assert_eq!(status, SubscriptionStatus::Unknown("frozen".to_string()));
        assert_eq!(serde_json::to_string(&status).unwrap(), "\"frozen\"");
    }

    #[test]
    fn serializes_as_snake_case() {
        let json = serde_json::to_string(&SubscriptionStatus::PastDue).unwrap();
        assert_eq!(json, "\"past_due\"");
    }

    #[test]
    fn access_checks() {
        assert!(SubscriptionStatus::Active.has_access());
        assert!(SubscriptionStatus::Trialing.has_access());
        assert!(SubscriptionStatus::PastDue.has_access());

        assert!(!SubscriptionStatus::Canceled.has_access());
        assert!(!SubscriptionStatus::Incomplete.has_access());
        assert!(!SubscriptionStatus::Unpaid.has_access());
        assert!(!SubscriptionStatus::Unknown("frozen".to_string()).has_access());
    }
}
