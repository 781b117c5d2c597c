//! Subscription data models.
//!
//! This module defines the built-in plan catalog and the local mirror of the
//! server-owned subscription record.

use std::{fmt, str::FromStr, sync::LazyLock};

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::{ClientError, Result};

/// Identifier of one of the three membership plans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanId {
    /// Free trial plan.
    Free,
    /// Mid-tier paid plan.
    Elevate,
    /// Top-tier paid plan.
    Unlimited,
}

impl PlanId {
    /// All plans in catalog order.
    pub const ALL: [Self; 3] = [Self::Free, Self::Elevate, Self::Unlimited];

    /// Returns the wire name (`free`, `elevate`, `unlimited`).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Elevate => "elevate",
            Self::Unlimited => "unlimited",
        }
    }

    /// Returns the capitalized name used in messages.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Free => "Free",
            Self::Elevate => "Elevate",
            Self::Unlimited => "Unlimited",
        }
    }

    /// Returns true for every plan except [`PlanId::Free`].
    #[must_use]
    pub const fn is_paid(self) -> bool {
        !matches!(self, Self::Free)
    }

    /// Returns the catalog entry for this plan.
    #[must_use]
    pub fn plan(self) -> &'static Plan {
        match self {
            Self::Free => &CATALOG[0],
            Self::Elevate => &CATALOG[1],
            Self::Unlimited => &CATALOG[2],
        }
    }
}

impl fmt::Display for PlanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlanId {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "free" => Ok(Self::Free),
            "elevate" => Ok(Self::Elevate),
            "unlimited" => Ok(Self::Unlimited),
            other => Err(ClientError::InvalidInput(format!(
                "unknown plan '{other}', expected one of: free, elevate, unlimited"
            ))),
        }
    }
}

/// Immutable catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Plan {
    /// Plan identifier.
    pub id: PlanId,
    /// Display title.
    pub title: &'static str,
    /// Price in USD per billing period.
    pub price: Decimal,
    /// Billing period abbreviation.
    pub billing_period: &'static str,
    /// Marketing subtitle.
    pub subtitle: &'static str,
    /// Included transcription hours.
    pub hours: &'static str,
    /// Footnote.
    pub note: &'static str,
    /// Call-to-action label.
    pub call_to_action: &'static str,
}

impl Plan {
    /// Returns true if the plan costs money.
    #[must_use]
    pub fn is_paid(&self) -> bool {
        self.id.is_paid()
    }
}

const ROLLOVER_NOTE: &str = "*Hours do not roll over to the following month";

static CATALOG: LazyLock<[Plan; 3]> = LazyLock::new(|| {
    [
        Plan {
            id: PlanId::Free,
            title: "Free Trial",
            price: Decimal::ZERO,
            billing_period: "mo",
            subtitle: "Start with a taste. Real-time voice insights. Meet your guides. Begin your \
                       journey.",
            hours: "10 hours transcription*",
            note: ROLLOVER_NOTE,
            call_to_action: "AWAKEN YOUR POTENTIAL",
        },
        Plan {
            id: PlanId::Elevate,
            title: "Elevate",
            price: Decimal::from(9),
            billing_period: "mo",
            subtitle: "Consistent reflection. Weekly patterns. Emotional intelligence that builds \
                       over time.",
            hours: "40 hours transcription*",
            note: ROLLOVER_NOTE,
            call_to_action: "DISCOVER YOUR EDGE",
        },
        Plan {
            id: PlanId::Unlimited,
            title: "Unlimited",
            price: Decimal::from(19),
            billing_period: "mo",
            subtitle: "Total access. Deeper data. Ideal for coaches, leaders and transformation \
                       seekers.",
            hours: "Unlimited transcription",
            note: ROLLOVER_NOTE,
            call_to_action: "MASTER YOUR EVOLUTION",
        },
    ]
});

/// Returns the built-in plan catalog in display order.
#[must_use]
pub fn catalog() -> &'static [Plan] {
    CATALOG.as_slice()
}

/// Subscription status as reported by the backend.
///
/// Decoded case-insensitively. Unknown values are preserved verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SubscriptionStatus {
    /// Renewing normally.
    Active,
    /// Will not renew; paid time remains until expiration.
    Cancelled,
    /// Awaiting payment confirmation.
    Pending,
    /// Any other backend status.
    Other(String),
}

impl SubscriptionStatus {
    /// Returns the canonical string form.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Active => "Active",
            Self::Cancelled => "Cancelled",
            Self::Pending => "Pending",
            Self::Other(s) => s,
        }
    }
}

impl From<&str> for SubscriptionStatus {
    fn from(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "active" => Self::Active,
            "cancelled" => Self::Cancelled,
            "pending" => Self::Pending,
            _ => Self::Other(s.to_owned()),
        }
    }
}

impl fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for SubscriptionStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for SubscriptionStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(Self::from(s.as_str()))
    }
}

/// Local mirror of the server-owned subscription record.
///
/// Dates are kept as the backend sent them; the record is a display cache and is
/// replaced wholesale after every mutating call. Fields this type does not model are
/// preserved in [`extra`](Self::extra).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionRecord {
    /// Plan name (`free`, `elevate`, `unlimited`).
    pub plan_name: String,
    /// Subscription status.
    pub status: SubscriptionStatus,
    /// End of the paid period.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration_date: Option<String>,
    /// Start of the subscription.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscribed_at: Option<String>,
    /// Price per period in USD.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<Decimal>,
    /// Plan the subscription will switch to at the end of the period.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled_plan_change: Option<String>,
    /// Date the scheduled change takes effect.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled_change_date: Option<String>,
    /// Price of the scheduled plan.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled_change_price: Option<Decimal>,
    /// When the subscription was cancelled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancelled_at: Option<String>,
    /// When the subscription was reactivated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reactivated_at: Option<String>,
    /// Unmodelled backend fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SubscriptionRecord {
    /// Creates a minimal record, mainly for tests and fixtures.
    #[must_use]
    pub fn new(plan: PlanId, status: SubscriptionStatus) -> Self {
        Self {
            plan_name: plan.as_str().to_owned(),
            status,
            expiration_date: None,
            subscribed_at: None,
            price: Some(plan.plan().price),
            scheduled_plan_change: None,
            scheduled_change_date: None,
            scheduled_change_price: None,
            cancelled_at: None,
            reactivated_at: None,
            extra: Map::new(),
        }
    }

    /// Decodes a record from a backend payload.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidResponse`] if the payload is not a subscription.
    pub fn from_value(value: Value) -> Result<Self> {
        serde_json::from_value(value)
            .map_err(|e| {
                ClientError::InvalidResponse(format!("Unexpected subscription shape: {e}"))
            })
    }

    /// Returns the plan, if `plan_name` is a known plan.
    #[must_use]
    pub fn plan_id(&self) -> Option<PlanId> {
        self.plan_name.parse().ok()
    }

    /// Returns the scheduled plan, if any and known.
    #[must_use]
    pub fn scheduled_plan(&self) -> Option<PlanId> {
        self.scheduled_plan_change.as_deref().and_then(|p| p.parse().ok())
    }

    /// Returns true if the status is active.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == SubscriptionStatus::Active
    }

    /// Returns true if the status is cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.status == SubscriptionStatus::Cancelled
    }

    /// Returns true if the subscription is active on a paid plan.
    #[must_use]
    pub fn is_active_paid(&self) -> bool {
        self.is_active() && self.plan_id().is_some_and(PlanId::is_paid)
    }

    /// Returns true if the subscription costs money, judged by price and then plan.
    #[must_use]
    pub fn is_paid(&self) -> bool {
        match self.price {
            Some(price) => price > Decimal::ZERO,
            None => self.plan_id().is_some_and(PlanId::is_paid),
        }
    }

    /// Describes the scheduled plan change, shown while active or cancelled.
    ///
    /// ```
    /// use membership_client::subscription::{PlanId, SubscriptionRecord, SubscriptionStatus};
    /// use rust_decimal::Decimal;
    ///
    /// let mut record = SubscriptionRecord::new(PlanId::Unlimited, SubscriptionStatus::Active);
    /// record.scheduled_plan_change = Some("elevate".to_owned());
    /// record.scheduled_change_date = Some("2025-03-01".to_owned());
    /// record.scheduled_change_price = Some(Decimal::from(9));
    /// assert_eq!(
    ///     record.scheduled_change_notice().as_deref(),
    ///     Some("Your plan will automatically change to ELEVATE ($9/month) on March 1, 2025.")
    /// );
    /// ```
    #[must_use]
    pub fn scheduled_change_notice(&self) -> Option<String> {
        if !(self.is_active() || self.is_cancelled()) {
            return None;
        }
        let plan = self.scheduled_plan_change.as_deref()?;
        let price = match self.scheduled_change_price {
            Some(p) if p > Decimal::ZERO => format!(" (${}/month)", p.normalize()),
            _ => String::new(),
        };
        let date =
            self.scheduled_change_date.as_deref().map(format_display_date).unwrap_or_default();
        Some(format!(
            "Your plan will automatically change to {}{price} on {date}.",
            plan.to_ascii_uppercase()
        ))
    }
}

/// Formats a backend date as `Month D, YYYY`.
///
/// Only the date part of an ISO-8601 timestamp is used. Unparseable input is returned
/// unchanged; empty input yields an empty string.
///
/// # Examples
///
/// ```
/// use membership_client::subscription::format_display_date;
///
/// assert_eq!(format_display_date("2025-03-01T12:30:00Z"), "March 1, 2025");
/// assert_eq!(format_display_date("soon"), "soon");
/// ```
#[must_use]
pub fn format_display_date(date: &str) -> String {
    let date_part = date.split('T').next().unwrap_or_default();
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
        .map_or_else(|_| date.to_owned(), |d| d.format("%B %-d, %Y").to_string())
}
