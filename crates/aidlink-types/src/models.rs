use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::Amount;

/// A stored enum column held a value this build does not know.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} '{value}'")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

/// Closed string-backed enums. The string form is what goes over the wire
/// and into SQLite, so it must stay stable.
macro_rules! string_enum {
    ($(#[$meta:meta])* $name:ident, $kind:literal { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "lowercase")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    other => Err(UnknownVariant {
                        kind: $kind,
                        value: other.to_string(),
                    }),
                }
            }
        }
    };
}

string_enum!(
    /// Who a user is on the platform. Response shapes and permissions
    /// branch on this with exhaustive matches.
    Role, "role" {
        Admin => "admin",
        Donor => "donor",
        Helper => "helper",
        Receiver => "receiver",
        Organization => "organization",
    }
);

string_enum!(
    CampaignStatus, "campaign status" {
        Pending => "pending",
        Active => "active",
        Rejected => "rejected",
    }
);

string_enum!(
    RequestStatus, "request status" {
        Pending => "pending",
        Accepted => "accepted",
        Approved => "approved",
        Sanctioned => "sanctioned",
        Completed => "completed",
        Rejected => "rejected",
    }
);

string_enum!(
    RequestType, "request type" {
        Service => "service",
        Financial => "financial",
    }
);

string_enum!(
    Urgency, "urgency" {
        Low => "low",
        Medium => "medium",
        High => "high",
    }
);

string_enum!(
    TransactionStatus, "transaction status" {
        Completed => "completed",
    }
);

impl RequestStatus {
    /// Statuses a helper's nearby search still considers open.
    pub fn is_open(self) -> bool {
        matches!(self, Self::Pending | Self::Approved)
    }

    /// Statuses from which an admin may still approve or reject.
    pub fn is_undecided(self) -> bool {
        matches!(self, Self::Pending | Self::Accepted)
    }
}

impl Default for Urgency {
    fn default() -> Self {
        Self::Medium
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub lat: f64,
    pub lng: f64,
    #[serde(default)]
    pub address: Option<String>,
}

impl Location {
    pub fn point(&self) -> GeoPoint {
        GeoPoint {
            lat: self.lat,
            lng: self.lng,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub verified: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Campaign {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub category: String,
    pub goal: Amount,
    pub raised: Amount,
    pub donor_count: i64,
    pub status: CampaignStatus,
    pub active: bool,
    pub verified: bool,
    pub created_by: Uuid,
    pub deadline: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

impl Campaign {
    pub fn progress(&self) -> CampaignProgress {
        CampaignProgress::new(self.id, self.raised, self.goal, self.donor_count)
    }
}

/// Read-only view of a campaign's ledger. `percent` is capped for display;
/// `raised` is not.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CampaignProgress {
    pub campaign_id: Uuid,
    pub raised: Amount,
    pub goal: Amount,
    pub donor_count: i64,
    pub percent: f64,
}

impl CampaignProgress {
    pub fn new(campaign_id: Uuid, raised: Amount, goal: Amount, donor_count: i64) -> Self {
        let percent = if goal > 0 {
            (raised as f64 / goal as f64 * 100.0).min(100.0)
        } else {
            0.0
        };
        Self {
            campaign_id,
            raised,
            goal,
            donor_count,
            percent,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    pub id: Uuid,
    pub user_id: Uuid,
    pub category: String,
    pub title: String,
    pub description: String,
    #[serde(rename = "type")]
    pub kind: RequestType,
    pub location: Option<Location>,
    pub status: RequestStatus,
    pub urgency: Urgency,
    pub amount: Option<Amount>,
    pub sanctioned_amount: Option<Amount>,
    pub accepted_by: Option<Uuid>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub proof_docs: Vec<String>,
    pub completed: bool,
    pub approved_by: Option<Uuid>,
    pub approved_at: Option<DateTime<Utc>>,
    pub rejected_by: Option<Uuid>,
    pub rejected_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
    pub sanctioned_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// A single completed donation. Never mutated after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: Uuid,
    /// `None` for anonymous donations.
    pub donor_id: Option<Uuid>,
    pub receiver_id: Uuid,
    pub campaign_id: Uuid,
    pub amount: Amount,
    pub is_anonymous: bool,
    pub qr_code: Option<String>,
    pub track_url: Option<String>,
    pub impact_story: String,
    pub status: TransactionStatus,
    pub payment_id: String,
    pub created_at: DateTime<Utc>,
}
