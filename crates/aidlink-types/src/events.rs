use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::Amount;

/// A plaintext value that must never reach logs. Serializes as-is so it can
/// travel to the delivery collaborator exactly once.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

/// Outbound notification addressed to one recipient.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub recipient_email: String,
    pub event: NotificationEvent,
}

/// Structured payloads handed to the delivery collaborator. Rendering is
/// its concern, not ours.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum NotificationEvent {
    /// Sent to a named donor after their donation lands
    DonationConfirmed {
        transaction_id: Uuid,
        campaign_id: Uuid,
        campaign_title: String,
        amount: Amount,
        impact_story: String,
    },

    /// Sent to the campaign owner for every donation
    DonationReceived {
        transaction_id: Uuid,
        campaign_id: Uuid,
        campaign_title: String,
        amount: Amount,
        donor_name: Option<String>,
        raised: Amount,
        goal: Amount,
    },

    CampaignApproved {
        campaign_id: Uuid,
        campaign_title: String,
    },

    CampaignRejected {
        campaign_id: Uuid,
        campaign_title: String,
    },

    /// One-time credentials for a beneficiary whose request was approved
    CredentialsIssued {
        request_id: Uuid,
        user_id: Uuid,
        name: String,
        email: String,
        password: Secret,
    },

    RequestRejected {
        request_id: Uuid,
        request_title: String,
        reason: String,
    },

    RequestSanctioned {
        request_id: Uuid,
        request_title: String,
        amount: Amount,
    },
}

impl NotificationEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::DonationConfirmed { .. } => "donation-confirmed",
            Self::DonationReceived { .. } => "donation-received",
            Self::CampaignApproved { .. } => "campaign-approved",
            Self::CampaignRejected { .. } => "campaign-rejected",
            Self::CredentialsIssued { .. } => "credentials-issued",
            Self::RequestRejected { .. } => "request-rejected",
            Self::RequestSanctioned { .. } => "request-sanctioned",
        }
    }
}
