use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::Amount;
use crate::events::Secret;
use crate::models::{
    Campaign, CampaignProgress, Location, Request, RequestType, Role, Transaction, Urgency,
};

// -- Users --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterUserRequest {
    pub name: String,
    pub email: String,
    pub role: Role,
}

// -- Campaigns --

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct NewCampaign {
    pub title: String,
    pub description: String,
    pub category: String,
    pub goal: Amount,
    pub created_by: Uuid,
    #[serde(default)]
    pub deadline: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct DonateRequest {
    #[serde(default)]
    pub donor_id: Option<Uuid>,
    pub amount: Amount,
    #[serde(default)]
    pub is_anonymous: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DonationReceipt {
    pub transaction: Transaction,
    pub campaign: CampaignProgress,
}

#[derive(Debug, Serialize)]
pub struct ImpactResponse {
    pub transaction: Transaction,
    pub campaign: Campaign,
}

// -- Assistance requests --

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct NewRequest {
    pub user_id: Uuid,
    pub category: String,
    pub title: String,
    pub description: String,
    #[serde(rename = "type")]
    pub kind: RequestType,
    #[serde(default)]
    pub location: Option<Location>,
    #[serde(default)]
    pub urgency: Urgency,
    #[serde(default)]
    pub amount: Option<Amount>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct ApproveRequestBody {
    pub admin_id: Uuid,
}

/// Returned once. The plaintext password is not stored anywhere.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalOutcome {
    pub request: Request,
    pub user_id: Uuid,
    pub email: String,
    pub password: Secret,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct RejectRequestBody {
    pub admin_id: Uuid,
    pub reason: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct UploadProofBody {
    pub proof_ref: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SanctionBody {
    pub amount: Amount,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct AcceptBody {
    pub helper_id: Uuid,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NearbyQuery {
    pub lat: f64,
    pub lng: f64,
    pub radius_km: Option<f64>,
    pub category: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NearbyMatch {
    pub request: Request,
    pub distance_km: f64,
}

// -- Errors --

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub kind: &'static str,
    pub error: String,
}
