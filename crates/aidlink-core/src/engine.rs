use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use aidlink_db::Database;
use aidlink_types::Amount;
use aidlink_types::api::{
    ApprovalOutcome, DonationReceipt, ImpactResponse, NearbyMatch, NewCampaign, NewRequest,
};
use aidlink_types::models::{
    Campaign, CampaignProgress, CampaignStatus, GeoPoint, Request, RequestStatus, Role,
    Transaction, User,
};

use crate::campaign::CampaignWorkflow;
use crate::credentials::{CredentialHasher, CredentialPolicy};
use crate::donation::DonationProcessor;
use crate::error::{CoreError, Result};
use crate::geo;
use crate::ledger::{Ledger, LedgerAudit};
use crate::notify::Notifier;
use crate::request::RequestWorkflow;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryTotal {
    pub category: String,
    pub amount: Amount,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DonationAnalytics {
    pub total_donations: i64,
    pub total_amount: Amount,
    pub anonymous_donations: i64,
    pub anonymous_amount: Amount,
    pub unique_donors: i64,
    pub average_donation: f64,
    pub by_category: Vec<CategoryTotal>,
}

/// The engine's public surface. One instance is shared by every caller;
/// all methods take `&self` and are safe to call concurrently.
#[derive(Clone)]
pub struct Engine {
    db: Arc<Database>,
    ledger: Ledger,
    donations: DonationProcessor,
    requests: RequestWorkflow,
    campaigns: CampaignWorkflow,
}

impl Engine {
    pub fn new(
        db: Arc<Database>,
        notifier: Arc<dyn Notifier>,
        hasher: Arc<dyn CredentialHasher>,
        policy: CredentialPolicy,
    ) -> Self {
        let ledger = Ledger::new(db.clone());
        Self {
            donations: DonationProcessor::new(db.clone(), ledger.clone(), notifier.clone()),
            requests: RequestWorkflow::new(db.clone(), notifier.clone(), hasher, policy),
            campaigns: CampaignWorkflow::new(db.clone(), notifier),
            ledger,
            db,
        }
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    // -- Users --

    /// Minimal account creation for donors, helpers and receivers. Login and
    /// password management live outside the engine.
    pub fn register_user(&self, name: &str, email: &str, role: Role) -> Result<User> {
        let name = name.trim();
        let email = email.trim();
        if name.is_empty() {
            return Err(CoreError::Validation("name is required".into()));
        }
        if !email.contains('@') {
            return Err(CoreError::Validation(format!("'{}' is not an email address", email)));
        }
        let user = User {
            id: Uuid::new_v4(),
            name: name.to_string(),
            email: email.to_string(),
            role,
            verified: match role {
                Role::Admin => true,
                Role::Donor | Role::Helper | Role::Receiver | Role::Organization => false,
            },
            created_at: Utc::now(),
        };
        // The unique email index decides, so concurrent sign-ups cannot both win.
        if !self.db.insert_user(&user, None)? {
            return Err(CoreError::Validation(format!("{} is already registered", email)));
        }
        info!("Registered {} {}", user.role, user.id);
        Ok(user)
    }

    pub fn get_user(&self, id: Uuid) -> Result<User> {
        self.db
            .get_user(id)?
            .ok_or_else(|| CoreError::not_found("user", id))
    }

    // -- Donations --

    pub fn donate(
        &self,
        campaign_id: Uuid,
        donor_id: Option<Uuid>,
        amount: Amount,
        is_anonymous: bool,
    ) -> Result<DonationReceipt> {
        self.donations.donate(campaign_id, donor_id, amount, is_anonymous)
    }

    pub fn get_campaign_progress(&self, campaign_id: Uuid) -> Result<CampaignProgress> {
        self.ledger.get_progress(campaign_id)
    }

    pub fn lookup_impact(&self, qr_code: &str) -> Result<ImpactResponse> {
        self.donations.lookup_impact(qr_code)
    }

    pub fn donation_history(&self, donor_id: Uuid) -> Result<Vec<Transaction>> {
        self.donations.donation_history(donor_id)
    }

    pub fn campaign_transactions(&self, campaign_id: Uuid) -> Result<Vec<Transaction>> {
        self.donations.campaign_transactions(campaign_id)
    }

    pub fn verify_ledger(&self, campaign_id: Uuid) -> Result<LedgerAudit> {
        self.ledger.audit(campaign_id)
    }

    pub fn analytics(&self) -> Result<DonationAnalytics> {
        let totals = self.db.donation_totals()?;
        let by_category = self
            .db
            .donations_by_category()?
            .into_iter()
            .map(|(category, amount)| CategoryTotal { category, amount })
            .collect();

        Ok(DonationAnalytics {
            total_donations: totals.count,
            total_amount: totals.amount,
            anonymous_donations: totals.anonymous_count,
            anonymous_amount: totals.anonymous_amount,
            unique_donors: totals.unique_donors,
            average_donation: if totals.count > 0 {
                totals.amount as f64 / totals.count as f64
            } else {
                0.0
            },
            by_category,
        })
    }

    // -- Campaigns --

    pub fn submit_campaign(&self, new: NewCampaign) -> Result<Campaign> {
        self.campaigns.submit(new)
    }

    pub fn approve_campaign(&self, campaign_id: Uuid) -> Result<Campaign> {
        self.campaigns.approve(campaign_id)
    }

    pub fn reject_campaign(&self, campaign_id: Uuid) -> Result<Campaign> {
        self.campaigns.reject(campaign_id)
    }

    pub fn get_campaign(&self, campaign_id: Uuid) -> Result<Campaign> {
        self.db
            .get_campaign(campaign_id)?
            .ok_or_else(|| CoreError::not_found("campaign", campaign_id))
    }

    pub fn list_campaigns(&self, status: Option<CampaignStatus>) -> Result<Vec<Campaign>> {
        self.campaigns.list(status)
    }

    // -- Requests --

    pub fn submit_request(&self, new: NewRequest) -> Result<Request> {
        self.requests.submit(new)
    }

    pub fn approve_request(&self, request_id: Uuid, admin_id: Uuid) -> Result<ApprovalOutcome> {
        self.requests.approve(request_id, admin_id)
    }

    pub fn reject_request(&self, request_id: Uuid, admin_id: Uuid, reason: &str) -> Result<Request> {
        self.requests.reject(request_id, admin_id, reason)
    }

    pub fn upload_proof(&self, request_id: Uuid, proof_ref: &str) -> Result<Request> {
        self.requests.upload_proof(request_id, proof_ref)
    }

    pub fn sanction_request(&self, request_id: Uuid, amount: Amount) -> Result<Request> {
        self.requests.sanction(request_id, amount)
    }

    pub fn accept_request(&self, request_id: Uuid, helper_id: Uuid) -> Result<Request> {
        self.requests.accept(request_id, helper_id)
    }

    pub fn complete_request(&self, request_id: Uuid) -> Result<Request> {
        self.requests.complete(request_id)
    }

    pub fn get_request(&self, request_id: Uuid) -> Result<Request> {
        self.db
            .get_request(request_id)?
            .ok_or_else(|| CoreError::not_found("request", request_id))
    }

    pub fn list_requests(&self, status: Option<RequestStatus>) -> Result<Vec<Request>> {
        Ok(self.db.list_requests(status)?)
    }

    pub fn list_requests_by_user(&self, user_id: Uuid) -> Result<Vec<Request>> {
        Ok(self.db.list_requests_by_user(user_id)?)
    }

    /// Open requests around a helper, nearest first.
    pub fn find_nearby_requests(
        &self,
        origin: GeoPoint,
        radius_km: f64,
        category: Option<&str>,
    ) -> Result<Vec<NearbyMatch>> {
        if !geo::in_range(origin.lat, origin.lng) {
            return Err(CoreError::Validation(format!(
                "origin ({}, {}) is out of range",
                origin.lat, origin.lng
            )));
        }
        if !radius_km.is_finite() || radius_km < 0.0 {
            return Err(CoreError::Validation(format!("invalid radius {}", radius_km)));
        }
        let snapshot = self.db.list_open_requests()?;
        Ok(geo::find_nearby(origin, radius_km, category, &snapshot))
    }
}
