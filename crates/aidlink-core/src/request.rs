//! Assistance request lifecycle.
//!
//! Funding path: `pending -> approved -> sanctioned -> completed`, with
//! `pending -> rejected`. Once approved a request can no longer be rejected.
//! Service path, orthogonal to funding: any helper may accept an open
//! service request once, and an accepted request may be completed.
//!
//! Every transition is a conditional update in storage, so concurrent
//! callers racing on the same request see exactly one winner.

use std::sync::Arc;

use chrono::{Datelike, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use aidlink_db::Database;
use aidlink_db::queries::{Approval, ApprovalWrite};
use aidlink_types::Amount;
use aidlink_types::api::{ApprovalOutcome, NewRequest};
use aidlink_types::events::{Notification, NotificationEvent, Secret};
use aidlink_types::models::{Request, RequestStatus, RequestType};

use crate::beneficiary;
use crate::credentials::{CredentialHasher, CredentialPolicy};
use crate::error::{CoreError, Result};
use crate::geo;
use crate::notify::{Notifier, dispatch};

#[derive(Clone)]
pub struct RequestWorkflow {
    db: Arc<Database>,
    notifier: Arc<dyn Notifier>,
    hasher: Arc<dyn CredentialHasher>,
    policy: CredentialPolicy,
}

impl RequestWorkflow {
    pub fn new(
        db: Arc<Database>,
        notifier: Arc<dyn Notifier>,
        hasher: Arc<dyn CredentialHasher>,
        policy: CredentialPolicy,
    ) -> Self {
        Self {
            db,
            notifier,
            hasher,
            policy,
        }
    }

    fn load(&self, id: Uuid) -> Result<Request> {
        self.db
            .get_request(id)?
            .ok_or_else(|| CoreError::not_found("request", id))
    }

    pub fn submit(&self, new: NewRequest) -> Result<Request> {
        if new.title.trim().is_empty() {
            return Err(CoreError::Validation("title is required".into()));
        }
        if new.category.trim().is_empty() {
            return Err(CoreError::Validation("category is required".into()));
        }
        if let Some(loc) = &new.location {
            if !geo::in_range(loc.lat, loc.lng) {
                return Err(CoreError::Validation(format!(
                    "location ({}, {}) is out of range",
                    loc.lat, loc.lng
                )));
            }
        }
        match (new.kind, new.amount) {
            (RequestType::Financial, None) => {
                return Err(CoreError::Validation(
                    "financial requests need an amount".into(),
                ));
            }
            (RequestType::Financial, Some(a)) if a <= 0 => {
                return Err(CoreError::InvalidAmount(format!(
                    "requested amount must be positive, got {}",
                    a
                )));
            }
            (RequestType::Service, Some(_)) => {
                return Err(CoreError::Validation(
                    "service requests do not carry an amount".into(),
                ));
            }
            (RequestType::Financial, Some(_)) | (RequestType::Service, None) => {}
        }

        let request = Request {
            id: Uuid::new_v4(),
            user_id: new.user_id,
            category: new.category.trim().to_string(),
            title: new.title.trim().to_string(),
            description: new.description,
            kind: new.kind,
            location: new.location,
            status: RequestStatus::Pending,
            urgency: new.urgency,
            amount: new.amount,
            sanctioned_amount: None,
            accepted_by: None,
            accepted_at: None,
            proof_docs: vec![],
            completed: false,
            approved_by: None,
            approved_at: None,
            rejected_by: None,
            rejected_at: None,
            rejection_reason: None,
            sanctioned_at: None,
            completed_at: None,
            created_at: Utc::now(),
        };
        self.db.insert_request(&request)?;
        info!("Request {} submitted by {} ({})", request.id, request.user_id, request.kind);
        Ok(request)
    }

    /// Approve a request and issue one-time credentials to its beneficiary.
    ///
    /// A request that is already decided fails with `InvalidState` before
    /// any password is generated, and the storage write is conditional on
    /// the request still being undecided, so two racing approvals can never
    /// both write a password.
    pub fn approve(&self, request_id: Uuid, admin_id: Uuid) -> Result<ApprovalOutcome> {
        let request = self.load(request_id)?;
        if !request.status.is_undecided() {
            return Err(CoreError::InvalidState(format!(
                "request {} is already {}",
                request.id, request.status
            )));
        }

        let beneficiary = beneficiary::resolve(&self.db, &request)?;
        let now = Utc::now();
        let password = match &beneficiary.organization {
            Some(org) => self.policy.organization_password(org, now.year()),
            None => self.policy.individual_password(beneficiary.user.id),
        };
        let password_hash = self.hasher.hash(&password)?;

        let write = ApprovalWrite {
            request_id,
            admin_id,
            approved_at: now,
            beneficiary_id: beneficiary.user.id,
            password_hash: &password_hash,
            create_beneficiary: beneficiary.is_new.then_some(&beneficiary.user),
        };
        // Nothing below the write may fail: the password exists only here.
        let request = match self.db.approve_request(&write)? {
            Approval::Approved(request) => request,
            Approval::AlreadyDecided => {
                return Err(CoreError::InvalidState(format!(
                    "request {} was decided concurrently",
                    request_id
                )));
            }
            Approval::EmailTaken => {
                return Err(CoreError::Validation(format!(
                    "{} was registered while request {} was being approved",
                    beneficiary.user.email, request_id
                )));
            }
        };
        info!(
            "Request {} approved by {}, credentials issued to user {}",
            request_id, admin_id, beneficiary.user.id
        );

        let password = Secret::new(password);
        dispatch(
            self.notifier.as_ref(),
            Notification {
                recipient_email: beneficiary.user.email.clone(),
                event: NotificationEvent::CredentialsIssued {
                    request_id,
                    user_id: beneficiary.user.id,
                    name: beneficiary.user.name.clone(),
                    email: beneficiary.user.email.clone(),
                    password: password.clone(),
                },
            },
        );

        Ok(ApprovalOutcome {
            request,
            user_id: beneficiary.user.id,
            email: beneficiary.user.email,
            password,
        })
    }

    pub fn reject(&self, request_id: Uuid, admin_id: Uuid, reason: &str) -> Result<Request> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(CoreError::Validation("a rejection reason is required".into()));
        }
        let request = self.load(request_id)?;

        if !self.db.reject_request(request_id, admin_id, reason, Utc::now())? {
            let current = self.load(request_id)?;
            return Err(CoreError::InvalidState(format!(
                "request {} is {} and can no longer be rejected",
                request_id, current.status
            )));
        }
        info!("Request {} rejected by {}", request_id, admin_id);

        self.notify_creator(&request, |r| NotificationEvent::RequestRejected {
            request_id: r.id,
            request_title: r.title.clone(),
            reason: reason.to_string(),
        });
        self.load(request_id)
    }

    /// Append a proof reference. Allowed once a request is approved, or for a
    /// service request once a helper has accepted it. Storage re-checks the
    /// state as it writes, so a concurrent rejection always wins.
    pub fn upload_proof(&self, request_id: Uuid, proof_ref: &str) -> Result<Request> {
        let proof_ref = proof_ref.trim();
        if proof_ref.is_empty() {
            return Err(CoreError::Validation("proof reference is required".into()));
        }
        self.load(request_id)?;

        let Some(count) = self.db.append_proof(request_id, proof_ref, Utc::now())? else {
            let current = self.load(request_id)?;
            return Err(CoreError::InvalidState(format!(
                "request {} is {}; proof can be attached once it is approved or accepted",
                request_id, current.status
            )));
        };
        info!("Request {}: proof #{} attached", request_id, count);
        self.load(request_id)
    }

    /// Release funds against an approved, proof-backed request. The amount
    /// may never exceed what was originally requested.
    pub fn sanction(&self, request_id: Uuid, amount: Amount) -> Result<Request> {
        if amount <= 0 {
            return Err(CoreError::InvalidAmount(format!(
                "sanctioned amount must be positive, got {}",
                amount
            )));
        }
        let request = self.load(request_id)?;

        let requested = request.amount.ok_or_else(|| {
            CoreError::InvalidAmount(format!("request {} has no requested amount", request_id))
        })?;
        if amount > requested {
            return Err(CoreError::InvalidAmount(format!(
                "cannot sanction {} against a request for {}",
                amount, requested
            )));
        }
        if request.status != RequestStatus::Approved {
            return Err(CoreError::InvalidState(format!(
                "request {} is {}, only approved requests can be sanctioned",
                request_id, request.status
            )));
        }
        if request.proof_docs.is_empty() {
            return Err(CoreError::InvalidState(format!(
                "request {} has no proof attached",
                request_id
            )));
        }

        if !self.db.sanction_request(request_id, amount, Utc::now())? {
            return Err(CoreError::InvalidState(format!(
                "request {} changed state during sanction",
                request_id
            )));
        }
        info!("Request {} sanctioned for {}", request_id, amount);

        self.notify_creator(&request, |r| NotificationEvent::RequestSanctioned {
            request_id: r.id,
            request_title: r.title.clone(),
            amount,
        });
        self.load(request_id)
    }

    /// Claim a service request for a helper. Exactly one concurrent caller
    /// wins; the rest get `AlreadyAccepted`.
    pub fn accept(&self, request_id: Uuid, helper_id: Uuid) -> Result<Request> {
        let request = self.load(request_id)?;
        if request.kind != RequestType::Service {
            return Err(CoreError::InvalidState(format!(
                "request {} is financial; only service requests can be accepted",
                request_id
            )));
        }

        if self.db.accept_request(request_id, helper_id, Utc::now())? {
            info!("Request {} accepted by helper {}", request_id, helper_id);
            return self.load(request_id);
        }

        let current = self.load(request_id)?;
        match current.accepted_by {
            Some(winner) => Err(CoreError::AlreadyAccepted {
                request_id,
                helper_id: winner,
            }),
            None => Err(CoreError::InvalidState(format!(
                "request {} is {} and cannot be accepted",
                request_id, current.status
            ))),
        }
    }

    /// Finish a request: an accepted service request or a sanctioned
    /// financial one.
    pub fn complete(&self, request_id: Uuid) -> Result<Request> {
        let request = self.load(request_id)?;
        if request.completed {
            return Err(CoreError::InvalidState(format!(
                "request {} is already completed",
                request_id
            )));
        }

        if !self.db.complete_request(request_id, Utc::now())? {
            return Err(CoreError::InvalidState(format!(
                "request {} is {}; it must be accepted or sanctioned first",
                request_id, request.status
            )));
        }
        info!("Request {} completed", request_id);
        self.load(request_id)
    }

    fn notify_creator(&self, request: &Request, event: impl FnOnce(&Request) -> NotificationEvent) {
        match self.db.get_user(request.user_id) {
            Ok(Some(user)) => dispatch(
                self.notifier.as_ref(),
                Notification {
                    recipient_email: user.email,
                    event: event(request),
                },
            ),
            Ok(None) => warn!("Request {} creator has no account, skipping notification", request.id),
            Err(e) => warn!("Could not load creator of request {}: {}", request.id, e),
        }
    }
}
