use std::sync::Arc;

use chrono::Utc;
use rand::{Rng, distr::Alphanumeric};
use tracing::{info, warn};
use uuid::Uuid;

use aidlink_db::Database;
use aidlink_types::Amount;
use aidlink_types::api::{DonationReceipt, ImpactResponse};
use aidlink_types::events::{Notification, NotificationEvent};
use aidlink_types::models::{Campaign, CampaignStatus, Transaction, TransactionStatus, User};

use crate::error::{CoreError, Result};
use crate::ledger::Ledger;
use crate::notify::{Notifier, dispatch};

pub const QR_PREFIX: &str = "QR-";
const QR_TOKEN_LEN: usize = 7;

/// `QR-` followed by 7 uppercase alphanumerics.
pub fn generate_qr_code() -> String {
    let token: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(QR_TOKEN_LEN)
        .map(|b| char::from(b).to_ascii_uppercase())
        .collect();
    format!("{QR_PREFIX}{token}")
}

pub fn track_url(qr_code: &str) -> String {
    format!("/impact/{qr_code}")
}

/// Rupees with Indian digit grouping: 1234567 -> "₹12,34,567".
pub fn format_inr(amount: Amount) -> String {
    let digits = amount.unsigned_abs().to_string();
    let grouped = if digits.len() <= 3 {
        digits
    } else {
        let (head, last3) = digits.split_at(digits.len() - 3);
        let mut parts: Vec<&str> = Vec::new();
        let mut end = head.len();
        while end > 2 {
            parts.push(&head[end - 2..end]);
            end -= 2;
        }
        parts.push(&head[..end]);
        parts.reverse();
        format!("{},{}", parts.join(","), last3)
    };
    let sign = if amount < 0 { "-" } else { "" };
    format!("{sign}₹{grouped}")
}

/// Category-keyed thank-you line shown on receipts and the QR impact page.
pub fn impact_story(category: &str, amount: Amount) -> String {
    let amount = format_inr(amount);
    match category.to_lowercase().as_str() {
        "medical" | "health" | "healthcare" => {
            format!("Your {amount} contribution is helping provide critical medical care.")
        }
        "education" => {
            format!("Your {amount} contribution is helping a student stay in school.")
        }
        "food" | "hunger" => format!("Your {amount} contribution is putting meals on the table."),
        "disaster" | "disaster relief" | "emergency" => {
            format!("Your {amount} contribution is reaching families rebuilding after disaster.")
        }
        "water" | "sanitation" => {
            format!("Your {amount} contribution is bringing clean water to a community.")
        }
        "shelter" | "housing" => format!("Your {amount} contribution is helping keep a family sheltered."),
        "environment" => format!("Your {amount} contribution is helping protect the environment."),
        _ => format!("Your {amount} contribution is making a real difference."),
    }
}

/// Turns a donor action into one transaction, one ledger increment and
/// best-effort notifications.
#[derive(Clone)]
pub struct DonationProcessor {
    db: Arc<Database>,
    ledger: Ledger,
    notifier: Arc<dyn Notifier>,
}

impl DonationProcessor {
    pub fn new(db: Arc<Database>, ledger: Ledger, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            db,
            ledger,
            notifier,
        }
    }

    pub fn donate(
        &self,
        campaign_id: Uuid,
        donor_id: Option<Uuid>,
        amount: Amount,
        is_anonymous: bool,
    ) -> Result<DonationReceipt> {
        let campaign = self
            .db
            .get_campaign(campaign_id)?
            .ok_or_else(|| CoreError::not_found("campaign", campaign_id))?;

        if amount <= 0 {
            return Err(CoreError::InvalidAmount(format!(
                "donation amount must be positive, got {}",
                amount
            )));
        }

        if campaign.status != CampaignStatus::Active {
            return Err(CoreError::InvalidState(format!(
                "campaign {} is {}, not accepting donations",
                campaign.id, campaign.status
            )));
        }

        let donor = if is_anonymous {
            None
        } else {
            let donor_id = donor_id.ok_or_else(|| {
                CoreError::Validation("donor id is required for a named donation".into())
            })?;
            let donor = self
                .db
                .get_user(donor_id)?
                .ok_or_else(|| CoreError::not_found("user", donor_id))?;
            Some(donor)
        };

        let qr_code = is_anonymous.then(generate_qr_code);
        let donation = Transaction {
            id: Uuid::new_v4(),
            donor_id: donor.as_ref().map(|d| d.id),
            receiver_id: campaign.created_by,
            campaign_id: campaign.id,
            amount,
            is_anonymous,
            track_url: qr_code.as_deref().map(track_url),
            qr_code,
            impact_story: impact_story(&campaign.category, amount),
            status: TransactionStatus::Completed,
            payment_id: format!("pay_{}", Uuid::new_v4().simple()),
            created_at: Utc::now(),
        };

        let updated = self.ledger.commit(&donation)?;
        info!(
            "Donation {} of {} to campaign {} ({})",
            donation.id,
            amount,
            campaign.id,
            if is_anonymous { "anonymous" } else { "named" }
        );

        self.notify_parties(&donation, &updated, donor.as_ref());

        Ok(DonationReceipt {
            campaign: updated.progress(),
            transaction: donation,
        })
    }

    fn notify_parties(&self, donation: &Transaction, campaign: &Campaign, donor: Option<&User>) {
        if let Some(donor) = donor {
            dispatch(
                self.notifier.as_ref(),
                Notification {
                    recipient_email: donor.email.clone(),
                    event: NotificationEvent::DonationConfirmed {
                        transaction_id: donation.id,
                        campaign_id: campaign.id,
                        campaign_title: campaign.title.clone(),
                        amount: donation.amount,
                        impact_story: donation.impact_story.clone(),
                    },
                },
            );
        }

        match self.db.get_user(campaign.created_by) {
            Ok(Some(owner)) => dispatch(
                self.notifier.as_ref(),
                Notification {
                    recipient_email: owner.email,
                    event: NotificationEvent::DonationReceived {
                        transaction_id: donation.id,
                        campaign_id: campaign.id,
                        campaign_title: campaign.title.clone(),
                        amount: donation.amount,
                        donor_name: donor.map(|d| d.name.clone()),
                        raised: campaign.raised,
                        goal: campaign.goal,
                    },
                },
            ),
            Ok(None) => warn!("Campaign {} owner {} not found, skipping notification", campaign.id, campaign.created_by),
            Err(e) => warn!("Could not load owner of campaign {}: {}", campaign.id, e),
        }
    }

    /// Resolve an anonymous donation's QR code to its transaction and campaign.
    pub fn lookup_impact(&self, qr_code: &str) -> Result<ImpactResponse> {
        let transaction = self
            .db
            .get_transaction_by_qr(qr_code)?
            .ok_or_else(|| CoreError::not_found("qr code", qr_code))?;
        let campaign = self
            .db
            .get_campaign(transaction.campaign_id)?
            .ok_or_else(|| CoreError::not_found("campaign", transaction.campaign_id))?;
        Ok(ImpactResponse {
            transaction,
            campaign,
        })
    }

    pub fn donation_history(&self, donor_id: Uuid) -> Result<Vec<Transaction>> {
        Ok(self.db.list_transactions_for_donor(donor_id)?)
    }

    pub fn campaign_transactions(&self, campaign_id: Uuid) -> Result<Vec<Transaction>> {
        if self.db.get_campaign(campaign_id)?.is_none() {
            return Err(CoreError::not_found("campaign", campaign_id));
        }
        Ok(self.db.list_transactions_for_campaign(campaign_id)?)
    }
}
