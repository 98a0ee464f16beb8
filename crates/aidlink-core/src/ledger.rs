use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};
use uuid::Uuid;

use aidlink_db::Database;
use aidlink_types::Amount;
use aidlink_types::models::{Campaign, CampaignProgress, Transaction};

use crate::error::{CoreError, Result};

/// Owns every write to a campaign's `raised` and `donor_count`.
///
/// Increments are a single `raised = raised + ?` statement, so concurrent
/// donations to one campaign never lose an update.
#[derive(Clone)]
pub struct Ledger {
    db: Arc<Database>,
}

/// Result of re-deriving a campaign's total from its transactions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerAudit {
    pub campaign_id: Uuid,
    pub raised: Amount,
    pub donor_count: i64,
    pub transaction_total: Amount,
    pub transaction_count: i64,
    pub balanced: bool,
}

impl Ledger {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Raw ledger increment with no transaction row. Donations go through
    /// [`Ledger::commit`] so that `raised` stays equal to the transaction sum.
    pub fn apply_donation(&self, campaign_id: Uuid, amount: Amount) -> Result<CampaignProgress> {
        validate_amount(amount)?;
        let campaign = self
            .db
            .increment_raised(campaign_id, amount)?
            .ok_or_else(|| CoreError::not_found("campaign", campaign_id))?;
        debug!(
            "Ledger: campaign {} raised={} donors={}",
            campaign.id, campaign.raised, campaign.donor_count
        );
        Ok(campaign.progress())
    }

    /// Store a donation and apply it to its campaign in one storage
    /// transaction. Nothing is written if the campaign is gone.
    pub(crate) fn commit(&self, donation: &Transaction) -> Result<Campaign> {
        validate_amount(donation.amount)?;
        let campaign = self
            .db
            .record_donation(donation)?
            .ok_or_else(|| CoreError::not_found("campaign", donation.campaign_id))?;
        debug!(
            "Ledger: transaction {} applied, campaign {} raised={} donors={}",
            donation.id, campaign.id, campaign.raised, campaign.donor_count
        );
        Ok(campaign)
    }

    pub fn get_progress(&self, campaign_id: Uuid) -> Result<CampaignProgress> {
        let campaign = self
            .db
            .get_campaign(campaign_id)?
            .ok_or_else(|| CoreError::not_found("campaign", campaign_id))?;
        Ok(campaign.progress())
    }

    /// Compare `raised`/`donor_count` with the sum and count of the
    /// campaign's completed transactions.
    pub fn audit(&self, campaign_id: Uuid) -> Result<LedgerAudit> {
        let campaign = self
            .db
            .get_campaign(campaign_id)?
            .ok_or_else(|| CoreError::not_found("campaign", campaign_id))?;
        let (transaction_total, transaction_count) =
            self.db.campaign_transaction_totals(campaign_id)?;

        let balanced =
            transaction_total == campaign.raised && transaction_count == campaign.donor_count;
        if !balanced {
            warn!(
                "Ledger mismatch on campaign {}: raised={} vs transactions={} ({} vs {} donors)",
                campaign_id, campaign.raised, transaction_total, campaign.donor_count, transaction_count
            );
        }

        Ok(LedgerAudit {
            campaign_id,
            raised: campaign.raised,
            donor_count: campaign.donor_count,
            transaction_total,
            transaction_count,
            balanced,
        })
    }
}

fn validate_amount(amount: Amount) -> Result<()> {
    if amount <= 0 {
        return Err(CoreError::InvalidAmount(format!(
            "donation amount must be positive, got {}",
            amount
        )));
    }
    Ok(())
}
