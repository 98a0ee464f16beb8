use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use aidlink_db::Database;
use aidlink_types::api::NewCampaign;
use aidlink_types::events::{Notification, NotificationEvent};
use aidlink_types::models::{Campaign, CampaignStatus, Role};

use crate::error::{CoreError, Result};
use crate::notify::{Notifier, dispatch};

/// Campaign moderation: `pending -> active` or `pending -> rejected`, once.
#[derive(Clone)]
pub struct CampaignWorkflow {
    db: Arc<Database>,
    notifier: Arc<dyn Notifier>,
}

fn can_start_campaign(role: Role) -> bool {
    match role {
        Role::Admin | Role::Donor | Role::Receiver | Role::Organization => true,
        Role::Helper => false,
    }
}

impl CampaignWorkflow {
    pub fn new(db: Arc<Database>, notifier: Arc<dyn Notifier>) -> Self {
        Self { db, notifier }
    }

    fn load(&self, id: Uuid) -> Result<Campaign> {
        self.db
            .get_campaign(id)?
            .ok_or_else(|| CoreError::not_found("campaign", id))
    }

    /// New campaigns always start pending, inactive and unverified.
    pub fn submit(&self, new: NewCampaign) -> Result<Campaign> {
        for (field, value) in [
            ("title", &new.title),
            ("description", &new.description),
            ("category", &new.category),
        ] {
            if value.trim().is_empty() {
                return Err(CoreError::Validation(format!("{field} is required")));
            }
        }
        if new.goal <= 0 {
            return Err(CoreError::InvalidAmount(format!(
                "goal must be positive, got {}",
                new.goal
            )));
        }

        let creator = self
            .db
            .get_user(new.created_by)?
            .ok_or_else(|| CoreError::not_found("user", new.created_by))?;
        if !can_start_campaign(creator.role) {
            return Err(CoreError::Validation(format!(
                "a {} account cannot start campaigns",
                creator.role
            )));
        }

        let campaign = Campaign {
            id: Uuid::new_v4(),
            title: new.title.trim().to_string(),
            description: new.description,
            category: new.category.trim().to_lowercase(),
            goal: new.goal,
            raised: 0,
            donor_count: 0,
            status: CampaignStatus::Pending,
            active: false,
            verified: false,
            created_by: creator.id,
            deadline: new.deadline,
            created_at: Utc::now(),
        };
        self.db.insert_campaign(&campaign)?;
        info!("Campaign {} submitted by {}", campaign.id, creator.id);
        Ok(campaign)
    }

    /// Activate a pending campaign. Approving an already active campaign is
    /// a successful no-op.
    pub fn approve(&self, campaign_id: Uuid) -> Result<Campaign> {
        self.decide(campaign_id, CampaignStatus::Active)
    }

    /// Reject a pending campaign. Rejecting an already rejected campaign is
    /// a successful no-op.
    pub fn reject(&self, campaign_id: Uuid) -> Result<Campaign> {
        self.decide(campaign_id, CampaignStatus::Rejected)
    }

    fn decide(&self, campaign_id: Uuid, to: CampaignStatus) -> Result<Campaign> {
        let campaign = self.load(campaign_id)?;
        if campaign.status == to {
            return Ok(campaign);
        }

        if !self.db.decide_campaign(campaign_id, to)? {
            // Lost a race with another admin, or the campaign was already
            // decided the other way.
            let current = self.load(campaign_id)?;
            if current.status == to {
                return Ok(current);
            }
            return Err(CoreError::InvalidState(format!(
                "campaign {} is already {}",
                campaign_id, current.status
            )));
        }

        let campaign = self.load(campaign_id)?;
        info!("Campaign {} is now {}", campaign.id, campaign.status);
        self.notify_creator(&campaign);
        Ok(campaign)
    }

    fn notify_creator(&self, campaign: &Campaign) {
        let event = match campaign.status {
            CampaignStatus::Active => NotificationEvent::CampaignApproved {
                campaign_id: campaign.id,
                campaign_title: campaign.title.clone(),
            },
            CampaignStatus::Rejected => NotificationEvent::CampaignRejected {
                campaign_id: campaign.id,
                campaign_title: campaign.title.clone(),
            },
            CampaignStatus::Pending => return,
        };

        match self.db.get_user(campaign.created_by) {
            Ok(Some(creator)) => dispatch(
                self.notifier.as_ref(),
                Notification {
                    recipient_email: creator.email,
                    event,
                },
            ),
            Ok(None) => warn!("Campaign {} creator not found, skipping notification", campaign.id),
            Err(e) => warn!("Could not load creator of campaign {}: {}", campaign.id, e),
        }
    }

    pub fn list(&self, status: Option<CampaignStatus>) -> Result<Vec<Campaign>> {
        Ok(self.db.list_campaigns(status)?)
    }
}
