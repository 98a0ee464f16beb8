/// Database row types. These map directly to SQLite rows.
/// Converted into aidlink-types models at the crate boundary so callers never
/// see raw column strings.
use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use aidlink_types::models::{Campaign, Location, Request, Transaction, User};

/// Stored in `transactions.donor_id` when the donation is anonymous.
pub const ANONYMOUS_DONOR: &str = "anonymous";

pub struct UserRow {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: String,
    pub password: Option<String>,
    pub verified: bool,
    pub created_at: String,
}

pub struct CampaignRow {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub goal: i64,
    pub raised: i64,
    pub donor_count: i64,
    pub status: String,
    pub active: bool,
    pub verified: bool,
    pub created_by: String,
    pub deadline: Option<String>,
    pub created_at: String,
}

pub struct RequestRow {
    pub id: String,
    pub user_id: String,
    pub category: String,
    pub title: String,
    pub description: String,
    pub kind: String,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub address: Option<String>,
    pub status: String,
    pub urgency: String,
    pub amount: Option<i64>,
    pub sanctioned_amount: Option<i64>,
    pub accepted_by: Option<String>,
    pub accepted_at: Option<String>,
    pub completed: bool,
    pub approved_by: Option<String>,
    pub approved_at: Option<String>,
    pub rejected_by: Option<String>,
    pub rejected_at: Option<String>,
    pub rejection_reason: Option<String>,
    pub sanctioned_at: Option<String>,
    pub completed_at: Option<String>,
    pub created_at: String,
}

pub struct TransactionRow {
    pub id: String,
    pub donor_id: String,
    pub receiver_id: String,
    pub campaign_id: String,
    pub amount: i64,
    pub is_anonymous: bool,
    pub qr_code: Option<String>,
    pub track_url: Option<String>,
    pub impact_story: String,
    pub status: String,
    pub payment_id: String,
    pub created_at: String,
}

pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339()
}

pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    raw.parse::<DateTime<Utc>>()
        .or_else(|_| {
            // SQLite's datetime('now') has no timezone; treat as UTC.
            chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .with_context(|| format!("corrupt timestamp '{}'", raw))
}

fn parse_opt_timestamp(raw: Option<&str>) -> Result<Option<DateTime<Utc>>> {
    raw.map(parse_timestamp).transpose()
}

fn parse_id(raw: &str) -> Result<Uuid> {
    raw.parse().with_context(|| format!("corrupt id '{}'", raw))
}

fn parse_opt_id(raw: Option<&str>) -> Result<Option<Uuid>> {
    raw.map(parse_id).transpose()
}

impl UserRow {
    pub fn into_model(self) -> Result<User> {
        Ok(User {
            id: parse_id(&self.id)?,
            name: self.name,
            email: self.email,
            role: self.role.parse()?,
            verified: self.verified,
            created_at: parse_timestamp(&self.created_at)?,
        })
    }
}

impl CampaignRow {
    pub fn into_model(self) -> Result<Campaign> {
        let deadline = self
            .deadline
            .as_deref()
            .map(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d"))
            .transpose()
            .with_context(|| format!("corrupt deadline on campaign '{}'", self.id))?;

        Ok(Campaign {
            id: parse_id(&self.id)?,
            title: self.title,
            description: self.description,
            category: self.category,
            goal: self.goal,
            raised: self.raised,
            donor_count: self.donor_count,
            status: self.status.parse()?,
            active: self.active,
            verified: self.verified,
            created_by: parse_id(&self.created_by)?,
            deadline,
            created_at: parse_timestamp(&self.created_at)?,
        })
    }
}

impl RequestRow {
    pub fn into_model(self, proof_docs: Vec<String>) -> Result<Request> {
        let location = match (self.lat, self.lng) {
            (Some(lat), Some(lng)) => Some(Location {
                lat,
                lng,
                address: self.address,
            }),
            _ => None,
        };

        Ok(Request {
            id: parse_id(&self.id)?,
            user_id: parse_id(&self.user_id)?,
            category: self.category,
            title: self.title,
            description: self.description,
            kind: self.kind.parse()?,
            location,
            status: self.status.parse()?,
            urgency: self.urgency.parse()?,
            amount: self.amount,
            sanctioned_amount: self.sanctioned_amount,
            accepted_by: parse_opt_id(self.accepted_by.as_deref())?,
            accepted_at: parse_opt_timestamp(self.accepted_at.as_deref())?,
            proof_docs,
            completed: self.completed,
            approved_by: parse_opt_id(self.approved_by.as_deref())?,
            approved_at: parse_opt_timestamp(self.approved_at.as_deref())?,
            rejected_by: parse_opt_id(self.rejected_by.as_deref())?,
            rejected_at: parse_opt_timestamp(self.rejected_at.as_deref())?,
            rejection_reason: self.rejection_reason,
            sanctioned_at: parse_opt_timestamp(self.sanctioned_at.as_deref())?,
            completed_at: parse_opt_timestamp(self.completed_at.as_deref())?,
            created_at: parse_timestamp(&self.created_at)?,
        })
    }
}

impl TransactionRow {
    pub fn from_model(tx: &Transaction) -> Self {
        Self {
            id: tx.id.to_string(),
            donor_id: tx
                .donor_id
                .map(|id| id.to_string())
                .unwrap_or_else(|| ANONYMOUS_DONOR.to_string()),
            receiver_id: tx.receiver_id.to_string(),
            campaign_id: tx.campaign_id.to_string(),
            amount: tx.amount,
            is_anonymous: tx.is_anonymous,
            qr_code: tx.qr_code.clone(),
            track_url: tx.track_url.clone(),
            impact_story: tx.impact_story.clone(),
            status: tx.status.as_str().to_string(),
            payment_id: tx.payment_id.clone(),
            created_at: format_timestamp(tx.created_at),
        }
    }

    pub fn into_model(self) -> Result<Transaction> {
        let donor_id = if self.donor_id == ANONYMOUS_DONOR {
            None
        } else {
            Some(parse_id(&self.donor_id)?)
        };

        Ok(Transaction {
            id: parse_id(&self.id)?,
            donor_id,
            receiver_id: parse_id(&self.receiver_id)?,
            campaign_id: parse_id(&self.campaign_id)?,
            amount: self.amount,
            is_anonymous: self.is_anonymous,
            qr_code: self.qr_code,
            track_url: self.track_url,
            impact_story: self.impact_story,
            status: self.status.parse()?,
            payment_id: self.payment_id,
            created_at: parse_timestamp(&self.created_at)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_rfc3339_and_sqlite_timestamps() {
        let a = parse_timestamp("2026-03-01T10:00:00+00:00").unwrap();
        let b = parse_timestamp("2026-03-01 10:00:00").unwrap();
        assert_eq!(a, b);
        assert!(parse_timestamp("yesterday").is_err());
    }
}
