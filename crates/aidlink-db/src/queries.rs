use crate::Database;
use crate::models::{CampaignRow, RequestRow, TransactionRow, UserRow, format_timestamp};
use aidlink_types::models::{
    Campaign, CampaignStatus, Request, RequestStatus, Role, Transaction, User,
};
use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, Params, Row, params};
use uuid::Uuid;

const USER_COLUMNS: &str = "id, name, email, role, password, verified, created_at";

const CAMPAIGN_COLUMNS: &str = "id, title, description, category, goal, raised, donor_count, \
     status, active, verified, created_by, deadline, created_at";

const REQUEST_COLUMNS: &str = "id, user_id, category, title, description, kind, lat, lng, address, \
     status, urgency, amount, sanctioned_amount, accepted_by, accepted_at, completed, \
     approved_by, approved_at, rejected_by, rejected_at, rejection_reason, sanctioned_at, \
     completed_at, created_at";

const TRANSACTION_COLUMNS: &str = "id, donor_id, receiver_id, campaign_id, amount, is_anonymous, \
     qr_code, track_url, impact_story, status, payment_id, created_at";

/// Everything the approval step writes, applied in one SQLite transaction.
pub struct ApprovalWrite<'a> {
    pub request_id: Uuid,
    pub admin_id: Uuid,
    pub approved_at: DateTime<Utc>,
    pub beneficiary_id: Uuid,
    pub password_hash: &'a str,
    /// Set when the beneficiary was recovered from an organization
    /// registration and has no account yet.
    pub create_beneficiary: Option<&'a User>,
}

/// What `approve_request` did.
#[derive(Debug)]
pub enum Approval {
    /// Committed. The request as stored by the same transaction.
    Approved(Request),
    /// The request was no longer pending or accepted. Nothing was written.
    AlreadyDecided,
    /// The beneficiary account to be created collides with an existing
    /// email. Nothing was written.
    EmailTaken,
}

/// Aggregate over every completed transaction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DonationTotals {
    pub count: i64,
    pub amount: i64,
    pub anonymous_count: i64,
    pub anonymous_amount: i64,
    pub unique_donors: i64,
}

impl Database {
    // -- Users --

    /// Returns false, writing nothing, if the email is already registered.
    pub fn insert_user(&self, user: &User, password_hash: Option<&str>) -> Result<bool> {
        self.with_conn(|conn| insert_user(conn, user, password_hash))
    }

    pub fn get_user(&self, id: Uuid) -> Result<Option<User>> {
        self.with_conn(|conn| {
            query_user(conn, "WHERE id = ?1", &id.to_string())?
                .map(UserRow::into_model)
                .transpose()
        })
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        self.with_conn(|conn| {
            query_user(conn, "WHERE email = ?1 COLLATE NOCASE", email)?
                .map(UserRow::into_model)
                .transpose()
        })
    }

    /// Most recently created user with the given role.
    pub fn latest_user_with_role(&self, role: Role) -> Result<Option<User>> {
        self.with_conn(|conn| {
            query_user(
                conn,
                "WHERE role = ?1 ORDER BY created_at DESC, rowid DESC LIMIT 1",
                role.as_str(),
            )?
            .map(UserRow::into_model)
            .transpose()
        })
    }

    pub fn get_password_hash(&self, user_id: Uuid) -> Result<Option<String>> {
        self.with_conn(|conn| {
            Ok(query_user(conn, "WHERE id = ?1", &user_id.to_string())?.and_then(|u| u.password))
        })
    }

    // -- Campaigns --

    pub fn insert_campaign(&self, campaign: &Campaign) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO campaigns (id, title, description, category, goal, raised, donor_count,
                     status, active, verified, created_by, deadline, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
                params![
                    campaign.id.to_string(),
                    campaign.title,
                    campaign.description,
                    campaign.category,
                    campaign.goal,
                    campaign.raised,
                    campaign.donor_count,
                    campaign.status.as_str(),
                    campaign.active,
                    campaign.verified,
                    campaign.created_by.to_string(),
                    campaign.deadline.map(|d| d.format("%Y-%m-%d").to_string()),
                    format_timestamp(campaign.created_at),
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_campaign(&self, id: Uuid) -> Result<Option<Campaign>> {
        self.with_conn(|conn| query_campaign(conn, id))
    }

    pub fn list_campaigns(&self, status: Option<CampaignStatus>) -> Result<Vec<Campaign>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {CAMPAIGN_COLUMNS} FROM campaigns
                 WHERE (?1 IS NULL OR status = ?1)
                 ORDER BY created_at DESC"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([status.map(|s| s.as_str())], map_campaign)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            rows.into_iter().map(CampaignRow::into_model).collect()
        })
    }

    /// Move a pending campaign to `to`. Returns false if the campaign was not
    /// pending (or does not exist).
    pub fn decide_campaign(&self, id: Uuid, to: CampaignStatus) -> Result<bool> {
        let active = to == CampaignStatus::Active;
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE campaigns SET status = ?2, active = ?3, verified = ?3
                 WHERE id = ?1 AND status = 'pending'",
                params![id.to_string(), to.as_str(), active],
            )?;
            Ok(changed == 1)
        })
    }

    /// Atomic `raised += amount, donor_count += 1`. Returns the updated
    /// campaign, or `None` if it does not exist.
    pub fn increment_raised(&self, campaign_id: Uuid, amount: i64) -> Result<Option<Campaign>> {
        self.with_tx(|tx| {
            if !increment_raised(tx, campaign_id, amount)? {
                return Ok(None);
            }
            query_campaign(tx, campaign_id)
        })
    }

    /// Insert a donation and apply it to its campaign's ledger as one unit.
    /// Returns `None` (and writes nothing) if the campaign does not exist.
    pub fn record_donation(&self, donation: &Transaction) -> Result<Option<Campaign>> {
        let row = TransactionRow::from_model(donation);
        self.with_tx(|tx| {
            if !increment_raised(tx, donation.campaign_id, donation.amount)? {
                return Ok(None);
            }

            tx.execute(
                &format!(
                    "INSERT INTO transactions ({TRANSACTION_COLUMNS})
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)"
                ),
                params![
                    row.id,
                    row.donor_id,
                    row.receiver_id,
                    row.campaign_id,
                    row.amount,
                    row.is_anonymous,
                    row.qr_code,
                    row.track_url,
                    row.impact_story,
                    row.status,
                    row.payment_id,
                    row.created_at,
                ],
            )?;

            query_campaign(tx, donation.campaign_id)
        })
    }

    // -- Requests --

    pub fn insert_request(&self, request: &Request) -> Result<()> {
        self.with_conn(|conn| {
            let location = request.location.as_ref();
            conn.execute(
                "INSERT INTO requests (id, user_id, category, title, description, kind, lat, lng,
                     address, status, urgency, amount, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
                params![
                    request.id.to_string(),
                    request.user_id.to_string(),
                    request.category,
                    request.title,
                    request.description,
                    request.kind.as_str(),
                    location.map(|l| l.lat),
                    location.map(|l| l.lng),
                    location.and_then(|l| l.address.clone()),
                    request.status.as_str(),
                    request.urgency.as_str(),
                    request.amount,
                    format_timestamp(request.created_at),
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_request(&self, id: Uuid) -> Result<Option<Request>> {
        self.with_conn(|conn| query_request(conn, id))
    }

    pub fn list_requests(&self, status: Option<RequestStatus>) -> Result<Vec<Request>> {
        self.with_conn(|conn| {
            query_requests(
                conn,
                "WHERE (?1 IS NULL OR status = ?1) ORDER BY created_at ASC",
                [status.map(|s| s.as_str())],
            )
        })
    }

    pub fn list_requests_by_user(&self, user_id: Uuid) -> Result<Vec<Request>> {
        self.with_conn(|conn| {
            query_requests(
                conn,
                "WHERE user_id = ?1 ORDER BY created_at ASC",
                [user_id.to_string()],
            )
        })
    }

    /// Snapshot of located requests that are still pending or approved.
    pub fn list_open_requests(&self) -> Result<Vec<Request>> {
        self.with_conn(|conn| {
            query_requests(
                conn,
                "WHERE status IN ('pending', 'approved')
                   AND completed = 0
                   AND lat IS NOT NULL AND lng IS NOT NULL
                 ORDER BY created_at ASC",
                params![],
            )
        })
    }

    /// Conditional `pending|accepted -> approved`, writing the beneficiary's
    /// new password hash in the same transaction. The checks run before any
    /// write, under the transaction's write lock.
    pub fn approve_request(&self, write: &ApprovalWrite<'_>) -> Result<Approval> {
        self.with_tx(|tx| {
            let status: Option<String> = tx
                .query_row(
                    "SELECT status FROM requests WHERE id = ?1",
                    [write.request_id.to_string()],
                    |r| r.get(0),
                )
                .optional()?;
            if !matches!(status.as_deref(), Some("pending" | "accepted")) {
                return Ok(Approval::AlreadyDecided);
            }

            if let Some(user) = write.create_beneficiary {
                if !insert_user(tx, user, Some(write.password_hash))? {
                    return Ok(Approval::EmailTaken);
                }
            } else {
                let updated = tx.execute(
                    "UPDATE users SET password = ?2, verified = 1 WHERE id = ?1",
                    params![write.beneficiary_id.to_string(), write.password_hash],
                )?;
                if updated == 0 {
                    anyhow::bail!("beneficiary {} vanished during approval", write.beneficiary_id);
                }
            }

            tx.execute(
                "UPDATE requests SET status = 'approved', approved_by = ?2, approved_at = ?3
                 WHERE id = ?1",
                params![
                    write.request_id.to_string(),
                    write.admin_id.to_string(),
                    format_timestamp(write.approved_at),
                ],
            )?;

            let request = query_request(tx, write.request_id)?.ok_or_else(|| {
                anyhow::anyhow!("request {} vanished during approval", write.request_id)
            })?;
            Ok(Approval::Approved(request))
        })
    }

    pub fn reject_request(
        &self,
        id: Uuid,
        admin_id: Uuid,
        reason: &str,
        at: DateTime<Utc>,
    ) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE requests SET status = 'rejected', rejected_by = ?2, rejected_at = ?3,
                     rejection_reason = ?4
                 WHERE id = ?1 AND status IN ('pending', 'accepted')",
                params![id.to_string(), admin_id.to_string(), format_timestamp(at), reason],
            )?;
            Ok(changed == 1)
        })
    }

    /// Append a proof reference to a request that accepts proof: approved
    /// or later, or still undecided with a helper attached. Returns the new
    /// number of proofs, or `None` (writing nothing) if the request is not in
    /// such a state.
    pub fn append_proof(
        &self,
        id: Uuid,
        proof_ref: &str,
        at: DateTime<Utc>,
    ) -> Result<Option<usize>> {
        self.with_tx(|tx| {
            let inserted = tx.execute(
                "INSERT INTO request_proofs (request_id, position, proof_ref, created_at)
                 SELECT r.id,
                        (SELECT COALESCE(MAX(p.position), -1) + 1
                         FROM request_proofs p WHERE p.request_id = r.id),
                        ?2, ?3
                 FROM requests r
                 WHERE r.id = ?1
                   AND (r.status IN ('approved', 'sanctioned', 'completed')
                        OR (r.status IN ('pending', 'accepted') AND r.accepted_by IS NOT NULL))",
                params![id.to_string(), proof_ref, format_timestamp(at)],
            )?;
            if inserted == 0 {
                return Ok(None);
            }

            let count: i64 = tx.query_row(
                "SELECT COUNT(*) FROM request_proofs WHERE request_id = ?1",
                [id.to_string()],
                |r| r.get(0),
            )?;
            Ok(Some(count as usize))
        })
    }

    /// Conditional `approved -> sanctioned`. The cap is enforced here too, so
    /// no interleaving can store a sanction above the requested amount.
    pub fn sanction_request(&self, id: Uuid, amount: i64, at: DateTime<Utc>) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE requests SET status = 'sanctioned', sanctioned_amount = ?2, sanctioned_at = ?3
                 WHERE id = ?1 AND status = 'approved' AND amount IS NOT NULL AND ?2 <= amount",
                params![id.to_string(), amount, format_timestamp(at)],
            )?;
            Ok(changed == 1)
        })
    }

    /// Claim a request for a helper. Exactly one caller can win.
    pub fn accept_request(&self, id: Uuid, helper_id: Uuid, at: DateTime<Utc>) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE requests SET accepted_by = ?2, accepted_at = ?3
                 WHERE id = ?1 AND accepted_by IS NULL AND status IN ('pending', 'approved')",
                params![id.to_string(), helper_id.to_string(), format_timestamp(at)],
            )?;
            Ok(changed == 1)
        })
    }

    pub fn complete_request(&self, id: Uuid, at: DateTime<Utc>) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE requests SET status = 'completed', completed = 1, completed_at = ?2
                 WHERE id = ?1 AND completed = 0 AND status != 'rejected'
                   AND (accepted_by IS NOT NULL OR status = 'sanctioned')",
                params![id.to_string(), format_timestamp(at)],
            )?;
            Ok(changed == 1)
        })
    }

    // -- Transactions --

    pub fn get_transaction_by_qr(&self, qr_code: &str) -> Result<Option<Transaction>> {
        self.with_conn(|conn| {
            Ok(query_transactions(conn, "WHERE qr_code = ?1", qr_code)?.into_iter().next())
        })
    }

    pub fn list_transactions_for_donor(&self, donor_id: Uuid) -> Result<Vec<Transaction>> {
        self.with_conn(|conn| {
            query_transactions(
                conn,
                "WHERE donor_id = ?1 ORDER BY created_at DESC",
                &donor_id.to_string(),
            )
        })
    }

    pub fn list_transactions_for_campaign(&self, campaign_id: Uuid) -> Result<Vec<Transaction>> {
        self.with_conn(|conn| {
            query_transactions(
                conn,
                "WHERE campaign_id = ?1 ORDER BY created_at DESC",
                &campaign_id.to_string(),
            )
        })
    }

    /// (sum, count) of completed transactions referencing a campaign.
    pub fn campaign_transaction_totals(&self, campaign_id: Uuid) -> Result<(i64, i64)> {
        self.with_conn(|conn| {
            let totals = conn.query_row(
                "SELECT COALESCE(SUM(amount), 0), COUNT(*) FROM transactions
                 WHERE campaign_id = ?1 AND status = 'completed'",
                [campaign_id.to_string()],
                |r| Ok((r.get(0)?, r.get(1)?)),
            )?;
            Ok(totals)
        })
    }

    pub fn donation_totals(&self) -> Result<DonationTotals> {
        self.with_conn(|conn| {
            let totals = conn.query_row(
                "SELECT COUNT(*),
                        COALESCE(SUM(amount), 0),
                        COALESCE(SUM(is_anonymous), 0),
                        COALESCE(SUM(CASE WHEN is_anonymous = 1 THEN amount ELSE 0 END), 0),
                        COUNT(DISTINCT CASE WHEN is_anonymous = 0 THEN donor_id END)
                 FROM transactions WHERE status = 'completed'",
                [],
                |r| {
                    Ok(DonationTotals {
                        count: r.get(0)?,
                        amount: r.get(1)?,
                        anonymous_count: r.get(2)?,
                        anonymous_amount: r.get(3)?,
                        unique_donors: r.get(4)?,
                    })
                },
            )?;
            Ok(totals)
        })
    }

    /// Donated amount per campaign category, largest first.
    pub fn donations_by_category(&self) -> Result<Vec<(String, i64)>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT c.category, SUM(t.amount) AS total
                 FROM transactions t
                 JOIN campaigns c ON c.id = t.campaign_id
                 WHERE t.status = 'completed'
                 GROUP BY c.category
                 ORDER BY total DESC, c.category ASC",
            )?;
            let rows = stmt
                .query_map([], |r| Ok((r.get(0)?, r.get(1)?)))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

fn insert_user(conn: &Connection, user: &User, password_hash: Option<&str>) -> Result<bool> {
    let inserted = conn.execute(
        "INSERT INTO users (id, name, email, role, password, verified, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
         ON CONFLICT(email) DO NOTHING",
        params![
            user.id.to_string(),
            user.name,
            user.email,
            user.role.as_str(),
            password_hash,
            user.verified,
            format_timestamp(user.created_at),
        ],
    )?;
    Ok(inserted == 1)
}

fn increment_raised(conn: &Connection, campaign_id: Uuid, amount: i64) -> Result<bool> {
    let changed = conn.execute(
        "UPDATE campaigns SET raised = raised + ?2, donor_count = donor_count + 1 WHERE id = ?1",
        params![campaign_id.to_string(), amount],
    )?;
    Ok(changed == 1)
}

fn query_user(conn: &Connection, clause: &str, arg: &str) -> Result<Option<UserRow>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users {clause}");
    let mut stmt = conn.prepare(&sql)?;

    let row = stmt
        .query_row([arg], |row| {
            Ok(UserRow {
                id: row.get(0)?,
                name: row.get(1)?,
                email: row.get(2)?,
                role: row.get(3)?,
                password: row.get(4)?,
                verified: row.get(5)?,
                created_at: row.get(6)?,
            })
        })
        .optional()?;

    Ok(row)
}

fn map_campaign(row: &Row<'_>) -> rusqlite::Result<CampaignRow> {
    Ok(CampaignRow {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        category: row.get(3)?,
        goal: row.get(4)?,
        raised: row.get(5)?,
        donor_count: row.get(6)?,
        status: row.get(7)?,
        active: row.get(8)?,
        verified: row.get(9)?,
        created_by: row.get(10)?,
        deadline: row.get(11)?,
        created_at: row.get(12)?,
    })
}

fn query_campaign(conn: &Connection, id: Uuid) -> Result<Option<Campaign>> {
    let sql = format!("SELECT {CAMPAIGN_COLUMNS} FROM campaigns WHERE id = ?1");
    let mut stmt = conn.prepare(&sql)?;
    let row = stmt.query_row([id.to_string()], map_campaign).optional()?;
    row.map(CampaignRow::into_model).transpose()
}

fn map_request(row: &Row<'_>) -> rusqlite::Result<RequestRow> {
    Ok(RequestRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        category: row.get(2)?,
        title: row.get(3)?,
        description: row.get(4)?,
        kind: row.get(5)?,
        lat: row.get(6)?,
        lng: row.get(7)?,
        address: row.get(8)?,
        status: row.get(9)?,
        urgency: row.get(10)?,
        amount: row.get(11)?,
        sanctioned_amount: row.get(12)?,
        accepted_by: row.get(13)?,
        accepted_at: row.get(14)?,
        completed: row.get(15)?,
        approved_by: row.get(16)?,
        approved_at: row.get(17)?,
        rejected_by: row.get(18)?,
        rejected_at: row.get(19)?,
        rejection_reason: row.get(20)?,
        sanctioned_at: row.get(21)?,
        completed_at: row.get(22)?,
        created_at: row.get(23)?,
    })
}

fn query_proofs(conn: &Connection, request_id: &str) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT proof_ref FROM request_proofs WHERE request_id = ?1 ORDER BY position ASC",
    )?;
    let proofs = stmt
        .query_map([request_id], |r| r.get(0))?
        .collect::<std::result::Result<Vec<String>, _>>()?;
    Ok(proofs)
}

fn query_request(conn: &Connection, id: Uuid) -> Result<Option<Request>> {
    Ok(query_requests(conn, "WHERE id = ?1", [id.to_string()])?
        .into_iter()
        .next())
}

fn query_requests<P: Params>(conn: &Connection, clause: &str, args: P) -> Result<Vec<Request>> {
    let sql = format!("SELECT {REQUEST_COLUMNS} FROM requests {clause}");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(args, map_request)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    rows.into_iter()
        .map(|row| {
            let proofs = query_proofs(conn, &row.id)?;
            row.into_model(proofs)
        })
        .collect()
}

fn query_transactions(conn: &Connection, clause: &str, arg: &str) -> Result<Vec<Transaction>> {
    let sql = format!("SELECT {TRANSACTION_COLUMNS} FROM transactions {clause}");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([arg], |row| {
            Ok(TransactionRow {
                id: row.get(0)?,
                donor_id: row.get(1)?,
                receiver_id: row.get(2)?,
                campaign_id: row.get(3)?,
                amount: row.get(4)?,
                is_anonymous: row.get(5)?,
                qr_code: row.get(6)?,
                track_url: row.get(7)?,
                impact_story: row.get(8)?,
                status: row.get(9)?,
                payment_id: row.get(10)?,
                created_at: row.get(11)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    rows.into_iter().map(TransactionRow::into_model).collect()
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
