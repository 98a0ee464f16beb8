//! Working out whose account receives credentials when a request is approved.
//!
//! The normal path is the request's creator. Organization registrations are
//! a special case: they can be filed before the organization has an account,
//! so identity has to be recovered from the request text.

use std::sync::LazyLock;

use chrono::Utc;
use regex::Regex;
use serde_json::Value;
use tracing::{info, warn};
use uuid::Uuid;

use aidlink_db::Database;
use aidlink_types::models::{Request, Role, User};

use crate::error::{CoreError, Result};

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[A-Za-z0-9._%+\-]+@[A-Za-z0-9.\-]+\.[A-Za-z]{2,}").expect("static email regex")
});

static ORG_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?im)^\s*organi[sz]ation\s*name\s*[:\-]\s*(.+?)\s*$").expect("static org regex")
});

const NAME_KEYS: &[&str] = &["organizationName", "organisationName", "orgName", "organization_name", "name"];
const EMAIL_KEYS: &[&str] = &["email", "contactEmail", "organizationEmail", "orgEmail"];

/// Titles carrying this marker are organization registrations.
pub fn is_organization_registration(title: &str) -> bool {
    let title = title.to_lowercase();
    title.contains("organization registration") || title.contains("organisation registration")
}

/// Identity fields recovered from a registration's free-text description.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct OrganizationDetails {
    pub name: Option<String>,
    pub email: Option<String>,
}

/// JSON first, then line/regex sniffing.
pub fn parse_organization_details(description: &str) -> OrganizationDetails {
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(description) {
        let field = |keys: &[&str]| {
            keys.iter()
                .filter_map(|k| map.get(*k).and_then(Value::as_str))
                .map(str::trim)
                .find(|v| !v.is_empty())
                .map(str::to_string)
        };
        let details = OrganizationDetails {
            name: field(NAME_KEYS),
            email: field(EMAIL_KEYS).filter(|e| EMAIL_RE.is_match(e)),
        };
        if details.email.is_some() {
            return details;
        }
        return OrganizationDetails {
            email: EMAIL_RE.find(description).map(|m| m.as_str().to_string()),
            ..details
        };
    }

    OrganizationDetails {
        name: ORG_NAME_RE
            .captures(description)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string()),
        email: EMAIL_RE.find(description).map(|m| m.as_str().to_string()),
    }
}

/// Who gets the credentials.
#[derive(Debug, Clone)]
pub struct Beneficiary {
    pub user: User,
    /// Present when the beneficiary is an organization; drives the password
    /// format.
    pub organization: Option<String>,
    /// The account does not exist yet and must be created with the approval.
    pub is_new: bool,
}

pub fn resolve(db: &Database, request: &Request) -> Result<Beneficiary> {
    let org_registration = is_organization_registration(&request.title);

    if let Some(user) = db.get_user(request.user_id)? {
        let organization = match user.role {
            Role::Organization => Some(user.name.clone()),
            Role::Admin | Role::Donor | Role::Helper | Role::Receiver if org_registration => Some(
                parse_organization_details(&request.description)
                    .name
                    .unwrap_or_else(|| user.name.clone()),
            ),
            Role::Admin | Role::Donor | Role::Helper | Role::Receiver => None,
        };
        return Ok(Beneficiary {
            user,
            organization,
            is_new: false,
        });
    }

    if !org_registration {
        return Err(CoreError::ResolutionFailure(format!(
            "no user {} for request {}",
            request.user_id, request.id
        )));
    }

    resolve_organization_fallback(db, request)
}

fn resolve_organization_fallback(db: &Database, request: &Request) -> Result<Beneficiary> {
    let details = parse_organization_details(&request.description);

    if let Some(email) = details.email.as_deref() {
        if let Some(user) = db.get_user_by_email(email)? {
            info!("Request {}: organization resolved by email to user {}", request.id, user.id);
            let organization = details.name.clone().unwrap_or_else(|| user.name.clone());
            return Ok(Beneficiary {
                user,
                organization: Some(organization),
                is_new: false,
            });
        }

        let name = details
            .name
            .clone()
            .unwrap_or_else(|| email.split('@').next().unwrap_or(email).to_string());
        info!("Request {}: provisioning receiver account for {}", request.id, name);
        return Ok(Beneficiary {
            user: User {
                id: Uuid::new_v4(),
                name: name.clone(),
                email: email.to_string(),
                role: Role::Receiver,
                verified: true,
                created_at: Utc::now(),
            },
            organization: Some(name),
            is_new: true,
        });
    }

    warn!(
        "Request {}: no email in organization registration, falling back to latest receiver",
        request.id
    );
    let user = db.latest_user_with_role(Role::Receiver)?.ok_or_else(|| {
        CoreError::ResolutionFailure(format!(
            "organization registration {} has no recoverable email and no receiver exists",
            request.id
        ))
    })?;
    let organization = details.name.unwrap_or_else(|| user.name.clone());
    Ok(Beneficiary {
        user,
        organization: Some(organization),
        is_new: false,
    })
}
