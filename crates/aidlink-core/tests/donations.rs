mod common;

use std::sync::Arc;

use aidlink_core::credentials::{Argon2Hasher, CredentialPolicy};
use aidlink_core::notify::Outbox;
use aidlink_core::{CoreError, Engine};
use aidlink_db::Database;
use aidlink_types::api::NewCampaign;
use aidlink_types::events::NotificationEvent;
use aidlink_types::models::Role;
use uuid::Uuid;

use common::Harness;

#[test]
fn named_donation_updates_ledger_and_notifies_both_parties() {
    let mut h = Harness::new();
    let (campaign, owner) = h.active_campaign("medical", 10_000);
    let donor = h.user(Role::Donor);
    h.drain();

    let receipt = h.engine.donate(campaign.id, Some(donor.id), 2_500, false).unwrap();

    assert_eq!(receipt.transaction.donor_id, Some(donor.id));
    assert_eq!(receipt.transaction.receiver_id, owner.id);
    assert!(receipt.transaction.qr_code.is_none());
    assert!(receipt.transaction.track_url.is_none());
    assert_eq!(
        receipt.transaction.impact_story,
        "Your ₹2,500 contribution is helping provide critical medical care."
    );
    assert_eq!(receipt.campaign.raised, 2_500);
    assert_eq!(receipt.campaign.donor_count, 1);
    assert_eq!(receipt.campaign.percent, 25.0);

    let sent = h.drain();
    assert_eq!(sent.len(), 2);
    assert!(sent.iter().any(|n| n.recipient_email == donor.email
        && matches!(n.event, NotificationEvent::DonationConfirmed { amount: 2_500, .. })));
    assert!(sent.iter().any(|n| n.recipient_email == owner.email
        && matches!(n.event, NotificationEvent::DonationReceived { raised: 2_500, .. })));

    assert_eq!(h.engine.donation_history(donor.id).unwrap().len(), 1);
}

#[test]
fn anonymous_donation_round_trips_through_qr_lookup() {
    let mut h = Harness::new();
    let (campaign, _) = h.active_campaign("education", 5_000);
    h.drain();

    let receipt = h.engine.donate(campaign.id, None, 500, true).unwrap();
    let tx = &receipt.transaction;

    let qr = tx.qr_code.as_deref().unwrap();
    let token = qr.strip_prefix("QR-").unwrap();
    assert_eq!(token.len(), 7);
    assert!(token.chars().all(|c| c.is_ascii_alphanumeric()));
    assert_eq!(tx.track_url.as_deref(), Some(format!("/impact/{qr}").as_str()));
    assert_eq!(tx.donor_id, None);
    assert!(tx.is_anonymous);

    let impact = h.engine.lookup_impact(qr).unwrap();
    assert_eq!(impact.transaction.id, tx.id);
    assert_eq!(impact.campaign.id, campaign.id);
    assert_eq!(impact.campaign.raised, 500);

    // Only the campaign owner hears about an anonymous gift.
    let sent = h.drain();
    assert_eq!(sent.len(), 1);
    assert!(matches!(
        sent[0].event,
        NotificationEvent::DonationReceived { donor_name: None, .. }
    ));
}

#[test]
fn anonymous_donation_never_stores_the_donor() {
    let h = Harness::new();
    let (campaign, _) = h.active_campaign("food", 1_000);
    let donor = h.user(Role::Donor);

    let receipt = h.engine.donate(campaign.id, Some(donor.id), 100, true).unwrap();
    assert_eq!(receipt.transaction.donor_id, None);
    assert!(h.engine.donation_history(donor.id).unwrap().is_empty());
}

#[test]
fn unknown_qr_code_is_not_found() {
    let h = Harness::new();
    assert!(matches!(
        h.engine.lookup_impact("QR-NOPE123"),
        Err(CoreError::NotFound { .. })
    ));
}

#[test]
fn donation_failures_are_typed() {
    let h = Harness::new();
    let (campaign, _) = h.active_campaign("water", 1_000);
    let donor = h.user(Role::Donor);

    assert!(matches!(
        h.engine.donate(Uuid::new_v4(), Some(donor.id), 100, false),
        Err(CoreError::NotFound { .. })
    ));
    assert!(matches!(
        h.engine.donate(campaign.id, Some(donor.id), 0, false),
        Err(CoreError::InvalidAmount(_))
    ));
    assert!(matches!(
        h.engine.donate(campaign.id, None, 100, false),
        Err(CoreError::Validation(_))
    ));
    assert!(matches!(
        h.engine.donate(campaign.id, Some(Uuid::new_v4()), 100, false),
        Err(CoreError::NotFound { .. })
    ));

    let progress = h.engine.get_campaign_progress(campaign.id).unwrap();
    assert_eq!(progress.raised, 0);
    assert_eq!(progress.donor_count, 0);
}

#[test]
fn pending_campaigns_do_not_accept_donations() {
    let h = Harness::new();
    let owner = h.user(Role::Organization);
    let campaign = h
        .engine
        .submit_campaign(NewCampaign {
            title: "Winter blankets".into(),
            description: "500 blankets".into(),
            category: "shelter".into(),
            goal: 50_000,
            created_by: owner.id,
            deadline: None,
        })
        .unwrap();

    assert!(matches!(
        h.engine.donate(campaign.id, None, 100, true),
        Err(CoreError::InvalidState(_))
    ));
}

#[test]
fn ledger_stays_balanced_and_analytics_add_up() {
    let h = Harness::new();
    let (medical, _) = h.active_campaign("medical", 10_000);
    let (food, _) = h.active_campaign("food", 10_000);
    let donor = h.user(Role::Donor);

    h.engine.donate(medical.id, Some(donor.id), 1_000, false).unwrap();
    h.engine.donate(medical.id, Some(donor.id), 3_000, false).unwrap();
    h.engine.donate(food.id, None, 500, true).unwrap();

    let audit = h.engine.verify_ledger(medical.id).unwrap();
    assert!(audit.balanced);
    assert_eq!(audit.raised, 4_000);
    assert_eq!(audit.transaction_count, 2);
    assert_eq!(h.engine.campaign_transactions(medical.id).unwrap().len(), 2);

    let stats = h.engine.analytics().unwrap();
    assert_eq!(stats.total_donations, 3);
    assert_eq!(stats.total_amount, 4_500);
    assert_eq!(stats.anonymous_donations, 1);
    assert_eq!(stats.anonymous_amount, 500);
    assert_eq!(stats.unique_donors, 1);
    assert_eq!(stats.average_donation, 1_500.0);
    assert_eq!(stats.by_category[0].category, "medical");
    assert_eq!(stats.by_category[0].amount, 4_000);
}

#[test]
fn notification_failure_does_not_fail_the_donation() {
    // An outbox nobody listens to rejects every notification.
    let db = Arc::new(Database::open_in_memory().unwrap());
    let engine = Engine::new(
        db,
        Arc::new(Outbox::new(4)),
        Arc::new(Argon2Hasher::with_params(8, 1, 1).unwrap()),
        CredentialPolicy::default(),
    );
    let owner = engine.register_user("Meera", "meera@example.org", Role::Receiver).unwrap();
    let donor = engine.register_user("Kabir", "kabir@example.org", Role::Donor).unwrap();
    let campaign = engine
        .submit_campaign(NewCampaign {
            title: "Hearing aids".into(),
            description: "For two children".into(),
            category: "medical".into(),
            goal: 8_000,
            created_by: owner.id,
            deadline: None,
        })
        .unwrap();
    engine.approve_campaign(campaign.id).unwrap();

    let receipt = engine.donate(campaign.id, Some(donor.id), 800, false).unwrap();
    assert_eq!(receipt.campaign.raised, 800);
}
