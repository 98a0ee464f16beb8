mod common;

use std::sync::{Arc, Barrier};
use std::thread;
use std::time::{Duration, Instant};

use aidlink_core::CoreError;
use aidlink_types::events::NotificationEvent;
use aidlink_types::models::Role;

use common::Harness;

const WORKERS: usize = 16;

const HOLD: Duration = Duration::from_millis(400);

/// Runs `f(i)` on `WORKERS` threads released at the same instant.
fn race<T, F>(f: F) -> Vec<T>
where
    T: Send + 'static,
    F: Fn(usize) -> T + Send + Sync + 'static,
{
    let f = Arc::new(f);
    let barrier = Arc::new(Barrier::new(WORKERS));
    let handles: Vec<_> = (0..WORKERS)
        .map(|i| {
            let f = f.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                f(i)
            })
        })
        .collect();
    handles.into_iter().map(|h| h.join().unwrap()).collect()
}

#[test]
fn concurrent_ledger_increments_are_exact() {
    let h = Harness::on_disk();
    let (campaign, _) = h.active_campaign("medical", 1_000_000);
    let ledger = h.engine.ledger().clone();

    let id = campaign.id;
    race(move |i| ledger.apply_donation(id, 100 + i as i64).unwrap());

    let expected: i64 = (0..WORKERS as i64).map(|i| 100 + i).sum();
    let progress = h.engine.get_campaign_progress(campaign.id).unwrap();
    assert_eq!(progress.raised, expected);
    assert_eq!(progress.donor_count, WORKERS as i64);
}

#[test]
fn concurrent_donations_keep_the_ledger_balanced() {
    let h = Harness::on_disk();
    let (first, _) = h.active_campaign("food", 100_000);
    let (second, _) = h.active_campaign("water", 100_000);
    let donor = h.user(Role::Donor);

    let engine = h.engine.clone();
    let (a, b, donor_id) = (first.id, second.id, donor.id);
    race(move |i| {
        let campaign = if i % 2 == 0 { a } else { b };
        engine
            .donate(campaign, Some(donor_id), 250, i % 3 == 0)
            .unwrap()
    });

    for id in [first.id, second.id] {
        let audit = h.engine.verify_ledger(id).unwrap();
        assert!(audit.balanced, "{audit:?}");
        assert_eq!(audit.raised, 250 * (WORKERS as i64 / 2));
        assert_eq!(audit.transaction_count, WORKERS as i64 / 2);
    }
}

#[test]
fn only_one_helper_wins_an_accept_race() {
    let h = Harness::on_disk();
    let receiver = h.user(Role::Receiver);
    let request = h.service_request(receiver.id, 12.97, 77.59);
    let helpers: Vec<_> = (0..WORKERS).map(|_| h.user(Role::Helper).id).collect();

    let engine = h.engine.clone();
    let id = request.id;
    let results = race(move |i| engine.accept_request(id, helpers[i]));

    let winners: Vec<_> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
    assert_eq!(winners.len(), 1);
    let winner = winners[0].accepted_by.unwrap();

    for r in &results {
        match r {
            Ok(_) => {}
            Err(CoreError::AlreadyAccepted { helper_id, .. }) => assert_eq!(*helper_id, winner),
            Err(e) => panic!("unexpected error {e}"),
        }
    }
    assert_eq!(h.engine.get_request(id).unwrap().accepted_by, Some(winner));
}

#[test]
fn concurrent_approvals_issue_one_set_of_credentials() {
    let mut h = Harness::on_disk();
    let receiver = h.user(Role::Receiver);
    let admin = h.user(Role::Admin);
    let request = h.financial_request(receiver.id, 9_000);
    h.drain();

    let engine = h.engine.clone();
    let (id, admin_id) = (request.id, admin.id);
    let results = race(move |_| engine.approve_request(id, admin_id));

    let ok: Vec<_> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
    assert_eq!(ok.len(), 1);
    assert!(
        results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .all(|e| matches!(e, CoreError::InvalidState(_)))
    );

    let issued = h
        .drain()
        .into_iter()
        .filter(|n| matches!(n.event, NotificationEvent::CredentialsIssued { .. }))
        .count();
    assert_eq!(issued, 1);

    let hash = h.db.get_password_hash(receiver.id).unwrap().unwrap();
    assert!(aidlink_core::credentials::verify_password(
        &hash,
        ok[0].password.expose()
    ));
}

#[test]
fn busy_campaign_does_not_hold_up_donations_elsewhere() {
    let h = Harness::on_disk();
    let (a, _) = h.active_campaign("medical", 10_000);
    let (b, _) = h.active_campaign("food", 10_000);

    let db = h.db.clone();
    let started = Arc::new(Barrier::new(2));
    let holder = {
        let started = started.clone();
        thread::spawn(move || {
            db.with_conn(|conn| {
                // Keep a transaction on campaign A open for a while.
                conn.execute_batch("BEGIN")?;
                let raised: i64 = conn.query_row(
                    "SELECT raised FROM campaigns WHERE id = ?1",
                    [a.id.to_string()],
                    |r| r.get(0),
                )?;
                started.wait();
                thread::sleep(HOLD);
                conn.execute_batch("COMMIT")?;
                Ok(raised)
            })
            .unwrap()
        })
    };

    started.wait();
    let clock = Instant::now();
    let receipt = h.engine.donate(b.id, None, 500, true).unwrap();
    let waited = clock.elapsed();
    assert_eq!(holder.join().unwrap(), 0);

    assert!(waited < HOLD / 2, "donation to campaign B took {waited:?}");
    assert_eq!(receipt.campaign.raised, 500);
    assert_eq!(h.engine.get_campaign_progress(a.id).unwrap().raised, 0);
}

#[test]
fn concurrent_sign_ups_with_one_email_register_once() {
    let h = Harness::on_disk();
    let engine = h.engine.clone();
    let results = race(move |i| {
        let email = if i % 2 == 0 { "asha@example.org" } else { "ASHA@example.org" };
        engine.register_user("Asha", email, Role::Donor)
    });

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(
        results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .all(|e| matches!(e, CoreError::Validation(_)))
    );
}
