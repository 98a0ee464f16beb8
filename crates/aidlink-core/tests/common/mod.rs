#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::broadcast;
use uuid::Uuid;

use aidlink_core::Engine;
use aidlink_core::credentials::{Argon2Hasher, CredentialPolicy};
use aidlink_core::notify::Outbox;
use aidlink_db::Database;
use aidlink_types::api::{NewCampaign, NewRequest};
use aidlink_types::events::Notification;
use aidlink_types::models::{Campaign, Location, Request, RequestType, Role, Urgency, User};

pub struct Harness {
    pub engine: Arc<Engine>,
    pub db: Arc<Database>,
    pub outbox: Outbox,
    pub rx: broadcast::Receiver<Notification>,
    path: Option<PathBuf>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_db(Database::open_in_memory().unwrap(), None)
    }

    /// Backed by a WAL file in the temp dir, so callers get their own
    /// connections. Removed on drop.
    pub fn on_disk() -> Self {
        let path = std::env::temp_dir().join(format!("aidlink-test-{}.db", Uuid::new_v4()));
        Self::with_db(Database::open(&path).unwrap(), Some(path))
    }

    fn with_db(db: Database, path: Option<PathBuf>) -> Self {
        let db = Arc::new(db);
        let outbox = Outbox::new(4096);
        let rx = outbox.subscribe();
        // Minimum Argon2 cost keeps the suite fast.
        let hasher = Arc::new(Argon2Hasher::with_params(8, 1, 1).unwrap());
        let engine = Arc::new(Engine::new(
            db.clone(),
            Arc::new(outbox.clone()),
            hasher,
            CredentialPolicy::default(),
        ));
        Self {
            engine,
            db,
            outbox,
            rx,
            path,
        }
    }

    /// Everything emitted since the last drain.
    pub fn drain(&mut self) -> Vec<Notification> {
        let mut out = Vec::new();
        while let Ok(n) = self.rx.try_recv() {
            out.push(n);
        }
        out
    }

    pub fn user(&self, role: Role) -> User {
        let tag = Uuid::new_v4().simple().to_string();
        self.engine
            .register_user(&format!("{role} {}", &tag[..6]), &format!("{role}-{tag}@example.org"), role)
            .unwrap()
    }

    pub fn active_campaign(&self, category: &str, goal: i64) -> (Campaign, User) {
        let owner = self.user(Role::Receiver);
        let campaign = self
            .engine
            .submit_campaign(NewCampaign {
                title: "Dialysis for Ravi".into(),
                description: "Three months of treatment".into(),
                category: category.into(),
                goal,
                created_by: owner.id,
                deadline: None,
            })
            .unwrap();
        let campaign = self.engine.approve_campaign(campaign.id).unwrap();
        (campaign, owner)
    }

    pub fn financial_request(&self, user_id: Uuid, amount: i64) -> Request {
        self.engine
            .submit_request(NewRequest {
                user_id,
                category: "medical".into(),
                title: "Surgery costs".into(),
                description: "Knee replacement".into(),
                kind: RequestType::Financial,
                location: None,
                urgency: Urgency::High,
                amount: Some(amount),
            })
            .unwrap()
    }

    pub fn service_request(&self, user_id: Uuid, lat: f64, lng: f64) -> Request {
        self.engine
            .submit_request(NewRequest {
                user_id,
                category: "food".into(),
                title: "Weekly groceries".into(),
                description: "Elderly couple, second floor".into(),
                kind: RequestType::Service,
                location: Some(Location {
                    lat,
                    lng,
                    address: Some("Rohini, Delhi".into()),
                }),
                urgency: Urgency::Medium,
                amount: None,
            })
            .unwrap()
    }
}

impl Drop for Harness {
    fn drop(&mut self) {
        if let Some(path) = &self.path {
            for suffix in ["", "-wal", "-shm"] {
                let _ = std::fs::remove_file(format!("{}{suffix}", path.display()));
            }
        }
    }
}
