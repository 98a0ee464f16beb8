mod config;

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::sync::broadcast::{Receiver, error::RecvError};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use aidlink_api::state::AppStateInner;
use aidlink_core::Engine;
use aidlink_core::credentials::{Argon2Hasher, CredentialPolicy};
use aidlink_core::notify::Outbox;
use aidlink_db::Database;
use aidlink_types::events::Notification;

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "aidlink=debug,tower_http=debug".into()),
        )
        .init();

    let config = Config::from_env()?;

    // Init database
    let db = Arc::new(Database::open(&config.db_path)?);
    info!("Database ready at {}", config.db_path.display());

    // Notifications
    let outbox = Outbox::new(config.outbox_capacity);
    tokio::spawn(deliver(outbox.subscribe()));

    let engine = Engine::new(
        db,
        Arc::new(outbox),
        Arc::new(Argon2Hasher::default()),
        CredentialPolicy {
            hardened: config.harden_credentials,
        },
    );
    let state = AppStateInner::new(Arc::new(engine), config.default_radius_km);

    let app = aidlink_api::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("AidLink server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Stand-in for mail delivery: drains the outbox and records what would be
/// sent. Payloads are not logged since they may carry credentials.
async fn deliver(mut rx: Receiver<Notification>) {
    loop {
        match rx.recv().await {
            Ok(n) => info!("Delivered {} to {}", n.event.kind(), n.recipient_email),
            Err(RecvError::Lagged(skipped)) => {
                warn!("Delivery worker fell behind, {} notifications dropped", skipped)
            }
            Err(RecvError::Closed) => break,
        }
    }
}
