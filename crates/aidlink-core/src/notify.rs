use std::sync::Arc;

use anyhow::{Result, anyhow};
use tokio::sync::broadcast;
use tracing::{debug, warn};

use aidlink_types::events::Notification;

/// Outbound notification collaborator. Fire-and-forget: the engine never
/// waits on delivery and never fails an operation because of it.
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification) -> Result<()>;
}

/// In-process outbox. Delivery workers (and tests) subscribe to receive every
/// notification the engine emits.
#[derive(Clone)]
pub struct Outbox {
    inner: Arc<OutboxInner>,
}

struct OutboxInner {
    tx: broadcast::Sender<Notification>,
}

impl Outbox {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self {
            inner: Arc::new(OutboxInner { tx }),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.inner.tx.subscribe()
    }
}

impl Default for Outbox {
    fn default() -> Self {
        Self::new(1024)
    }
}

impl Notifier for Outbox {
    fn notify(&self, notification: Notification) -> Result<()> {
        let kind = notification.event.kind();
        self.inner
            .tx
            .send(notification)
            .map_err(|_| anyhow!("no delivery worker subscribed for {}", kind))?;
        Ok(())
    }
}

/// Hand a notification to the collaborator, logging instead of failing.
/// Call only after the state change it describes is durable.
pub(crate) fn dispatch(notifier: &dyn Notifier, notification: Notification) {
    let kind = notification.event.kind();
    match notifier.notify(notification) {
        Ok(()) => debug!("Queued {} notification", kind),
        Err(e) => warn!("Dropped {} notification: {}", kind, e),
    }
}
