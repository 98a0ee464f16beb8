//! Funding and workflow engine.
//!
//! Campaign ledger, donation processing, the assistance-request lifecycle,
//! campaign moderation and proximity matching. Storage, credential hashing
//! and notification delivery are injected collaborators.

pub mod beneficiary;
pub mod campaign;
pub mod credentials;
pub mod donation;
pub mod engine;
pub mod error;
pub mod geo;
pub mod ledger;
pub mod notify;
pub mod request;

pub use engine::Engine;
pub use error::{CoreError, Result};
