use std::fmt::Display;

use thiserror::Error;
use uuid::Uuid;

/// Business failures are expected and recoverable. `Unavailable` is the
/// only variant that means the system itself is at fault.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("request {request_id} already accepted by {helper_id}")]
    AlreadyAccepted { request_id: Uuid, helper_id: Uuid },

    #[error("beneficiary resolution failed: {0}")]
    ResolutionFailure(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("storage unavailable: {0}")]
    Unavailable(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, CoreError>;

impl CoreError {
    pub fn not_found(entity: &'static str, id: impl Display) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Stable machine-readable name for the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::InvalidAmount(_) => "invalid_amount",
            Self::InvalidState(_) => "invalid_state",
            Self::AlreadyAccepted { .. } => "already_accepted",
            Self::ResolutionFailure(_) => "resolution_failure",
            Self::Validation(_) => "validation_error",
            Self::Unavailable(_) => "unavailable",
        }
    }

    /// True for failures caused by the caller rather than the system.
    pub fn is_business(&self) -> bool {
        !matches!(self, Self::Unavailable(_))
    }
}
