use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::{debug, error};

use aidlink_core::CoreError;
use aidlink_types::api::ErrorResponse;

#[derive(Debug)]
pub enum ApiError {
    Core(CoreError),
    Status(StatusCode),
}

impl From<CoreError> for ApiError {
    fn from(e: CoreError) -> Self {
        Self::Core(e)
    }
}

pub fn status_for(err: &CoreError) -> StatusCode {
    match err {
        CoreError::NotFound { .. } | CoreError::ResolutionFailure(_) => StatusCode::NOT_FOUND,
        CoreError::InvalidAmount(_) => StatusCode::BAD_REQUEST,
        CoreError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        CoreError::InvalidState(_) | CoreError::AlreadyAccepted { .. } => StatusCode::CONFLICT,
        CoreError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            Self::Core(err) => {
                let status = status_for(&err);
                if err.is_business() {
                    debug!("{} -> {}", err, status);
                } else {
                    error!("Storage failure: {:#}", err);
                }
                // Internal detail stays in the log.
                let message = if err.is_business() {
                    err.to_string()
                } else {
                    "service temporarily unavailable".to_string()
                };
                (
                    status,
                    Json(ErrorResponse {
                        kind: err.kind(),
                        error: message,
                    }),
                )
                    .into_response()
            }
            Self::Status(status) => status.into_response(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn business_errors_are_client_errors() {
        assert_eq!(
            status_for(&CoreError::not_found("campaign", Uuid::nil())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_for(&CoreError::AlreadyAccepted {
                request_id: Uuid::nil(),
                helper_id: Uuid::nil(),
            }),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_for(&CoreError::InvalidAmount("zero".into())),
            StatusCode::BAD_REQUEST
        );
        assert!(status_for(&CoreError::Validation("title".into())).is_client_error());
    }

    #[test]
    fn storage_failure_is_a_server_error() {
        let err = CoreError::Unavailable(std::io::Error::other("database is locked").into());
        assert_eq!(status_for(&err), StatusCode::SERVICE_UNAVAILABLE);
    }
}
