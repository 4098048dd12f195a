//! HTTP error mapping.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use tracing::{error, warn};

use crate::scan::ScanRejection;
use crate::security::ValidationError;
use crate::storage::DatabaseError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Missing x-user-id header")]
    Unauthenticated,

    #[error("QR code not found")]
    NotFound,

    #[error("{0}")]
    BadRequest(String),

    #[error("Password is required")]
    PasswordMissing,

    #[error("Incorrect password")]
    WrongPassword,

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Scan(#[from] ScanRejection),

    #[error("store error: {0}")]
    Store(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<DatabaseError> for ApiError {
    fn from(e: DatabaseError) -> Self {
        match e {
            DatabaseError::NotFound(_) => Self::NotFound,
            other => Self::Store(other.to_string()),
        }
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Unauthenticated | Self::PasswordMissing | Self::WrongPassword => {
                StatusCode::UNAUTHORIZED
            }
            Self::NotFound | Self::Scan(ScanRejection::NotFound) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Validation(ValidationError::PasswordHash(_)) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Scan(ScanRejection::Expired | ScanRejection::LimitReached) => StatusCode::GONE,
            Self::Scan(ScanRejection::Conflict) => StatusCode::TOO_MANY_REQUESTS,
            Self::Scan(ScanRejection::StoreUnavailable(_)) | Self::Store(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
        }
    }

    /// Text shown to the client. Infrastructure detail stays in the logs.
    fn public_message(&self) -> String {
        match self {
            Self::Scan(ScanRejection::Expired) => {
                "This QR code has expired and is no longer valid".to_string()
            }
            Self::Scan(ScanRejection::LimitReached) => {
                "This QR code has reached its scan limit and is no longer valid".to_string()
            }
            Self::Scan(ScanRejection::Conflict) => {
                "The scan could not be recorded, please try again".to_string()
            }
            Self::Scan(ScanRejection::StoreUnavailable(_)) | Self::Store(_) => {
                "Service temporarily unavailable".to_string()
            }
            Self::Validation(ValidationError::PasswordHash(_)) | Self::Internal(_) => {
                "Internal server error".to_string()
            }
            other => other.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, status = status.as_u16(), "Request failed");
        } else if status == StatusCode::TOO_MANY_REQUESTS {
            warn!(error = %self, "Scan lost a concurrent race");
        }

        (status, Json(json!({ "error": self.public_message() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejection_statuses() {
        let cases = [
            (ScanRejection::NotFound, StatusCode::NOT_FOUND),
            (ScanRejection::Expired, StatusCode::GONE),
            (ScanRejection::LimitReached, StatusCode::GONE),
            (ScanRejection::Conflict, StatusCode::TOO_MANY_REQUESTS),
            (
                ScanRejection::StoreUnavailable("disk".into()),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
        ];
        for (rejection, status) in cases {
            assert_eq!(ApiError::from(rejection).status(), status);
        }
    }

    #[test]
    fn validation_is_bad_request() {
        assert_eq!(
            ApiError::from(ValidationError::ExpiryInPast).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(ValidationError::PasswordHash("rng".into())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn database_not_found_is_404() {
        let err = ApiError::from(DatabaseError::NotFound("QR code x".into()));
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        let err = ApiError::from(DatabaseError::Query("syntax".into()));
        assert_eq!(err.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn store_detail_is_not_exposed() {
        let err = ApiError::Scan(ScanRejection::StoreUnavailable("/var/db: EIO".into()));
        assert_eq!(err.public_message(), "Service temporarily unavailable");
        let limit = ApiError::Scan(ScanRejection::LimitReached);
        assert!(limit.public_message().contains("scan limit"));
    }
}
