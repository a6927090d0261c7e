use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use crate::kapacitor::RemoteError;
use crate::store::StoreError;

/// Every failure a handler can report.
///
/// The three not-found variants render identically so that callers cannot
/// tell which link of the source → kapacitor → task chain was missing.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    InvalidRequest(String),
    #[error("{0}")]
    InvalidInstance(String),
    #[error("{0}")]
    InvalidRule(String),
    #[error("{0}")]
    InvalidStatus(String),
    #[error("ID {0} not found")]
    SourceNotFound(i64),
    #[error("ID {0} not found")]
    InstanceNotFound(i64),
    #[error("ID {0} not found")]
    TaskNotFound(i64),
    #[error("{0}")]
    RemoteUnavailable(String),
    #[error("{0}")]
    RemoteRejected(String),
    #[error("{0}")]
    StoreFailure(String),
}

#[derive(Serialize)]
struct ErrorBody {
    code: u16,
    message: String,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::InvalidInstance(_) | Self::InvalidRule(_) | Self::InvalidStatus(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::SourceNotFound(_) | Self::InstanceNotFound(_) | Self::TaskNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            Self::RemoteUnavailable(_) | Self::RemoteRejected(_) | Self::StoreFailure(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Maps an engine failure for a task reached through kapacitor `kapa_id`.
    pub fn from_remote(err: RemoteError, kapa_id: i64) -> Self {
        match err {
            RemoteError::NotFound => Self::TaskNotFound(kapa_id),
            RemoteError::Unavailable(msg) => Self::RemoteUnavailable(msg),
            RemoteError::Rejected(msg) => Self::RemoteRejected(msg),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        Self::StoreFailure(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(ErrorBody {
            code: status.as_u16(),
            message: self.to_string(),
        });
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_variants_are_indistinguishable() {
        let a = ApiError::InstanceNotFound(7);
        let b = ApiError::TaskNotFound(7);
        assert_eq!(a.to_string(), b.to_string());
        assert_eq!(a.status(), b.status());
        assert_eq!(a.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn status_codes() {
        assert_eq!(
            ApiError::InvalidRequest("x".into()).status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(ApiError::InvalidRule("x".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ApiError::RemoteRejected("x".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn remote_message_is_preserved() {
        let err = ApiError::from_remote(RemoteError::Rejected("invalid TICKscript".into()), 1);
        assert_eq!(err.to_string(), "invalid TICKscript");
        assert!(matches!(
            ApiError::from_remote(RemoteError::NotFound, 3),
            ApiError::TaskNotFound(3)
        ));
    }
}
