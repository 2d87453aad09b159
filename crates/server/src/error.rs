use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use services::{HierarchyError, SessionError, ValidationError};
use thiserror::Error;
use tracing::error;

/// Everything a handler can fail with, mapped onto an HTTP status.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ApiError {
    #[error("Invalid request body")]
    InvalidBody(#[from] JsonRejection),
    #[error("Invalid path parameter")]
    InvalidPath(#[from] PathRejection),
    #[error("Invalid query parameter")]
    InvalidQuery(#[from] QueryRejection),
    #[error("Validation failed")]
    Validation(#[from] ValidationError),
    #[error("Content-Type header is required")]
    MissingContentType,
    #[error("Content-Type must be application/json")]
    UnsupportedMediaType,
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Hierarchy(#[from] HierarchyError),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl ApiError {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidBody(_)
            | ApiError::InvalidPath(_)
            | ApiError::InvalidQuery(_)
            | ApiError::Validation(_)
            | ApiError::MissingContentType => StatusCode::BAD_REQUEST,
            ApiError::UnsupportedMediaType => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ApiError::Session(e) => match e {
                SessionError::NotFound { .. } => StatusCode::NOT_FOUND,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::Hierarchy(e) => match e {
                HierarchyError::Empty { .. } => StatusCode::NOT_FOUND,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    fn body(&self) -> ErrorBody {
        let (error, details) = match self {
            ApiError::InvalidBody(e) => (self.to_string(), Some(e.body_text())),
            ApiError::InvalidPath(e) => (self.to_string(), Some(e.body_text())),
            ApiError::InvalidQuery(e) => (self.to_string(), Some(e.body_text())),
            ApiError::Validation(e) => (self.to_string(), Some(e.to_string())),
            ApiError::Session(SessionError::NotFound { .. })
            | ApiError::Hierarchy(HierarchyError::Empty { .. }) => (self.to_string(), None),
            ApiError::Session(e @ SessionError::StartTimeOverflow { .. }) => {
                ("Server misconfigured".to_string(), Some(e.to_string()))
            }
            ApiError::Session(e) => ("Transaction failed".to_string(), Some(e.to_string())),
            ApiError::Hierarchy(e) => ("Storage failure".to_string(), Some(e.to_string())),
            ApiError::MissingContentType | ApiError::UnsupportedMediaType => {
                (self.to_string(), None)
            }
        };
        ErrorBody { error, details }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, "request failed");
        }
        (status, Json(self.body())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use portal_core::model::SessionId;
    use storage::StorageError;

    #[test]
    fn session_errors_map_to_distinct_statuses() {
        let not_found = ApiError::from(SessionError::NotFound {
            session_id: SessionId::new(4),
        });
        assert_eq!(not_found.status(), StatusCode::NOT_FOUND);
        assert!(not_found.body().details.is_none());

        let tx = ApiError::from(SessionError::Transaction(StorageError::Connection(
            "disk full".into(),
        )));
        assert_eq!(tx.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = tx.body();
        assert_eq!(body.error, "Transaction failed");
        assert!(body.details.unwrap().contains("disk full"));
    }

    #[test]
    fn start_time_overflow_is_a_server_error() {
        let err = ApiError::from(SessionError::StartTimeOverflow {
            offset: chrono::Duration::MAX,
        });
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.body().error, "Server misconfigured");
    }

    #[test]
    fn empty_hierarchy_is_not_found() {
        let err = ApiError::from(HierarchyError::Empty { what: "niches" });
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(err.body().error, "no niches found");
    }

    #[test]
    fn content_type_errors() {
        assert_eq!(
            ApiError::MissingContentType.status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::UnsupportedMediaType.status(),
            StatusCode::UNSUPPORTED_MEDIA_TYPE
        );
    }
}
