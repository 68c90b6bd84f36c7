use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use vidcast_store::StoreError;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Upload rejected before it reached the store (e.g. unsupported type).
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Upload too large (max {max} bytes)")]
    PayloadTooLarge { max: usize },

    #[error("Media not found: {0}")]
    MediaNotFound(String),

    #[error("Media storage error: {0}")]
    MediaStorage(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServerError {
    /// Machine-readable kind carried in the `error` field of the body.
    fn kind(&self) -> &'static str {
        match self {
            ServerError::Store(e) => match e {
                StoreError::NotFound(_) => "NotFound",
                StoreError::Forbidden(_) => "Forbidden",
                StoreError::Conflict(_) => "Conflict",
                StoreError::ValidationFailed(_) => "ValidationFailed",
                StoreError::NotSubscribed => "NotSubscribed",
                StoreError::NotLiked => "NotLiked",
                StoreError::InvalidCredentials => "InvalidCredentials",
                StoreError::TransactionFailed { .. } => "TransactionFailed",
                _ => "Internal",
            },
            ServerError::Unauthorized(_) => "Unauthorized",
            ServerError::BadRequest(_) => "BadRequest",
            ServerError::Validation(_) => "ValidationFailed",
            ServerError::PayloadTooLarge { .. } => "PayloadTooLarge",
            ServerError::MediaNotFound(_) => "NotFound",
            ServerError::MediaStorage(_) | ServerError::Internal(_) => "Internal",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            ServerError::Store(e) => match e {
                StoreError::NotFound(_) => StatusCode::NOT_FOUND,
                StoreError::Forbidden(_) => StatusCode::FORBIDDEN,
                StoreError::Conflict(_) => StatusCode::CONFLICT,
                StoreError::ValidationFailed(_)
                | StoreError::NotSubscribed
                | StoreError::NotLiked => StatusCode::BAD_REQUEST,
                StoreError::InvalidCredentials => StatusCode::UNAUTHORIZED,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ServerError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ServerError::BadRequest(_) | ServerError::Validation(_) => StatusCode::BAD_REQUEST,
            ServerError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            ServerError::MediaNotFound(_) => StatusCode::NOT_FOUND,
            ServerError::MediaStorage(_) | ServerError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        let kind = self.kind();
        let message = if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
            match &self {
                ServerError::Store(StoreError::TransactionFailed { operation, .. }) => {
                    format!("Could not {operation}; nothing was changed")
                }
                ServerError::MediaStorage(_) => "Media storage error".to_string(),
                _ => "Internal server error".to_string(),
            }
        } else {
            match &self {
                ServerError::Store(e) => e.to_string(),
                other => other.to_string(),
            }
        };

        let body = serde_json::json!({
            "error": kind,
            "message": message,
            "success": false,
        });

        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_errors_map_to_statuses() {
        let cases = [
            (StoreError::NotFound("Video"), StatusCode::NOT_FOUND),
            (StoreError::Forbidden("x".into()), StatusCode::FORBIDDEN),
            (StoreError::Conflict("x".into()), StatusCode::CONFLICT),
            (StoreError::NotSubscribed, StatusCode::BAD_REQUEST),
            (StoreError::NotLiked, StatusCode::BAD_REQUEST),
            (StoreError::InvalidCredentials, StatusCode::UNAUTHORIZED),
            (
                StoreError::TransactionFailed {
                    operation: "delete video",
                    reason: "disk I/O error".into(),
                },
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(ServerError::from(err).into_response().status(), status);
        }
    }

    #[test]
    fn upload_errors_map_to_statuses() {
        let too_big = ServerError::PayloadTooLarge { max: 5 };
        assert_eq!(too_big.into_response().status(), StatusCode::PAYLOAD_TOO_LARGE);
        let bad_type = ServerError::Validation("text/plain".into());
        assert_eq!(bad_type.into_response().status(), StatusCode::BAD_REQUEST);
    }
}
