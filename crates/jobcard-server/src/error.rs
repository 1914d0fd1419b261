use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use jobcard_shared::FormError;
use jobcard_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Invalid job card: {0}")]
    Validation(#[from] FormError),

    #[error("Image too large: {size} bytes (max {max})")]
    ImageTooLarge { size: usize, max: usize },

    #[error("Image storage error: {0}")]
    Storage(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for ServerError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound => ServerError::NotFound("Record not found".to_string()),
            StoreError::ImageTooLarge { size, max } => ServerError::ImageTooLarge { size, max },
            StoreError::Storage(msg) => ServerError::Storage(msg),
            other => ServerError::Internal(other.to_string()),
        }
    }
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::NotFound(_) => StatusCode::NOT_FOUND,
            ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ServerError::ImageTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            ServerError::Storage(_) | ServerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show to the user.
    pub fn public_message(&self) -> String {
        match self {
            ServerError::Storage(_) => "Image storage error".to_string(),
            ServerError::Internal(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        let body = serde_json::json!({
            "error": self.public_message(),
        });

        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_errors_map_to_statuses() {
        assert_eq!(ServerError::from(StoreError::NotFound).status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ServerError::from(StoreError::ImageTooLarge { size: 2, max: 1 }).status(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        let storage = ServerError::from(StoreError::Storage("disk full".into()));
        assert_eq!(storage.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(storage.public_message(), "Image storage error");
    }

    #[test]
    fn form_errors_are_unprocessable() {
        let err = ServerError::from(FormError::Missing("customer"));
        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(err.public_message().contains("customer"));
    }
}
