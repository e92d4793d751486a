use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use std::any::Any;
use tracing::error;

use crate::application::usercases::subscriptions::SubscriptionError;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: u16,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            code: status.as_u16(),
            message: message.into(),
        }
    }
}

impl IntoResponse for ErrorResponse {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self)).into_response()
    }
}

impl IntoResponse for SubscriptionError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            // Storage details are logged by the use case, never sent to the client.
            SubscriptionError::Storage(_) => "internal server error".to_string(),
            SubscriptionError::Timeout => "request timed out".to_string(),
            other => other.to_string(),
        };

        ErrorResponse::new(status, message).into_response()
    }
}

/// Response for a request whose handler panicked. The payload is logged, not returned.
pub fn panic_response(payload: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    };
    error!(panic = %detail, "http: handler panicked");

    ErrorResponse::new(StatusCode::INTERNAL_SERVER_ERROR, "internal server error").into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::errors::{ParseError, ValidationError};
    use anyhow::anyhow;
    use serde_json::Value;

    async fn render(err: SubscriptionError) -> (StatusCode, Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn validation_error_keeps_its_message() {
        let (status, body) = render(SubscriptionError::from(ValidationError::field(
            "price",
            "price must be positive",
        )))
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], 400);
        assert_eq!(body["message"], "price must be positive");
    }

    #[tokio::test]
    async fn parse_error_names_the_field() {
        let (status, body) = render(SubscriptionError::from(ValidationError::Date {
            field: "end_date",
            source: ParseError::InvalidMonth("13-2024".to_string()),
        }))
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "invalid end_date format, expected MM-YYYY");
    }

    #[tokio::test]
    async fn not_found_maps_to_404() {
        let (status, body) = render(SubscriptionError::NotFound).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "subscription not found");
    }

    #[tokio::test]
    async fn storage_error_is_opaque() {
        let (status, body) = render(SubscriptionError::Storage(anyhow!(
            "password authentication failed for user postgres"
        )))
        .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], "internal server error");
    }

    #[tokio::test]
    async fn panic_payload_is_not_leaked() {
        let response = panic_response(Box::new(String::from("index out of bounds: the len is 0")));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["code"], 500);
        assert_eq!(body["message"], "internal server error");
    }

    #[tokio::test]
    async fn timeout_maps_to_504() {
        let (status, _) = render(SubscriptionError::Timeout).await;
        assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
    }
}
