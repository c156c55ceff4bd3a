//! Success envelope shared by every handler.
//!
//! Failures are rendered by `Error`'s `IntoResponse`; this is the other half:
//! `{"success": true, "data": ..., "message"?: ...}`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::Value;

/// JSON success response with an HTTP status.
#[derive(Debug)]
pub struct ApiResponse {
    status: StatusCode,
    data: Value,
    message: Option<String>,
}

impl ApiResponse {
    /// 200 OK with the given payload.
    pub fn ok(data: Value) -> Self {
        Self {
            status: StatusCode::OK,
            data,
            message: None,
        }
    }

    /// 201 Created with the given payload.
    pub fn created(data: Value) -> Self {
        Self {
            status: StatusCode::CREATED,
            data,
            message: None,
        }
    }

    /// 200 OK carrying only a message.
    pub fn message(message: impl Into<String>) -> Self {
        Self::ok(Value::Null).with_message(message)
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for ApiResponse {
    fn into_response(self) -> Response {
        let mut body = serde_json::json!({
            "success": true,
            "data": self.data,
        });

        if let Some(message) = self.message {
            body["message"] = Value::String(message);
        }

        (self.status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_created_envelope() {
        let response = ApiResponse::created(serde_json::json!({ "id": "abc" })).into_response();
        assert_eq!(response.status(), StatusCode::CREATED);

        let body = body_json(response).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["id"], "abc");
        assert!(body.get("message").is_none());
    }

    #[tokio::test]
    async fn test_message_envelope() {
        let response = ApiResponse::message("Logged out").into_response();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["message"], "Logged out");
        assert!(body["data"].is_null());
    }
}
