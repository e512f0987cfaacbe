use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

/// JSON error body carrying a transport status code.
#[derive(Debug)]
pub struct JsonApiError {
    status: StatusCode,
    message: String,
    detail: Option<String>,
}

impl JsonApiError {
    pub fn new(status: StatusCode, message: &str, detail: Option<String>) -> Self {
        Self { status, message: message.to_string(), detail }
    }
}

impl IntoResponse for JsonApiError {
    fn into_response(self) -> Response {
        let mut body = serde_json::json!({ "error": self.message });
        if let Some(detail) = self.detail {
            body["detail"] = serde_json::Value::String(detail);
        }
        (self.status, Json(body)).into_response()
    }
}
