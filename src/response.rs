use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use serde_json::{json, Value};

/// Success envelope: `{"status": "success", "message": ..., "data": ...}`.
#[derive(Debug)]
pub struct ApiResponse {
    code: StatusCode,
    message: String,
    data: Option<Value>,
}

impl ApiResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            code: StatusCode::OK,
            message: message.into(),
            data: None,
        }
    }

    pub fn created(message: impl Into<String>) -> Self {
        Self {
            code: StatusCode::CREATED,
            ..Self::ok(message)
        }
    }

    pub fn with_data<T: Serialize>(mut self, data: T) -> Self {
        // Serialisasi struct model kita tidak pernah gagal
        self.data = Some(serde_json::to_value(data).unwrap_or(Value::Null));
        self
    }

    pub fn status_code(&self) -> StatusCode {
        self.code
    }

    pub fn body(&self) -> Value {
        let mut body = json!({
            "status": status_label(self.code),
            "message": self.message,
        });
        if let Some(data) = &self.data {
            body["data"] = data.clone();
        }
        body
    }
}

impl IntoResponse for ApiResponse {
    fn into_response(self) -> Response {
        (self.code, Json(self.body())).into_response()
    }
}

pub fn status_label(code: StatusCode) -> &'static str {
    if code.as_u16() < 400 {
        "success"
    } else {
        "error"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_carries_data_only_when_set() {
        let bare = ApiResponse::ok("Logged out").body();
        assert_eq!(bare["status"], "success");
        assert_eq!(bare["message"], "Logged out");
        assert!(bare.get("data").is_none());

        let created = ApiResponse::created("Budget created").with_data(json!({"id": 7}));
        assert_eq!(created.status_code(), StatusCode::CREATED);
        assert_eq!(created.body()["data"]["id"], 7);
    }

    #[test]
    fn labels_follow_status_code() {
        assert_eq!(status_label(StatusCode::CREATED), "success");
        assert_eq!(status_label(StatusCode::NOT_FOUND), "error");
    }
}
