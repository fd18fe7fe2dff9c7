use axum::Json;
use axum::http::StatusCode;
use chrono::Utc;
use serde::Serialize;

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub kind: &'static str,
    pub message: String,
    pub status_code: u16,
    pub timestamp: String,
}

pub fn error(
    status: StatusCode,
    kind: &'static str,
    message: String,
) -> (StatusCode, Json<ErrorResponse>) {
    let body = ErrorBody {
        kind,
        message,
        status_code: status.as_u16(),
        timestamp: Utc::now().to_rfc3339(),
    };

    (status, Json(ErrorResponse { error: body }))
}
