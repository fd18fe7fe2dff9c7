use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::api::response;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Upstream service unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("Upstream service returned an unexpected response: {0}")]
    UpstreamMalformed(String),

    #[error("Required environment variable {0} is not set")]
    ConfigurationMissing(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::UpstreamUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::UpstreamMalformed(_) => StatusCode::BAD_GATEWAY,
            AppError::ConfigurationMissing(_) | AppError::Config(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Stable machine-readable name used in the error envelope.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "validation_error",
            AppError::UpstreamUnavailable(_) => "upstream_unavailable",
            AppError::UpstreamMalformed(_) => "upstream_malformed",
            AppError::ConfigurationMissing(_) => "configuration_missing",
            AppError::Config(_) => "configuration_error",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(kind = self.kind(), "{}", self);
        } else {
            tracing::warn!(kind = self.kind(), "{}", self);
        }

        response::error(status, self.kind(), self.to_string()).into_response()
    }
}

// Body decoding failures surface through reqwest as well, so split them out
// before treating the rest as transport problems.
impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            AppError::UpstreamMalformed(err.to_string())
        } else if err.is_timeout() {
            AppError::UpstreamUnavailable(format!("request timed out: {}", err))
        } else {
            AppError::UpstreamUnavailable(err.to_string())
        }
    }
}

impl From<axum::extract::rejection::JsonRejection> for AppError {
    fn from(rejection: axum::extract::rejection::JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<axum::extract::rejection::QueryRejection> for AppError {
    fn from(rejection: axum::extract::rejection::QueryRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
