use crate::services::settings::SettingsError;
use axum::Json;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use std::fmt;
use tracing::error;

#[derive(Debug)]
pub(crate) enum AppError {
    /// 设置读写失败，`message` 原样返回给调用方
    Settings {
        message: String,
        source: SettingsError,
    },
    BadRequest(String),
}

impl AppError {
    pub(crate) fn settings(message: impl Into<String>) -> impl FnOnce(SettingsError) -> Self {
        let message = message.into();
        move |source| Self::Settings { message, source }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Settings { message, source } => write!(f, "{}: {}", message, source),
            AppError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            AppError::Settings { message, source } => {
                error!(error = %source, "{}", message);
                (StatusCode::INTERNAL_SERVER_ERROR, message)
            }
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}
