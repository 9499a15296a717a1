use axum::Json;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::index::IndexError;

#[derive(Debug)]
pub enum AppError {
    InvalidRequest(String),
    StoreUnavailable,
    FailedToGetMessage,
    FailedToStoreMessage,
}

#[derive(Serialize)]
struct ErrorResponse {
    code: i32,
    error_message: String,
}

impl AppError {
    /// 读取路径上的索引错误
    pub fn from_read(err: IndexError) -> Self {
        Self::classify(err, AppError::FailedToGetMessage)
    }

    /// 写入路径上的索引错误
    pub fn from_write(err: IndexError) -> Self {
        Self::classify(err, AppError::FailedToStoreMessage)
    }

    fn classify(err: IndexError, fallback: AppError) -> Self {
        match err {
            IndexError::Validation(msg) => AppError::InvalidRequest(msg),
            IndexError::Store(e) if e.is_transient() => AppError::StoreUnavailable,
            _ => fallback,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::InvalidRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::StoreUnavailable => (
                StatusCode::SERVICE_UNAVAILABLE,
                "Message store unavailable, try again later".to_string(),
            ),
            AppError::FailedToGetMessage => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to get messages".to_string(),
            ),
            AppError::FailedToStoreMessage => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to process current post".to_string(),
            ),
        };

        let body = Json(ErrorResponse {
            code: status.as_u16() as i32,
            error_message,
        });

        (status, body).into_response()
    }
}
