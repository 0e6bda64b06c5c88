use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::render::engine::RenderError;
use crate::render::templates::TemplateError;

/// Message returned for every failure after input validation.
pub const GENERIC_RENDER_MESSAGE: &str = "Error generating resume";

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Template file not found: {0}.html")]
    TemplateNotFound(String),

    #[error("Render error: {0}")]
    Render(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<TemplateError> for AppError {
    fn from(err: TemplateError) -> Self {
        match err {
            TemplateError::InvalidName(_) => AppError::Validation(err.to_string()),
            TemplateError::NotFound(name) => AppError::TemplateNotFound(name),
            TemplateError::Io { .. } => AppError::Internal(anyhow::Error::new(err)),
            TemplateError::Render { .. } => AppError::Render(err.to_string()),
        }
    }
}

impl From<RenderError> for AppError {
    fn from(err: RenderError) -> Self {
        AppError::Render(err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::TemplateNotFound(_) => {
                (StatusCode::BAD_REQUEST, "TEMPLATE_NOT_FOUND", self.to_string())
            }
            AppError::Render(detail) => {
                tracing::error!("Render error: {detail}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "RENDER_ERROR",
                    GENERIC_RENDER_MESSAGE.to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    GENERIC_RENDER_MESSAGE.to_string(),
                )
            }
        };

        let body = Json(json!({
            "code": code,
            "message": message
        }));

        (status, body).into_response()
    }
}
