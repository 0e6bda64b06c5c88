//! Axum route handlers for the resume generation API.

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde::Serialize;

use crate::errors::AppError;
use crate::generation::pipeline::{GenerateResumeRequest, RenderedDocument};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct TemplateListResponse {
    pub templates: Vec<String>,
}

/// POST /api/v1/ai/generate-resume
///
/// Rewrites (best-effort) and renders the submitted resume into a PDF download.
/// A body that is not valid JSON is a validation error, not axum's plain-text rejection.
pub async fn handle_generate_resume(
    State(state): State<AppState>,
    payload: Result<Json<GenerateResumeRequest>, JsonRejection>,
) -> Result<RenderedDocument, AppError> {
    let Json(request) = payload.map_err(|rejection| {
        AppError::Validation(format!("Invalid request body: {}", rejection.body_text()))
    })?;

    state.pipeline.run(request).await
}

/// GET /api/v1/templates
pub async fn handle_list_templates(
    State(state): State<AppState>,
) -> Result<Json<TemplateListResponse>, AppError> {
    let templates = state.pipeline.templates().list().await?;
    Ok(Json(TemplateListResponse { templates }))
}
