//! Resume PDF pipeline — orchestrates one export request end to end.
//!
//! Flow: validate → resolve layout → AI rewrite (best-effort) → sanitize →
//!       merge template → render PDF.
//!
//! Stages run strictly in order. Only input problems and rendering failures
//! reach the caller; a failed rewrite degrades to the original record.

use axum::{
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::generation::rewrite::{ResumeRewriter, RewriteFailure, RewriteOutcome};
use crate::models::resume::ResumeRecord;
use crate::render::engine::DocumentRenderer;
use crate::render::sanitizer::Sanitizer;
use crate::render::templates::{Layout, TemplateId, TemplateStore};

// ────────────────────────────────────────────────────────────────────────────
// Request / output types
// ────────────────────────────────────────────────────────────────────────────

/// Request body for PDF generation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResumeRequest {
    pub template: Option<String>,
    pub resume_data: Option<Value>,
    /// Run the AI rewrite before rendering. Defaults to true.
    pub enhance: Option<bool>,
}

/// A finished PDF, produced once per request and never cached.
#[derive(Debug, Clone)]
pub struct RenderedDocument {
    pub template: TemplateId,
    pub bytes: Bytes,
}

impl RenderedDocument {
    pub fn filename(&self) -> String {
        format!("AI_Resume_{}.pdf", self.template)
    }

    pub fn content_length(&self) -> usize {
        self.bytes.len()
    }
}

impl IntoResponse for RenderedDocument {
    fn into_response(self) -> Response {
        // TemplateId is restricted to [A-Za-z0-9_-], so this cannot fail in practice
        let disposition = HeaderValue::from_str(&format!("attachment; filename={}", self.filename()))
            .unwrap_or_else(|_| HeaderValue::from_static("attachment"));

        (
            [
                (header::CONTENT_TYPE, HeaderValue::from_static("application/pdf")),
                (header::CONTENT_DISPOSITION, disposition),
                (header::CONTENT_LENGTH, HeaderValue::from(self.content_length())),
            ],
            self.bytes,
        )
            .into_response()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Received,
    Validated,
    Rewritten,
    RewriteFallback,
    Sanitized,
    TemplateResolved,
    Rendered,
}

impl Stage {
    fn as_str(self) -> &'static str {
        match self {
            Stage::Received => "received",
            Stage::Validated => "validated",
            Stage::Rewritten => "rewritten",
            Stage::RewriteFallback => "rewrite_fallback",
            Stage::Sanitized => "sanitized",
            Stage::TemplateResolved => "template_resolved",
            Stage::Rendered => "rendered",
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Pipeline
// ────────────────────────────────────────────────────────────────────────────

pub struct ResumePipeline {
    templates: TemplateStore,
    sanitizer: Sanitizer,
    rewriter: ResumeRewriter,
    renderer: DocumentRenderer,
}

/// Checked request, ready for the expensive stages.
struct ValidatedRequest {
    layout: Layout,
    record: ResumeRecord,
    enhance: bool,
}

impl ResumePipeline {
    pub fn new(
        templates: TemplateStore,
        sanitizer: Sanitizer,
        rewriter: ResumeRewriter,
        renderer: DocumentRenderer,
    ) -> Self {
        Self {
            templates,
            sanitizer,
            rewriter,
            renderer,
        }
    }

    pub fn templates(&self) -> &TemplateStore {
        &self.templates
    }

    /// Runs the full pipeline for one request.
    ///
    /// Steps:
    /// 1. validate input and read the layout (no external calls yet)
    /// 2. rewrite via the generative backend, or fall back to the input
    /// 3. sanitize every string in whichever record is current
    /// 4. merge the record into the layout
    /// 5. render the HTML to PDF in a dedicated browser session
    pub async fn run(&self, request: GenerateResumeRequest) -> Result<RenderedDocument, AppError> {
        let request_id = Uuid::new_v4();
        let mut stage = Stage::Received;

        let result = self.execute(request, request_id, &mut stage).await;

        match &result {
            Ok(document) => info!(
                %request_id,
                "Generated {} ({} bytes)",
                document.filename(),
                document.content_length()
            ),
            Err(e) => warn!(%request_id, stage = stage.as_str(), "Resume generation failed: {e}"),
        }

        result
    }

    async fn execute(
        &self,
        request: GenerateResumeRequest,
        request_id: Uuid,
        stage: &mut Stage,
    ) -> Result<RenderedDocument, AppError> {
        let ValidatedRequest {
            layout,
            record,
            enhance,
        } = self.validate(request).await?;
        advance(stage, Stage::Validated, request_id);

        let outcome = if enhance {
            self.rewriter.rewrite(&record).await
        } else {
            RewriteOutcome::Fallback {
                record,
                reason: RewriteFailure::NotRequested,
            }
        };

        if let RewriteOutcome::Fallback { reason, .. } = &outcome {
            match reason {
                RewriteFailure::NotRequested | RewriteFailure::Disabled => {
                    info!(%request_id, "AI rewrite skipped: {reason}")
                }
                _ => warn!(%request_id, "AI rewrite failed, using original data: {reason}"),
            }
        }
        let next = if outcome.is_fallback() {
            Stage::RewriteFallback
        } else {
            Stage::Rewritten
        };
        advance(stage, next, request_id);

        let clean = self.sanitizer.sanitize_record(outcome.record());
        advance(stage, Stage::Sanitized, request_id);

        let html = self.templates.render(&layout, &clean)?;
        advance(stage, Stage::TemplateResolved, request_id);

        let bytes = self.renderer.render(&html).await?;
        advance(stage, Stage::Rendered, request_id);

        Ok(RenderedDocument {
            template: layout.id,
            bytes,
        })
    }

    /// Cheap checks first: nothing here calls the AI backend or launches a browser.
    async fn validate(&self, request: GenerateResumeRequest) -> Result<ValidatedRequest, AppError> {
        let template = request
            .template
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| AppError::Validation("Template not provided".to_string()))?;

        let data = request
            .resume_data
            .filter(|d| !d.is_null())
            .ok_or_else(|| AppError::Validation("No resume data received".to_string()))?;

        let id = TemplateId::parse(&template)?;

        let record = ResumeRecord::from_value(data)
            .ok_or_else(|| AppError::Validation("Resume data must be a JSON object".to_string()))?
            .without_metadata();

        let layout = self.templates.resolve(&id).await?;

        Ok(ValidatedRequest {
            layout,
            record,
            enhance: request.enhance.unwrap_or(true),
        })
    }
}

fn advance(stage: &mut Stage, next: Stage, request_id: Uuid) {
    debug!(%request_id, from = stage.as_str(), to = next.as_str(), "Pipeline stage");
    *stage = next;
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
