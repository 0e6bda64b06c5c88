//! AI rewrite — best-effort wording enhancement of a résumé record.
//!
//! The rewrite never fails the request. Every problem (no backend, timeout,
//! transport error, unparseable output) becomes `RewriteOutcome::Fallback`
//! carrying the original record, and the orchestrator branches on it.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, warn};

use crate::generation::prompts::{REWRITE_PROMPT_TEMPLATE, REWRITE_SYSTEM};
use crate::llm_client::prompts::{
    JSON_ONLY_SYSTEM, NO_FABRICATION_INSTRUCTION, PRESERVE_SHAPE_INSTRUCTION,
};
use crate::llm_client::{extract_json_object, LlmError, TextGenerator};
use crate::models::resume::{KeyDiff, ResumeRecord, SECTION_KEYS};

/// Why a rewrite was not used.
#[derive(Debug, Error)]
pub enum RewriteFailure {
    #[error("no generative backend configured")]
    Disabled,

    #[error("rewrite not requested")]
    NotRequested,

    #[error("generative backend timed out after {0:?}")]
    Timeout(Duration),

    #[error("generative backend failed: {0}")]
    Backend(#[from] LlmError),

    #[error("response contained no JSON object")]
    NoPayload,

    #[error("rewrite changed top-level keys (added: {added:?}, removed: {removed:?})")]
    KeysChanged {
        added: Vec<String>,
        removed: Vec<String>,
    },

    #[error("failed to serialize record for prompt: {0}")]
    Prompt(serde_json::Error),
}

/// Result of the rewrite stage.
#[derive(Debug)]
pub enum RewriteOutcome {
    Rewritten(ResumeRecord),
    Fallback {
        record: ResumeRecord,
        reason: RewriteFailure,
    },
}

impl RewriteOutcome {
    pub fn record(&self) -> &ResumeRecord {
        match self {
            RewriteOutcome::Rewritten(record) => record,
            RewriteOutcome::Fallback { record, .. } => record,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, RewriteOutcome::Fallback { .. })
    }
}

pub struct ResumeRewriter {
    generator: Option<Arc<dyn TextGenerator>>,
    timeout: Duration,
    strict_keys: bool,
}

impl ResumeRewriter {
    pub fn new(generator: Option<Arc<dyn TextGenerator>>, timeout: Duration) -> Self {
        Self {
            generator,
            timeout,
            strict_keys: false,
        }
    }

    /// Reject rewrites whose top-level key set differs from the input.
    pub fn with_strict_keys(mut self, strict_keys: bool) -> Self {
        self.strict_keys = strict_keys;
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.generator.is_some()
    }

    /// Attempts one rewrite of `record`. `record` must already be free of metadata.
    pub async fn rewrite(&self, record: &ResumeRecord) -> RewriteOutcome {
        match self.try_rewrite(record).await {
            Ok(rewritten) => RewriteOutcome::Rewritten(rewritten),
            Err(reason) => RewriteOutcome::Fallback {
                record: record.clone(),
                reason,
            },
        }
    }

    async fn try_rewrite(&self, record: &ResumeRecord) -> Result<ResumeRecord, RewriteFailure> {
        let generator = self.generator.as_ref().ok_or(RewriteFailure::Disabled)?;
        let prompt = build_rewrite_prompt(record)?;
        let system = format!("{REWRITE_SYSTEM} {JSON_ONLY_SYSTEM}");

        let text = tokio::time::timeout(self.timeout, generator.generate(&prompt, &system))
            .await
            .map_err(|_| RewriteFailure::Timeout(self.timeout))??;

        debug!("Rewrite response received ({} chars)", text.len());

        let map = extract_json_object(&text).ok_or(RewriteFailure::NoPayload)?;
        let rewritten = ResumeRecord::from_map(map).without_metadata();

        let diff = record.key_diff(&rewritten);
        if !diff.is_empty() {
            let KeyDiff { added, removed } = diff;
            if self.strict_keys {
                return Err(RewriteFailure::KeysChanged { added, removed });
            }
            warn!(
                "Rewrite changed top-level keys (added: {:?}, removed: {:?}), accepting anyway",
                added, removed
            );
        }

        Ok(rewritten)
    }
}

fn build_rewrite_prompt(record: &ResumeRecord) -> Result<String, RewriteFailure> {
    let resume_json = serde_json::to_string_pretty(record).map_err(RewriteFailure::Prompt)?;

    Ok(REWRITE_PROMPT_TEMPLATE
        .replace("{shape_instruction}", PRESERVE_SHAPE_INSTRUCTION)
        .replace("{fabrication_instruction}", NO_FABRICATION_INSTRUCTION)
        .replace("{sections}", &SECTION_KEYS.join(", "))
        .replace("{json_only}", JSON_ONLY_SYSTEM)
        .replace("{resume_json}", &resume_json))
}
