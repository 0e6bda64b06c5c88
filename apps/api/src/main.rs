mod config;
mod errors;
mod generation;
mod llm_client;
mod models;
mod render;
mod routes;
mod state;
#[cfg(test)]
mod test_support;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::generation::pipeline::ResumePipeline;
use crate::generation::rewrite::ResumeRewriter;
use crate::llm_client::{LlmClient, TextGenerator};
use crate::render::chromium::launcher_for;
use crate::render::engine::{DocumentRenderer, PdfOptions};
use crate::render::sanitizer::Sanitizer;
use crate::render::templates::TemplateStore;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Resume API v{}", env!("CARGO_PKG_VERSION"));

    // Generative backend is optional; without a key every rewrite falls back
    let generator: Option<Arc<dyn TextGenerator>> = match &config.anthropic_api_key {
        Some(key) => {
            let llm = LlmClient::new(key.clone(), config.llm_timeout)?;
            info!("LLM client initialized (model: {})", llm_client::MODEL);
            Some(Arc::new(llm) as Arc<dyn TextGenerator>)
        }
        None => {
            warn!("ANTHROPIC_API_KEY not set; AI rewrite disabled");
            None
        }
    };
    let rewriter = ResumeRewriter::new(generator, config.llm_timeout)
        .with_strict_keys(config.rewrite_strict_keys);
    info!(
        "AI rewrite enabled: {} (strict keys: {})",
        rewriter.is_enabled(),
        config.rewrite_strict_keys
    );

    let templates = TemplateStore::new(config.templates_dir.clone(), config.template_strict_mode);
    match templates.list().await {
        Ok(names) => info!("Templates in {}: {}", templates.dir().display(), names.join(", ")),
        Err(e) => warn!("Could not list templates: {e}"),
    }

    let launcher = launcher_for(config.browser_runtime, config.chromium_path.clone());
    let renderer = DocumentRenderer::new(launcher, PdfOptions::a4(), config.render_timeout);
    info!("Document renderer: {}", renderer.launcher_name());

    let pipeline = ResumePipeline::new(templates, Sanitizer::new(), rewriter, renderer);
    let state = AppState {
        pipeline: Arc::new(pipeline),
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
