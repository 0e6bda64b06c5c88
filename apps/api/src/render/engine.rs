//! Document rendering engine: HTML in, paginated PDF bytes out.
//!
//! A [`BrowserLauncher`] is the configured strategy for acquiring a rendering
//! session. [`DocumentRenderer::render`] owns the session for exactly one
//! document: acquire, load (bounded), export, close. `close` runs on every
//! path that returns. If the render future is dropped mid-flight, dropping the
//! session tears the browser down.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to launch browser: {0}")]
    Launch(String),

    #[error("document did not finish loading within {0:?}")]
    Timeout(Duration),

    #[error("failed to load document: {0}")]
    Load(String),

    #[error("failed to export PDF: {0}")]
    Export(String),

    #[error("renderer produced an empty document")]
    EmptyDocument,

    #[error("failed to close browser session: {0}")]
    Close(String),
}

/// Page geometry for the exported PDF. Dimensions are in inches.
#[derive(Debug, Clone, PartialEq)]
pub struct PdfOptions {
    pub paper_width: f64,
    pub paper_height: f64,
    pub margin: f64,
    pub print_background: bool,
}

impl PdfOptions {
    /// A4 with half-inch margins and background graphics.
    pub fn a4() -> Self {
        Self {
            paper_width: 8.27,
            paper_height: 11.69,
            margin: 0.5,
            print_background: true,
        }
    }
}

impl Default for PdfOptions {
    fn default() -> Self {
        Self::a4()
    }
}

/// One headless browser instance.
#[async_trait]
pub trait RenderSession: Send {
    /// Replaces the page content and resolves once the document has fully loaded.
    async fn load_html(&mut self, html: &str) -> Result<(), RenderError>;

    async fn export_pdf(&mut self, options: &PdfOptions) -> Result<Vec<u8>, RenderError>;

    /// Shuts the browser down. Called once per session by `DocumentRenderer`.
    async fn close(&mut self) -> Result<(), RenderError>;
}

/// Strategy for acquiring rendering sessions, chosen once at startup.
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    fn name(&self) -> &'static str;

    async fn launch(&self) -> Result<Box<dyn RenderSession>, RenderError>;
}

pub struct DocumentRenderer {
    launcher: Arc<dyn BrowserLauncher>,
    options: PdfOptions,
    load_timeout: Duration,
}

impl DocumentRenderer {
    pub fn new(launcher: Arc<dyn BrowserLauncher>, options: PdfOptions, load_timeout: Duration) -> Self {
        Self {
            launcher,
            options,
            load_timeout,
        }
    }

    pub fn launcher_name(&self) -> &'static str {
        self.launcher.name()
    }

    /// Renders `html` in a fresh session and returns the PDF bytes.
    pub async fn render(&self, html: &str) -> Result<Bytes, RenderError> {
        let mut session = self.launcher.launch().await?;
        debug!("Rendering session acquired ({})", self.launcher.name());

        let result = self.print(session.as_mut(), html).await;

        if let Err(e) = session.close().await {
            // never masks the render result
            warn!("Rendering session did not close cleanly: {e}");
        } else {
            debug!("Rendering session released");
        }

        result
    }

    async fn print(&self, session: &mut dyn RenderSession, html: &str) -> Result<Bytes, RenderError> {
        tokio::time::timeout(self.load_timeout, session.load_html(html))
            .await
            .map_err(|_| RenderError::Timeout(self.load_timeout))??;

        let pdf = session.export_pdf(&self.options).await?;
        if pdf.is_empty() {
            return Err(RenderError::EmptyDocument);
        }

        Ok(Bytes::from(pdf))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{FakeLauncher, SessionBehavior, FAKE_PDF};
    use futures::future::join_all;

    fn renderer(launcher: &Arc<FakeLauncher>) -> DocumentRenderer {
        DocumentRenderer::new(launcher.clone(), PdfOptions::a4(), Duration::from_secs(60))
    }

    #[tokio::test]
    async fn test_render_returns_pdf_and_releases_session() {
        let launcher = Arc::new(FakeLauncher::new(SessionBehavior::Succeed));
        let pdf = renderer(&launcher).render("<h1>Jane</h1>").await.unwrap();

        assert_eq!(pdf.as_ref(), FAKE_PDF);
        assert_eq!(launcher.acquired(), 1);
        assert_eq!(launcher.released(), 1);
        assert_eq!(launcher.captured_html(), vec!["<h1>Jane</h1>".to_string()]);
        assert_eq!(launcher.last_options(), Some(PdfOptions::a4()));
    }

    #[tokio::test]
    async fn test_export_failure_still_releases_session() {
        let launcher = Arc::new(FakeLauncher::new(SessionBehavior::FailExport));
        let err = renderer(&launcher).render("<p>x</p>").await.unwrap_err();

        assert!(matches!(err, RenderError::Export(_)));
        assert_eq!(launcher.acquired(), 1);
        assert_eq!(launcher.released(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_load_times_out_and_releases_session() {
        let launcher = Arc::new(FakeLauncher::new(SessionBehavior::HangOnLoad));
        let renderer =
            DocumentRenderer::new(launcher.clone(), PdfOptions::a4(), Duration::from_secs(60));

        let err = renderer.render("<p>x</p>").await.unwrap_err();

        assert!(matches!(err, RenderError::Timeout(d) if d == Duration::from_secs(60)));
        assert_eq!(launcher.released(), 1);
    }

    #[tokio::test]
    async fn test_close_failure_does_not_mask_success() {
        let launcher = Arc::new(FakeLauncher::new(SessionBehavior::FailClose));
        let pdf = renderer(&launcher).render("<p>x</p>").await;
        assert!(pdf.is_ok());
        assert_eq!(launcher.released(), 1);
    }

    #[tokio::test]
    async fn test_empty_pdf_is_an_error() {
        let launcher = Arc::new(FakeLauncher::new(SessionBehavior::EmptyPdf));
        let err = renderer(&launcher).render("<p>x</p>").await.unwrap_err();
        assert!(matches!(err, RenderError::EmptyDocument));
        assert_eq!(launcher.released(), 1);
    }

    #[tokio::test]
    async fn test_launch_failure_acquires_nothing() {
        let launcher = Arc::new(FakeLauncher::new(SessionBehavior::FailLaunch));
        let err = renderer(&launcher).render("<p>x</p>").await.unwrap_err();
        assert!(matches!(err, RenderError::Launch(_)));
        assert_eq!(launcher.acquired(), 0);
        assert_eq!(launcher.released(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_renders_balance_sessions() {
        let ok = Arc::new(FakeLauncher::new(SessionBehavior::Succeed));
        let failing = Arc::new(FakeLauncher::new(SessionBehavior::FailLoad));
        let ok_renderer = renderer(&ok);
        let failing_renderer = renderer(&failing);

        let mut jobs = Vec::new();
        for i in 0..12 {
            let r = if i % 3 == 0 { &failing_renderer } else { &ok_renderer };
            jobs.push(r.render("<p>concurrent</p>"));
        }
        let results = join_all(jobs).await;

        assert_eq!(results.iter().filter(|r| r.is_err()).count(), 4);
        assert_eq!(ok.acquired() + failing.acquired(), 12);
        assert_eq!(ok.released() + failing.released(), 12);
    }

    #[tokio::test]
    async fn test_dropped_render_releases_session() {
        let launcher = Arc::new(FakeLauncher::new(SessionBehavior::HangOnLoad));
        let renderer = renderer(&launcher);

        let render = renderer.render("<p>x</p>");
        // caller disconnects before the load completes
        let _ = tokio::time::timeout(Duration::from_millis(10), render).await;

        assert_eq!(launcher.acquired(), 1);
        assert_eq!(launcher.released(), 1);
    }
}
