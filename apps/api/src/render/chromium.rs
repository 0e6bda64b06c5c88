//! Chromium-backed rendering sessions via the DevTools protocol.
//!
//! Two launch strategies share one session type:
//! - `SandboxedChromium` for serverless / production hosts: a minimal prepackaged
//!   binary, no sandbox, single process, `/dev/shm` avoided.
//! - `LocalChromium` for development: an installed Chrome, auto-detected unless
//!   a path is given.
//!
//! Every session gets its own throwaway profile directory.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig, BrowserConfigBuilder};
use chromiumoxide::cdp::browser_protocol::page::PrintToPdfParams;
use chromiumoxide::cdp::js_protocol::runtime::EvaluateParams;
use chromiumoxide::Page;
use futures::StreamExt;
use tempfile::TempDir;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::config::BrowserRuntime;
use crate::render::engine::{BrowserLauncher, PdfOptions, RenderError, RenderSession};

/// Default binary location for the prepackaged serverless Chromium.
pub const SANDBOXED_CHROMIUM_PATH: &str = "/opt/chromium/chromium";

/// Flags for constrained hosts: read-only filesystem outside /tmp, tiny /dev/shm, no GPU.
const SANDBOXED_ARGS: &[&str] = &[
    "--disable-dev-shm-usage",
    "--disable-gpu",
    "--single-process",
    "--no-zygote",
    "--hide-scrollbars",
    "--mute-audio",
    "--font-render-hinting=none",
    "--disable-extensions",
];

/// CDP request timeout; the page load itself is bounded by the renderer.
const CDP_REQUEST_TIMEOUT: Duration = Duration::from_secs(90);

/// How long a closed or killed browser gets to exit before we stop waiting.
const PROCESS_EXIT_TIMEOUT: Duration = Duration::from_secs(10);

/// Resolves once `load` has fired and web fonts are ready.
const WAIT_FOR_LOAD_JS: &str = r#"new Promise((resolve) => {
  const done = () => document.fonts.ready.then(() => resolve(true));
  if (document.readyState === "complete") { done(); }
  else { window.addEventListener("load", done, { once: true }); }
})"#;

/// Picks the launch strategy for the configured runtime.
pub fn launcher_for(runtime: BrowserRuntime, executable: Option<PathBuf>) -> Arc<dyn BrowserLauncher> {
    match runtime {
        BrowserRuntime::Sandboxed => Arc::new(SandboxedChromium {
            executable: executable.unwrap_or_else(|| PathBuf::from(SANDBOXED_CHROMIUM_PATH)),
        }),
        BrowserRuntime::Local => Arc::new(LocalChromium { executable }),
    }
}

pub struct SandboxedChromium {
    executable: PathBuf,
}

#[async_trait]
impl BrowserLauncher for SandboxedChromium {
    fn name(&self) -> &'static str {
        "sandboxed-chromium"
    }

    async fn launch(&self) -> Result<Box<dyn RenderSession>, RenderError> {
        let profile = profile_dir()?;
        let builder = BrowserConfig::builder()
            .chrome_executable(&self.executable)
            .no_sandbox()
            .args(SANDBOXED_ARGS.iter().copied());

        ChromiumSession::launch(builder, profile).await
    }
}

pub struct LocalChromium {
    executable: Option<PathBuf>,
}

#[async_trait]
impl BrowserLauncher for LocalChromium {
    fn name(&self) -> &'static str {
        "local-chromium"
    }

    async fn launch(&self) -> Result<Box<dyn RenderSession>, RenderError> {
        let profile = profile_dir()?;
        let mut builder = BrowserConfig::builder();
        if let Some(path) = &self.executable {
            builder = builder.chrome_executable(path);
        }

        ChromiumSession::launch(builder, profile).await
    }
}

fn profile_dir() -> Result<TempDir, RenderError> {
    tempfile::Builder::new()
        .prefix("resume-render-")
        .tempdir()
        .map_err(|e| RenderError::Launch(format!("could not create profile directory: {e}")))
}

pub struct ChromiumSession {
    browser: Browser,
    handler: JoinHandle<()>,
    page: Option<Page>,
    closed: bool,
    // dropped after the browser
    _profile: TempDir,
}

impl ChromiumSession {
    async fn launch(
        builder: BrowserConfigBuilder,
        profile: TempDir,
    ) -> Result<Box<dyn RenderSession>, RenderError> {
        let config = builder
            .user_data_dir(profile.path())
            .request_timeout(CDP_REQUEST_TIMEOUT)
            .build()
            .map_err(RenderError::Launch)?;

        let (browser, mut events) = Browser::launch(config)
            .await
            .map_err(|e| RenderError::Launch(e.to_string()))?;

        // The CDP connection only makes progress while this stream is polled.
        let handler = tokio::spawn(async move {
            while let Some(event) = events.next().await {
                if let Err(e) = event {
                    debug!("Browser handler event error: {e}");
                }
            }
        });

        Ok(Box::new(ChromiumSession {
            browser,
            handler,
            page: None,
            closed: false,
            _profile: profile,
        }))
    }

    async fn page(&mut self) -> Result<&Page, RenderError> {
        if self.page.is_none() {
            let page = self
                .browser
                .new_page("about:blank")
                .await
                .map_err(|e| RenderError::Load(e.to_string()))?;
            self.page = Some(page);
        }

        self.page
            .as_ref()
            .ok_or_else(|| RenderError::Load("page unavailable".to_string()))
    }
}

#[async_trait]
impl RenderSession for ChromiumSession {
    async fn load_html(&mut self, html: &str) -> Result<(), RenderError> {
        let page = self.page().await?;

        page.set_content(html)
            .await
            .map_err(|e| RenderError::Load(e.to_string()))?;

        let wait = EvaluateParams::builder()
            .expression(WAIT_FOR_LOAD_JS)
            .await_promise(true)
            .return_by_value(true)
            .build()
            .map_err(RenderError::Load)?;

        page.evaluate_expression(wait)
            .await
            .map_err(|e| RenderError::Load(e.to_string()))?;

        Ok(())
    }

    async fn export_pdf(&mut self, options: &PdfOptions) -> Result<Vec<u8>, RenderError> {
        let page = self.page().await?;

        let params = PrintToPdfParams {
            print_background: Some(options.print_background),
            paper_width: Some(options.paper_width),
            paper_height: Some(options.paper_height),
            margin_top: Some(options.margin),
            margin_bottom: Some(options.margin),
            margin_left: Some(options.margin),
            margin_right: Some(options.margin),
            ..Default::default()
        };

        page.pdf(params)
            .await
            .map_err(|e| RenderError::Export(e.to_string()))
    }

    async fn close(&mut self) -> Result<(), RenderError> {
        self.closed = true;
        self.page = None;

        let result = shutdown(&mut self.browser, PROCESS_EXIT_TIMEOUT).await;
        self.handler.abort();
        result
    }
}

/// Process control needed to tear a browser down.
#[async_trait]
trait BrowserProcess: Send {
    /// Asks the browser to exit over CDP.
    async fn request_close(&mut self) -> Result<(), String>;

    async fn force_kill(&mut self) -> Result<(), String>;

    async fn wait_for_exit(&mut self) -> Result<(), String>;
}

#[async_trait]
impl BrowserProcess for Browser {
    async fn request_close(&mut self) -> Result<(), String> {
        self.close().await.map(|_| ()).map_err(|e| e.to_string())
    }

    async fn force_kill(&mut self) -> Result<(), String> {
        match self.kill().await {
            Some(Err(e)) => Err(e.to_string()),
            _ => Ok(()),
        }
    }

    async fn wait_for_exit(&mut self) -> Result<(), String> {
        self.wait().await.map(|_| ()).map_err(|e| e.to_string())
    }
}

/// Closes the browser and reaps the process. Never waits unbounded: a browser
/// that rejects the close request is killed, and the exit wait is capped.
async fn shutdown(process: &mut dyn BrowserProcess, exit_timeout: Duration) -> Result<(), RenderError> {
    let closed = process.request_close().await;
    if let Err(e) = &closed {
        warn!("Browser rejected close request ({e}); killing process");
        if let Err(e) = process.force_kill().await {
            warn!("Failed to kill browser process: {e}");
        }
    }

    let exited = match tokio::time::timeout(exit_timeout, process.wait_for_exit()).await {
        Ok(exited) => exited,
        Err(_) => {
            warn!("Browser still running {exit_timeout:?} after close; killing process");
            if let Err(e) = process.force_kill().await {
                warn!("Failed to kill browser process: {e}");
            }
            Err(format!("browser did not exit within {exit_timeout:?}"))
        }
    };

    closed.map_err(RenderError::Close)?;
    exited.map_err(RenderError::Close)
}

impl Drop for ChromiumSession {
    fn drop(&mut self) {
        if !self.closed {
            // Request was cancelled mid-render. Dropping `Browser` kills the child process.
            warn!("Rendering session dropped before close; killing browser");
            self.handler.abort();
        }
    }
}
