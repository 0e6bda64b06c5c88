//! Test doubles for the generative backend and the browser.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::llm_client::{LlmError, TextGenerator};
use crate::render::engine::{BrowserLauncher, PdfOptions, RenderError, RenderSession};

pub const FAKE_PDF: &[u8] = b"%PDF-1.7\n%fake resume\n%%EOF\n";

pub enum FakeGenerator {
    Reply(String),
    Fail,
    Hang,
}

impl FakeGenerator {
    pub fn reply(text: &str) -> Self {
        FakeGenerator::Reply(text.to_string())
    }

    pub fn fail() -> Self {
        FakeGenerator::Fail
    }

    pub fn hang() -> Self {
        FakeGenerator::Hang
    }
}

#[async_trait]
impl TextGenerator for FakeGenerator {
    async fn generate(&self, _prompt: &str, _system: &str) -> Result<String, LlmError> {
        match self {
            FakeGenerator::Reply(text) => Ok(text.clone()),
            FakeGenerator::Fail => Err(LlmError::Api {
                status: 529,
                message: "overloaded_error: upstream stack trace at worker.rs:42".to_string(),
            }),
            FakeGenerator::Hang => {
                tokio::time::sleep(Duration::from_secs(60 * 60)).await;
                Err(LlmError::EmptyContent)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionBehavior {
    Succeed,
    FailLaunch,
    FailLoad,
    HangOnLoad,
    FailExport,
    EmptyPdf,
    FailClose,
}

#[derive(Default)]
struct Counters {
    acquired: AtomicUsize,
    released: AtomicUsize,
    html: Mutex<Vec<String>>,
    options: Mutex<Option<PdfOptions>>,
}

/// Counts sessions and records what was rendered.
pub struct FakeLauncher {
    behavior: SessionBehavior,
    counters: Arc<Counters>,
}

impl FakeLauncher {
    pub fn new(behavior: SessionBehavior) -> Self {
        Self {
            behavior,
            counters: Arc::new(Counters::default()),
        }
    }

    pub fn acquired(&self) -> usize {
        self.counters.acquired.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> usize {
        self.counters.released.load(Ordering::SeqCst)
    }

    pub fn captured_html(&self) -> Vec<String> {
        self.counters.html.lock().unwrap().clone()
    }

    pub fn last_options(&self) -> Option<PdfOptions> {
        self.counters.options.lock().unwrap().clone()
    }
}

#[async_trait]
impl BrowserLauncher for FakeLauncher {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn launch(&self) -> Result<Box<dyn RenderSession>, RenderError> {
        if self.behavior == SessionBehavior::FailLaunch {
            return Err(RenderError::Launch("no such file: chromium".to_string()));
        }
        self.counters.acquired.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeSession {
            behavior: self.behavior,
            counters: self.counters.clone(),
            closed: false,
        }))
    }
}

struct FakeSession {
    behavior: SessionBehavior,
    counters: Arc<Counters>,
    closed: bool,
}

#[async_trait]
impl RenderSession for FakeSession {
    async fn load_html(&mut self, html: &str) -> Result<(), RenderError> {
        self.counters.html.lock().unwrap().push(html.to_string());
        match self.behavior {
            SessionBehavior::FailLoad => Err(RenderError::Load("net::ERR_ABORTED".to_string())),
            SessionBehavior::HangOnLoad => {
                std::future::pending::<()>().await;
                Ok(())
            }
            _ => Ok(()),
        }
    }

    async fn export_pdf(&mut self, options: &PdfOptions) -> Result<Vec<u8>, RenderError> {
        *self.counters.options.lock().unwrap() = Some(options.clone());
        match self.behavior {
            SessionBehavior::FailExport => {
                Err(RenderError::Export("Printing failed: target crashed".to_string()))
            }
            SessionBehavior::EmptyPdf => Ok(Vec::new()),
            _ => Ok(FAKE_PDF.to_vec()),
        }
    }

    async fn close(&mut self) -> Result<(), RenderError> {
        assert!(!self.closed, "session closed twice");
        self.closed = true;
        self.counters.released.fetch_add(1, Ordering::SeqCst);
        if self.behavior == SessionBehavior::FailClose {
            return Err(RenderError::Close("browser already exited".to_string()));
        }
        Ok(())
    }
}

impl Drop for FakeSession {
    fn drop(&mut self) {
        // a dropped, unclosed session stands for a killed browser
        if !self.closed {
            self.counters.released.fetch_add(1, Ordering::SeqCst);
        }
    }
}
