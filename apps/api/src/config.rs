use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

/// Which browser binary the document renderer launches.
///
/// Selected once at startup from `APP_ENV`; callers never branch on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrowserRuntime {
    /// Serverless / production: minimal prepackaged Chromium, no sandbox, single process.
    Sandboxed,
    /// Development: a locally installed Chrome or Chromium.
    Local,
}

impl BrowserRuntime {
    fn from_app_env(app_env: &str) -> Self {
        if app_env.eq_ignore_ascii_case("production") {
            BrowserRuntime::Sandboxed
        } else {
            BrowserRuntime::Local
        }
    }
}

/// Application configuration loaded from environment variables.
/// Nothing is required: without `ANTHROPIC_API_KEY` the AI rewrite is disabled.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub rust_log: String,
    pub browser_runtime: BrowserRuntime,
    pub chromium_path: Option<PathBuf>,
    pub templates_dir: PathBuf,
    pub template_strict_mode: bool,
    pub anthropic_api_key: Option<String>,
    pub llm_timeout: Duration,
    pub rewrite_strict_keys: bool,
    pub render_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Ok(Config {
            port: parse_or(&get, "PORT", 8080)?,
            rust_log: get("RUST_LOG").unwrap_or_else(|| "info".to_string()),
            browser_runtime: BrowserRuntime::from_app_env(
                &get("APP_ENV").unwrap_or_else(|| "development".to_string()),
            ),
            chromium_path: get("CHROMIUM_PATH").map(PathBuf::from),
            templates_dir: get("TEMPLATES_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("templates")),
            template_strict_mode: parse_bool_or(&get, "TEMPLATE_STRICT_MODE", false)?,
            anthropic_api_key: get("ANTHROPIC_API_KEY"),
            llm_timeout: Duration::from_secs(parse_or(&get, "LLM_TIMEOUT_SECS", 45)?),
            rewrite_strict_keys: parse_bool_or(&get, "REWRITE_STRICT_KEYS", false)?,
            render_timeout: Duration::from_secs(parse_or(&get, "RENDER_TIMEOUT_SECS", 60)?),
        })
    }
}

fn parse_or<F, T>(get: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match get(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("Environment variable '{key}' has an invalid value: {raw}")),
        None => Ok(default),
    }
}

fn parse_bool_or<F>(get: &F, key: &str, default: bool) -> Result<bool>
where
    F: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => anyhow::bail!("Environment variable '{key}' must be a boolean, got: {raw}"),
        },
        None => Ok(default),
    }
}
