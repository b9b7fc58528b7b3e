use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{bail, Context};
use client_core::{http::DEFAULT_API_BASE_URL, page::DEFAULT_PAGE_SIZE};
use serde::Deserialize;
use url::Url;

pub const DEFAULT_CONFIG_FILE: &str = "console.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub api_base_url: String,
    pub session_file: PathBuf,
    pub page_size: u64,
    pub request_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.into(),
            session_file: PathBuf::from(".console/session.json"),
            page_size: DEFAULT_PAGE_SIZE,
            request_timeout_secs: 30,
        }
    }
}

impl Settings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Keys accepted in `console.toml`; all optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileSettings {
    api_base_url: Option<String>,
    session_file: Option<PathBuf>,
    page_size: Option<u64>,
    request_timeout_secs: Option<u64>,
}

/// Defaults, then the config file when present, then the environment.
pub fn load_settings(config_path: Option<&Path>) -> anyhow::Result<Settings> {
    let mut settings = Settings::default();

    let path = config_path.unwrap_or(Path::new(DEFAULT_CONFIG_FILE));
    match fs::read_to_string(path) {
        Ok(raw) => apply_file(&mut settings, &raw)
            .with_context(|| format!("invalid config file '{}'", path.display()))?,
        Err(err) if config_path.is_none() && err.kind() == std::io::ErrorKind::NotFound => {}
        Err(err) => {
            return Err(err)
                .with_context(|| format!("failed to read config file '{}'", path.display()))
        }
    }

    apply_env(&mut settings, |key| std::env::var(key).ok());
    validate(&settings)?;
    Ok(settings)
}

fn apply_file(settings: &mut Settings, raw: &str) -> anyhow::Result<()> {
    let file: FileSettings = toml::from_str(raw)?;
    if let Some(v) = file.api_base_url {
        settings.api_base_url = v;
    }
    if let Some(v) = file.session_file {
        settings.session_file = v;
    }
    if let Some(v) = file.page_size {
        settings.page_size = v;
    }
    if let Some(v) = file.request_timeout_secs {
        settings.request_timeout_secs = v;
    }
    Ok(())
}

fn apply_env(settings: &mut Settings, var: impl Fn(&str) -> Option<String>) {
    if let Some(v) = var("CONSOLE_API_URL") {
        settings.api_base_url = v;
    }
    if let Some(v) = var("APP__API_BASE_URL") {
        settings.api_base_url = v;
    }

    if let Some(v) = var("APP__SESSION_FILE") {
        settings.session_file = PathBuf::from(v);
    }

    // Unparseable numbers keep the previous value.
    if let Some(parsed) = var("APP__PAGE_SIZE").and_then(|v| v.trim().parse().ok()) {
        settings.page_size = parsed;
    }
    if let Some(parsed) = var("APP__REQUEST_TIMEOUT_SECS").and_then(|v| v.trim().parse().ok()) {
        settings.request_timeout_secs = parsed;
    }
}

fn validate(settings: &Settings) -> anyhow::Result<()> {
    let url = Url::parse(&settings.api_base_url)
        .with_context(|| format!("invalid api base url '{}'", settings.api_base_url))?;
    if !matches!(url.scheme(), "http" | "https") {
        bail!("api base url must be http or https, got '{}'", url.scheme());
    }
    if settings.page_size == 0 {
        bail!("page_size must be at least 1");
    }
    Ok(())
}
