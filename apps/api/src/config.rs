use std::str::FromStr;

use anyhow::{anyhow, bail, Context, Result};

const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
const DEFAULT_ANTHROPIC_URL: &str = "https://api.anthropic.com";
const DEFAULT_MODEL: &str = "mistral";

/// Which wire protocol a model role talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Ollama,
    Anthropic,
}

impl Provider {
    fn default_base_url(self) -> &'static str {
        match self {
            Provider::Ollama => DEFAULT_OLLAMA_URL,
            Provider::Anthropic => DEFAULT_ANTHROPIC_URL,
        }
    }
}

impl FromStr for Provider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ollama" => Ok(Provider::Ollama),
            "anthropic" => Ok(Provider::Anthropic),
            other => Err(anyhow!("unknown provider '{other}' (expected 'ollama' or 'anthropic')")),
        }
    }
}

/// Backend settings for one model role.
#[derive(Debug, Clone, PartialEq)]
pub struct BackendConfig {
    pub provider: Provider,
    pub model: String,
    pub base_url: String,
    pub temperature: f32,
}

/// Application configuration loaded from environment variables.
/// Fails at startup if a variable is present but malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub rust_log: String,
    /// Convergence threshold: number of completed revision cycles before finalizing.
    pub max_iterations: u32,
    pub max_upload_bytes: usize,
    pub generation_timeout_secs: u64,
    pub draft: BackendConfig,
    pub revise: BackendConfig,
    pub anthropic_api_key: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup. `from_env` is this over the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let draft = backend_from_lookup(&lookup, "DRAFT", 0.7)?;
        let revise = backend_from_lookup(&lookup, "REVISE", 0.2)?;
        let anthropic_api_key = lookup("ANTHROPIC_API_KEY").filter(|k| !k.trim().is_empty());

        let uses_anthropic = [&draft, &revise]
            .iter()
            .any(|b| b.provider == Provider::Anthropic);
        if uses_anthropic && anthropic_api_key.is_none() {
            bail!("ANTHROPIC_API_KEY must be set when a model role uses the anthropic provider");
        }

        let max_iterations: u32 = parse_or(&lookup, "MAX_ITERATIONS", 2)?;
        if max_iterations == 0 {
            bail!("MAX_ITERATIONS must be at least 1");
        }

        Ok(Config {
            port: parse_or(&lookup, "PORT", 8080)?,
            rust_log: lookup("RUST_LOG").unwrap_or_else(|| "info".to_string()),
            max_iterations,
            max_upload_bytes: parse_or(&lookup, "MAX_UPLOAD_BYTES", 10 * 1024 * 1024)?,
            generation_timeout_secs: parse_or(&lookup, "GENERATION_TIMEOUT_SECS", 120)?,
            draft,
            revise,
            anthropic_api_key,
        })
    }
}

fn backend_from_lookup<F>(lookup: &F, prefix: &str, default_temperature: f32) -> Result<BackendConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let provider = match lookup(&format!("{prefix}_PROVIDER")) {
        Some(raw) => raw
            .parse::<Provider>()
            .with_context(|| format!("{prefix}_PROVIDER is invalid"))?,
        None => Provider::Ollama,
    };

    let temperature: f32 = parse_or(lookup, &format!("{prefix}_TEMPERATURE"), default_temperature)?;
    if !(0.0..=2.0).contains(&temperature) {
        bail!("{prefix}_TEMPERATURE must be between 0.0 and 2.0, got {temperature}");
    }

    Ok(BackendConfig {
        provider,
        model: lookup(&format!("{prefix}_MODEL")).unwrap_or_else(|| DEFAULT_MODEL.to_string()),
        base_url: lookup(&format!("{prefix}_BASE_URL"))
            .unwrap_or_else(|| provider.default_base_url().to_string())
            .trim_end_matches('/')
            .to_string(),
        temperature,
    })
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} has an invalid value '{raw}'")),
        None => Ok(default),
    }
}
