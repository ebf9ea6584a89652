/// LLM Client: the single point of entry for all text-generation calls.
///
/// ARCHITECTURAL RULE: No other module may call a model backend directly.
/// Stages ask `ModelRoles` for a role ("draft" or "revise"); which concrete backend
/// serves that role is decided once, at startup, from config.
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

use crate::config::{BackendConfig, Provider};

pub mod anthropic;
pub mod ollama;
pub mod prompts;

pub use anthropic::AnthropicClient;
pub use ollama::OllamaClient;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("LLM returned empty content")]
    EmptyContent,
}

/// A text-generation backend: prompt in, generated text out.
///
/// Implementations must be safe to call from concurrent runs.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, LlmError>;

    /// Short human-readable identity for logs, e.g. `ollama:mistral`.
    fn describe(&self) -> String;
}

/// The two role bindings used by the refinement workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelRole {
    /// Fast, higher-temperature backend. Used only for first drafts.
    Draft,
    /// Stronger, lower-temperature backend. Used for every critique and revision.
    Revise,
}

impl fmt::Display for ModelRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelRole::Draft => f.write_str("draft"),
            ModelRole::Revise => f.write_str("revise"),
        }
    }
}

/// Role → backend bindings, injected into the workflow engine at construction.
#[derive(Clone)]
pub struct ModelRoles {
    draft: Arc<dyn TextGenerator>,
    revise: Arc<dyn TextGenerator>,
}

impl ModelRoles {
    pub fn new(draft: Arc<dyn TextGenerator>, revise: Arc<dyn TextGenerator>) -> Self {
        Self { draft, revise }
    }

    /// Single-model variant: both roles served by the same backend.
    #[cfg(test)]
    pub fn shared(backend: Arc<dyn TextGenerator>) -> Self {
        Self {
            draft: backend.clone(),
            revise: backend,
        }
    }

    pub fn backend(&self, role: ModelRole) -> &dyn TextGenerator {
        match role {
            ModelRole::Draft => self.draft.as_ref(),
            ModelRole::Revise => self.revise.as_ref(),
        }
    }

    /// Generates text with the backend bound to `role`.
    /// Blank output is an error: an empty artifact must never flow into the next stage.
    pub async fn generate(&self, role: ModelRole, prompt: &str) -> Result<String, LlmError> {
        let backend = self.backend(role);
        debug!(
            "Generating with {} role ({}), prompt_chars={}",
            role,
            backend.describe(),
            prompt.len()
        );

        let text = backend.generate(prompt).await?;
        let text = text.trim();
        if text.is_empty() {
            return Err(LlmError::EmptyContent);
        }
        Ok(text.to_string())
    }
}

/// Constructs the backend described by `backend`, sharing nothing with other roles
/// beyond what `reqwest` pools internally.
pub fn build_generator(
    backend: &BackendConfig,
    timeout: Duration,
    anthropic_api_key: Option<&str>,
) -> anyhow::Result<Arc<dyn TextGenerator>> {
    let http = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .context("Failed to build HTTP client")?;

    let generator: Arc<dyn TextGenerator> = match backend.provider {
        Provider::Ollama => Arc::new(OllamaClient::new(http, backend)),
        Provider::Anthropic => {
            let api_key = anthropic_api_key
                .context("ANTHROPIC_API_KEY is required for the anthropic provider")?;
            Arc::new(AnthropicClient::new(http, backend, api_key.to_string()))
        }
    };
    Ok(generator)
}

#[cfg(test)]
pub mod testing {
    //! In-memory backend for tests: counts calls, records prompts, fails on demand.

    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use super::*;

    type Responder = Box<dyn Fn(&str, usize) -> String + Send + Sync>;

    pub struct ScriptedGenerator {
        name: String,
        calls: AtomicUsize,
        prompts: Mutex<Vec<String>>,
        fail_on_call: Option<usize>,
        responder: Responder,
    }

    impl ScriptedGenerator {
        /// Responds to the n-th call (1-based) with `responder(prompt, n)`.
        pub fn new<F>(name: &str, responder: F) -> Self
        where
            F: Fn(&str, usize) -> String + Send + Sync + 'static,
        {
            Self {
                name: name.to_string(),
                calls: AtomicUsize::new(0),
                prompts: Mutex::new(Vec::new()),
                fail_on_call: None,
                responder: Box::new(responder),
            }
        }

        /// Answers every call with `"{name} output #{n}"`.
        pub fn numbered(name: &str) -> Self {
            let label = name.to_string();
            Self::new(name, move |_, n| format!("{label} output #{n}"))
        }

        /// The n-th call (1-based) fails with an API error.
        pub fn failing_on(mut self, call: usize) -> Self {
            self.fail_on_call = Some(call);
            self
        }

        pub fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        pub fn prompts(&self) -> Vec<String> {
            self.prompts.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl TextGenerator for ScriptedGenerator {
        async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            self.prompts.lock().unwrap().push(prompt.to_string());
            if self.fail_on_call == Some(n) {
                return Err(LlmError::Api {
                    status: 503,
                    message: format!("{} unavailable", self.name),
                });
            }
            Ok((self.responder)(prompt, n))
        }

        fn describe(&self) -> String {
            format!("scripted:{}", self.name)
        }
    }
}
