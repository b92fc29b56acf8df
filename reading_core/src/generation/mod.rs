//! Generation Backend Chain - ordered narrative backends with fallback.
//!
//! Backends are tried once each, in priority order, each under its own
//! timeout. The first success ends the chain. The last backend is always a
//! local composer that cannot fail, so a well-formed chain always produces
//! text.

mod hosted;
mod local;

pub use hosted::*;
pub use local::*;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::{BackendSpec, GenerationConfig};
use crate::context_assembler::PromptPayload;
use crate::error::{BackendError, BackendErrorKind, ConfigError, ReadingError};

/// One interchangeable narrative generator.
#[async_trait]
pub trait NarrativeBackend: Send + Sync {
    fn id(&self) -> &str;

    /// Local backends make no external call and cannot fail.
    fn is_local(&self) -> bool {
        false
    }

    async fn generate(&self, payload: &PromptPayload) -> Result<String, BackendError>;
}

/// Record of one backend call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationAttempt {
    pub backend_id: String,
    pub succeeded: bool,
    pub narrative_text: Option<String>,
    pub error_kind: Option<BackendErrorKind>,
    pub latency_ms: u64,
    /// Set when the text was generated but rejected by the structural gate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_reason: Option<String>,
}

/// Text produced by the chain, with every attempt made.
#[derive(Debug, Clone)]
pub struct ChainOutcome {
    pub narrative_text: String,
    pub backend_id: String,
    /// Index of the successful backend in the chain.
    pub position: usize,
    pub attempts: Vec<GenerationAttempt>,
}

/// Ordered list of backends ending in a local composer.
#[derive(Clone)]
pub struct BackendChain {
    backends: Vec<Arc<dyn NarrativeBackend>>,
    timeout: Duration,
}

impl std::fmt::Debug for BackendChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendChain")
            .field("backends", &self.backend_ids())
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl BackendChain {
    pub fn new(backends: Vec<Arc<dyn NarrativeBackend>>, timeout: Duration) -> Result<Self, ConfigError> {
        match backends.last() {
            None => Err(ConfigError::invalid("generation.backend_order", "must not be empty")),
            Some(last) if !last.is_local() => Err(ConfigError::invalid(
                "generation.backend_order",
                format!("must end with a local backend, found '{}'", last.id()),
            )),
            Some(_) => Ok(Self { backends, timeout }),
        }
    }

    /// A chain holding only the local composer.
    pub fn local_only(timeout: Duration) -> Self {
        Self {
            backends: vec![Arc::new(LocalComposer::default())],
            timeout,
        }
    }

    /// Build the chain named by `backend_order`.
    pub fn from_config(config: &GenerationConfig) -> Result<Self, ConfigError> {
        let mut backends: Vec<Arc<dyn NarrativeBackend>> = Vec::new();

        for id in &config.backend_order {
            let spec = config.backend_spec(id).ok_or_else(|| {
                ConfigError::invalid("generation.backend_order", format!("unknown backend '{}'", id))
            })?;

            let backend: Arc<dyn NarrativeBackend> = match spec {
                BackendSpec::ChatCompletions {
                    base_url,
                    model,
                    api_key_env,
                    temperature,
                    max_tokens,
                } => Arc::new(
                    ChatCompletionsBackend::new(id.clone(), base_url.clone(), model.clone(), api_key_env.as_deref())?
                        .with_temperature(*temperature)
                        .with_max_tokens(*max_tokens),
                ),
                BackendSpec::Ollama { base_url, model } => {
                    Arc::new(OllamaBackend::new(id.clone(), base_url.clone(), model.clone())?)
                }
                BackendSpec::Local => Arc::new(LocalComposer::new(id.clone())),
            };
            backends.push(backend);
        }

        Self::new(backends, Duration::from_millis(config.timeout_ms))
    }

    pub fn len(&self) -> usize {
        self.backends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }

    pub fn backend_ids(&self) -> Vec<&str> {
        self.backends.iter().map(|b| b.id()).collect()
    }

    pub async fn generate(&self, payload: &PromptPayload) -> Result<ChainOutcome, ReadingError> {
        self.generate_from(payload, 0).await
    }

    /// Run the chain starting at backend `start`.
    pub async fn generate_from(&self, payload: &PromptPayload, start: usize) -> Result<ChainOutcome, ReadingError> {
        let mut attempts = Vec::new();

        for (position, backend) in self.backends.iter().enumerate().skip(start) {
            let started = Instant::now();
            let result = match tokio::time::timeout(self.timeout, backend.generate(payload)).await {
                Ok(result) => result,
                Err(_) => Err(BackendError::Timeout {
                    after_ms: self.timeout.as_millis() as u64,
                }),
            };
            let latency_ms = started.elapsed().as_millis() as u64;

            match result {
                Ok(text) => {
                    tracing::debug!(backend = backend.id(), latency_ms, "backend produced narrative");
                    attempts.push(GenerationAttempt {
                        backend_id: backend.id().to_string(),
                        succeeded: true,
                        narrative_text: Some(text.clone()),
                        error_kind: None,
                        latency_ms,
                        block_reason: None,
                    });
                    return Ok(ChainOutcome {
                        narrative_text: text,
                        backend_id: backend.id().to_string(),
                        position,
                        attempts,
                    });
                }
                Err(err) => {
                    tracing::warn!(backend = backend.id(), error = %err, latency_ms, "backend failed, advancing chain");
                    attempts.push(GenerationAttempt {
                        backend_id: backend.id().to_string(),
                        succeeded: false,
                        narrative_text: None,
                        error_kind: Some(err.kind()),
                        latency_ms,
                        block_reason: None,
                    });
                }
            }
        }

        tracing::error!(attempts = attempts.len(), start, "backend chain exhausted");
        Err(ReadingError::ChainExhausted {
            attempts: attempts.len(),
        })
    }
}
