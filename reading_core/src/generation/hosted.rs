//! Hosted language-model backends.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use super::NarrativeBackend;
use crate::context_assembler::PromptPayload;
use crate::error::{BackendError, ConfigError};

fn build_client(id: &str) -> Result<Client, ConfigError> {
    Client::builder()
        .build()
        .map_err(|e| ConfigError::invalid(format!("generation.backends.{}", id), e.to_string()))
}

/// Read an API key from the named environment variable.
fn api_key_from_env(id: &str, var: Option<&str>) -> Option<String> {
    let var = var?;
    match std::env::var(var) {
        Ok(key) if !key.trim().is_empty() => Some(key),
        _ => {
            tracing::warn!(backend = id, env = var, "API key variable is not set; calling without auth");
            None
        }
    }
}

async fn post_json(request: reqwest::RequestBuilder, body: &Value) -> Result<Value, BackendError> {
    let response = request.json(body).send().await?;

    let status = response.status();
    if !status.is_success() {
        return Err(BackendError::Status {
            status: status.as_u16(),
        });
    }

    response.json::<Value>().await.map_err(|e| BackendError::Malformed {
        reason: e.to_string(),
    })
}

fn non_empty(text: Option<&str>, field: &str) -> Result<String, BackendError> {
    let text = text.ok_or_else(|| BackendError::Malformed {
        reason: format!("response has no `{}` string", field),
    })?;
    if text.trim().is_empty() {
        return Err(BackendError::Empty);
    }
    Ok(text.trim().to_string())
}

/// OpenAI-compatible `/chat/completions` backend.
#[derive(Debug, Clone)]
pub struct ChatCompletionsBackend {
    id: String,
    client: Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
    temperature: f32,
    max_tokens: Option<u32>,
}

impl ChatCompletionsBackend {
    pub fn new(
        id: impl Into<String>,
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key_env: Option<&str>,
    ) -> Result<Self, ConfigError> {
        let id = id.into();
        Ok(Self {
            client: build_client(&id)?,
            api_key: api_key_from_env(&id, api_key_env),
            id,
            base_url: base_url.into(),
            model: model.into(),
            temperature: 0.7,
            max_tokens: None,
        })
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: Option<u32>) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }
}

#[async_trait]
impl NarrativeBackend for ChatCompletionsBackend {
    fn id(&self) -> &str {
        &self.id
    }

    async fn generate(&self, payload: &PromptPayload) -> Result<String, BackendError> {
        let mut body = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": payload.system_instructions },
                { "role": "user", "content": payload.user_content },
            ],
            "temperature": self.temperature,
        });
        if let Some(max_tokens) = self.max_tokens {
            body["max_tokens"] = json!(max_tokens);
        }

        let mut request = self
            .client
            .post(format!("{}/chat/completions", self.base_url.trim_end_matches('/')));
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let json = post_json(request, &body).await?;
        non_empty(json["choices"][0]["message"]["content"].as_str(), "choices[0].message.content")
    }
}

/// Ollama `/api/generate` backend.
#[derive(Debug, Clone)]
pub struct OllamaBackend {
    id: String,
    client: Client,
    base_url: String,
    model: String,
}

impl OllamaBackend {
    pub fn new(id: impl Into<String>, base_url: impl Into<String>, model: impl Into<String>) -> Result<Self, ConfigError> {
        let id = id.into();
        Ok(Self {
            client: build_client(&id)?,
            id,
            base_url: base_url.into(),
            model: model.into(),
        })
    }
}

#[async_trait]
impl NarrativeBackend for OllamaBackend {
    fn id(&self) -> &str {
        &self.id
    }

    async fn generate(&self, payload: &PromptPayload) -> Result<String, BackendError> {
        let body = json!({
            "model": self.model,
            "system": payload.system_instructions,
            "prompt": payload.user_content,
            "stream": false,
        });

        let request = self
            .client
            .post(format!("{}/api/generate", self.base_url.trim_end_matches('/')));

        let json = post_json(request, &body).await?;
        non_empty(json["response"].as_str(), "response")
    }
}
