//! Optional remote source of reference passages.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

use crate::error::RetrievalError;
use crate::knowledge_base::{Passage, Tag};

/// A corpus reached over the network.
#[async_trait]
pub trait RemoteCorpus: Send + Sync {
    /// Fetch candidate passages for the active tags and the querent's question.
    async fn fetch(&self, tags: &[Tag], query: &str) -> Result<Vec<Passage>, RetrievalError>;
}

/// JSON-over-HTTP corpus.
///
/// Posts `{"tags": [...], "query": "..."}` and expects
/// `{"passages": [{"text", "sourceTag", "tags", "importance"}]}`.
pub struct HttpRemoteCorpus {
    client: Client,
    url: String,
}

#[derive(Deserialize)]
struct RemoteResponse {
    passages: Vec<Passage>,
}

impl HttpRemoteCorpus {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, RetrievalError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RetrievalError::Unavailable { reason: e.to_string() })?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl RemoteCorpus for HttpRemoteCorpus {
    async fn fetch(&self, tags: &[Tag], query: &str) -> Result<Vec<Passage>, RetrievalError> {
        let body = json!({
            "tags": tags.iter().map(|t| t.as_string()).collect::<Vec<_>>(),
            "query": query,
        });

        let unavailable = |e: reqwest::Error| RetrievalError::Unavailable { reason: e.to_string() };

        let response = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(unavailable)?
            .error_for_status()
            .map_err(unavailable)?;

        let parsed: RemoteResponse = response.json().await.map_err(unavailable)?;
        Ok(parsed.passages)
    }
}
