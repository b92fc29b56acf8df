//! Scoring service client.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{EvalMode, EvalScore, SCORE_MAX, SCORE_MIN};
use crate::error::EvaluatorError;

/// Reading context sent alongside the narrative.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpreadContext {
    pub spread_name: String,
    pub cards: Vec<String>,
    pub question: Option<String>,
    pub backend_used: String,
}

/// Anything that can score a narrative.
#[async_trait]
pub trait QualityScorer: Send + Sync {
    async fn score(&self, narrative: &str, context: &SpreadContext) -> Result<EvalScore, EvaluatorError>;
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ScoreResponse {
    personalization: u8,
    coherence: u8,
    tone: u8,
    safety: u8,
    overall: u8,
    #[serde(default)]
    safety_flag: bool,
    #[serde(default)]
    notes: Option<String>,
}

impl ScoreResponse {
    fn into_score(self) -> Result<EvalScore, EvaluatorError> {
        let axes = [
            ("personalization", self.personalization),
            ("coherence", self.coherence),
            ("tone", self.tone),
            ("safety", self.safety),
            ("overall", self.overall),
        ];
        if let Some((axis, value)) = axes.iter().find(|(_, v)| !(SCORE_MIN..=SCORE_MAX).contains(v)) {
            return Err(EvaluatorError::Malformed {
                reason: format!("{} score {} is outside 1-5", axis, value),
            });
        }

        Ok(EvalScore {
            personalization: self.personalization,
            coherence: self.coherence,
            tone: self.tone,
            safety: self.safety,
            overall: self.overall,
            safety_flag: self.safety_flag,
            notes: self.notes,
            mode: EvalMode::ModelScored,
        })
    }
}

/// JSON-over-HTTP scoring service.
///
/// Posts `{"narrative", "context"}` and expects the five scores plus
/// `safetyFlag` and optional `notes`.
#[derive(Debug, Clone)]
pub struct HttpQualityScorer {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
}

impl HttpQualityScorer {
    pub fn new(endpoint: impl Into<String>, api_key_env: Option<&str>) -> Result<Self, EvaluatorError> {
        let client = Client::builder().build()?;
        let api_key = api_key_env.and_then(|var| std::env::var(var).ok()).filter(|k| !k.trim().is_empty());

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            api_key,
        })
    }
}

#[async_trait]
impl QualityScorer for HttpQualityScorer {
    async fn score(&self, narrative: &str, context: &SpreadContext) -> Result<EvalScore, EvaluatorError> {
        let body = json!({
            "narrative": narrative,
            "context": context,
        });

        let mut request = self.client.post(&self.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(EvaluatorError::Unavailable {
                reason: format!("scorer returned status {}", status.as_u16()),
            });
        }

        let parsed: ScoreResponse = response.json().await.map_err(|e| EvaluatorError::Malformed {
            reason: e.to_string(),
        })?;
        parsed.into_score()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_out_of_range_rejected() {
        let response: ScoreResponse = serde_json::from_str(
            r#"{"personalization": 4, "coherence": 9, "tone": 3, "safety": 5, "overall": 4}"#,
        )
        .unwrap();

        let err = response.into_score().unwrap_err();
        assert!(matches!(err, EvaluatorError::Malformed { reason } if reason.contains("coherence")));
    }

    #[test]
    fn test_defaults_for_optional_fields() {
        let response: ScoreResponse = serde_json::from_str(
            r#"{"personalization": 4, "coherence": 5, "tone": 3, "safety": 5, "overall": 4}"#,
        )
        .unwrap();

        let score = response.into_score().unwrap();
        assert!(!score.safety_flag);
        assert_eq!(score.mode, EvalMode::ModelScored);
    }
}
