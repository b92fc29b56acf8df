//! Reading pipeline configuration, loaded from TOML.
//!
//! Every section defaults independently, so an empty document is a valid
//! configuration that runs with the local composer only.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::context_assembler::StyleContract;
use crate::error::ConfigError;

pub mod defaults {
    pub const RELEVANCE_THRESHOLD: f32 = 0.30;
    pub const RETRIEVAL_TOKEN_BUDGET: usize = 600;
    pub const REMOTE_CORPUS_TIMEOUT_MS: u64 = 3_000;
    pub const ACTIVATION_DECAY: f32 = 0.5;
    pub const ACTIVATION_DEPTH: u32 = 2;
    pub const PROMPT_TOKEN_BUDGET: usize = 3_000;
    pub const COVERAGE_MIN_RATIO: f64 = 0.90;
    pub const SPINE_MIN_ELEMENTS: usize = 1;
    pub const MAX_INCOMPLETE_SECTIONS: usize = 1;
    pub const GENERATION_TIMEOUT_MS: u64 = 12_000;
    pub const EVALUATION_TIMEOUT_MS: u64 = 8_000;
    pub const LOCAL_BACKEND_ID: &str = "local";
    pub const OLLAMA_BASE_URL: &str = "http://localhost:11434";
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadingConfig {
    pub retrieval: RetrievalConfig,
    pub prompt: PromptConfig,
    pub quality: QualityConfig,
    pub generation: GenerationConfig,
    pub evaluation: EvaluationConfig,
    pub observability: ObservabilityConfig,
}

impl ReadingConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml(source: &str) -> Result<Self, ConfigError> {
        let config: ReadingConfig = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse, and validate a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml(&source)
    }

    /// Check ranges and the backend order.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_unit("retrieval.relevance_threshold", self.retrieval.relevance_threshold as f64)?;
        check_unit("quality.coverage_min_ratio", self.quality.coverage_min_ratio)?;
        check_unit("retrieval.activation_decay", self.retrieval.activation_decay as f64)?;
        check_positive("retrieval.token_budget", self.retrieval.token_budget as u64)?;
        check_positive("prompt.token_budget", self.prompt.token_budget as u64)?;
        check_positive("generation.timeout_ms", self.generation.timeout_ms)?;
        check_positive("evaluation.timeout_ms", self.evaluation.timeout_ms)?;

        if self.quality.spine_min_elements > 3 {
            return Err(ConfigError::invalid(
                "quality.spine_min_elements",
                "a section has at most 3 spine elements",
            ));
        }

        let order = &self.generation.backend_order;
        let Some(last) = order.last() else {
            return Err(ConfigError::invalid("generation.backend_order", "must not be empty"));
        };

        for id in order {
            if self.generation.backend_spec(id).is_none() {
                return Err(ConfigError::invalid(
                    "generation.backend_order",
                    format!("backend '{}' has no [generation.backends.{}] table", id, id),
                ));
            }
        }

        if !matches!(self.generation.backend_spec(last), Some(BackendSpec::Local)) {
            return Err(ConfigError::invalid(
                "generation.backend_order",
                format!("must end with a local backend, found '{}'", last),
            ));
        }

        if self.evaluation.gate_enabled && self.evaluation.endpoint.is_none() {
            tracing::warn!(
                "evaluation gate enabled without an endpoint; every gated reading uses the {:?} failure mode",
                self.evaluation.failure_mode
            );
        }

        Ok(())
    }
}

fn check_unit(field: &str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::invalid(field, format!("{} is outside [0, 1]", value)))
    }
}

fn check_positive(field: &str, value: u64) -> Result<(), ConfigError> {
    if value > 0 {
        Ok(())
    } else {
        Err(ConfigError::invalid(field, "must be greater than zero"))
    }
}

/// Reference retrieval settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Passages scoring below this are discarded.
    #[serde(alias = "relevanceThreshold")]
    pub relevance_threshold: f32,

    /// Token budget for all retained passages together.
    #[serde(alias = "retrievalTokenBudget")]
    pub token_budget: usize,

    /// Energy decay per hop when spreading activation through the corpus.
    pub activation_decay: f32,

    /// Maximum hops for spreading activation.
    pub activation_depth: u32,

    /// Optional remote corpus endpoint.
    pub remote_url: Option<String>,

    pub remote_timeout_ms: u64,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            relevance_threshold: defaults::RELEVANCE_THRESHOLD,
            token_budget: defaults::RETRIEVAL_TOKEN_BUDGET,
            activation_decay: defaults::ACTIVATION_DECAY,
            activation_depth: defaults::ACTIVATION_DEPTH,
            remote_url: None,
            remote_timeout_ms: defaults::REMOTE_CORPUS_TIMEOUT_MS,
        }
    }
}

/// Prompt assembly settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptConfig {
    /// Hard cap for the assembled prompt, in tokens.
    #[serde(alias = "promptTokenBudget")]
    pub token_budget: usize,

    pub include_imagery: bool,
    pub include_correspondences: bool,

    /// Narrator voice and deployment rules, under `[prompt.style]`.
    pub style: StyleContract,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            token_budget: defaults::PROMPT_TOKEN_BUDGET,
            include_imagery: true,
            include_correspondences: true,
            style: StyleContract::default(),
        }
    }
}

/// Structural gate settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityConfig {
    #[serde(alias = "coverageMinRatio")]
    pub coverage_min_ratio: f64,

    /// Fixed allowance; when unset it scales with spread size.
    #[serde(alias = "hallucinationAllowance")]
    pub hallucination_allowance: Option<usize>,

    /// Spine elements a section needs to count as complete.
    #[serde(alias = "spineMinElements")]
    pub spine_min_elements: usize,

    pub max_incomplete_sections: usize,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            coverage_min_ratio: defaults::COVERAGE_MIN_RATIO,
            hallucination_allowance: None,
            spine_min_elements: defaults::SPINE_MIN_ELEMENTS,
            max_incomplete_sections: defaults::MAX_INCOMPLETE_SECTIONS,
        }
    }
}

/// Backend chain settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Backend ids in priority order; must end with a local backend.
    #[serde(alias = "backendOrder")]
    pub backend_order: Vec<String>,

    /// Per-backend call timeout.
    pub timeout_ms: u64,

    pub backends: BTreeMap<String, BackendSpec>,
}

impl GenerationConfig {
    /// Spec for a backend id. `local` is always available.
    pub fn backend_spec(&self, id: &str) -> Option<&BackendSpec> {
        match self.backends.get(id) {
            Some(spec) => Some(spec),
            None if id == defaults::LOCAL_BACKEND_ID => Some(&LOCAL_SPEC),
            None => None,
        }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            backend_order: vec![defaults::LOCAL_BACKEND_ID.to_string()],
            timeout_ms: defaults::GENERATION_TIMEOUT_MS,
            backends: BTreeMap::new(),
        }
    }
}

static LOCAL_SPEC: BackendSpec = BackendSpec::Local;

/// How to reach one generation backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BackendSpec {
    /// OpenAI-compatible `/chat/completions` endpoint.
    ChatCompletions {
        base_url: String,
        model: String,
        /// Environment variable holding the API key.
        #[serde(default)]
        api_key_env: Option<String>,
        #[serde(default = "default_temperature")]
        temperature: f32,
        #[serde(default)]
        max_tokens: Option<u32>,
    },

    /// Ollama `/api/generate` endpoint.
    Ollama {
        #[serde(default = "default_ollama_url")]
        base_url: String,
        model: String,
    },

    /// Deterministic local composer.
    Local,
}

fn default_temperature() -> f32 {
    0.7
}

fn default_ollama_url() -> String {
    defaults::OLLAMA_BASE_URL.to_string()
}

/// What a synchronous evaluation gate does when the evaluator fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GateFailureMode {
    /// Release the narrative if it passed the structural gate.
    Open,
    /// Substitute the safe fallback narrative.
    #[default]
    Closed,
}

/// Learned evaluator settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationConfig {
    /// Await the evaluator before releasing the response.
    #[serde(alias = "evalGateEnabled")]
    pub gate_enabled: bool,

    #[serde(alias = "evalGateFailureMode")]
    pub failure_mode: GateFailureMode,

    pub timeout_ms: u64,

    /// Scoring service endpoint; without one every evaluation is heuristic.
    pub endpoint: Option<String>,

    pub api_key_env: Option<String>,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            gate_enabled: false,
            failure_mode: GateFailureMode::Closed,
            timeout_ms: defaults::EVALUATION_TIMEOUT_MS,
            endpoint: None,
            api_key_env: None,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub log_level: String,
    pub json: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config = ReadingConfig::from_toml("").unwrap();

        assert!((config.retrieval.relevance_threshold - 0.30).abs() < f32::EPSILON);
        assert_eq!(config.prompt.token_budget, 3_000);
        assert!((config.quality.coverage_min_ratio - 0.90).abs() < f64::EPSILON);
        assert!(config.quality.hallucination_allowance.is_none());
        assert_eq!(config.generation.backend_order, vec!["local"]);
        assert!(!config.evaluation.gate_enabled);
        assert_eq!(config.evaluation.failure_mode, GateFailureMode::Closed);
        assert_eq!(config.observability.log_level, "info");
    }

    #[test]
    fn test_prompt_style_from_toml() {
        let toml = r#"
[prompt.style]
voice = "Plain and brief."
extra_rules = ["Keep each section under 120 words."]
"#;
        let config = ReadingConfig::from_toml(toml).unwrap();

        assert_eq!(config.prompt.style.voice, "Plain and brief.");
        assert_eq!(config.prompt.style.extra_rules, vec!["Keep each section under 120 words."]);
        assert!(config.prompt.include_imagery);
    }

    #[test]
    fn test_full_backend_chain() {
        let toml = r#"
[generation]
backend_order = ["primary", "secondary", "local"]
timeout_ms = 9000

[generation.backends.primary]
kind = "chat_completions"
base_url = "https://llm.example.com/v1"
model = "narrator-large"
api_key_env = "NARRATOR_API_KEY"

[generation.backends.secondary]
kind = "ollama"
model = "llama3"
"#;
        let config = ReadingConfig::from_toml(toml).unwrap();

        assert_eq!(config.generation.backend_order.len(), 3);
        assert_eq!(config.generation.timeout_ms, 9000);
        assert!(matches!(
            config.generation.backend_spec("primary"),
            Some(BackendSpec::ChatCompletions { temperature, .. }) if (*temperature - 0.7).abs() < f32::EPSILON
        ));
        assert!(matches!(
            config.generation.backend_spec("secondary"),
            Some(BackendSpec::Ollama { base_url, .. }) if base_url == "http://localhost:11434"
        ));
        assert_eq!(config.generation.backend_spec("local"), Some(&BackendSpec::Local));
    }

    #[test]
    fn test_camel_case_aliases() {
        let toml = r#"
[retrieval]
relevanceThreshold = 0.5

[prompt]
promptTokenBudget = 1200

[quality]
coverageMinRatio = 0.75
hallucinationAllowance = 2

[evaluation]
evalGateEnabled = true
evalGateFailureMode = "open"
endpoint = "http://scorer.internal/score"
"#;
        let config = ReadingConfig::from_toml(toml).unwrap();

        assert!((config.retrieval.relevance_threshold - 0.5).abs() < f32::EPSILON);
        assert_eq!(config.prompt.token_budget, 1200);
        assert!((config.quality.coverage_min_ratio - 0.75).abs() < f64::EPSILON);
        assert_eq!(config.quality.hallucination_allowance, Some(2));
        assert!(config.evaluation.gate_enabled);
        assert_eq!(config.evaluation.failure_mode, GateFailureMode::Open);
    }

    #[test]
    fn test_order_must_end_with_local() {
        let toml = r#"
[generation]
backend_order = ["local", "primary"]

[generation.backends.primary]
kind = "ollama"
model = "llama3"
"#;
        let err = ReadingConfig::from_toml(toml).unwrap_err();
        assert!(err.to_string().contains("must end with a local backend"));
    }

    #[test]
    fn test_unknown_backend_rejected() {
        let toml = r#"
[generation]
backend_order = ["missing", "local"]
"#;
        let err = ReadingConfig::from_toml(toml).unwrap_err();
        assert!(err.to_string().contains("missing"));
    }

    #[test]
    fn test_empty_order_rejected() {
        let toml = r#"
[generation]
backend_order = []
"#;
        assert!(ReadingConfig::from_toml(toml).is_err());
    }

    #[test]
    fn test_threshold_range_checked() {
        let toml = r#"
[retrieval]
relevance_threshold = 1.5
"#;
        let err = ReadingConfig::from_toml(toml).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref field, .. } if field == "retrieval.relevance_threshold"));
    }

    #[test]
    fn test_parse_error_surfaces() {
        let err = ReadingConfig::from_toml("[generation\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
