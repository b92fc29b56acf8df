//! Error types for the reading pipeline.
//!
//! Only [`ReadingError`] reaches callers. Everything else is recovered inside
//! the pipeline and logged.

use serde::{Deserialize, Serialize};
use tarot_rules::SpreadError;

/// Errors surfaced to the caller of a reading.
#[derive(Debug, thiserror::Error)]
pub enum ReadingError {
    #[error("invalid reading request: {0}")]
    InvalidRequest(#[from] SpreadError),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The chain ran out of backends. The final backend is local and cannot
    /// fail, so this indicates a broken backend order.
    #[error("backend chain exhausted after {attempts} attempts")]
    ChainExhausted { attempts: usize },
}

pub type ReadingResult<T> = Result<T, ReadingError>;

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid value for `{field}`: {reason}")]
    Invalid { field: String, reason: String },

    #[error("failed to compile card name pattern: {0}")]
    Pattern(#[from] regex::Error),
}

impl ConfigError {
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// A single generation backend failure. Advances the chain.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BackendError {
    #[error("backend timed out after {after_ms}ms")]
    Timeout { after_ms: u64 },

    #[error("backend returned malformed output: {reason}")]
    Malformed { reason: String },

    #[error("backend returned status {status}")]
    Status { status: u16 },

    #[error("backend returned empty text")]
    Empty,

    #[error("backend transport failure: {reason}")]
    Transport { reason: String },
}

/// Failure category recorded on a generation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BackendErrorKind {
    Timeout,
    Malformed,
    NonSuccessStatus,
    Empty,
    Transport,
}

impl BackendError {
    pub fn kind(&self) -> BackendErrorKind {
        match self {
            BackendError::Timeout { .. } => BackendErrorKind::Timeout,
            BackendError::Malformed { .. } => BackendErrorKind::Malformed,
            BackendError::Status { .. } => BackendErrorKind::NonSuccessStatus,
            BackendError::Empty => BackendErrorKind::Empty,
            BackendError::Transport { .. } => BackendErrorKind::Transport,
        }
    }
}

impl From<reqwest::Error> for BackendError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            BackendError::Timeout { after_ms: 0 }
        } else if let Some(status) = err.status() {
            BackendError::Status {
                status: status.as_u16(),
            }
        } else if err.is_decode() {
            BackendError::Malformed {
                reason: err.to_string(),
            }
        } else {
            BackendError::Transport {
                reason: err.to_string(),
            }
        }
    }
}

/// Remote corpus failure. Retrieval degrades to local passages.
#[derive(Debug, thiserror::Error)]
pub enum RetrievalError {
    #[error("reference corpus unavailable: {reason}")]
    Unavailable { reason: String },
}

/// Learned evaluator failure. A heuristic score is persisted instead.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EvaluatorError {
    #[error("evaluator timed out after {after_ms}ms")]
    Timeout { after_ms: u64 },

    #[error("evaluator unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("evaluator returned malformed scores: {reason}")]
    Malformed { reason: String },
}

impl From<reqwest::Error> for EvaluatorError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            EvaluatorError::Malformed {
                reason: err.to_string(),
            }
        } else {
            EvaluatorError::Unavailable {
                reason: err.to_string(),
            }
        }
    }
}

/// Metrics sink failure. Logged and dropped.
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    #[error("metrics store I/O failure: {0}")]
    Io(#[from] std::io::Error),

    #[error("metrics serialization failure: {0}")]
    Serialization(#[from] serde_json::Error),
}
