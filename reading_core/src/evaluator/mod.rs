//! Learned Quality Evaluator - scores accepted narratives off the user path.
//!
//! By default evaluation is scheduled as a detached task after the response
//! is built, and its only effect is a metrics upsert. When the synchronous
//! gate is enabled the score is awaited and may replace the narrative.

mod scorer;

pub use scorer::*;

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::config::GateFailureMode;
use crate::error::EvaluatorError;
use crate::metrics::MetricsSink;
use crate::quality::QualityVerdict;

/// Lowest and highest score on every axis.
pub const SCORE_MIN: u8 = 1;
pub const SCORE_MAX: u8 = 5;

/// A safety score at or below this blocks under the synchronous gate.
const SAFETY_BLOCK_AT: u8 = 1;

/// How a score was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EvalMode {
    ModelScored,
    HeuristicFallback,
}

/// Quality and safety scores for one narrative, each in 1..=5.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvalScore {
    pub personalization: u8,
    pub coherence: u8,
    pub tone: u8,
    pub safety: u8,
    pub overall: u8,
    pub safety_flag: bool,
    pub notes: Option<String>,
    pub mode: EvalMode,
}

impl EvalScore {
    /// Score derived from the structural verdict alone.
    pub fn heuristic(verdict: &QualityVerdict) -> Self {
        let coverage = verdict.card_coverage_ratio.clamp(0.0, 1.0);
        let mut coherence = 1 + (coverage * 4.0).round() as u8;
        if !verdict.spine_valid {
            coherence = coherence.saturating_sub(1);
        }
        let coherence = coherence.clamp(SCORE_MIN, SCORE_MAX);

        let hallucinated = verdict.hallucinated_count();
        let tone = if hallucinated == 0 { 4 } else { 3 };
        let safety = if hallucinated == 0 { 5 } else { 3 };
        let personalization = 3;
        let overall = ((personalization + coherence + tone + safety) as f32 / 4.0).round() as u8;

        Self {
            personalization,
            coherence,
            tone,
            safety,
            overall: overall.clamp(SCORE_MIN, SCORE_MAX),
            safety_flag: false,
            notes: Some(format!(
                "heuristic from structural verdict: coverage {:.2}, {} undrawn mentions, spine {}",
                coverage,
                hallucinated,
                if verdict.spine_valid { "valid" } else { "invalid" }
            )),
            mode: EvalMode::HeuristicFallback,
        }
    }

    /// Whether the synchronous gate must replace the narrative.
    pub fn blocks(&self) -> bool {
        self.safety_flag || self.safety <= SAFETY_BLOCK_AT
    }
}

/// What the synchronous gate decided.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GateDecision {
    pub blocked: bool,
    pub reason: Option<String>,
}

impl GateDecision {
    /// Decide from the evaluator outcome and the configured failure mode.
    pub fn decide(
        outcome: &Result<EvalScore, EvaluatorError>,
        failure_mode: GateFailureMode,
        structurally_accepted: bool,
    ) -> Self {
        match outcome {
            Ok(score) if score.blocks() => GateDecision {
                blocked: true,
                reason: Some(format!(
                    "evaluator flagged safety (score {}, flag {})",
                    score.safety, score.safety_flag
                )),
            },
            Ok(_) => GateDecision {
                blocked: false,
                reason: None,
            },
            Err(err) => match failure_mode {
                GateFailureMode::Open if structurally_accepted => GateDecision {
                    blocked: false,
                    reason: Some(format!("evaluator failed, released fail-open: {}", err)),
                },
                GateFailureMode::Open => GateDecision {
                    blocked: true,
                    reason: Some(format!("evaluator failed and structural checks did not pass: {}", err)),
                },
                GateFailureMode::Closed => GateDecision {
                    blocked: true,
                    reason: Some(format!("evaluator failed, substituted fail-closed: {}", err)),
                },
            },
        }
    }
}

/// Submits narratives to a scorer under a timeout.
#[derive(Clone)]
pub struct Evaluator {
    scorer: Option<Arc<dyn QualityScorer>>,
    timeout: Duration,
}

impl std::fmt::Debug for Evaluator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Evaluator")
            .field("has_scorer", &self.scorer.is_some())
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Evaluator {
    pub fn new(scorer: Option<Arc<dyn QualityScorer>>, timeout: Duration) -> Self {
        Self { scorer, timeout }
    }

    /// Score a narrative, failing on timeout or scorer error.
    pub async fn score(&self, narrative: &str, context: &SpreadContext) -> Result<EvalScore, EvaluatorError> {
        let Some(scorer) = &self.scorer else {
            return Err(EvaluatorError::Unavailable {
                reason: "no scoring endpoint configured".to_string(),
            });
        };

        match tokio::time::timeout(self.timeout, scorer.score(narrative, context)).await {
            Ok(result) => result,
            Err(_) => Err(EvaluatorError::Timeout {
                after_ms: self.timeout.as_millis() as u64,
            }),
        }
    }

    /// Score a narrative, falling back to the heuristic score on failure.
    pub async fn score_or_heuristic(
        &self,
        narrative: &str,
        context: &SpreadContext,
        verdict: &QualityVerdict,
    ) -> EvalScore {
        match self.score(narrative, context).await {
            Ok(score) => score,
            Err(err) => {
                tracing::warn!(error = %err, "evaluator unavailable, persisting heuristic score");
                EvalScore::heuristic(verdict)
            }
        }
    }

    /// Evaluate in a detached task and upsert the score into `sink`.
    ///
    /// The task is not tied to the caller: dropping the request does not
    /// cancel it.
    pub fn schedule_evaluation(
        &self,
        request_id: Uuid,
        narrative: String,
        context: SpreadContext,
        verdict: QualityVerdict,
        sink: Arc<dyn MetricsSink>,
    ) -> JoinHandle<()> {
        let evaluator = self.clone();
        tokio::spawn(async move {
            let score = evaluator.score_or_heuristic(&narrative, &context, &verdict).await;
            tracing::debug!(%request_id, mode = ?score.mode, overall = score.overall, "evaluation finished");
            if let Err(err) = sink.upsert_evaluation(request_id, score).await {
                tracing::warn!(%request_id, error = %err, "failed to persist evaluation");
            }
        })
    }
}
