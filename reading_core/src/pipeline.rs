//! The reading pipeline: analyze, retrieve, assemble, generate, gate.
//!
//! Stages run in order for each request. Backend failures and structural
//! blocks are recovered here; only validation, configuration, and chain
//! exhaustion errors reach the caller.

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::Instrument;

use tarot_rules::{CardLexicon, DrawnCard};

use crate::analysis::analyze;
use crate::config::ReadingConfig;
use crate::context_assembler::{PromptAssembler, PromptInputs, PromptPayload};
use crate::error::{ReadingError, ReadingResult};
use crate::evaluator::{EvalScore, Evaluator, GateDecision, HttpQualityScorer, QualityScorer, SpreadContext};
use crate::generation::{BackendChain, GenerationAttempt};
use crate::knowledge_base::{builtin_corpus, KnowledgeGraph};
use crate::metrics::{InMemoryMetrics, MetricsSink, ReadingMetrics};
use crate::quality::{safe_fallback_narrative, QualityVerdict, StructuralGate};
use crate::request::{ReadingRequest, ReadingResponse, ValidatedReading, VerdictSummary};
use crate::retrieval::{HttpRemoteCorpus, RemoteCorpus, Retriever};

/// Backend id reported when the safe fallback narrative is used.
pub const FALLBACK_BACKEND_ID: &str = "safe_fallback";

/// Narrative chosen for the response, before evaluation.
struct Narrative {
    text: String,
    backend_id: String,
    verdict: QualityVerdict,
    used_fallback: bool,
    attempts: Vec<GenerationAttempt>,
}

/// Runs readings. Share it across tasks behind an `Arc`.
pub struct ReadingPipeline {
    config: ReadingConfig,
    corpus: Arc<KnowledgeGraph>,
    remote: Option<Arc<dyn RemoteCorpus>>,
    chain: BackendChain,
    evaluator: Evaluator,
    metrics: Arc<dyn MetricsSink>,
}

impl ReadingPipeline {
    /// Build a pipeline from configuration, with an in-memory metrics store.
    pub fn from_config(config: ReadingConfig) -> ReadingResult<Self> {
        config.validate()?;
        let chain = BackendChain::from_config(&config.generation)?;

        let remote: Option<Arc<dyn RemoteCorpus>> = match &config.retrieval.remote_url {
            Some(url) => {
                match HttpRemoteCorpus::new(url.clone(), Duration::from_millis(config.retrieval.remote_timeout_ms)) {
                    Ok(corpus) => Some(Arc::new(corpus)),
                    Err(err) => {
                        tracing::warn!(error = %err, "remote corpus disabled");
                        None
                    }
                }
            }
            None => None,
        };

        let scorer: Option<Arc<dyn QualityScorer>> = match &config.evaluation.endpoint {
            Some(endpoint) => match HttpQualityScorer::new(endpoint.clone(), config.evaluation.api_key_env.as_deref()) {
                Ok(scorer) => Some(Arc::new(scorer)),
                Err(err) => {
                    tracing::warn!(error = %err, "scoring service disabled, evaluations will be heuristic");
                    None
                }
            },
            None => None,
        };
        let evaluator = Evaluator::new(scorer, Duration::from_millis(config.evaluation.timeout_ms));

        let mut pipeline = Self::new(config, chain, evaluator, Arc::new(InMemoryMetrics::new()));
        pipeline.remote = remote;
        Ok(pipeline)
    }

    pub fn new(config: ReadingConfig, chain: BackendChain, evaluator: Evaluator, metrics: Arc<dyn MetricsSink>) -> Self {
        tracing::info!(
            backends = ?chain.backend_ids(),
            gate_enabled = config.evaluation.gate_enabled,
            failure_mode = ?config.evaluation.failure_mode,
            "reading pipeline ready"
        );

        Self {
            config,
            corpus: builtin_corpus(),
            remote: None,
            chain,
            evaluator,
            metrics,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<dyn MetricsSink>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn with_remote_corpus(mut self, remote: Arc<dyn RemoteCorpus>) -> Self {
        self.remote = Some(remote);
        self
    }

    pub fn config(&self) -> &ReadingConfig {
        &self.config
    }

    pub fn metrics(&self) -> Arc<dyn MetricsSink> {
        Arc::clone(&self.metrics)
    }

    /// Run one reading. A scheduled evaluation keeps running after return.
    pub async fn run(&self, request: &ReadingRequest) -> ReadingResult<ReadingResponse> {
        self.run_with_handle(request).await.map(|(response, _)| response)
    }

    /// Run one reading, returning the handle of the detached evaluation
    /// task when one was scheduled.
    pub async fn run_with_handle(
        &self,
        request: &ReadingRequest,
    ) -> ReadingResult<(ReadingResponse, Option<JoinHandle<()>>)> {
        let reading = request.validate()?;
        let span = tracing::info_span!(
            "reading.pipeline",
            request_id = %reading.request_id,
            spread = %reading.spread.name,
            cards = reading.cards.len()
        );
        self.execute(reading).instrument(span).await
    }

    async fn execute(&self, reading: ValidatedReading) -> ReadingResult<(ReadingResponse, Option<JoinHandle<()>>)> {
        let lexicon = CardLexicon::for_style(reading.deck_style);
        let gate = StructuralGate::for_lexicon(&lexicon, self.config.quality.clone())?
            .with_spread_name(reading.spread.name.clone());

        let analysis = analyze(&reading.cards, &lexicon);

        let query = [reading.question.as_deref(), reading.reflections.as_deref()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" ");
        let mut retriever = Retriever::new(Arc::clone(&self.corpus), &self.config.retrieval);
        if let Some(remote) = &self.remote {
            retriever = retriever.with_remote(Arc::clone(remote));
        }
        let passages = retriever
            .retrieve_with_remote(&analysis, &reading.cards, &lexicon, &query)
            .instrument(tracing::info_span!("reading.retrieval"))
            .await;

        let assembler = PromptAssembler::new(self.config.prompt.style.clone(), &self.config.prompt);
        let payload = assembler.assemble(&PromptInputs {
            spread: &reading.spread,
            cards: &reading.cards,
            analysis: &analysis,
            passages: &passages,
            question: reading.question.as_deref(),
            reflections: reading.reflections.as_deref(),
            lexicon: &lexicon,
        });
        tracing::debug!(
            tokens = payload.token_count,
            passages = payload.included_passage_count,
            truncated = payload.truncated,
            "prompt assembled"
        );

        let mut narrative = self
            .generate_gated(&payload, &gate, &reading.cards, &lexicon)
            .instrument(tracing::info_span!("reading.generation"))
            .await?;

        let context = SpreadContext {
            spread_name: reading.spread.name.clone(),
            cards: reading.cards.iter().map(|c| c.name.clone()).collect(),
            question: reading.question.clone(),
            backend_used: narrative.backend_id.clone(),
        };

        let mut gate_decision = None;
        let mut gated_score = None;
        if self.config.evaluation.gate_enabled {
            let outcome = self
                .evaluator
                .score(&narrative.text, &context)
                .instrument(tracing::info_span!("reading.evaluation", mode = "gate"))
                .await;
            let decision = GateDecision::decide(&outcome, self.config.evaluation.failure_mode, narrative.verdict.accepted);

            gated_score = Some(match outcome {
                Ok(score) => score,
                Err(err) => {
                    tracing::warn!(error = %err, "evaluator failed under the synchronous gate");
                    EvalScore::heuristic(&narrative.verdict)
                }
            });

            if decision.blocked && !narrative.used_fallback {
                tracing::info!(reason = ?decision.reason, "evaluation gate substituted the safe fallback");
                narrative.text = safe_fallback_narrative(&reading.cards, &lexicon);
                narrative.verdict = gate.evaluate(&narrative.text, &reading.cards);
                narrative.backend_id = FALLBACK_BACKEND_ID.to_string();
                narrative.used_fallback = true;
            }
            gate_decision = Some(decision);
        }

        let metrics = ReadingMetrics {
            backend_used: narrative.backend_id.clone(),
            attempts: narrative.attempts,
            verdict: narrative.verdict.clone(),
            truncated: payload.truncated,
            used_fallback: narrative.used_fallback,
            gate_decision: gate_decision.clone(),
        };
        if let Err(err) = self.metrics.upsert_reading(reading.request_id, metrics).await {
            tracing::warn!(error = %err, "failed to record reading metrics");
        }

        let handle = match gated_score {
            Some(score) => {
                if let Err(err) = self.metrics.upsert_evaluation(reading.request_id, score).await {
                    tracing::warn!(error = %err, "failed to record evaluation");
                }
                None
            }
            None => Some(self.evaluator.schedule_evaluation(
                reading.request_id,
                narrative.text.clone(),
                SpreadContext {
                    backend_used: narrative.backend_id.clone(),
                    ..context
                },
                narrative.verdict.clone(),
                Arc::clone(&self.metrics),
            )),
        };

        let response = ReadingResponse {
            request_id: reading.request_id,
            narrative_text: narrative.text,
            backend_used: narrative.backend_id,
            quality_verdict: VerdictSummary::from(&narrative.verdict),
            truncated: payload.truncated,
            gate_decision,
        };

        Ok((response, handle))
    }

    /// Generate until a narrative passes the structural gate, falling back
    /// to the template narrative when the chain runs out.
    async fn generate_gated(
        &self,
        payload: &PromptPayload,
        gate: &StructuralGate,
        cards: &[DrawnCard],
        lexicon: &CardLexicon,
    ) -> ReadingResult<Narrative> {
        let mut attempts = Vec::new();
        let mut start = 0;

        loop {
            let outcome = match self.chain.generate_from(payload, start).await {
                Ok(outcome) => outcome,
                Err(ReadingError::ChainExhausted { attempts: tried }) => {
                    return Err(ReadingError::ChainExhausted {
                        attempts: attempts.len() + tried,
                    })
                }
                Err(err) => return Err(err),
            };
            attempts.extend(outcome.attempts);

            let verdict = gate.evaluate(&outcome.narrative_text, cards);
            if verdict.accepted {
                return Ok(Narrative {
                    text: outcome.narrative_text,
                    backend_id: outcome.backend_id,
                    verdict,
                    used_fallback: false,
                    attempts,
                });
            }

            tracing::info!(
                backend = %outcome.backend_id,
                reason = verdict.block_reason.as_deref().unwrap_or_default(),
                "structural gate blocked narrative"
            );
            if let Some(last) = attempts.last_mut() {
                last.block_reason = verdict.block_reason.clone();
            }

            if outcome.position + 1 < self.chain.len() {
                start = outcome.position + 1;
                continue;
            }

            let text = safe_fallback_narrative(cards, lexicon);
            let verdict = gate.evaluate(&text, cards);
            if !verdict.accepted {
                tracing::warn!(
                    reason = verdict.block_reason.as_deref().unwrap_or_default(),
                    "safe fallback released without passing the structural gate"
                );
            }
            return Ok(Narrative {
                text,
                backend_id: FALLBACK_BACKEND_ID.to_string(),
                verdict,
                used_fallback: true,
                attempts,
            });
        }
    }
}
