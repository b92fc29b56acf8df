//! Per-request metrics records and the sinks that store them.
//!
//! Every write is an idempotent upsert keyed by request id: the reading
//! summary and the evaluation score arrive separately and may be delivered
//! more than once.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::error::MetricsError;
use crate::evaluator::{EvalScore, GateDecision};
use crate::generation::GenerationAttempt;
use crate::quality::QualityVerdict;

/// What the pipeline knows once the response is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadingMetrics {
    pub backend_used: String,
    pub attempts: Vec<GenerationAttempt>,
    pub verdict: QualityVerdict,
    pub truncated: bool,
    pub used_fallback: bool,
    pub gate_decision: Option<GateDecision>,
}

/// Stored record for one request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsRecord {
    pub request_id: Uuid,
    pub updated_at: DateTime<Utc>,
    pub reading: Option<ReadingMetrics>,
    pub evaluation: Option<EvalScore>,
}

impl MetricsRecord {
    fn empty(request_id: Uuid) -> Self {
        Self {
            request_id,
            updated_at: Utc::now(),
            reading: None,
            evaluation: None,
        }
    }
}

/// Write-only destination for metrics.
#[async_trait]
pub trait MetricsSink: Send + Sync {
    async fn upsert_reading(&self, request_id: Uuid, reading: ReadingMetrics) -> Result<(), MetricsError>;

    async fn upsert_evaluation(&self, request_id: Uuid, score: EvalScore) -> Result<(), MetricsError>;
}

fn apply_reading(records: &mut BTreeMap<Uuid, MetricsRecord>, request_id: Uuid, reading: ReadingMetrics) {
    let record = records
        .entry(request_id)
        .or_insert_with(|| MetricsRecord::empty(request_id));
    record.reading = Some(reading);
    record.updated_at = Utc::now();
}

fn apply_evaluation(records: &mut BTreeMap<Uuid, MetricsRecord>, request_id: Uuid, score: EvalScore) {
    let record = records
        .entry(request_id)
        .or_insert_with(|| MetricsRecord::empty(request_id));
    record.evaluation = Some(score);
    record.updated_at = Utc::now();
}

/// Process-local store.
#[derive(Debug, Default)]
pub struct InMemoryMetrics {
    records: RwLock<BTreeMap<Uuid, MetricsRecord>>,
}

impl InMemoryMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, request_id: Uuid) -> Option<MetricsRecord> {
        self.records.read().await.get(&request_id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl MetricsSink for InMemoryMetrics {
    async fn upsert_reading(&self, request_id: Uuid, reading: ReadingMetrics) -> Result<(), MetricsError> {
        apply_reading(&mut *self.records.write().await, request_id, reading);
        Ok(())
    }

    async fn upsert_evaluation(&self, request_id: Uuid, score: EvalScore) -> Result<(), MetricsError> {
        apply_evaluation(&mut *self.records.write().await, request_id, score);
        Ok(())
    }
}

/// Store kept as one JSON document on disk, rewritten on every upsert.
#[derive(Debug)]
pub struct JsonFileMetrics {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonFileMetrics {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Every stored record, keyed by request id.
    pub async fn load(&self) -> Result<BTreeMap<Uuid, MetricsRecord>, MetricsError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(text) if text.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(text) => Ok(serde_json::from_str(&text)?),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(err) => Err(err.into()),
        }
    }

    async fn update(&self, apply: impl FnOnce(&mut BTreeMap<Uuid, MetricsRecord>)) -> Result<(), MetricsError> {
        let _guard = self.lock.lock().await;

        let mut records = self.load().await?;
        apply(&mut records);

        let text = serde_json::to_string_pretty(&records)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, text).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl MetricsSink for JsonFileMetrics {
    async fn upsert_reading(&self, request_id: Uuid, reading: ReadingMetrics) -> Result<(), MetricsError> {
        self.update(|records| apply_reading(records, request_id, reading)).await
    }

    async fn upsert_evaluation(&self, request_id: Uuid, score: EvalScore) -> Result<(), MetricsError> {
        self.update(|records| apply_evaluation(records, request_id, score)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::EvalMode;

    fn reading(backend: &str) -> ReadingMetrics {
        ReadingMetrics {
            backend_used: backend.to_string(),
            attempts: Vec::new(),
            verdict: QualityVerdict {
                card_coverage_ratio: 1.0,
                missing_cards: Vec::new(),
                hallucinated_card_names: Vec::new(),
                spine_valid: true,
                incomplete_sections: 0,
                accepted: true,
                block_reason: None,
            },
            truncated: false,
            used_fallback: false,
            gate_decision: None,
        }
    }

    fn score() -> EvalScore {
        EvalScore {
            personalization: 4,
            coherence: 5,
            tone: 4,
            safety: 5,
            overall: 4,
            safety_flag: false,
            notes: None,
            mode: EvalMode::ModelScored,
        }
    }

    #[tokio::test]
    async fn test_in_memory_upserts_are_idempotent() {
        let store = InMemoryMetrics::new();
        let id = Uuid::new_v4();

        store.upsert_reading(id, reading("local")).await.unwrap();
        store.upsert_reading(id, reading("local")).await.unwrap();
        store.upsert_evaluation(id, score()).await.unwrap();
        store.upsert_evaluation(id, score()).await.unwrap();

        assert_eq!(store.len().await, 1);
        let record = store.get(id).await.unwrap();
        assert_eq!(record.reading.unwrap().backend_used, "local");
        assert_eq!(record.evaluation, Some(score()));
    }

    #[tokio::test]
    async fn test_evaluation_before_reading_is_kept() {
        let store = InMemoryMetrics::new();
        let id = Uuid::new_v4();

        store.upsert_evaluation(id, score()).await.unwrap();
        store.upsert_reading(id, reading("primary")).await.unwrap();

        let record = store.get(id).await.unwrap();
        assert!(record.evaluation.is_some());
        assert_eq!(record.reading.unwrap().backend_used, "primary");
    }

    #[tokio::test]
    async fn test_json_file_store_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileMetrics::new(dir.path().join("metrics.json"));
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();

        assert!(store.load().await.unwrap().is_empty());

        store.upsert_reading(first, reading("local")).await.unwrap();
        store.upsert_reading(second, reading("primary")).await.unwrap();
        store.upsert_evaluation(first, score()).await.unwrap();
        store.upsert_reading(first, reading("local")).await.unwrap();

        let records = store.load().await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[&first].evaluation, Some(score()));
        assert_eq!(records[&second].reading.as_ref().unwrap().backend_used, "primary");
    }
}
