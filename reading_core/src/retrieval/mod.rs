//! Reference Retriever - selects supporting passages using spreading activation.
//!
//! 1. **Trigger**: Tags derived from the drawn cards and the spread analysis
//! 2. **Spreading**: Energy spreads through tag associations in the corpus
//! 3. **Scoring**: Each eligible passage is scored from its tag energies,
//!    importance, and word overlap with the querent's question
//! 4. **Filtering**: Passages under the relevance threshold are dropped
//! 5. **Selection**: Highest scores first, until the token budget is spent
//!
//! A passage tagged with a card is only eligible when that card was drawn.
//! Remote passages are also screened by text, so reference material never
//! introduces undrawn cards into the prompt.

mod activation;
mod remote;

pub use activation::*;
pub use remote::*;

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use std::time::Duration;

use tarot_rules::{CardId, CardLexicon, DrawnCard};

use crate::analysis::{RelationshipKind, ReversalFramework, SpreadAnalysis};
use crate::config::RetrievalConfig;
use crate::knowledge_base::{
    missing_element_theme, KnowledgeGraph, Passage, Tag, THEME_COURTS, THEME_MAJORS,
};
use crate::quality::{CardMentionScanner, DrawnSet};
use crate::tokens::TokenCounter;

/// Share of relevance from tag activation when a question is present.
const ACTIVATION_SHARE: f32 = 0.75;

/// Words shorter than this are ignored in question overlap.
const MIN_QUERY_WORD: usize = 4;

const STOP_WORDS: &[&str] = &[
    "about", "after", "also", "been", "being", "could", "does", "from", "have", "into", "just",
    "more", "should", "some", "than", "that", "their", "them", "then", "there", "they", "this",
    "what", "when", "where", "which", "will", "with", "would", "your",
];

/// A passage chosen for the prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrievedPassage {
    pub text: String,
    pub source_tag: String,
    /// Relevance in [0, 1].
    pub relevance_score: f32,
}

/// Scores and selects reference passages.
#[derive(Clone)]
pub struct Retriever {
    graph: Arc<KnowledgeGraph>,
    relevance_threshold: f32,
    token_budget: usize,
    decay_rate: f32,
    max_depth: u32,
    remote: Option<Arc<dyn RemoteCorpus>>,
    remote_timeout: Duration,
    counter: TokenCounter,
}

impl Retriever {
    pub fn new(graph: Arc<KnowledgeGraph>, config: &RetrievalConfig) -> Self {
        Self {
            graph,
            relevance_threshold: config.relevance_threshold,
            token_budget: config.token_budget,
            decay_rate: config.activation_decay,
            max_depth: config.activation_depth,
            remote: None,
            remote_timeout: Duration::from_millis(config.remote_timeout_ms),
            counter: TokenCounter::new(),
        }
    }

    pub fn with_remote(mut self, remote: Arc<dyn RemoteCorpus>) -> Self {
        self.remote = Some(remote);
        self
    }

    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.relevance_threshold = threshold;
        self
    }

    pub fn with_token_budget(mut self, budget: usize) -> Self {
        self.token_budget = budget;
        self
    }

    pub fn with_token_counter(mut self, counter: TokenCounter) -> Self {
        self.counter = counter;
        self
    }

    pub fn relevance_threshold(&self) -> f32 {
        self.relevance_threshold
    }

    /// Tags to activate for a reading, with their initial energy.
    pub fn trigger_tags(
        &self,
        analysis: &SpreadAnalysis,
        cards: &[DrawnCard],
        lexicon: &CardLexicon,
    ) -> Vec<(Tag, f32)> {
        let mut triggers = Vec::new();

        for drawn in cards {
            if let Some(card) = drawn.card(lexicon) {
                triggers.push((Tag::card(card.id), 1.0));
            }
            if let Some(suit) = drawn.suit(lexicon) {
                triggers.push((Tag::suit(suit), 0.3));
            }
        }

        let theme = &analysis.theme;
        if let Some(element) = theme.dominant_element {
            triggers.push((Tag::element(element), 1.0));
        }
        for element in &theme.missing_elements {
            triggers.push((Tag::theme(missing_element_theme(*element)), 0.8));
        }
        if theme.reversal_framework != ReversalFramework::None {
            triggers.push((Tag::framework(theme.reversal_framework.name()), 1.0));
        }
        if theme.card_count >= 3 && theme.major_ratio >= 0.5 {
            triggers.push((Tag::theme(THEME_MAJORS), 0.8));
        }
        if theme.court_count >= 2 {
            triggers.push((Tag::theme(THEME_COURTS), 0.8));
        }

        for rel in &analysis.relationships {
            if rel.relationship != RelationshipKind::Neutral {
                triggers.push((Tag::relationship(rel.relationship.name()), 0.6));
            }
        }

        for pattern in &analysis.patterns {
            triggers.push((Tag::pattern(pattern.name.clone()), pattern.weight));
        }

        triggers
    }

    /// Seed the trigger tags and spread them through the corpus graph.
    pub fn spread_activation(&self, trigger_tags: Vec<(Tag, f32)>) -> TagActivation {
        TagActivation::seeded(trigger_tags).spread(&self.graph, self.decay_rate, self.max_depth)
    }

    /// Retrieve from the local corpus only.
    pub fn retrieve(
        &self,
        analysis: &SpreadAnalysis,
        cards: &[DrawnCard],
        lexicon: &CardLexicon,
        query: &str,
    ) -> Vec<RetrievedPassage> {
        let activation = self.spread_activation(self.trigger_tags(analysis, cards, lexicon));
        let drawn = drawn_ids(cards, lexicon);
        let scored = self.score(self.graph.all_passages(), &activation, &drawn, query);
        self.select(scored)
    }

    /// Retrieve from the local corpus plus the remote corpus, if one is set.
    ///
    /// A failing remote corpus is logged and ignored.
    pub async fn retrieve_with_remote(
        &self,
        analysis: &SpreadAnalysis,
        cards: &[DrawnCard],
        lexicon: &CardLexicon,
        query: &str,
    ) -> Vec<RetrievedPassage> {
        let Some(remote) = &self.remote else {
            return self.retrieve(analysis, cards, lexicon, query);
        };

        let activation = self.spread_activation(self.trigger_tags(analysis, cards, lexicon));
        let hot: Vec<Tag> = activation
            .hot_tags(self.relevance_threshold)
            .into_iter()
            .map(|(tag, _)| tag.clone())
            .collect();

        let remote_passages = match tokio::time::timeout(self.remote_timeout, remote.fetch(&hot, query)).await {
            Ok(Ok(passages)) => passages,
            Ok(Err(err)) => {
                tracing::warn!(error = %err, "remote corpus failed, using local passages only");
                Vec::new()
            }
            Err(_) => {
                tracing::warn!(
                    timeout_ms = self.remote_timeout.as_millis() as u64,
                    "remote corpus timed out, using local passages only"
                );
                Vec::new()
            }
        };

        let remote_passages = screen_remote(remote_passages, cards, lexicon);
        let drawn = drawn_ids(cards, lexicon);
        let scored = self.score(
            self.graph.all_passages().chain(remote_passages.iter()),
            &activation,
            &drawn,
            query,
        );
        self.select(scored)
    }

    fn score<'a>(
        &self,
        passages: impl Iterator<Item = &'a Passage>,
        activation: &TagActivation,
        drawn: &HashSet<CardId>,
        query: &str,
    ) -> Vec<RetrievedPassage> {
        let query_words = content_words(query);

        passages
            .filter(|p| p.card_tags().all(|id| drawn.contains(&id)))
            .map(|p| {
                let tag_score = activation.combined(&p.tags) * (0.5 + 0.5 * p.importance);
                let score = if query_words.is_empty() {
                    tag_score
                } else {
                    let overlap = lexical_overlap(&query_words, &p.text);
                    ACTIVATION_SHARE * tag_score + (1.0 - ACTIVATION_SHARE) * overlap
                };
                RetrievedPassage {
                    text: p.text.clone(),
                    source_tag: p.source_tag.clone(),
                    relevance_score: score.clamp(0.0, 1.0),
                }
            })
            .collect()
    }

    /// Threshold, sort, then take greedily until the budget is spent.
    fn select(&self, scored: Vec<RetrievedPassage>) -> Vec<RetrievedPassage> {
        let mut kept: Vec<_> = scored
            .into_iter()
            .filter(|p| p.relevance_score >= self.relevance_threshold)
            .collect();

        // Stable sort keeps corpus order for equal scores.
        kept.sort_by(|a, b| b.relevance_score.total_cmp(&a.relevance_score));

        let mut used = 0;
        let mut selected = Vec::new();
        for passage in kept {
            let cost = self.counter.count(&passage.text);
            if used + cost > self.token_budget {
                break;
            }
            used += cost;
            selected.push(passage);
        }

        tracing::debug!(
            selected = selected.len(),
            tokens = used,
            threshold = self.relevance_threshold,
            "passages retrieved"
        );

        selected
    }
}

/// Drop remote passages whose text names a card outside the reading.
fn screen_remote(passages: Vec<Passage>, cards: &[DrawnCard], lexicon: &CardLexicon) -> Vec<Passage> {
    if passages.is_empty() {
        return passages;
    }
    let scanner = match CardMentionScanner::for_style(lexicon.style()) {
        Ok(scanner) => scanner,
        Err(err) => {
            tracing::warn!(error = %err, "card name scanner unavailable, ignoring remote passages");
            return Vec::new();
        }
    };
    let drawn = DrawnSet::new(cards.iter().map(|c| c.name.as_str()), lexicon);

    passages
        .into_iter()
        .filter(|p| {
            let undrawn = scanner.undrawn(&p.text, &drawn);
            if !undrawn.is_empty() {
                tracing::debug!(source = %p.source_tag, names = ?undrawn, "remote passage names undrawn cards");
            }
            undrawn.is_empty()
        })
        .collect()
}

fn drawn_ids(cards: &[DrawnCard], lexicon: &CardLexicon) -> HashSet<CardId> {
    cards
        .iter()
        .filter_map(|c| lexicon.lookup(&c.name))
        .flat_map(|entry| entry.cards.iter().copied())
        .collect()
}

fn content_words(text: &str) -> BTreeSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .map(|w| w.to_lowercase())
        .filter(|w| w.chars().count() >= MIN_QUERY_WORD && !STOP_WORDS.contains(&w.as_str()))
        .collect()
}

fn lexical_overlap(query_words: &BTreeSet<String>, text: &str) -> f32 {
    let passage_words = content_words(text);
    let shared = query_words.intersection(&passage_words).count();
    shared as f32 / query_words.len() as f32
}
