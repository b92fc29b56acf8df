//! Structural Quality Gate - synchronous, rule-based acceptance of a narrative.
//!
//! Three independent checks:
//! 1. **Coverage**: share of drawn cards named in the text
//! 2. **Hallucination**: counted mentions of cards that were not drawn
//! 3. **Spine**: sections with too few spine elements
//!
//! Any failing check blocks the narrative. Blocks are recovered by the
//! pipeline, never surfaced as errors.

mod fallback;
mod mentions;
mod spine;

pub use fallback::*;
pub use mentions::*;
pub use spine::*;

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use tarot_rules::{CardLexicon, DrawnCard};

use crate::config::QualityConfig;
use crate::error::ConfigError;

/// Spreads of this many cards or fewer get no hallucination allowance.
const ALLOWANCE_FREE_CARDS: usize = 9;

/// Result of the structural gate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityVerdict {
    /// Share of drawn cards named in the text, in [0, 1].
    pub card_coverage_ratio: f64,
    pub missing_cards: Vec<String>,
    pub hallucinated_card_names: Vec<String>,
    pub spine_valid: bool,
    pub incomplete_sections: usize,
    pub accepted: bool,
    pub block_reason: Option<String>,
}

impl QualityVerdict {
    pub fn hallucinated_count(&self) -> usize {
        self.hallucinated_card_names.len()
    }
}

/// The structural gate for one deck style.
#[derive(Debug, Clone)]
pub struct StructuralGate {
    scanner: Arc<CardMentionScanner>,
    config: QualityConfig,
    spread_name: Option<String>,
}

impl StructuralGate {
    pub fn new(scanner: Arc<CardMentionScanner>, config: QualityConfig) -> Self {
        Self {
            scanner,
            config,
            spread_name: None,
        }
    }

    /// The spread's name, treated like a position label when the text
    /// refers to the spread.
    pub fn with_spread_name(mut self, name: impl Into<String>) -> Self {
        self.spread_name = Some(name.into());
        self
    }

    /// Gate using the shared scanner for the lexicon's deck style.
    pub fn for_lexicon(lexicon: &CardLexicon, config: QualityConfig) -> Result<Self, ConfigError> {
        Ok(Self::new(CardMentionScanner::for_style(lexicon.style())?, config))
    }

    pub fn lexicon(&self) -> &CardLexicon {
        self.scanner.lexicon()
    }

    /// Undrawn cards tolerated before a narrative is blocked.
    pub fn hallucination_allowance(&self, card_count: usize) -> usize {
        self.config.hallucination_allowance.unwrap_or(if card_count <= ALLOWANCE_FREE_CARDS {
            0
        } else {
            card_count / 10
        })
    }

    pub fn evaluate(&self, text: &str, cards: &[DrawnCard]) -> QualityVerdict {
        let lexicon = self.scanner.lexicon();

        let missing_cards: Vec<String> = cards
            .iter()
            .filter(|c| !self.is_covered(text, c))
            .map(|c| c.name.clone())
            .collect();
        let card_coverage_ratio = if cards.is_empty() {
            1.0
        } else {
            ((cards.len() - missing_cards.len()) as f64 / cards.len() as f64).clamp(0.0, 1.0)
        };

        let labels = cards
            .iter()
            .map(|c| c.position.0.as_str())
            .chain(self.spread_name.as_deref());
        let drawn = DrawnSet::new(cards.iter().map(|c| c.name.as_str()), lexicon).with_labels(labels);
        let hallucinated_card_names = self.scanner.undrawn(text, &drawn);
        let allowance = self.hallucination_allowance(cards.len());

        let sections = split_sections(text);
        let incomplete = incomplete_sections(&sections, self.config.spine_min_elements);
        let spine_valid = !sections.is_empty() && incomplete <= self.config.max_incomplete_sections;

        let mut reasons = Vec::new();
        if text.trim().is_empty() {
            reasons.push("narrative is empty".to_string());
        }
        if card_coverage_ratio < self.config.coverage_min_ratio {
            reasons.push(format!(
                "card coverage {:.2} below minimum {:.2} (missing: {})",
                card_coverage_ratio,
                self.config.coverage_min_ratio,
                missing_cards.join(", ")
            ));
        }
        if hallucinated_card_names.len() > allowance {
            reasons.push(format!(
                "names undrawn cards: {}",
                hallucinated_card_names.join(", ")
            ));
        } else if !hallucinated_card_names.is_empty() {
            tracing::debug!(
                names = ?hallucinated_card_names,
                allowance,
                "undrawn card mentions within allowance"
            );
        }
        if !spine_valid {
            reasons.push(format!("{} sections lack a narrative spine", incomplete));
        }

        let accepted = reasons.is_empty();

        QualityVerdict {
            card_coverage_ratio,
            missing_cards,
            hallucinated_card_names,
            spine_valid,
            incomplete_sections: incomplete,
            accepted,
            block_reason: (!accepted).then(|| reasons.join("; ")),
        }
    }

    /// Whether the drawn name, or any name of its preferred card, appears.
    fn is_covered(&self, text: &str, drawn: &DrawnCard) -> bool {
        let lexicon = self.scanner.lexicon();
        let mut names = vec![drawn.name.as_str()];
        if let Some(card) = lexicon.resolve(&drawn.name) {
            names.extend(lexicon.names_for(card.id));
        }

        match names_pattern(&names) {
            Ok(pattern) => pattern.is_match(text),
            Err(err) => {
                tracing::warn!(card = %drawn.name, error = %err, "could not build coverage pattern");
                text.to_lowercase().contains(&drawn.name.to_lowercase())
            }
        }
    }
}
