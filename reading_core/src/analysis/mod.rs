//! # Spread Analysis
//!
//! Deterministic structure derived from the drawn cards: elemental dignities
//! between neighbours, archetypal patterns, and spread-wide themes. Analysis
//! never calls out of process and the same cards always give the same result.

pub mod dignities;
pub mod patterns;
pub mod themes;

pub use dignities::*;
pub use patterns::*;
pub use themes::*;

use serde::{Deserialize, Serialize};
use tarot_rules::{CardLexicon, DrawnCard};

/// Everything the analyzer derives from one reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpreadAnalysis {
    pub theme: ThemeSummary,
    pub relationships: Vec<ElementalRelationship>,
    pub patterns: Vec<DetectedPattern>,
}

impl SpreadAnalysis {
    /// Strongest detected pattern. Ties go to the earlier pattern.
    pub fn strongest_pattern(&self) -> Option<&DetectedPattern> {
        self.patterns
            .iter()
            .reduce(|best, p| if p.weight > best.weight { p } else { best })
    }

    /// Count of relationships of one kind.
    pub fn count_relationships(&self, kind: RelationshipKind) -> usize {
        self.relationships.iter().filter(|r| r.relationship == kind).count()
    }
}

/// Analyze cards already placed in spread order.
pub fn analyze(cards: &[DrawnCard], lexicon: &CardLexicon) -> SpreadAnalysis {
    let analysis = SpreadAnalysis {
        theme: ThemeSummary::from_cards(cards, lexicon),
        relationships: adjacent_relationships(cards, lexicon),
        patterns: detect_patterns(cards, lexicon),
    };

    tracing::debug!(
        cards = cards.len(),
        patterns = analysis.patterns.len(),
        framework = analysis.theme.reversal_framework.name(),
        "spread analyzed"
    );

    analysis
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_analyze_is_deterministic() {
        let lexicon = CardLexicon::default();
        let cards = vec![
            DrawnCard::upright("The Tower", "Past"),
            DrawnCard::reversed("The Moon", "Present"),
            DrawnCard::upright("The Star", "Future"),
        ];

        let first = analyze(&cards, &lexicon);
        let second = analyze(&cards, &lexicon);
        assert_eq!(first, second);
        assert_eq!(first.relationships.len(), 2);
        assert_eq!(first.strongest_pattern().unwrap().name, "Dark Night to Dawn");
    }

    #[test]
    fn test_single_card_analysis() {
        let lexicon = CardLexicon::default();
        let analysis = analyze(&[DrawnCard::upright("The Star", "Focus")], &lexicon);

        assert!(analysis.relationships.is_empty());
        assert!(analysis.patterns.is_empty());
        assert!(analysis.strongest_pattern().is_none());
    }

    #[test]
    fn test_unknown_cards_are_neutral() {
        let lexicon = CardLexicon::default();
        let cards = vec![
            DrawnCard::upright("The Lantern Keeper", "Past"),
            DrawnCard::upright("The Salt Road", "Present"),
        ];

        let analysis = analyze(&cards, &lexicon);
        assert_eq!(analysis.count_relationships(RelationshipKind::Neutral), 1);
        assert_eq!(analysis.theme.card_count, 2);
    }
}
