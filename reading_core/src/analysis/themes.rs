//! Spread-wide theme statistics and reversal framework selection.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tarot_rules::{CardLexicon, DrawnCard, Element};

/// Share of elemental cards one element needs to dominate.
const DOMINANT_SHARE: f64 = 0.4;

/// Spreads smaller than this do not report missing elements.
const MISSING_ELEMENT_MIN_CARDS: usize = 4;

/// How reversed cards should be read across a spread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReversalFramework {
    None,
    Blocked,
    Delayed,
    Internalized,
    Contextual,
}

impl ReversalFramework {
    /// Select a framework from the share of reversed cards.
    pub fn from_ratio(ratio: f64) -> Self {
        if ratio >= 0.6 {
            ReversalFramework::Blocked
        } else if ratio >= 0.4 {
            ReversalFramework::Delayed
        } else if ratio >= 0.2 {
            ReversalFramework::Internalized
        } else if ratio > 0.0 {
            ReversalFramework::Contextual
        } else {
            ReversalFramework::None
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ReversalFramework::None => "none",
            ReversalFramework::Blocked => "blocked",
            ReversalFramework::Delayed => "delayed",
            ReversalFramework::Internalized => "internalized",
            ReversalFramework::Contextual => "contextual",
        }
    }

    /// Instruction for interpreting reversals under this framework.
    pub fn guidance(&self) -> &'static str {
        match self {
            ReversalFramework::None => "All cards are upright; read each at face value.",
            ReversalFramework::Blocked => {
                "Most cards are reversed: read reversals as energy that is blocked or resisted and needs release."
            }
            ReversalFramework::Delayed => {
                "Many cards are reversed: read reversals as energy that is delayed or still gathering."
            }
            ReversalFramework::Internalized => {
                "Some cards are reversed: read reversals as energy turned inward or worked through privately."
            }
            ReversalFramework::Contextual => {
                "Few cards are reversed: read each reversal in the context of its neighbours."
            }
        }
    }
}

/// Derived statistics for the whole spread.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThemeSummary {
    pub card_count: usize,

    /// Counts per suit name, with "Major" for major arcana.
    pub suit_counts: BTreeMap<String, usize>,

    pub element_counts: BTreeMap<Element, usize>,

    pub reversal_count: usize,
    pub reversal_ratio: f64,

    /// Element holding a clear plurality, if any.
    pub dominant_element: Option<Element>,

    pub reversal_framework: ReversalFramework,

    pub major_ratio: f64,
    pub court_count: usize,

    /// Elements absent from a spread of four or more cards.
    pub missing_elements: Vec<Element>,
}

impl ThemeSummary {
    /// Summarize a set of drawn cards.
    pub fn from_cards(cards: &[DrawnCard], lexicon: &CardLexicon) -> Self {
        let card_count = cards.len();
        let mut suit_counts = BTreeMap::new();
        let mut element_counts = BTreeMap::new();
        let mut reversal_count = 0;
        let mut major_count = 0;
        let mut court_count = 0;

        for drawn in cards {
            if drawn.is_reversed() {
                reversal_count += 1;
            }

            let catalog_card = drawn.card(lexicon);
            if catalog_card.map(|c| c.is_major()).unwrap_or(false) {
                major_count += 1;
                *suit_counts.entry("Major".to_string()).or_insert(0) += 1;
            } else if let Some(suit) = drawn.suit(lexicon) {
                *suit_counts.entry(suit.name().to_string()).or_insert(0) += 1;
            }

            if catalog_card.map(|c| c.is_court()).unwrap_or(false) {
                court_count += 1;
            }

            if let Some(element) = drawn.element(lexicon) {
                *element_counts.entry(element).or_insert(0) += 1;
            }
        }

        let reversal_ratio = ratio(reversal_count, card_count);
        let missing_elements = if card_count >= MISSING_ELEMENT_MIN_CARDS {
            Element::ALL
                .iter()
                .copied()
                .filter(|e| !element_counts.contains_key(e))
                .collect()
        } else {
            Vec::new()
        };

        Self {
            card_count,
            dominant_element: dominant_element(&element_counts),
            suit_counts,
            element_counts,
            reversal_count,
            reversal_ratio,
            reversal_framework: ReversalFramework::from_ratio(reversal_ratio),
            major_ratio: ratio(major_count, card_count),
            court_count,
            missing_elements,
        }
    }

    pub fn has_dominant_element(&self) -> bool {
        self.dominant_element.is_some()
    }

    /// One-line description for prompts.
    pub fn describe(&self) -> String {
        let mut parts = vec![format!(
            "{} of {} cards reversed (framework: {})",
            self.reversal_count,
            self.card_count,
            self.reversal_framework.name()
        )];

        if let Some(element) = self.dominant_element {
            parts.push(format!("dominant element: {}", element));
        }
        if self.major_ratio > 0.0 {
            parts.push(format!("{:.0}% major arcana", self.major_ratio * 100.0));
        }
        if self.court_count > 0 {
            parts.push(format!("{} court cards", self.court_count));
        }
        if !self.missing_elements.is_empty() {
            let names: Vec<_> = self.missing_elements.iter().map(|e| e.name()).collect();
            parts.push(format!("missing: {}", names.join(", ")));
        }

        parts.join("; ")
    }
}

fn ratio(count: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 / total as f64
    }
}

fn dominant_element(counts: &BTreeMap<Element, usize>) -> Option<Element> {
    let total: usize = counts.values().sum();
    let (&element, &count) = counts.iter().max_by_key(|(_, count)| **count)?;

    let tied = counts.values().filter(|c| **c == count).count() > 1;
    if count < 2 || tied || ratio(count, total) < DOMINANT_SHARE {
        return None;
    }
    Some(element)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn celtic_cross_with_reversals(reversed: usize) -> Vec<DrawnCard> {
        let names = [
            "The Fool", "Two of Cups", "Three of Swords", "Four of Pentacles", "Five of Wands",
            "Six of Cups", "Seven of Swords", "Eight of Pentacles", "Nine of Wands", "The World",
        ];
        names
            .iter()
            .enumerate()
            .map(|(i, name)| {
                if i < reversed {
                    DrawnCard::reversed(*name, format!("P{}", i))
                } else {
                    DrawnCard::upright(*name, format!("P{}", i))
                }
            })
            .collect()
    }

    #[test]
    fn test_framework_thresholds() {
        assert_eq!(ReversalFramework::from_ratio(0.0), ReversalFramework::None);
        assert_eq!(ReversalFramework::from_ratio(0.1), ReversalFramework::Contextual);
        assert_eq!(ReversalFramework::from_ratio(0.2), ReversalFramework::Internalized);
        assert_eq!(ReversalFramework::from_ratio(0.4), ReversalFramework::Delayed);
        assert_eq!(ReversalFramework::from_ratio(0.6), ReversalFramework::Blocked);
        assert_eq!(ReversalFramework::from_ratio(1.0), ReversalFramework::Blocked);
    }

    #[test]
    fn test_half_reversed_ten_card_spread_is_delayed() {
        let lexicon = CardLexicon::default();
        let summary = ThemeSummary::from_cards(&celtic_cross_with_reversals(5), &lexicon);

        assert!((summary.reversal_ratio - 0.5).abs() < f64::EPSILON);
        assert_eq!(summary.reversal_framework, ReversalFramework::Delayed);
    }

    #[test]
    fn test_counts() {
        let lexicon = CardLexicon::default();
        let summary = ThemeSummary::from_cards(&celtic_cross_with_reversals(0), &lexicon);

        assert_eq!(summary.card_count, 10);
        assert_eq!(summary.suit_counts.get("Major"), Some(&2));
        assert_eq!(summary.suit_counts.get("Cups"), Some(&2));
        assert!((summary.major_ratio - 0.2).abs() < f64::EPSILON);
        assert_eq!(summary.reversal_framework, ReversalFramework::None);
        assert!(summary.missing_elements.is_empty());
    }

    #[test]
    fn test_dominant_element() {
        let lexicon = CardLexicon::default();
        let cards = vec![
            DrawnCard::upright("Ace of Wands", "Past"),
            DrawnCard::upright("The Sun", "Present"),
            DrawnCard::upright("Two of Cups", "Future"),
        ];
        let summary = ThemeSummary::from_cards(&cards, &lexicon);
        assert_eq!(summary.dominant_element, Some(Element::Fire));

        let tied = vec![
            DrawnCard::upright("Ace of Wands", "Past"),
            DrawnCard::upright("Two of Cups", "Future"),
        ];
        assert!(!ThemeSummary::from_cards(&tied, &lexicon).has_dominant_element());
    }

    #[test]
    fn test_single_card_degrades_gracefully() {
        let lexicon = CardLexicon::default();
        let summary = ThemeSummary::from_cards(&[DrawnCard::upright("The Star", "Focus")], &lexicon);

        assert_eq!(summary.card_count, 1);
        assert_eq!(summary.dominant_element, None);
        assert_eq!(summary.reversal_framework, ReversalFramework::None);
        assert!(summary.missing_elements.is_empty());
    }

    #[test]
    fn test_missing_elements_for_larger_spreads() {
        let lexicon = CardLexicon::default();
        let cards = vec![
            DrawnCard::upright("Ace of Wands", "A"),
            DrawnCard::upright("Two of Wands", "B"),
            DrawnCard::upright("Three of Cups", "C"),
            DrawnCard::upright("Four of Cups", "D"),
        ];
        let summary = ThemeSummary::from_cards(&cards, &lexicon);
        assert_eq!(summary.missing_elements, vec![Element::Air, Element::Earth]);
    }
}
