//! Archetypal pattern detection against the static catalog.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tarot_rules::{
    suit_progression_name, CardLexicon, DrawnCard, PatternKind, Suit, ADJACENCY_BONUS,
    JOURNEY_STAGES, MIN_STAGE_MEMBERS, MIN_SUIT_RUN, PATTERN_CATALOG,
};

/// Longest run that still increases a suit progression's weight.
const FULL_RUN: usize = 5;

/// A pattern found in the drawn cards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectedPattern {
    pub kind: PatternKind,
    pub name: String,
    /// Drawn card names, as drawn.
    pub member_card_names: Vec<String>,
    pub weight: f32,
    pub theme: String,
    /// Whether the members occupy consecutive positions.
    pub adjacent: bool,
}

/// Match all catalog patterns, journey stages, and suit runs.
pub fn detect_patterns(cards: &[DrawnCard], lexicon: &CardLexicon) -> Vec<DetectedPattern> {
    // First position of each major by number.
    let mut majors: BTreeMap<u8, usize> = BTreeMap::new();
    for (i, drawn) in cards.iter().enumerate() {
        if let Some(card) = drawn.card(lexicon).filter(|c| c.is_major()) {
            majors.entry(card.rank).or_insert(i);
        }
    }

    let mut patterns = Vec::new();

    for def in PATTERN_CATALOG {
        let indices: Option<Vec<usize>> = def.members.iter().map(|m| majors.get(m).copied()).collect();
        let Some(indices) = indices else { continue };

        let adjacent = is_contiguous(&indices);
        let weight = if adjacent {
            (def.base_weight + ADJACENCY_BONUS).min(1.0)
        } else {
            def.base_weight
        };

        patterns.push(DetectedPattern {
            kind: def.kind,
            name: def.name.to_string(),
            member_card_names: indices.iter().map(|&i| cards[i].name.clone()).collect(),
            weight,
            theme: def.theme.to_string(),
            adjacent,
        });
    }

    for stage in JOURNEY_STAGES.iter() {
        let indices: Vec<usize> = majors
            .iter()
            .filter(|(number, _)| stage.majors.contains(*number))
            .map(|(_, &i)| i)
            .collect();

        if indices.len() >= MIN_STAGE_MEMBERS {
            let mut ordered = indices.clone();
            ordered.sort_unstable();
            patterns.push(DetectedPattern {
                kind: PatternKind::JourneyStage,
                name: stage.name.to_string(),
                member_card_names: ordered.iter().map(|&i| cards[i].name.clone()).collect(),
                weight: (indices.len() as f32 / cards.len() as f32).min(1.0),
                theme: stage.theme.to_string(),
                adjacent: is_contiguous(&indices),
            });
        }
    }

    for suit in Suit::ALL {
        patterns.extend(suit_progressions(cards, lexicon, suit));
    }

    patterns
}

fn suit_progressions(cards: &[DrawnCard], lexicon: &CardLexicon, suit: Suit) -> Vec<DetectedPattern> {
    // First position of each rank within the suit.
    let mut ranks: BTreeMap<u8, usize> = BTreeMap::new();
    for (i, drawn) in cards.iter().enumerate() {
        if drawn.is_major(lexicon) || drawn.suit(lexicon) != Some(suit) {
            continue;
        }
        if let Some(rank) = drawn.rank(lexicon) {
            ranks.entry(rank).or_insert(i);
        }
    }

    let mut runs: Vec<Vec<(u8, usize)>> = Vec::new();
    for (&rank, &index) in &ranks {
        match runs.last_mut() {
            Some(run) if run.last().map(|(r, _)| r + 1) == Some(rank) => run.push((rank, index)),
            _ => runs.push(vec![(rank, index)]),
        }
    }

    runs.into_iter()
        .filter(|run| run.len() >= MIN_SUIT_RUN)
        .map(|run| {
            let indices: Vec<usize> = run.iter().map(|(_, i)| *i).collect();
            let first = run.first().map(|(r, _)| *r).unwrap_or_default();
            let last = run.last().map(|(r, _)| *r).unwrap_or_default();
            DetectedPattern {
                kind: PatternKind::SuitProgression,
                name: suit_progression_name(suit),
                member_card_names: indices.iter().map(|&i| cards[i].name.clone()).collect(),
                weight: (run.len() as f32 / FULL_RUN as f32).min(1.0),
                theme: format!(
                    "a developing story in {} from rank {} to rank {}",
                    suit.name().to_lowercase(),
                    first,
                    last
                ),
                adjacent: is_contiguous(&indices),
            }
        })
        .collect()
}

fn is_contiguous(indices: &[usize]) -> bool {
    match (indices.iter().min(), indices.iter().max()) {
        (Some(min), Some(max)) => max - min + 1 == indices.len(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_triad_detected_adjacent() {
        let lexicon = CardLexicon::default();
        let cards = vec![
            DrawnCard::upright("The Tower", "Past"),
            DrawnCard::upright("The Moon", "Present"),
            DrawnCard::upright("The Star", "Future"),
        ];

        let patterns = detect_patterns(&cards, &lexicon);
        let triad = patterns.iter().find(|p| p.name == "Dark Night to Dawn").unwrap();
        assert_eq!(triad.kind, PatternKind::Triad);
        assert!(triad.adjacent);
        assert!((triad.weight - 1.0).abs() < f32::EPSILON);
        assert_eq!(triad.member_card_names, vec!["The Tower", "The Star", "The Moon"]);

        // The Tower + The Star dyad co-occurs with the triad.
        assert!(patterns.iter().any(|p| p.name == "Rupture and Renewal"));
        // Three majors from the last stage of the journey.
        assert!(patterns.iter().any(|p| p.kind == PatternKind::JourneyStage && p.name == "Transcendence"));
    }

    #[test]
    fn test_dyad_not_adjacent() {
        let lexicon = CardLexicon::default();
        let cards = vec![
            DrawnCard::upright("The Lovers", "Past"),
            DrawnCard::upright("Two of Cups", "Present"),
            DrawnCard::reversed("The Devil", "Future"),
        ];

        let patterns = detect_patterns(&cards, &lexicon);
        let dyad = patterns.iter().find(|p| p.name == "Choice and Attachment").unwrap();
        assert!(!dyad.adjacent);
        assert!((dyad.weight - 0.6).abs() < f32::EPSILON);
    }

    #[test]
    fn test_thoth_names_match_catalog() {
        let lexicon = CardLexicon::for_style(tarot_rules::DeckStyle::Thoth);
        let cards = vec![
            DrawnCard::upright("Death", "Past"),
            DrawnCard::upright("Art", "Present"),
            DrawnCard::upright("The Star", "Future"),
        ];

        let patterns = detect_patterns(&cards, &lexicon);
        let arc = patterns.iter().find(|p| p.name == "Healing Arc").unwrap();
        assert_eq!(arc.member_card_names, vec!["Death", "Art", "The Star"]);
    }

    #[test]
    fn test_suit_progression() {
        let lexicon = CardLexicon::default();
        let cards = vec![
            DrawnCard::upright("Four of Cups", "A"),
            DrawnCard::upright("The Hermit", "B"),
            DrawnCard::upright("Two of Cups", "C"),
            DrawnCard::upright("Three of Cups", "D"),
            DrawnCard::upright("Six of Cups", "E"),
        ];

        let patterns = detect_patterns(&cards, &lexicon);
        let runs: Vec<_> = patterns
            .iter()
            .filter(|p| p.kind == PatternKind::SuitProgression)
            .collect();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].name, "Cups Progression");
        assert_eq!(runs[0].member_card_names, vec!["Two of Cups", "Three of Cups", "Four of Cups"]);
        assert!((runs[0].weight - 0.6).abs() < 1e-6);
        assert!(!runs[0].adjacent);
    }

    #[test]
    fn test_tagged_custom_cards_form_progression() {
        let lexicon = CardLexicon::default();
        let cards = vec![
            DrawnCard::upright("Ember I", "A").with_tag("Wands").with_rank(7),
            DrawnCard::upright("Ember II", "B").with_tag("Wands").with_rank(8),
            DrawnCard::upright("Ember III", "C").with_tag("Wands").with_rank(9),
        ];

        let patterns = detect_patterns(&cards, &lexicon);
        assert_eq!(patterns.len(), 1);
        assert!(patterns[0].adjacent);
    }

    #[test]
    fn test_no_patterns_for_sparse_reading() {
        let lexicon = CardLexicon::default();
        let patterns = detect_patterns(&[DrawnCard::upright("The Star", "Focus")], &lexicon);
        assert!(patterns.is_empty());
    }
}
