//! Elemental dignities between adjacent positions.

use serde::{Deserialize, Serialize};
use tarot_rules::{CardLexicon, DrawnCard, Element};

/// Relationship between two cards' elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationshipKind {
    Supportive,
    Tension,
    Amplified,
    Neutral,
}

impl RelationshipKind {
    /// Classify a pair of elements. Order does not matter.
    pub fn between(a: Option<Element>, b: Option<Element>) -> Self {
        use Element::*;

        let (Some(a), Some(b)) = (a, b) else {
            return RelationshipKind::Neutral;
        };

        if a == b {
            return RelationshipKind::Amplified;
        }

        match (a.min(b), a.max(b)) {
            (Fire, Air) | (Water, Earth) => RelationshipKind::Supportive,
            (Fire, Water) | (Air, Earth) => RelationshipKind::Tension,
            _ => RelationshipKind::Neutral,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            RelationshipKind::Supportive => "supportive",
            RelationshipKind::Tension => "tension",
            RelationshipKind::Amplified => "amplified",
            RelationshipKind::Neutral => "neutral",
        }
    }

    /// Connective phrase a narrative should use to move between the two positions.
    pub fn connector(&self) -> &'static str {
        match self {
            RelationshipKind::Supportive => "and so",
            RelationshipKind::Tension => "however",
            RelationshipKind::Amplified => "because of this, even more strongly",
            RelationshipKind::Neutral => "meanwhile",
        }
    }

    /// Short reading of the relationship.
    pub fn gloss(&self) -> &'static str {
        match self {
            RelationshipKind::Supportive => "these energies feed each other",
            RelationshipKind::Tension => "these energies pull against each other",
            RelationshipKind::Amplified => "the same energy doubles and intensifies",
            RelationshipKind::Neutral => "these energies sit side by side without strong friction",
        }
    }
}

/// Elemental relationship between a card and the one before it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementalRelationship {
    pub relationship: RelationshipKind,
    /// Element names of the earlier and later card ("unknown" when untagged).
    pub elements: [String; 2],
    /// Index of the later card; the earlier card is `to_index - 1`.
    pub to_index: usize,
    pub from_card: String,
    pub to_card: String,
}

/// Relationships for each adjacent pair, in position order.
pub fn adjacent_relationships(cards: &[DrawnCard], lexicon: &CardLexicon) -> Vec<ElementalRelationship> {
    cards
        .windows(2)
        .enumerate()
        .map(|(i, pair)| {
            let a = pair[0].element(lexicon);
            let b = pair[1].element(lexicon);
            ElementalRelationship {
                relationship: RelationshipKind::between(a, b),
                elements: [element_name(a), element_name(b)],
                to_index: i + 1,
                from_card: pair[0].name.clone(),
                to_card: pair[1].name.clone(),
            }
        })
        .collect()
}

fn element_name(element: Option<Element>) -> String {
    element.map(|e| e.name()).unwrap_or("unknown").to_string()
}
