//! Passage definitions - reference text stored in the knowledge graph.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::Tag;

/// Index of a passage within its graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PassageId(pub usize);

impl std::fmt::Display for PassageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "passage:{}", self.0)
    }
}

/// What a passage is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PassageKind {
    CardMeaning,
    Element,
    Suit,
    Dignity,
    Pattern,
    Journey,
    Reversal,
    #[default]
    Commentary,
}

/// A piece of reference text.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Passage {
    /// Assigned when the passage is added to a graph.
    #[serde(skip)]
    pub id: PassageId,

    pub text: String,

    /// Short label for where the passage came from (e.g. "pattern:Healing Arc").
    pub source_tag: String,

    #[serde(default)]
    pub kind: PassageKind,

    /// Tags this passage is associated with.
    #[serde(default)]
    pub tags: BTreeSet<Tag>,

    /// Importance score (0.0 - 1.0) for prioritization.
    #[serde(default = "default_importance")]
    pub importance: f32,
}

fn default_importance() -> f32 {
    0.5
}

impl Default for PassageId {
    fn default() -> Self {
        PassageId(0)
    }
}

impl Passage {
    pub fn new(text: impl Into<String>, source_tag: impl Into<String>) -> Self {
        Self {
            id: PassageId::default(),
            text: text.into(),
            source_tag: source_tag.into(),
            kind: PassageKind::default(),
            tags: BTreeSet::new(),
            importance: default_importance(),
        }
    }

    pub fn with_kind(mut self, kind: PassageKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_tag(mut self, tag: Tag) -> Self {
        self.tags.insert(tag);
        self
    }

    pub fn with_tags(mut self, tags: impl IntoIterator<Item = Tag>) -> Self {
        self.tags.extend(tags);
        self
    }

    /// Set the importance score, clamped to [0, 1].
    pub fn with_importance(mut self, importance: f32) -> Self {
        self.importance = importance.clamp(0.0, 1.0);
        self
    }

    pub fn has_tag(&self, tag: &Tag) -> bool {
        self.tags.contains(tag)
    }

    /// Cards this passage is specifically about.
    pub fn card_tags(&self) -> impl Iterator<Item = tarot_rules::CardId> + '_ {
        self.tags.iter().filter_map(|t| match t {
            Tag::Card(id) => Some(*id),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tarot_rules::{CardId, Element};

    #[test]
    fn test_passage_builder() {
        let passage = Passage::new("Fire is will and appetite.", "element:fire")
            .with_kind(PassageKind::Element)
            .with_tag(Tag::element(Element::Fire))
            .with_importance(0.8);

        assert_eq!(passage.kind, PassageKind::Element);
        assert!(passage.has_tag(&Tag::element(Element::Fire)));
        assert!((passage.importance - 0.8).abs() < f32::EPSILON);
    }

    #[test]
    fn test_importance_clamping() {
        assert_eq!(Passage::new("x", "y").with_importance(1.5).importance, 1.0);
        assert_eq!(Passage::new("x", "y").with_importance(-0.5).importance, 0.0);
    }

    #[test]
    fn test_card_tags() {
        let passage = Passage::new("A pairing.", "pattern:test")
            .with_tags([Tag::card(CardId(16)), Tag::card(CardId(17)), Tag::theme("renewal")]);

        let cards: Vec<_> = passage.card_tags().collect();
        assert_eq!(cards, vec![CardId(16), CardId(17)]);
    }

    #[test]
    fn test_passage_deserializes_with_defaults() {
        let json = r#"{"text":"Water remembers.","sourceTag":"remote:notes"}"#;
        let passage: Passage = serde_json::from_str(json).unwrap();

        assert_eq!(passage.kind, PassageKind::Commentary);
        assert!(passage.tags.is_empty());
        assert!((passage.importance - 0.5).abs() < f32::EPSILON);
    }
}
