//! Energy carried by corpus tags while a reading's triggers spread.

use std::collections::BTreeMap;

use crate::knowledge_base::{KnowledgeGraph, Tag};

/// Accumulated activation per tag.
///
/// Seeded from the reading's trigger tags, then widened hop by hop through
/// the graph's associations. Only energy that arrived on the previous hop
/// travels further, so a tag linked back to its source is not re-counted
/// forever.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TagActivation {
    energy: BTreeMap<Tag, f32>,
}

impl TagActivation {
    /// Start from trigger tags. Repeated triggers add up.
    pub fn seeded(triggers: impl IntoIterator<Item = (Tag, f32)>) -> Self {
        let mut activation = Self::default();
        for (tag, energy) in triggers {
            activation.charge(tag, energy);
        }
        activation
    }

    pub fn charge(&mut self, tag: Tag, energy: f32) {
        if energy > 0.0 {
            *self.energy.entry(tag).or_insert(0.0) += energy;
        }
    }

    pub fn energy(&self, tag: &Tag) -> f32 {
        self.energy.get(tag).copied().unwrap_or(0.0)
    }

    pub fn len(&self) -> usize {
        self.energy.len()
    }

    pub fn is_empty(&self) -> bool {
        self.energy.is_empty()
    }

    /// Push energy outward for up to `hops` rounds, scaled by association
    /// weight and `decay` at every hop.
    pub fn spread(mut self, graph: &KnowledgeGraph, decay: f32, hops: u32) -> Self {
        let mut frontier: Vec<(Tag, f32)> = self.energy.iter().map(|(t, e)| (t.clone(), *e)).collect();

        for _ in 0..hops {
            let mut arrived: BTreeMap<Tag, f32> = BTreeMap::new();
            for (tag, energy) in &frontier {
                for assoc in graph.get_associations(tag) {
                    *arrived.entry(assoc.target.clone()).or_insert(0.0) += energy * assoc.weight * decay;
                }
            }

            frontier = arrived.into_iter().filter(|(_, e)| *e > f32::EPSILON).collect();
            if frontier.is_empty() {
                break;
            }
            for (tag, energy) in &frontier {
                self.charge(tag.clone(), *energy);
            }
        }

        self
    }

    /// Tags at or above `threshold`, hottest first.
    pub fn hot_tags(&self, threshold: f32) -> Vec<(&Tag, f32)> {
        let mut hot: Vec<_> = self
            .energy
            .iter()
            .filter(|(_, e)| **e >= threshold)
            .map(|(t, e)| (t, *e))
            .collect();
        hot.sort_by(|a, b| b.1.total_cmp(&a.1));
        hot
    }

    /// Relevance of a tag set in [0, 1].
    ///
    /// Each tag's energy is capped at 1 and read as an independent chance
    /// of relevance (noisy-OR), so an extra tag never lowers the result.
    pub fn combined<'a>(&self, tags: impl IntoIterator<Item = &'a Tag>) -> f32 {
        let miss: f32 = tags
            .into_iter()
            .map(|tag| 1.0 - self.energy(tag).clamp(0.0, 1.0))
            .product();
        (1.0 - miss).clamp(0.0, 1.0)
    }
}
