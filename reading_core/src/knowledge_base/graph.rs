//! Knowledge Graph - reference passages linked through weighted tag associations.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use super::{Passage, PassageId, Tag};

/// Association between two tags with a weight.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Association {
    pub target: Tag,
    /// Weight from 0.0 to 1.0 indicating association strength.
    pub weight: f32,
    pub association_type: AssociationType,
}

/// Types of associations between tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssociationType {
    /// Structural link from the deck itself (card to suit, suit to element).
    Direct,
    /// Both tags appear on the same passages.
    CoOccurrence,
    /// Symbolically related (pattern to member card, dignity to element).
    Semantic,
}

/// The reference corpus as a graph.
///
/// Passages are stored in insertion order so retrieval is deterministic.
/// After loading, the graph is only read.
#[derive(Debug, Clone, Default)]
pub struct KnowledgeGraph {
    passages: Vec<Passage>,

    /// Index: Tag -> passages carrying this tag.
    tag_to_passages: BTreeMap<Tag, BTreeSet<PassageId>>,

    /// Associations between tags (adjacency list).
    associations: BTreeMap<Tag, Vec<Association>>,
}

impl KnowledgeGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a passage, returning its id.
    pub fn add_passage(&mut self, mut passage: Passage) -> PassageId {
        let id = PassageId(self.passages.len());
        passage.id = id;

        for tag in &passage.tags {
            self.tag_to_passages.entry(tag.clone()).or_default().insert(id);
        }

        self.passages.push(passage);
        id
    }

    /// Parse a JSON array of passages and add them.
    pub fn extend_from_json(&mut self, json: &str) -> Result<usize, serde_json::Error> {
        let passages: Vec<Passage> = serde_json::from_str(json)?;
        let count = passages.len();
        for passage in passages {
            self.add_passage(passage);
        }
        Ok(count)
    }

    pub fn passages_by_tag(&self, tag: &Tag) -> Vec<&Passage> {
        self.tag_to_passages
            .get(tag)
            .map(|ids| ids.iter().filter_map(|id| self.get_passage(*id)).collect())
            .unwrap_or_default()
    }

    /// Link `from` to `to`. A repeated link keeps the stronger weight and
    /// that link's type.
    pub fn add_association(&mut self, from: Tag, to: Tag, weight: f32, assoc_type: AssociationType) {
        let weight = weight.clamp(0.0, 1.0);
        let links = self.associations.entry(from).or_default();

        match links.iter_mut().find(|a| a.target == to) {
            Some(link) if link.weight >= weight => {}
            Some(link) => {
                link.weight = weight;
                link.association_type = assoc_type;
            }
            None => links.push(Association {
                target: to,
                weight,
                association_type: assoc_type,
            }),
        }
    }

    pub fn add_bidirectional_association(
        &mut self,
        tag_a: Tag,
        tag_b: Tag,
        weight: f32,
        assoc_type: AssociationType,
    ) {
        self.add_association(tag_a.clone(), tag_b.clone(), weight, assoc_type);
        self.add_association(tag_b, tag_a, weight, assoc_type);
    }

    pub fn get_associations(&self, tag: &Tag) -> &[Association] {
        self.associations.get(tag).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn get_passage(&self, id: PassageId) -> Option<&Passage> {
        self.passages.get(id.0)
    }

    pub fn all_passages(&self) -> impl Iterator<Item = &Passage> {
        self.passages.iter()
    }

    pub fn passage_count(&self) -> usize {
        self.passages.len()
    }

    pub fn tag_count(&self) -> usize {
        self.tag_to_passages.len()
    }

    pub fn has_tag(&self, tag: &Tag) -> bool {
        self.tag_to_passages.contains_key(tag)
    }

    /// Create co-occurrence associations from tags shared on passages.
    ///
    /// Weight grows with the number of shared passages on a log scale and
    /// never replaces a stronger existing association.
    pub fn build_co_occurrence_associations(&mut self) {
        let mut co_occurrences: BTreeMap<(Tag, Tag), u32> = BTreeMap::new();

        for passage in &self.passages {
            // BTreeSet iteration is sorted, so (a, b) pairs are canonical.
            let tags: Vec<_> = passage.tags.iter().collect();
            for i in 0..tags.len() {
                for j in (i + 1)..tags.len() {
                    *co_occurrences.entry((tags[i].clone(), tags[j].clone())).or_default() += 1;
                }
            }
        }

        for ((tag_a, tag_b), count) in co_occurrences {
            let weight = (0.2 + (count as f32).ln() * 0.2).min(1.0);
            self.add_bidirectional_association(tag_a, tag_b, weight, AssociationType::CoOccurrence);
        }
    }
}
