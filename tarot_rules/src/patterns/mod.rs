//! Static archetypal pattern catalog.
//!
//! Patterns are matched against drawn cards by the analyzer. The catalog is
//! immutable for the process lifetime.

use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;

/// Kind of archetypal pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PatternKind {
    Triad,
    Dyad,
    JourneyStage,
    SuitProgression,
}

impl PatternKind {
    pub fn name(&self) -> &'static str {
        match self {
            PatternKind::Triad => "triad",
            PatternKind::Dyad => "dyad",
            PatternKind::JourneyStage => "journeyStage",
            PatternKind::SuitProgression => "suitProgression",
        }
    }
}

/// A named combination of major arcana.
#[derive(Debug)]
pub struct PatternDefinition {
    pub name: &'static str,
    pub kind: PatternKind,
    /// Major arcana numbers that must all be present.
    pub members: &'static [u8],
    pub theme: &'static str,
    /// Weight when members are present anywhere in the spread.
    pub base_weight: f32,
}

/// A stage of the Fool's journey through the majors.
#[derive(Debug)]
pub struct JourneyStage {
    pub name: &'static str,
    pub majors: RangeInclusive<u8>,
    pub theme: &'static str,
}

/// Extra weight when a pattern's members sit in adjacent positions.
pub const ADJACENCY_BONUS: f32 = 0.15;

/// Minimum run length for a suit progression.
pub const MIN_SUIT_RUN: usize = 3;

/// Minimum majors from one stage to count as a journey grouping.
pub const MIN_STAGE_MEMBERS: usize = 2;

pub static PATTERN_CATALOG: &[PatternDefinition] = &[
    PatternDefinition {
        name: "Dark Night to Dawn",
        kind: PatternKind::Triad,
        members: &[16, 17, 18],
        theme: "collapse of a false structure, a fragile renewal of hope, and the uncertain passage between them",
        base_weight: 0.85,
    },
    PatternDefinition {
        name: "Breakthrough",
        kind: PatternKind::Triad,
        members: &[16, 17, 19],
        theme: "sudden disruption clearing the way for hope and then open vitality",
        base_weight: 0.85,
    },
    PatternDefinition {
        name: "Healing Arc",
        kind: PatternKind::Triad,
        members: &[13, 14, 17],
        theme: "an ending integrated patiently until renewal becomes possible",
        base_weight: 0.85,
    },
    PatternDefinition {
        name: "Inner Guidance",
        kind: PatternKind::Triad,
        members: &[2, 9, 18],
        theme: "trusting inner knowing through solitude and uncertainty",
        base_weight: 0.8,
    },
    PatternDefinition {
        name: "Sovereign Order",
        kind: PatternKind::Triad,
        members: &[3, 4, 11],
        theme: "creative abundance held in fair, well-built structure",
        base_weight: 0.8,
    },
    PatternDefinition {
        name: "Conscious and Unconscious",
        kind: PatternKind::Dyad,
        members: &[1, 2],
        theme: "outer skill and inner knowing asking to work together",
        base_weight: 0.6,
    },
    PatternDefinition {
        name: "Creative Authority",
        kind: PatternKind::Dyad,
        members: &[3, 4],
        theme: "nurture and structure as complementary forces",
        base_weight: 0.6,
    },
    PatternDefinition {
        name: "Rupture and Renewal",
        kind: PatternKind::Dyad,
        members: &[16, 17],
        theme: "what breaks open makes room for hope",
        base_weight: 0.65,
    },
    PatternDefinition {
        name: "Choice and Attachment",
        kind: PatternKind::Dyad,
        members: &[6, 15],
        theme: "a values-based choice tested by compulsion or habit",
        base_weight: 0.6,
    },
    PatternDefinition {
        name: "Clarity and Illusion",
        kind: PatternKind::Dyad,
        members: &[18, 19],
        theme: "moving from confusion toward plain daylight understanding",
        base_weight: 0.6,
    },
    PatternDefinition {
        name: "Fate and Accountability",
        kind: PatternKind::Dyad,
        members: &[10, 11],
        theme: "circumstance beyond control meeting responsibility for one's part",
        base_weight: 0.6,
    },
    PatternDefinition {
        name: "Transformation Integrated",
        kind: PatternKind::Dyad,
        members: &[13, 14],
        theme: "an ending softened into a new balance",
        base_weight: 0.6,
    },
    PatternDefinition {
        name: "Full Circle",
        kind: PatternKind::Dyad,
        members: &[0, 21],
        theme: "a cycle closing as a new one begins",
        base_weight: 0.65,
    },
];

pub static JOURNEY_STAGES: [JourneyStage; 3] = [
    JourneyStage {
        name: "Outer World",
        majors: 1..=7,
        theme: "learning the rules of the outer world: skill, nurture, structure, belonging, and choice",
    },
    JourneyStage {
        name: "Inner World",
        majors: 8..=14,
        theme: "turning inward: courage, solitude, cycles, accountability, surrender, and integration",
    },
    JourneyStage {
        name: "Transcendence",
        majors: 15..=21,
        theme: "confronting shadow and emerging into renewal, clarity, and completion",
    },
];

/// Name of the suit progression pattern for a suit.
pub fn suit_progression_name(suit: crate::cards::Suit) -> String {
    format!("{} Progression", suit.name())
}
