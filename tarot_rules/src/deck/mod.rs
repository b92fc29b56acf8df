//! Deck styles and the name lexicon used to recognize cards in text.
//!
//! A lexicon maps every known name of a card (canonical name plus the
//! style's aliases) to the catalog entries it may refer to. A single name can
//! refer to more than one card: in the Thoth deck "Knight of Wands" is the
//! Rider-Waite-Smith King, while the canonical Knight is the Thoth Prince.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::cards::{catalog, Card, CardId, Suit, MINOR_RANKS};

/// Deck style selecting an alias set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeckStyle {
    #[default]
    RiderWaiteSmith,
    Thoth,
}

impl DeckStyle {
    /// Parse a deck style tag, e.g. "rws", "thoth".
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.trim().to_lowercase().replace(['-', ' '], "_").as_str() {
            "rws" | "rider_waite" | "rider_waite_smith" | "waite" => Some(DeckStyle::RiderWaiteSmith),
            "thoth" | "crowley" | "crowley_thoth" => Some(DeckStyle::Thoth),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            DeckStyle::RiderWaiteSmith => "rider_waite_smith",
            DeckStyle::Thoth => "thoth",
        }
    }
}

/// Card names that double as everyday words and need card context to count.
pub static AMBIGUOUS_NAMES: &[&str] = &[
    "the sun",
    "the moon",
    "the star",
    "the world",
    "death",
    "justice",
    "strength",
    "temperance",
    "judgement",
    "judgment",
    "fortune",
    "art",
    "lust",
    "adjustment",
    "the universe",
    "the aeon",
    "the fool",
    "the lovers",
    "the devil",
    "the tower",
];

/// Thoth renames of the majors, by major number.
const THOTH_MAJORS: &[(u8, &str)] = &[
    (1, "The Magus"),
    (2, "The Priestess"),
    (8, "Lust"),
    (10, "Fortune"),
    (11, "Adjustment"),
    (14, "Art"),
    (20, "The Aeon"),
    (21, "The Universe"),
];

/// Aliases every style understands.
const COMMON_MAJORS: &[(u8, &str)] = &[
    (2, "High Priestess"),
    (10, "The Wheel of Fortune"),
    (20, "Judgment"),
];

const NUMERALS: [&str; 10] = ["1", "2", "3", "4", "5", "6", "7", "8", "9", "10"];

/// One recognizable card name.
#[derive(Debug, Clone, Serialize)]
pub struct LexiconEntry {
    /// Display form of the name.
    pub name: String,

    /// Cards this name may refer to, preferred reading first.
    pub cards: Vec<CardId>,

    /// Whether the name is also common vocabulary.
    pub ambiguous: bool,
}

/// Name lexicon for one deck style.
#[derive(Debug, Clone)]
pub struct CardLexicon {
    style: DeckStyle,
    entries: Vec<LexiconEntry>,
    index: HashMap<String, usize>,
}

impl CardLexicon {
    /// Build the lexicon for a deck style.
    pub fn for_style(style: DeckStyle) -> Self {
        let mut lexicon = Self {
            style,
            entries: Vec::new(),
            index: HashMap::new(),
        };

        // Style aliases go first so they win when a name collides with a
        // canonical name.
        if style == DeckStyle::Thoth {
            lexicon.add_thoth_aliases();
        }

        for card in catalog() {
            lexicon.add(&card.name, card.id);
        }

        for (number, alias) in COMMON_MAJORS {
            lexicon.add(alias, CardId(*number));
        }

        for card in catalog().iter().filter(|c| !c.is_major() && c.rank >= 2 && c.rank <= 10) {
            if let Some(suit) = card.suit {
                let numeral = NUMERALS[(card.rank - 1) as usize];
                lexicon.add(&format!("{} of {}", numeral, suit.name()), card.id);
            }
        }

        lexicon
    }

    fn add_thoth_aliases(&mut self) {
        for (number, alias) in THOTH_MAJORS {
            self.add(alias, CardId(*number));
        }

        for card in catalog().iter().filter(|c| !c.is_major()) {
            let Some(suit) = card.suit else { continue };
            let rank_name = MINOR_RANKS[(card.rank - 1) as usize].name;
            let thoth_rank = match card.rank {
                11 => "Princess",
                12 => "Prince",
                14 => "Knight",
                _ => rank_name,
            };

            let mut suit_names = vec![suit.name()];
            if suit == Suit::Pentacles {
                suit_names.insert(0, "Disks");
            }

            for suit_name in suit_names {
                if thoth_rank != rank_name || suit_name != suit.name() {
                    self.add(&format!("{} of {}", thoth_rank, suit_name), card.id);
                }
            }
        }
    }

    fn add(&mut self, name: &str, id: CardId) {
        let key = normalize_name(name);
        match self.index.get(&key) {
            Some(&i) => {
                let entry = &mut self.entries[i];
                if !entry.cards.contains(&id) {
                    entry.cards.push(id);
                }
            }
            None => {
                self.index.insert(key.clone(), self.entries.len());
                self.entries.push(LexiconEntry {
                    name: name.to_string(),
                    cards: vec![id],
                    ambiguous: AMBIGUOUS_NAMES.contains(&key.as_str()),
                });
            }
        }
    }

    pub fn style(&self) -> DeckStyle {
        self.style
    }

    /// All recognizable names.
    pub fn entries(&self) -> &[LexiconEntry] {
        &self.entries
    }

    /// Find the entry for a name (case and spacing insensitive).
    pub fn lookup(&self, name: &str) -> Option<&LexiconEntry> {
        self.index
            .get(&normalize_name(name))
            .map(|&i| &self.entries[i])
    }

    /// Resolve a name to its preferred card.
    pub fn resolve(&self, name: &str) -> Option<&'static Card> {
        self.lookup(name)
            .and_then(|e| e.cards.first())
            .and_then(|id| crate::cards::card(*id))
    }

    /// Every name that may refer to a card.
    pub fn names_for(&self, id: CardId) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|e| e.cards.contains(&id))
            .map(|e| e.name.as_str())
            .collect()
    }

    /// The name a reader of this deck would use for a card.
    pub fn display_name(&self, card: &Card) -> String {
        if self.style != DeckStyle::Thoth {
            return card.name.clone();
        }

        // The first entry listing the card is the Thoth name when one exists.
        let name = self
            .entries
            .iter()
            .find(|e| e.cards.first() == Some(&card.id))
            .map(|e| e.name.clone())
            .unwrap_or_else(|| card.name.clone());

        match card.suit.and_then(|s| crate::cards::thoth_pip_title(s, card.rank)) {
            Some(title) => format!("{} ({})", name, title),
            None => name,
        }
    }
}

impl Default for CardLexicon {
    fn default() -> Self {
        Self::for_style(DeckStyle::default())
    }
}

/// Normalize a card name for lookup: lowercase, single spaces, no
/// orientation suffix.
pub fn normalize_name(name: &str) -> String {
    let mut normalized = name
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();

    for suffix in ["(reversed)", "(upright)", " reversed", " upright"] {
        if let Some(stripped) = normalized.strip_suffix(suffix) {
            normalized = stripped.trim_end().to_string();
        }
    }

    normalized
}
