//! Card definitions for the 78-card deck.

mod major;
mod minor;

pub use major::*;
pub use minor::*;

use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// Classical elements used for elemental dignities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Element {
    Fire,
    Water,
    Air,
    Earth,
}

impl Element {
    pub const ALL: [Element; 4] = [Element::Fire, Element::Water, Element::Air, Element::Earth];

    /// Get the lowercase name of this element.
    pub fn name(&self) -> &'static str {
        match self {
            Element::Fire => "fire",
            Element::Water => "water",
            Element::Air => "air",
            Element::Earth => "earth",
        }
    }

    /// Parse an element or suit tag (e.g. "Fire", "wands", "Disks").
    pub fn from_tag(tag: &str) -> Option<Self> {
        let tag = tag.trim().to_lowercase();
        match tag.as_str() {
            "fire" => Some(Element::Fire),
            "water" => Some(Element::Water),
            "air" => Some(Element::Air),
            "earth" => Some(Element::Earth),
            _ => Suit::from_name(&tag).map(|s| s.element()),
        }
    }
}

impl std::fmt::Display for Element {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// The four minor arcana suits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Suit {
    Wands,
    Cups,
    Swords,
    Pentacles,
}

impl Suit {
    pub const ALL: [Suit; 4] = [Suit::Wands, Suit::Cups, Suit::Swords, Suit::Pentacles];

    /// Get the element ruling this suit.
    pub fn element(&self) -> Element {
        match self {
            Suit::Wands => Element::Fire,
            Suit::Cups => Element::Water,
            Suit::Swords => Element::Air,
            Suit::Pentacles => Element::Earth,
        }
    }

    /// Get the canonical suit name.
    pub fn name(&self) -> &'static str {
        match self {
            Suit::Wands => "Wands",
            Suit::Cups => "Cups",
            Suit::Swords => "Swords",
            Suit::Pentacles => "Pentacles",
        }
    }

    /// Parse a suit name, accepting common deck variants.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "wands" | "wand" | "rods" | "batons" => Some(Suit::Wands),
            "cups" | "cup" | "chalices" => Some(Suit::Cups),
            "swords" | "sword" => Some(Suit::Swords),
            "pentacles" | "pentacle" | "disks" | "discs" | "coins" => Some(Suit::Pentacles),
            _ => None,
        }
    }
}

impl std::fmt::Display for Suit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Major or minor arcana.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Arcana {
    Major,
    Minor,
}

/// Index of a card in the catalog (0-21 majors, 22-77 minors).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CardId(pub u8);

impl std::fmt::Display for CardId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "card:{}", self.0)
    }
}

/// A card in the catalog.
#[derive(Debug, Clone, Serialize)]
pub struct Card {
    pub id: CardId,

    /// Canonical (Rider-Waite-Smith) name.
    pub name: String,

    pub arcana: Arcana,

    /// Suit for minor arcana.
    pub suit: Option<Suit>,

    /// Major number (0-21) or minor rank (1-14, courts 11-14).
    pub rank: u8,

    pub element: Element,

    /// Hebrew letter and astrological attribution for majors.
    pub correspondence: Option<&'static str>,

    pub upright_keywords: Vec<&'static str>,
    pub reversed_keywords: Vec<&'static str>,

    /// Sensory imagery hook for prompts.
    pub imagery: Option<&'static str>,
}

impl Card {
    pub fn is_major(&self) -> bool {
        self.arcana == Arcana::Major
    }

    /// Court cards are ranks 11-14 of a suit.
    pub fn is_court(&self) -> bool {
        self.arcana == Arcana::Minor && self.rank >= 11
    }

    /// Keywords for the given orientation.
    pub fn keywords(&self, reversed: bool) -> &[&'static str] {
        if reversed {
            &self.reversed_keywords
        } else {
            &self.upright_keywords
        }
    }
}

/// The full 78-card catalog, built once.
pub fn catalog() -> &'static [Card] {
    static CATALOG: OnceLock<Vec<Card>> = OnceLock::new();
    CATALOG.get_or_init(build_catalog)
}

/// Get a card by catalog index.
pub fn card(id: CardId) -> Option<&'static Card> {
    catalog().get(id.0 as usize)
}

/// Get a major arcana card by its number.
pub fn major(number: u8) -> Option<&'static Card> {
    if (number as usize) < MAJOR_ARCANA.len() {
        card(CardId(number))
    } else {
        None
    }
}

/// Get a minor arcana card by suit and rank.
pub fn minor(suit: Suit, rank: u8) -> Option<&'static Card> {
    if !(1..=14).contains(&rank) {
        return None;
    }
    let suit_index = Suit::ALL.iter().position(|s| *s == suit)? as u8;
    card(CardId(MAJOR_ARCANA.len() as u8 + suit_index * 14 + rank - 1))
}

fn build_catalog() -> Vec<Card> {
    let mut cards = Vec::with_capacity(78);

    for (number, def) in MAJOR_ARCANA.iter().enumerate() {
        cards.push(Card {
            id: CardId(number as u8),
            name: def.name.to_string(),
            arcana: Arcana::Major,
            suit: None,
            rank: number as u8,
            element: def.element,
            correspondence: Some(def.correspondence),
            upright_keywords: def.upright.to_vec(),
            reversed_keywords: def.reversed.to_vec(),
            imagery: Some(def.imagery),
        });
    }

    for suit in Suit::ALL {
        for rank in 1..=14u8 {
            let rank_def = &MINOR_RANKS[(rank - 1) as usize];
            let mut upright = rank_def.upright.to_vec();
            upright.push(suit_domain(suit));
            let reversed = rank_def.reversed.to_vec();

            cards.push(Card {
                id: CardId(cards.len() as u8),
                name: format!("{} of {}", rank_def.name, suit.name()),
                arcana: Arcana::Minor,
                suit: Some(suit),
                rank,
                element: suit.element(),
                correspondence: None,
                upright_keywords: upright,
                reversed_keywords: reversed,
                imagery: if rank == 1 { Some(ace_imagery(suit)) } else { None },
            });
        }
    }

    cards
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_size() {
        assert_eq!(catalog().len(), 78);
        assert_eq!(catalog().iter().filter(|c| c.is_major()).count(), 22);
        assert_eq!(catalog().iter().filter(|c| c.is_court()).count(), 16);
    }

    #[test]
    fn test_catalog_ids_match_indices() {
        for (i, card) in catalog().iter().enumerate() {
            assert_eq!(card.id.0 as usize, i);
        }
    }

    #[test]
    fn test_minor_lookup() {
        let card = minor(Suit::Cups, 3).unwrap();
        assert_eq!(card.name, "Three of Cups");
        assert_eq!(card.element, Element::Water);

        let king = minor(Suit::Pentacles, 14).unwrap();
        assert_eq!(king.name, "King of Pentacles");
        assert!(minor(Suit::Wands, 15).is_none());
        assert!(minor(Suit::Wands, 0).is_none());
    }

    #[test]
    fn test_major_lookup() {
        assert_eq!(major(16).unwrap().name, "The Tower");
        assert_eq!(major(16).unwrap().element, Element::Fire);
        assert!(major(22).is_none());
    }

    #[test]
    fn test_element_from_tag() {
        assert_eq!(Element::from_tag("Fire"), Some(Element::Fire));
        assert_eq!(Element::from_tag("disks"), Some(Element::Earth));
        assert_eq!(Element::from_tag(" Cups "), Some(Element::Water));
        assert_eq!(Element::from_tag("spirit"), None);
    }
}
