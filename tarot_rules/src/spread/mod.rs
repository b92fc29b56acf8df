//! Spreads, positions, and drawn cards.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::cards::{Card, Element, Suit};
use crate::deck::CardLexicon;

/// Card orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    #[default]
    Upright,
    Reversed,
}

impl Orientation {
    pub fn is_reversed(&self) -> bool {
        matches!(self, Orientation::Reversed)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Orientation::Upright => "Upright",
            Orientation::Reversed => "Reversed",
        }
    }
}

impl std::str::FromStr for Orientation {
    type Err = SpreadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "upright" | "up" | "" => Ok(Orientation::Upright),
            "reversed" | "reverse" | "rx" => Ok(Orientation::Reversed),
            other => Err(SpreadError::UnknownOrientation(other.to_string())),
        }
    }
}

/// A named slot in a spread (e.g. "Present", "Challenge").
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Position(pub String);

impl Position {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An ordered sequence of positions, fixed before a reading starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Spread {
    pub name: String,
    pub positions: Vec<Position>,
}

impl Spread {
    pub fn new(name: impl Into<String>, positions: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            name: name.into(),
            positions: positions.into_iter().map(Position::new).collect(),
        }
    }

    pub fn single_card() -> Self {
        Self::new("Single Card", ["Focus"])
    }

    pub fn three_card() -> Self {
        Self::new("Three Card", ["Past", "Present", "Future"])
    }

    pub fn celtic_cross() -> Self {
        Self::new(
            "Celtic Cross",
            [
                "Present",
                "Challenge",
                "Foundation",
                "Past",
                "Crown",
                "Near Future",
                "Self",
                "Environment",
                "Hopes and Fears",
                "Outcome",
            ],
        )
    }

    /// Look up a built-in spread by name.
    pub fn builtin(name: &str) -> Option<Self> {
        let key = name.trim().to_lowercase().replace(['-', '_'], " ");
        match key.as_str() {
            "single card" | "single" | "one card" | "daily" => Some(Self::single_card()),
            "three card" | "three" | "past present future" => Some(Self::three_card()),
            "celtic cross" | "celtic" => Some(Self::celtic_cross()),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Index of a position by name (case insensitive).
    pub fn position_index(&self, position: &Position) -> Option<usize> {
        self.positions
            .iter()
            .position(|p| p.0.eq_ignore_ascii_case(position.as_str()))
    }
}

/// A card drawn into a position. Created once per reading, read-only after.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrawnCard {
    pub name: String,
    pub orientation: Orientation,
    pub position: Position,

    /// Explicit rank; otherwise taken from the catalog.
    #[serde(default)]
    pub numeric_rank: Option<u8>,

    /// Explicit suit or element tag; otherwise taken from the catalog.
    #[serde(default)]
    pub suit_or_element_tag: Option<String>,

    /// Caller-provided meaning text.
    #[serde(default)]
    pub meaning: Option<String>,
}

impl DrawnCard {
    pub fn new(name: impl Into<String>, orientation: Orientation, position: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            orientation,
            position: Position::new(position),
            numeric_rank: None,
            suit_or_element_tag: None,
            meaning: None,
        }
    }

    pub fn upright(name: impl Into<String>, position: impl Into<String>) -> Self {
        Self::new(name, Orientation::Upright, position)
    }

    pub fn reversed(name: impl Into<String>, position: impl Into<String>) -> Self {
        Self::new(name, Orientation::Reversed, position)
    }

    pub fn with_rank(mut self, rank: u8) -> Self {
        self.numeric_rank = Some(rank);
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.suit_or_element_tag = Some(tag.into());
        self
    }

    pub fn with_meaning(mut self, meaning: impl Into<String>) -> Self {
        self.meaning = Some(meaning.into());
        self
    }

    pub fn is_reversed(&self) -> bool {
        self.orientation.is_reversed()
    }

    /// Catalog entry for this card, if the name is known.
    pub fn card(&self, lexicon: &CardLexicon) -> Option<&'static Card> {
        lexicon.resolve(&self.name)
    }

    /// Element from the explicit tag, falling back to the catalog.
    pub fn element(&self, lexicon: &CardLexicon) -> Option<Element> {
        self.suit_or_element_tag
            .as_deref()
            .and_then(Element::from_tag)
            .or_else(|| self.card(lexicon).map(|c| c.element))
    }

    /// Suit from the explicit tag, falling back to the catalog.
    pub fn suit(&self, lexicon: &CardLexicon) -> Option<Suit> {
        match self.suit_or_element_tag.as_deref().and_then(Suit::from_name) {
            Some(suit) => Some(suit),
            None => self.card(lexicon).and_then(|c| c.suit),
        }
    }

    /// Rank from the explicit value, falling back to the catalog.
    pub fn rank(&self, lexicon: &CardLexicon) -> Option<u8> {
        self.numeric_rank.or_else(|| self.card(lexicon).map(|c| c.rank))
    }

    pub fn is_major(&self, lexicon: &CardLexicon) -> bool {
        self.card(lexicon).map(|c| c.is_major()).unwrap_or(false)
    }
}

/// Validation errors for a reading's input.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SpreadError {
    #[error("reading has no cards")]
    NoCards,

    #[error("spread '{spread}' declares {expected} positions but {actual} cards were drawn")]
    CardCountMismatch {
        spread: String,
        expected: usize,
        actual: usize,
    },

    #[error("position '{0}' is not part of the spread")]
    UnknownPosition(String),

    #[error("position '{0}' holds more than one card")]
    DuplicatePosition(String),

    #[error("card at position '{0}' has no name")]
    BlankCardName(String),

    #[error("unknown orientation '{0}'")]
    UnknownOrientation(String),
}

/// Check that the drawn cards are consistent with the spread.
///
/// An empty spread declares no positions, so only the cards themselves are
/// checked.
pub fn validate_reading(spread: &Spread, cards: &[DrawnCard]) -> Result<(), SpreadError> {
    if cards.is_empty() {
        return Err(SpreadError::NoCards);
    }

    for card in cards {
        if card.name.trim().is_empty() {
            return Err(SpreadError::BlankCardName(card.position.0.clone()));
        }
    }

    if spread.is_empty() {
        return Ok(());
    }

    if spread.len() != cards.len() {
        return Err(SpreadError::CardCountMismatch {
            spread: spread.name.clone(),
            expected: spread.len(),
            actual: cards.len(),
        });
    }

    let mut seen = HashSet::new();
    for card in cards {
        let index = spread
            .position_index(&card.position)
            .ok_or_else(|| SpreadError::UnknownPosition(card.position.0.clone()))?;
        if !seen.insert(index) {
            return Err(SpreadError::DuplicatePosition(card.position.0.clone()));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn three_card_reading() -> Vec<DrawnCard> {
        vec![
            DrawnCard::upright("The Tower", "Past"),
            DrawnCard::reversed("The Moon", "Present"),
            DrawnCard::upright("The Star", "Future"),
        ]
    }

    #[test]
    fn test_valid_reading() {
        assert!(validate_reading(&Spread::three_card(), &three_card_reading()).is_ok());
    }

    #[test]
    fn test_empty_reading() {
        assert_eq!(
            validate_reading(&Spread::three_card(), &[]),
            Err(SpreadError::NoCards)
        );
    }

    #[test]
    fn test_count_mismatch() {
        let cards = &three_card_reading()[..2];
        assert!(matches!(
            validate_reading(&Spread::three_card(), cards),
            Err(SpreadError::CardCountMismatch { expected: 3, actual: 2, .. })
        ));
    }

    #[test]
    fn test_unknown_and_duplicate_positions() {
        let mut cards = three_card_reading();
        cards[2].position = Position::new("Outcome");
        assert_eq!(
            validate_reading(&Spread::three_card(), &cards),
            Err(SpreadError::UnknownPosition("Outcome".to_string()))
        );

        cards[2].position = Position::new("past");
        assert_eq!(
            validate_reading(&Spread::three_card(), &cards),
            Err(SpreadError::DuplicatePosition("past".to_string()))
        );
    }

    #[test]
    fn test_duplicate_card_names_allowed() {
        let cards = vec![
            DrawnCard::upright("The Star", "Past"),
            DrawnCard::upright("The Star", "Present"),
            DrawnCard::upright("The Star", "Future"),
        ];
        assert!(validate_reading(&Spread::three_card(), &cards).is_ok());
    }

    #[test]
    fn test_orientation_parse() {
        assert_eq!("Reversed".parse::<Orientation>(), Ok(Orientation::Reversed));
        assert_eq!("upright".parse::<Orientation>(), Ok(Orientation::Upright));
        assert!("sideways".parse::<Orientation>().is_err());
    }

    #[test]
    fn test_drawn_card_attributes() {
        let lexicon = CardLexicon::default();
        let card = DrawnCard::upright("Three of Cups", "Present");
        assert_eq!(card.element(&lexicon), Some(Element::Water));
        assert_eq!(card.suit(&lexicon), Some(Suit::Cups));
        assert_eq!(card.rank(&lexicon), Some(3));

        let custom = DrawnCard::upright("Ember Sprite", "Present").with_tag("fire").with_rank(4);
        assert_eq!(custom.element(&lexicon), Some(Element::Fire));
        assert_eq!(custom.suit(&lexicon), None);
        assert_eq!(custom.rank(&lexicon), Some(4));
    }

    #[test]
    fn test_builtin_spreads() {
        assert_eq!(Spread::builtin("Celtic Cross").unwrap().len(), 10);
        assert_eq!(Spread::builtin("three-card").unwrap().len(), 3);
        assert!(Spread::builtin("horseshoe").is_none());
    }

    #[test]
    fn test_drawn_card_serde() {
        let json = r#"{"name":"The Star","orientation":"reversed","position":"Future"}"#;
        let card: DrawnCard = serde_json::from_str(json).unwrap();
        assert!(card.is_reversed());
        assert_eq!(card.position.as_str(), "Future");
        assert!(card.meaning.is_none());
    }
}
