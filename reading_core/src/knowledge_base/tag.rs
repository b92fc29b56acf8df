//! Tag definitions - nodes in the knowledge graph.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tarot_rules::{CardId, Element, Suit};

/// Tags are the nodes in our knowledge graph.
/// They name the symbols a passage speaks to, and serialize as their
/// string form (`"element:fire"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Tag {
    /// A specific card in the catalog.
    Card(CardId),

    /// One of the four elements.
    Element(Element),

    /// A minor arcana suit.
    Suit(Suit),

    /// A named archetypal pattern (e.g., "Healing Arc").
    Pattern(String),

    /// A reversal framework (e.g., "delayed").
    Framework(String),

    /// An elemental relationship kind (e.g., "tension").
    Relationship(String),

    /// A broad theme (e.g., "court cards", "major arcana").
    Theme(String),

    /// Custom tag for extension.
    Custom(String),
}

impl Tag {
    pub fn card(id: CardId) -> Self {
        Tag::Card(id)
    }

    pub fn element(element: Element) -> Self {
        Tag::Element(element)
    }

    pub fn suit(suit: Suit) -> Self {
        Tag::Suit(suit)
    }

    pub fn pattern(name: impl Into<String>) -> Self {
        Tag::Pattern(name.into())
    }

    pub fn framework(name: impl Into<String>) -> Self {
        Tag::Framework(name.into())
    }

    pub fn relationship(name: impl Into<String>) -> Self {
        Tag::Relationship(name.into())
    }

    pub fn theme(name: impl Into<String>) -> Self {
        Tag::Theme(name.into())
    }

    pub fn custom(name: impl Into<String>) -> Self {
        Tag::Custom(name.into())
    }

    /// Convert the tag to a string representation.
    pub fn as_string(&self) -> String {
        match self {
            Tag::Card(id) => format!("card:{}", id.0),
            Tag::Element(e) => format!("element:{}", e.name()),
            Tag::Suit(s) => format!("suit:{}", s.name().to_lowercase()),
            Tag::Pattern(s) => format!("pattern:{}", s),
            Tag::Framework(s) => format!("framework:{}", s),
            Tag::Relationship(s) => format!("relationship:{}", s),
            Tag::Theme(s) => format!("theme:{}", s),
            Tag::Custom(s) => format!("custom:{}", s),
        }
    }

    /// Parse the string form produced by [`Tag::as_string`].
    ///
    /// Untyped strings become custom tags.
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        if value.is_empty() {
            return None;
        }

        let Some((category, name)) = value.split_once(':') else {
            return Some(Tag::Custom(value.to_string()));
        };
        let name = name.trim();

        match category.trim().to_lowercase().as_str() {
            "card" => name.parse::<u8>().ok().map(|n| Tag::Card(CardId(n))),
            "element" => Element::from_tag(name).map(Tag::Element),
            "suit" => Suit::from_name(name).map(Tag::Suit),
            "pattern" => Some(Tag::pattern(name)),
            "framework" => Some(Tag::framework(name.to_lowercase())),
            "relationship" => Some(Tag::relationship(name.to_lowercase())),
            "theme" => Some(Tag::theme(name)),
            "custom" => Some(Tag::custom(name)),
            _ => Some(Tag::Custom(value.to_string())),
        }
    }

    /// Get the category/type of this tag.
    pub fn category(&self) -> &'static str {
        match self {
            Tag::Card(_) => "card",
            Tag::Element(_) => "element",
            Tag::Suit(_) => "suit",
            Tag::Pattern(_) => "pattern",
            Tag::Framework(_) => "framework",
            Tag::Relationship(_) => "relationship",
            Tag::Theme(_) => "theme",
            Tag::Custom(_) => "custom",
        }
    }
}

impl std::fmt::Display for Tag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_string())
    }
}

impl Serialize for Tag {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.as_string())
    }
}

impl<'de> Deserialize<'de> for Tag {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        Tag::parse(&value).ok_or_else(|| serde::de::Error::custom(format!("invalid tag '{}'", value)))
    }
}

// Ordering by string form keeps graph iteration deterministic.
impl PartialOrd for Tag {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Tag {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.as_string().cmp(&other.as_string())
    }
}
