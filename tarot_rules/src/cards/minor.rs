//! Minor arcana reference data.

use super::Suit;

/// Static definition of a minor arcana rank, shared across suits.
#[derive(Debug)]
pub struct RankDef {
    pub name: &'static str,
    pub upright: &'static [&'static str],
    pub reversed: &'static [&'static str],
}

/// Ranks 1-14 (Ace through King).
pub static MINOR_RANKS: [RankDef; 14] = [
    RankDef { name: "Ace", upright: &["new potential", "a seed"], reversed: &["delayed start"] },
    RankDef { name: "Two", upright: &["choice", "partnership"], reversed: &["indecision"] },
    RankDef { name: "Three", upright: &["growth", "collaboration"], reversed: &["friction in a group"] },
    RankDef { name: "Four", upright: &["stability", "rest"], reversed: &["stagnation"] },
    RankDef { name: "Five", upright: &["conflict", "loss"], reversed: &["recovery"] },
    RankDef { name: "Six", upright: &["harmony", "generosity"], reversed: &["imbalance"] },
    RankDef { name: "Seven", upright: &["assessment", "perseverance"], reversed: &["doubt"] },
    RankDef { name: "Eight", upright: &["movement", "mastery"], reversed: &["restriction"] },
    RankDef { name: "Nine", upright: &["near completion", "resilience"], reversed: &["fatigue"] },
    RankDef { name: "Ten", upright: &["culmination", "burden"], reversed: &["release of a cycle"] },
    RankDef { name: "Page", upright: &["curiosity", "a message"], reversed: &["immaturity"] },
    RankDef { name: "Knight", upright: &["pursuit", "action"], reversed: &["haste"] },
    RankDef { name: "Queen", upright: &["receptive mastery", "care"], reversed: &["insecurity"] },
    RankDef { name: "King", upright: &["command", "responsibility"], reversed: &["overreach"] },
];

/// Thoth minor titles for pips 1-10, in the order Wands, Cups, Swords, Disks.
pub static THOTH_PIP_TITLES: [[&str; 10]; 4] = [
    [
        "Root of Fire", "Dominion", "Virtue", "Completion", "Strife",
        "Victory", "Valour", "Swiftness", "Strength", "Oppression",
    ],
    [
        "Root of Water", "Love", "Abundance", "Luxury", "Disappointment",
        "Pleasure", "Debauch", "Indolence", "Happiness", "Satiety",
    ],
    [
        "Root of Air", "Peace", "Sorrow", "Truce", "Defeat",
        "Science", "Futility", "Interference", "Cruelty", "Ruin",
    ],
    [
        "Root of Earth", "Change", "Works", "Power", "Worry",
        "Success", "Failure", "Prudence", "Gain", "Wealth",
    ],
];

/// Life domain a suit speaks to.
pub fn suit_domain(suit: Suit) -> &'static str {
    match suit {
        Suit::Wands => "drive",
        Suit::Cups => "feeling",
        Suit::Swords => "thought",
        Suit::Pentacles => "material life",
    }
}

pub(super) fn ace_imagery(suit: Suit) -> &'static str {
    match suit {
        Suit::Wands => "a hand from the clouds gripping a budding staff",
        Suit::Cups => "a hand from the clouds offering an overflowing vessel",
        Suit::Swords => "a hand from the clouds raising a crowned blade",
        Suit::Pentacles => "a hand from the clouds holding a golden coin over a garden",
    }
}

/// Thoth title for a pip card, if any.
pub fn thoth_pip_title(suit: Suit, rank: u8) -> Option<&'static str> {
    if !(1..=10).contains(&rank) {
        return None;
    }
    let suit_index = Suit::ALL.iter().position(|s| *s == suit)?;
    Some(THOTH_PIP_TITLES[suit_index][(rank - 1) as usize])
}
