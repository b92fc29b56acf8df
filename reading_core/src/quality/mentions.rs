//! Card name recognition in free text.

use regex::Regex;
use std::collections::BTreeSet;
use std::sync::{Arc, OnceLock};

use tarot_rules::{normalize_name, CardId, CardLexicon, DeckStyle};

/// Words that mark an ambiguous name as a card reference.
const CARD_CUES: &[&str] = &[
    "card", "cards", "draw", "drew", "drawn", "reversed", "upright", "arcana", "position",
];

/// How many words either side of a mention are searched for a cue.
const CUE_WINDOW: usize = 4;

/// Words that mark a reading label (a position or the spread name) as a
/// label rather than a card.
const LABEL_CUES: &[&str] = &["position", "positions", "spread", "reading"];

/// A card name found in text.
#[derive(Debug, Clone, PartialEq)]
pub struct Mention {
    /// The name as written.
    pub text: String,
    pub start: usize,
    pub end: usize,
    /// Cards the name may refer to.
    pub cards: Vec<CardId>,
    pub ambiguous: bool,
    /// Whether the mention counts as a card reference.
    pub counted: bool,
}

/// The cards drawn for a reading, as names and resolved ids, plus the
/// reading's own labels.
#[derive(Debug, Clone, Default)]
pub struct DrawnSet {
    ids: BTreeSet<CardId>,
    names: BTreeSet<String>,
    labels: Option<Regex>,
}

impl DrawnSet {
    pub fn new<'a>(names: impl IntoIterator<Item = &'a str>, lexicon: &CardLexicon) -> Self {
        let mut set = Self::default();
        for name in names {
            if let Some(entry) = lexicon.lookup(name) {
                set.ids.extend(entry.cards.iter().copied());
            }
            set.names.insert(normalize_name(name));
        }
        set
    }

    /// Position labels and the spread name. A label may share its words
    /// with a card ("Strength", "The Lovers Spread"); where the text uses it
    /// as a label, the words inside are not card mentions.
    pub fn with_labels<'a>(mut self, labels: impl IntoIterator<Item = &'a str>) -> Self {
        let labels: Vec<&str> = labels.into_iter().collect();
        if labels.iter().all(|l| l.trim().is_empty()) {
            return self;
        }
        match names_pattern(&labels) {
            Ok(pattern) => self.labels = Some(pattern),
            Err(err) => tracing::warn!(error = %err, "could not build reading label pattern"),
        }
        self
    }

    /// A mention is drawn if its text names a drawn card or any of its
    /// candidate cards was drawn.
    pub fn covers(&self, mention: &Mention) -> bool {
        self.names.contains(&normalize_name(&mention.text))
            || mention.cards.iter().any(|id| self.ids.contains(id))
    }

    /// Byte ranges of `text` where a reading label is used as a label: a
    /// section heading, or followed by "position", "spread" or "reading".
    fn label_spans(&self, text: &str) -> Vec<(usize, usize)> {
        let Some(pattern) = &self.labels else {
            return Vec::new();
        };
        pattern
            .find_iter(text)
            .filter(|m| is_heading(text, m.start()) || next_word_is_label_cue(&text[m.end()..]))
            .map(|m| (m.start(), m.end()))
            .collect()
    }
}

/// Finds card names from one deck style's lexicon.
#[derive(Debug)]
pub struct CardMentionScanner {
    lexicon: CardLexicon,
    pattern: Regex,
}

impl CardMentionScanner {
    pub fn new(lexicon: CardLexicon) -> Result<Self, regex::Error> {
        let names: Vec<&str> = lexicon.entries().iter().map(|e| e.name.as_str()).collect();
        let pattern = names_pattern(&names)?;
        Ok(Self { lexicon, pattern })
    }

    /// Shared scanner for a deck style, compiled once per process.
    pub fn for_style(style: DeckStyle) -> Result<Arc<Self>, regex::Error> {
        static RIDER_WAITE_SMITH: OnceLock<Result<Arc<CardMentionScanner>, regex::Error>> = OnceLock::new();
        static THOTH: OnceLock<Result<Arc<CardMentionScanner>, regex::Error>> = OnceLock::new();

        let cell = match style {
            DeckStyle::RiderWaiteSmith => &RIDER_WAITE_SMITH,
            DeckStyle::Thoth => &THOTH,
        };
        cell.get_or_init(|| Self::new(CardLexicon::for_style(style)).map(Arc::new))
            .clone()
    }

    pub fn lexicon(&self) -> &CardLexicon {
        &self.lexicon
    }

    /// Every card name in `text`, longest name first at each position.
    pub fn mentions(&self, text: &str) -> Vec<Mention> {
        self.pattern
            .find_iter(text)
            .filter_map(|m| {
                let entry = self.lexicon.lookup(m.as_str())?;
                let counted = !entry.ambiguous
                    || (is_title_case(m.as_str())
                        && !is_parenthesized(text, m.start(), m.end())
                        && in_card_context(text, m.start(), m.end()));

                Some(Mention {
                    text: m.as_str().to_string(),
                    start: m.start(),
                    end: m.end(),
                    cards: entry.cards.clone(),
                    ambiguous: entry.ambiguous,
                    counted,
                })
            })
            .collect()
    }

    /// Counted mentions of cards that were not drawn, by lexicon name, in
    /// order of first appearance.
    pub fn undrawn(&self, text: &str, drawn: &DrawnSet) -> Vec<String> {
        let mut seen = BTreeSet::new();
        let mut names = Vec::new();
        let labels = drawn.label_spans(text);

        for mention in self.mentions(text) {
            if !mention.counted || drawn.covers(&mention) {
                continue;
            }
            if labels.iter().any(|&(start, end)| start <= mention.start && mention.end <= end) {
                continue;
            }
            let name = self
                .lexicon
                .lookup(&mention.text)
                .map(|e| e.name.clone())
                .unwrap_or(mention.text);
            if seen.insert(normalize_name(&name)) {
                names.push(name);
            }
        }

        names
    }
}

/// Case-insensitive, word-bounded alternation of names, longest first.
pub(crate) fn names_pattern(names: &[&str]) -> Result<Regex, regex::Error> {
    let mut sorted: Vec<&str> = names.iter().copied().filter(|n| !n.trim().is_empty()).collect();
    sorted.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
    sorted.dedup();

    let alternation = sorted
        .iter()
        .map(|n| regex::escape(n.trim()).replace(' ', r"\s+"))
        .collect::<Vec<_>>()
        .join("|");

    Regex::new(&format!(r"(?i)\b(?:{})\b", alternation))
}

fn is_title_case(name: &str) -> bool {
    name.split_whitespace()
        .filter(|w| !matches!(*w, "of" | "to"))
        .all(|w| w.chars().next().is_some_and(char::is_uppercase))
}

fn is_parenthesized(text: &str, start: usize, end: usize) -> bool {
    text[..start].trim_end().ends_with('(') && text[end..].trim_start().starts_with(')')
}

fn in_card_context(text: &str, start: usize, end: usize) -> bool {
    let before = &text[..start];
    let after = &text[end..];

    if before.ends_with(['*', '"', '\u{201c}', '\'', '\u{2018}']) || after.starts_with(['*', '"', '\u{201d}']) {
        return true;
    }

    let before_words: Vec<String> = words(before).collect();
    let after_words: Vec<String> = words(after).take(CUE_WINDOW).collect();
    let near_before = before_words.iter().rev().take(CUE_WINDOW);

    near_before
        .chain(after_words.iter())
        .any(|w| CARD_CUES.contains(&w.as_str()))
}

/// Whether `start` is the first text on a markdown heading line.
fn is_heading(text: &str, start: usize) -> bool {
    let line_start = text[..start].rfind('\n').map_or(0, |i| i + 1);
    let prefix = text[line_start..start].trim();
    !prefix.is_empty() && prefix.chars().all(|c| c == '#')
}

fn next_word_is_label_cue(after: &str) -> bool {
    words(after).next().is_some_and(|w| LABEL_CUES.contains(&w.as_str()))
}

fn words(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scanner() -> Arc<CardMentionScanner> {
        CardMentionScanner::for_style(DeckStyle::RiderWaiteSmith).unwrap()
    }

    fn drawn(names: &[&str]) -> DrawnSet {
        DrawnSet::new(names.iter().copied(), &CardLexicon::default())
    }

    #[test]
    fn test_longest_name_wins() {
        let mentions = scanner().mentions("The High Priestess keeps her counsel.");
        assert_eq!(mentions.len(), 1);
        assert_eq!(mentions[0].text, "The High Priestess");
    }

    #[test]
    fn test_word_boundaries() {
        assert!(scanner().mentions("A deathly quiet and some artwork.").is_empty());
    }

    #[test]
    fn test_names_span_line_breaks() {
        let mentions = scanner().mentions("then the Three of\nSwords returns");
        assert_eq!(mentions.len(), 1);
        assert!(mentions[0].counted);
    }

    #[test]
    fn test_ambiguous_needs_card_context() {
        let s = scanner();
        let set = drawn(&["The Tower"]);

        assert!(s.undrawn("Walk under the moon tonight.", &set).is_empty());
        assert!(s.undrawn("The Moon rose over the hills.", &set).is_empty());
        assert_eq!(s.undrawn("The Moon card warns of illusion.", &set), vec!["The Moon"]);
        assert_eq!(s.undrawn("Here **The Moon** appears.", &set), vec!["The Moon"]);
        assert_eq!(s.undrawn("You drew The Moon in this spread.", &set), vec!["The Moon"]);
    }

    #[test]
    fn test_parenthesized_title_not_counted() {
        let mentions = scanner().mentions("Nine of Wands (Strength) in the position of effort.");
        let strength = mentions.iter().find(|m| m.text == "Strength").unwrap();
        assert!(!strength.counted);
    }

    #[test]
    fn test_unambiguous_names_always_count() {
        let s = scanner();
        assert_eq!(s.undrawn("the hermit walks alone", &drawn(&["The Star"])), vec!["The Hermit"]);
    }

    #[test]
    fn test_drawn_aliases_not_reported() {
        let s = scanner();
        let set = drawn(&["Judgement"]);
        assert!(s.undrawn("The Judgment card calls you.", &set).is_empty());
    }

    #[test]
    fn test_undrawn_reports_each_name_once() {
        let s = scanner();
        let text = "The Hermit waits. Later the Hermit returns, and so does the Two of Cups.";
        assert_eq!(s.undrawn(text, &drawn(&[])), vec!["The Hermit", "Two of Cups"]);
    }

    #[test]
    fn test_reading_labels_are_not_mentions() {
        let s = scanner();
        let set = drawn(&["Three of Cups", "Five of Swords"]).with_labels(["Strength", "Block", "The Hermit Spread"]);

        let text = "### Strength\nThree of Cups appears upright in the Strength position.\n\n\
This The Hermit Spread reading begins with Five of Swords.";
        assert!(s.undrawn(text, &set).is_empty());
    }

    #[test]
    fn test_label_words_still_count_outside_label_use() {
        let s = scanner();
        let set = drawn(&["Three of Cups"]).with_labels(["Strength", "The Hermit"]);

        assert_eq!(s.undrawn("The Strength card asks for patience.", &set), vec!["Strength"]);
        assert_eq!(s.undrawn("Next to it, The Hermit waits.", &set), vec!["The Hermit"]);
        assert!(s.undrawn("## The Hermit\nThree of Cups celebrates.", &set).is_empty());
    }

    #[test]
    fn test_thoth_collision_resolves_to_any_candidate() {
        let s = CardMentionScanner::for_style(DeckStyle::Thoth).unwrap();
        let set = DrawnSet::new(["Knight of Wands"], s.lexicon());

        assert!(s.undrawn("The Knight of Wands charges ahead.", &set).is_empty());
        assert_eq!(s.undrawn("The Queen of Disks steadies things.", &set), vec!["Queen of Disks"]);
    }
}
