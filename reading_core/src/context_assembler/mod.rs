//! Context Assembler - builds the bounded prompt for narrative generation.
//!
//! The payload has two logical parts:
//! 1. **Instructions**: The style and ethics contract, spine rules, reversal
//!    guidance, and transition language between positions
//! 2. **Reading**: Spread header, question, one block per drawn card, then
//!    optional analysis notes, imagery, reflections, and reference passages
//!
//! When the payload exceeds the token budget, optional sections are dropped
//! in a fixed priority order: imagery, then passages from the least relevant
//! up, then reflections, then analysis notes. Instructions and card blocks are
//! never dropped.

mod style;

pub use style::*;

use serde::{Deserialize, Serialize};
use tarot_rules::{CardLexicon, DeckStyle, DrawnCard, Element, Orientation, Spread};

use crate::analysis::{RelationshipKind, ReversalFramework, SpreadAnalysis};
use crate::config::PromptConfig;
use crate::retrieval::RetrievedPassage;
use crate::tokens::TokenCounter;

/// Optional sections, in the order they are dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OptionalSection {
    Imagery,
    Passage,
    Reflections,
    AnalysisNotes,
}

/// Everything the assembler reads for one reading.
#[derive(Debug, Clone, Copy)]
pub struct PromptInputs<'a> {
    pub spread: &'a Spread,
    /// Cards in spread order.
    pub cards: &'a [DrawnCard],
    pub analysis: &'a SpreadAnalysis,
    /// Passages, most relevant first.
    pub passages: &'a [RetrievedPassage],
    pub question: Option<&'a str>,
    pub reflections: Option<&'a str>,
    pub lexicon: &'a CardLexicon,
}

/// Structured copy of the reading for composers that do not read prose.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompositionInput {
    pub spread_name: String,
    pub deck_style: DeckStyle,
    pub question: Option<String>,
    pub cards: Vec<CompositionCard>,
    pub framework: ReversalFramework,
    pub dominant_element: Option<Element>,
    /// Strongest detected pattern as (name, theme).
    pub lead_pattern: Option<(String, String)>,
}

/// One card as the local composer sees it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompositionCard {
    pub position: String,
    pub name: String,
    /// The deck's own name, when it differs from `name` (Thoth titles).
    pub deck_name: Option<String>,
    pub orientation: Orientation,
    pub keywords: Vec<String>,
    pub meaning: Option<String>,
    pub imagery: Option<String>,
    /// Elemental relationship to the previous position.
    pub link_from_previous: Option<RelationshipKind>,
}

/// The assembled prompt. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptPayload {
    pub system_instructions: String,
    pub user_content: String,
    /// Whether any optional section was dropped to fit the budget.
    pub truncated: bool,
    pub included_passage_count: usize,
    pub token_count: usize,
    /// Dropped sections, in drop order.
    pub dropped_sections: Vec<OptionalSection>,
    pub composition: CompositionInput,
}

/// Builds prompt payloads within a token budget.
#[derive(Debug, Clone)]
pub struct PromptAssembler {
    contract: StyleContract,
    token_budget: usize,
    include_imagery: bool,
    include_correspondences: bool,
    counter: TokenCounter,
}

/// Which optional sections are still included while fitting the budget.
#[derive(Debug, Clone)]
struct Inclusion {
    imagery: bool,
    passages: usize,
    reflections: bool,
    analysis_notes: bool,
}

impl PromptAssembler {
    pub fn new(contract: StyleContract, config: &PromptConfig) -> Self {
        Self {
            contract,
            token_budget: config.token_budget,
            include_imagery: config.include_imagery,
            include_correspondences: config.include_correspondences,
            counter: TokenCounter::new(),
        }
    }

    pub fn with_token_budget(mut self, budget: usize) -> Self {
        self.token_budget = budget;
        self
    }

    pub fn with_token_counter(mut self, counter: TokenCounter) -> Self {
        self.counter = counter;
        self
    }

    pub fn token_budget(&self) -> usize {
        self.token_budget
    }

    /// Assemble a payload, dropping optional sections until it fits.
    pub fn assemble(&self, inputs: &PromptInputs<'_>) -> PromptPayload {
        let system_instructions = self.instructions(inputs);
        let system_tokens = self.counter.count(&system_instructions);

        let mut inclusion = Inclusion {
            imagery: self.include_imagery && inputs.cards.iter().any(|c| imagery_for(c, inputs.lexicon).is_some()),
            passages: inputs.passages.len(),
            reflections: inputs.reflections.is_some_and(|r| !r.trim().is_empty()),
            analysis_notes: true,
        };
        let mut dropped = Vec::new();

        let mut user_content = self.user_content(inputs, &inclusion);
        let mut token_count = system_tokens + self.counter.count(&user_content);

        while token_count > self.token_budget {
            let Some(section) = drop_next(&mut inclusion) else {
                break;
            };
            if dropped.last() != Some(&section) {
                dropped.push(section);
            }
            user_content = self.user_content(inputs, &inclusion);
            token_count = system_tokens + self.counter.count(&user_content);
        }

        if token_count > self.token_budget {
            tracing::warn!(
                tokens = token_count,
                budget = self.token_budget,
                "required prompt content exceeds the token budget"
            );
        }
        if !dropped.is_empty() {
            tracing::debug!(?dropped, passages = inclusion.passages, "prompt truncated to fit budget");
        }

        PromptPayload {
            system_instructions,
            user_content,
            truncated: !dropped.is_empty(),
            included_passage_count: inclusion.passages,
            token_count,
            dropped_sections: dropped,
            composition: composition(inputs),
        }
    }

    /// Tokens needed for the instructions and card blocks alone.
    pub fn minimum_tokens(&self, inputs: &PromptInputs<'_>) -> usize {
        let bare = Inclusion {
            imagery: false,
            passages: 0,
            reflections: false,
            analysis_notes: false,
        };
        self.counter.count(&self.instructions(inputs)) + self.counter.count(&self.user_content(inputs, &bare))
    }

    fn instructions(&self, inputs: &PromptInputs<'_>) -> String {
        let positions: Vec<String> = inputs.cards.iter().map(|c| c.position.0.clone()).collect();
        self.contract.render(
            inputs.analysis.theme.reversal_framework,
            &positions,
            &inputs.analysis.relationships,
        )
    }

    fn user_content(&self, inputs: &PromptInputs<'_>, inclusion: &Inclusion) -> String {
        let mut sections = Vec::new();

        let mut header = format!("## Spread\n{} ({} cards)", inputs.spread.name, inputs.cards.len());
        if let Some(question) = inputs.question.filter(|q| !q.trim().is_empty()) {
            header.push_str(&format!("\nQuestion: {}", question.trim()));
        }
        sections.push(header);

        let mut cards = String::from("## Cards");
        for (i, drawn) in inputs.cards.iter().enumerate() {
            cards.push('\n');
            cards.push_str(&card_block(i, drawn, inputs.lexicon));
        }
        sections.push(cards);

        if inclusion.analysis_notes {
            sections.push(self.analysis_notes(inputs));
        }

        if inclusion.imagery {
            let mut imagery = String::from("## Imagery");
            for drawn in inputs.cards {
                if let Some(hook) = imagery_for(drawn, inputs.lexicon) {
                    imagery.push_str(&format!("\n- {}: {}", drawn.position, hook));
                }
            }
            sections.push(imagery);
        }

        if inclusion.reflections {
            if let Some(reflections) = inputs.reflections {
                sections.push(format!("## Querent's Reflections\n{}", reflections.trim()));
            }
        }

        if inclusion.passages > 0 {
            let mut passages = String::from("## Reference");
            for passage in inputs.passages.iter().take(inclusion.passages) {
                passages.push_str(&format!("\n- {}", passage.text));
            }
            sections.push(passages);
        }

        sections.join("\n\n")
    }

    fn analysis_notes(&self, inputs: &PromptInputs<'_>) -> String {
        let analysis = inputs.analysis;
        let mut notes = format!("## Analysis\n- Spread: {}", analysis.theme.describe());

        for pattern in &analysis.patterns {
            notes.push_str(&format!(
                "\n- Pattern {} ({}): {}",
                pattern.name,
                pattern.kind.name(),
                pattern.theme
            ));
        }

        for drawn in inputs.cards {
            let Some(element) = drawn.element(inputs.lexicon) else {
                continue;
            };
            let correspondence = if self.include_correspondences {
                drawn
                    .card(inputs.lexicon)
                    .and_then(|c| c.correspondence)
                    .map(|c| format!(", {}", c))
                    .unwrap_or_default()
            } else {
                String::new()
            };
            notes.push_str(&format!("\n- {}: {}{}", drawn.position, element, correspondence));
        }

        notes
    }
}

fn drop_next(inclusion: &mut Inclusion) -> Option<OptionalSection> {
    if inclusion.imagery {
        inclusion.imagery = false;
        Some(OptionalSection::Imagery)
    } else if inclusion.passages > 0 {
        inclusion.passages -= 1;
        Some(OptionalSection::Passage)
    } else if inclusion.reflections {
        inclusion.reflections = false;
        Some(OptionalSection::Reflections)
    } else if inclusion.analysis_notes {
        inclusion.analysis_notes = false;
        Some(OptionalSection::AnalysisNotes)
    } else {
        None
    }
}

/// Required block for one card: position, name, orientation, meaning.
fn card_block(index: usize, drawn: &DrawnCard, lexicon: &CardLexicon) -> String {
    let mut block = format!(
        "{}. {}: {} ({})",
        index + 1,
        drawn.position,
        drawn.name,
        drawn.orientation.label()
    );

    if let Some(name) = deck_name_for(drawn, lexicon) {
        block.push_str(&format!("\n   Thoth name: {}", name));
    }
    let keywords = keywords_for(drawn, lexicon);
    if !keywords.is_empty() {
        block.push_str(&format!("\n   Keywords: {}", keywords.join(", ")));
    }
    if let Some(meaning) = drawn.meaning.as_deref().filter(|m| !m.trim().is_empty()) {
        block.push_str(&format!("\n   Meaning: {}", meaning.trim()));
    }

    block
}

fn keywords_for(drawn: &DrawnCard, lexicon: &CardLexicon) -> Vec<String> {
    drawn
        .card(lexicon)
        .map(|c| c.keywords(drawn.is_reversed()).iter().map(|k| k.to_string()).collect())
        .unwrap_or_default()
}

/// Thoth decks retitle many cards; a pip also carries its title,
/// e.g. "Two of Wands (Dominion)".
fn deck_name_for(drawn: &DrawnCard, lexicon: &CardLexicon) -> Option<String> {
    if lexicon.style() != DeckStyle::Thoth {
        return None;
    }
    let name = lexicon.display_name(drawn.card(lexicon)?);
    (name != drawn.name).then_some(name)
}

fn imagery_for(drawn: &DrawnCard, lexicon: &CardLexicon) -> Option<&'static str> {
    drawn.card(lexicon).and_then(|c| c.imagery)
}

fn composition(inputs: &PromptInputs<'_>) -> CompositionInput {
    let analysis = inputs.analysis;

    let cards = inputs
        .cards
        .iter()
        .enumerate()
        .map(|(i, drawn)| CompositionCard {
            position: drawn.position.0.clone(),
            name: drawn.name.clone(),
            deck_name: deck_name_for(drawn, inputs.lexicon),
            orientation: drawn.orientation,
            keywords: keywords_for(drawn, inputs.lexicon),
            meaning: drawn.meaning.clone().filter(|m| !m.trim().is_empty()),
            imagery: imagery_for(drawn, inputs.lexicon).map(str::to_string),
            link_from_previous: analysis
                .relationships
                .iter()
                .find(|r| r.to_index == i)
                .map(|r| r.relationship),
        })
        .collect();

    CompositionInput {
        spread_name: inputs.spread.name.clone(),
        deck_style: inputs.lexicon.style(),
        question: inputs.question.map(str::trim).filter(|q| !q.is_empty()).map(str::to_string),
        cards,
        framework: analysis.theme.reversal_framework,
        dominant_element: analysis.theme.dominant_element,
        lead_pattern: analysis
            .strongest_pattern()
            .map(|p| (p.name.clone(), p.theme.clone())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::analyze;

    struct Fixture {
        spread: Spread,
        cards: Vec<DrawnCard>,
        analysis: SpreadAnalysis,
        passages: Vec<RetrievedPassage>,
        lexicon: CardLexicon,
    }

    impl Fixture {
        fn new() -> Self {
            let lexicon = CardLexicon::default();
            let cards = vec![
                DrawnCard::upright("The Tower", "Past"),
                DrawnCard::reversed("The Moon", "Present").with_meaning("Confusion about what is real."),
                DrawnCard::upright("The Star", "Future"),
            ];
            let analysis = analyze(&cards, &lexicon);
            let passages = (0..4)
                .map(|i| RetrievedPassage {
                    text: format!("Reference passage number {} about renewal after upheaval.", i),
                    source_tag: format!("test:{}", i),
                    relevance_score: 0.9 - i as f32 * 0.1,
                })
                .collect();

            Self {
                spread: Spread::three_card(),
                cards,
                analysis,
                passages,
                lexicon,
            }
        }

        fn inputs(&self) -> PromptInputs<'_> {
            PromptInputs {
                spread: &self.spread,
                cards: &self.cards,
                analysis: &self.analysis,
                passages: &self.passages,
                question: Some("Where is my work heading?"),
                reflections: Some("I have felt stuck since the reorganisation."),
                lexicon: &self.lexicon,
            }
        }
    }

    fn assembler() -> PromptAssembler {
        PromptAssembler::new(StyleContract::default(), &PromptConfig::default())
    }

    #[test]
    fn test_assemble_within_budget_keeps_everything() {
        let fixture = Fixture::new();
        let payload = assembler().assemble(&fixture.inputs());

        assert!(!payload.truncated);
        assert_eq!(payload.included_passage_count, 4);
        assert!(payload.user_content.contains("## Imagery"));
        assert!(payload.user_content.contains("## Querent's Reflections"));
        assert!(payload.user_content.contains("2. Present: The Moon (Reversed)"));
        assert!(payload.user_content.contains("Meaning: Confusion about what is real."));
        assert!(payload.user_content.contains("Pattern Dark Night to Dawn"));
        assert!(payload.system_instructions.contains("Past to Present"));
        assert!(payload.token_count <= PromptConfig::default().token_budget);
    }

    #[test]
    fn test_imagery_dropped_before_passages() {
        let fixture = Fixture::new();
        let full = assembler().assemble(&fixture.inputs());

        let payload = assembler()
            .with_token_budget(full.token_count - 1)
            .assemble(&fixture.inputs());

        assert!(payload.truncated);
        assert_eq!(payload.dropped_sections.first(), Some(&OptionalSection::Imagery));
        assert!(!payload.user_content.contains("## Imagery"));
        assert!(payload.token_count < full.token_count);
    }

    #[test]
    fn test_passages_dropped_lowest_relevance_first() {
        let fixture = Fixture::new();
        let assembler = assembler();
        let full = assembler.assemble(&fixture.inputs());

        // Budget that forces imagery and some passages out.
        let mut budget = full.token_count;
        let payload = loop {
            budget -= 1;
            let payload = assembler.clone().with_token_budget(budget).assemble(&fixture.inputs());
            if payload.included_passage_count < 4 {
                break payload;
            }
        };

        let kept = payload.included_passage_count;
        for i in 0..kept {
            assert!(payload.user_content.contains(&format!("number {} ", i)));
        }
        for i in kept..4 {
            assert!(!payload.user_content.contains(&format!("number {} ", i)));
        }
        assert!(payload.user_content.contains("## Querent's Reflections"));
    }

    #[test]
    fn test_minimum_budget_keeps_cards_and_instructions() {
        let fixture = Fixture::new();
        let assembler = assembler();
        let minimum = assembler.minimum_tokens(&fixture.inputs());

        let payload = assembler.with_token_budget(minimum).assemble(&fixture.inputs());

        assert!(payload.truncated);
        assert!(payload.token_count <= minimum);
        assert_eq!(payload.included_passage_count, 0);
        assert_eq!(
            payload.dropped_sections,
            vec![
                OptionalSection::Imagery,
                OptionalSection::Passage,
                OptionalSection::Reflections,
                OptionalSection::AnalysisNotes,
            ]
        );
        assert!(payload.system_instructions.contains("Never name any other tarot card"));
        for card in &fixture.cards {
            assert!(payload.user_content.contains(&format!(
                "{}: {} ({})",
                card.position,
                card.name,
                card.orientation.label()
            )));
        }
        assert!(payload.user_content.contains("Meaning: Confusion about what is real."));
    }

    #[test]
    fn test_budget_below_minimum_still_keeps_required_content() {
        let fixture = Fixture::new();
        let payload = assembler().with_token_budget(10).assemble(&fixture.inputs());

        assert!(payload.truncated);
        assert!(payload.token_count > 10);
        assert!(payload.user_content.contains("3. Future: The Star (Upright)"));
    }

    #[test]
    fn test_composition_carries_links() {
        let fixture = Fixture::new();
        let payload = assembler().assemble(&fixture.inputs());
        let composition = &payload.composition;

        assert_eq!(composition.cards.len(), 3);
        assert_eq!(composition.cards[0].link_from_previous, None);
        assert_eq!(composition.cards[1].link_from_previous, Some(RelationshipKind::Tension));
        assert_eq!(
            composition.lead_pattern.as_ref().map(|(name, _)| name.as_str()),
            Some("Dark Night to Dawn")
        );
        assert_eq!(composition.question.as_deref(), Some("Where is my work heading?"));
        assert!(composition.cards.iter().all(|c| c.deck_name.is_none()));
    }

    #[test]
    fn test_thoth_names_reach_prompt_and_composition() {
        let lexicon = CardLexicon::for_style(DeckStyle::Thoth);
        let cards = vec![
            DrawnCard::upright("Strength", "Past"),
            DrawnCard::reversed("Two of Wands", "Present"),
        ];
        let spread = Spread::new("Two Card", ["Past", "Present"]);
        let analysis = analyze(&cards, &lexicon);
        let payload = assembler().assemble(&PromptInputs {
            spread: &spread,
            cards: &cards,
            analysis: &analysis,
            passages: &[],
            question: None,
            reflections: None,
            lexicon: &lexicon,
        });

        assert!(payload.user_content.contains("1. Past: Strength (Upright)\n   Thoth name: Lust"));
        assert!(payload.user_content.contains("Thoth name: Two of Wands (Dominion)"));
        assert_eq!(payload.composition.cards[0].deck_name.as_deref(), Some("Lust"));
        assert_eq!(
            payload.composition.cards[1].deck_name.as_deref(),
            Some("Two of Wands (Dominion)")
        );
    }
}
