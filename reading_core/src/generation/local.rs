//! Deterministic local composer: the last backend in every chain.

use async_trait::async_trait;

use super::NarrativeBackend;
use crate::analysis::{RelationshipKind, ReversalFramework};
use crate::context_assembler::{CompositionCard, CompositionInput, PromptPayload};
use crate::error::BackendError;
use crate::quality::{CardMentionScanner, DrawnSet};

/// Writes a reading from the structured composition input, with no external
/// call. Free text from the request (question, meanings) is only included
/// when it names no undrawn card.
#[derive(Debug, Clone)]
pub struct LocalComposer {
    id: String,
}

impl LocalComposer {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }

    pub fn compose(&self, input: &CompositionInput) -> String {
        let screen = TextScreen::new(input);
        let mut out = String::new();

        out.push_str(&format!(
            "This {} reading follows {} {} in order.",
            input.spread_name,
            input.cards.len(),
            if input.cards.len() == 1 { "card" } else { "cards" }
        ));
        if let Some(question) = input.question.as_deref().filter(|q| screen.allows(q)) {
            out.push_str(&format!(" You asked: \"{}\"", question));
            if !question.ends_with(['?', '.', '!']) {
                out.push('.');
            }
        }
        if let Some(element) = input.dominant_element {
            out.push_str(&format!(" Much of the spread leans toward {}.", element.name()));
        }
        out.push_str(" Each position builds on the one before, so the story may shift as it moves forward.\n\n");

        let last = input.cards.len().saturating_sub(1);
        for (i, card) in input.cards.iter().enumerate() {
            out.push_str(&self.section(card, input.framework, &screen));
            if i == last {
                if let Some((name, theme)) = &input.lead_pattern {
                    out.push_str(&format!(
                        " Taken together, the cards trace the {} pattern: {}.",
                        name, theme
                    ));
                }
            }
            out.push_str("\n\n");
        }

        out.trim_end().to_string()
    }

    fn section(&self, card: &CompositionCard, framework: ReversalFramework, screen: &TextScreen) -> String {
        let mut text = format!("### {}\n", card.position);

        let themes = match card.keywords.as_slice() {
            [] => "its own lesson".to_string(),
            [only] => only.clone(),
            [first, second, ..] => format!("{} and {}", first, second),
        };
        text.push_str(&format!("{} sits in the {} position", card.name, card.position));
        if card.orientation.is_reversed() {
            text.push_str(&format!(", reversed and {}", reversed_reading(framework)));
        }
        text.push_str(&format!(", bringing {} into view.", themes));
        if let Some(deck_name) = &card.deck_name {
            text.push_str(&format!(" In this deck it is titled {}.", deck_name));
        }

        if let Some(meaning) = card.meaning.as_deref().filter(|m| screen.allows(m)) {
            text.push_str(&format!(" As you understand it: {}", meaning));
            if !meaning.ends_with(['.', '!', '?']) {
                text.push('.');
            }
        }

        if let Some(imagery) = &card.imagery {
            text.push_str(&format!(" Picture {}.", imagery));
        }

        if let Some(link) = card.link_from_previous.filter(|k| *k != RelationshipKind::Neutral) {
            text.push_str(&format!(
                " Coming from the previous position, {}; {}, this card carries the thread forward.",
                link.gloss(),
                link.connector()
            ));
        }

        let focus = card.keywords.last().map(String::as_str).unwrap_or("what this card asks of you");
        text.push_str(&format!(
            " Because of this, {} may shape what unfolds next.",
            focus
        ));

        text
    }
}

impl Default for LocalComposer {
    fn default() -> Self {
        Self::new(crate::config::defaults::LOCAL_BACKEND_ID)
    }
}

#[async_trait]
impl NarrativeBackend for LocalComposer {
    fn id(&self) -> &str {
        &self.id
    }

    fn is_local(&self) -> bool {
        true
    }

    async fn generate(&self, payload: &PromptPayload) -> Result<String, BackendError> {
        Ok(self.compose(&payload.composition))
    }
}

fn reversed_reading(framework: ReversalFramework) -> &'static str {
    match framework {
        ReversalFramework::Blocked => "held back until it is released",
        ReversalFramework::Delayed => "still gathering its strength",
        ReversalFramework::Internalized => "turned inward for now",
        ReversalFramework::Contextual | ReversalFramework::None => "coloured by its neighbours",
    }
}

/// Rejects request text that names cards outside the reading.
struct TextScreen {
    scanner: Option<std::sync::Arc<CardMentionScanner>>,
    drawn: DrawnSet,
}

impl TextScreen {
    fn new(input: &CompositionInput) -> Self {
        match CardMentionScanner::for_style(input.deck_style) {
            Ok(scanner) => {
                let labels = input
                    .cards
                    .iter()
                    .map(|c| c.position.as_str())
                    .chain([input.spread_name.as_str()]);
                let drawn =
                    DrawnSet::new(input.cards.iter().map(|c| c.name.as_str()), scanner.lexicon()).with_labels(labels);
                Self {
                    scanner: Some(scanner),
                    drawn,
                }
            }
            Err(err) => {
                tracing::warn!(error = %err, "card name scanner unavailable, omitting request text");
                Self {
                    scanner: None,
                    drawn: DrawnSet::default(),
                }
            }
        }
    }

    fn allows(&self, text: &str) -> bool {
        match &self.scanner {
            Some(scanner) => !text.trim().is_empty() && scanner.undrawn(text, &self.drawn).is_empty(),
            None => false,
        }
    }
}
