//! Inbound request and outbound response shapes.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use tarot_rules::{validate_reading, DeckStyle, DrawnCard, Orientation, Spread, SpreadError};

use crate::evaluator::GateDecision;
use crate::quality::QualityVerdict;

/// Name given to spreads defined only by their cards.
const CUSTOM_SPREAD: &str = "Custom Spread";

/// A reading request from the calling layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadingRequest {
    #[serde(default)]
    pub spread_info: Option<SpreadInfo>,
    pub cards_info: Vec<CardInfo>,
    #[serde(default)]
    pub user_question: Option<String>,
    #[serde(default)]
    pub reflections_text: Option<String>,
    #[serde(default)]
    pub deck_style: Option<String>,
    /// Caller-supplied id; one is generated when absent.
    #[serde(default)]
    pub request_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpreadInfo {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub positions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardInfo {
    pub position: String,
    pub card: String,
    #[serde(default)]
    pub orientation: Option<String>,
    #[serde(default)]
    pub meaning: Option<String>,
    #[serde(default)]
    pub numeric_rank: Option<u8>,
    #[serde(default)]
    pub suit_or_element_tag: Option<String>,
}

/// A validated request, with cards in spread order.
#[derive(Debug, Clone)]
pub struct ValidatedReading {
    pub request_id: Uuid,
    pub spread: Spread,
    pub cards: Vec<DrawnCard>,
    pub deck_style: DeckStyle,
    pub question: Option<String>,
    pub reflections: Option<String>,
}

impl ReadingRequest {
    /// Resolve the spread, parse the cards and check they agree.
    ///
    /// Explicit positions win; otherwise a built-in spread is looked up by
    /// name; otherwise the cards' own positions, in order, form the spread.
    pub fn validate(&self) -> Result<ValidatedReading, SpreadError> {
        let mut cards = self
            .cards_info
            .iter()
            .map(CardInfo::to_drawn)
            .collect::<Result<Vec<_>, _>>()?;

        let info = self.spread_info.clone().unwrap_or_default();
        let spread = if !info.positions.is_empty() {
            Spread::new(info.name.as_deref().unwrap_or(CUSTOM_SPREAD), info.positions)
        } else if let Some(spread) = info.name.as_deref().and_then(Spread::builtin) {
            spread
        } else {
            Spread::new(
                info.name.as_deref().unwrap_or(CUSTOM_SPREAD),
                cards.iter().map(|c| c.position.0.clone()),
            )
        };

        validate_reading(&spread, &cards)?;
        cards.sort_by_key(|c| spread.position_index(&c.position).unwrap_or(usize::MAX));

        let deck_style = match self.deck_style.as_deref() {
            None => DeckStyle::default(),
            Some(tag) => DeckStyle::from_tag(tag).unwrap_or_else(|| {
                tracing::warn!(deck_style = tag, "unknown deck style, using the default");
                DeckStyle::default()
            }),
        };

        Ok(ValidatedReading {
            request_id: self.request_id.unwrap_or_else(Uuid::new_v4),
            spread,
            cards,
            deck_style,
            question: non_blank(self.user_question.as_deref()),
            reflections: non_blank(self.reflections_text.as_deref()),
        })
    }
}

impl CardInfo {
    fn to_drawn(&self) -> Result<DrawnCard, SpreadError> {
        let orientation: Orientation = match self.orientation.as_deref() {
            Some(text) => text.parse()?,
            None => Orientation::Upright,
        };

        let mut drawn = DrawnCard::new(self.card.trim(), orientation, self.position.trim());
        if let Some(rank) = self.numeric_rank {
            drawn = drawn.with_rank(rank);
        }
        if let Some(tag) = &self.suit_or_element_tag {
            drawn = drawn.with_tag(tag.clone());
        }
        if let Some(meaning) = non_blank(self.meaning.as_deref()) {
            drawn = drawn.with_meaning(meaning);
        }
        Ok(drawn)
    }
}

fn non_blank(text: Option<&str>) -> Option<String> {
    text.map(str::trim).filter(|t| !t.is_empty()).map(str::to_string)
}

/// Structural verdict as reported to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerdictSummary {
    pub coverage_ratio: f64,
    pub hallucinated_count: usize,
    pub spine_valid: bool,
}

impl From<&QualityVerdict> for VerdictSummary {
    fn from(verdict: &QualityVerdict) -> Self {
        Self {
            coverage_ratio: verdict.card_coverage_ratio,
            hallucinated_count: verdict.hallucinated_count(),
            spine_valid: verdict.spine_valid,
        }
    }
}

/// The reading returned to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadingResponse {
    pub request_id: Uuid,
    pub narrative_text: String,
    pub backend_used: String,
    pub quality_verdict: VerdictSummary,
    pub truncated: bool,
    /// Present only when the synchronous evaluation gate is enabled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gate_decision: Option<GateDecision>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card(position: &str, name: &str) -> CardInfo {
        CardInfo {
            position: position.to_string(),
            card: name.to_string(),
            orientation: None,
            meaning: None,
            numeric_rank: None,
            suit_or_element_tag: None,
        }
    }

    #[test]
    fn test_parse_wire_request() {
        let json = r#"{
            "spreadInfo": {"name": "Three Card", "positions": ["Past", "Present", "Future"]},
            "cardsInfo": [
                {"position": "Future", "card": "The Star", "orientation": "upright"},
                {"position": "Past", "card": "The Tower", "orientation": "reversed", "meaning": "  "},
                {"position": "Present", "card": "The Moon"}
            ],
            "userQuestion": "  What next? ",
            "deckStyle": "rws"
        }"#;
        let request: ReadingRequest = serde_json::from_str(json).unwrap();
        let reading = request.validate().unwrap();

        let names: Vec<_> = reading.cards.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["The Tower", "The Moon", "The Star"]);
        assert!(reading.cards[0].is_reversed());
        assert_eq!(reading.cards[0].meaning, None);
        assert_eq!(reading.question.as_deref(), Some("What next?"));
        assert_eq!(reading.reflections, None);
        assert_eq!(reading.deck_style, DeckStyle::RiderWaiteSmith);
    }

    #[test]
    fn test_builtin_spread_by_name() {
        let request = ReadingRequest {
            spread_info: Some(SpreadInfo {
                name: Some("celtic cross".to_string()),
                positions: Vec::new(),
            }),
            cards_info: vec![card("Present", "The Fool")],
            ..ReadingRequest::default()
        };

        let err = request.validate().unwrap_err();
        assert!(matches!(err, SpreadError::CardCountMismatch { expected: 10, actual: 1, .. }));
    }

    #[test]
    fn test_spread_from_card_positions() {
        let request = ReadingRequest {
            cards_info: vec![card("Focus", "Ace of Cups"), card("Advice", "Two of Swords")],
            ..ReadingRequest::default()
        };

        let reading = request.validate().unwrap();
        assert_eq!(reading.spread.len(), 2);
        assert_eq!(reading.spread.name, "Custom Spread");
    }

    #[test]
    fn test_empty_cards_rejected() {
        assert_eq!(ReadingRequest::default().validate().unwrap_err(), SpreadError::NoCards);
    }

    #[test]
    fn test_bad_orientation_rejected() {
        let mut info = card("Present", "The Fool");
        info.orientation = Some("sideways".to_string());
        let request = ReadingRequest {
            cards_info: vec![info],
            ..ReadingRequest::default()
        };

        assert!(matches!(request.validate(), Err(SpreadError::UnknownOrientation(_))));
    }

    #[test]
    fn test_response_omits_gate_when_disabled() {
        let response = ReadingResponse {
            request_id: Uuid::nil(),
            narrative_text: "text".to_string(),
            backend_used: "local".to_string(),
            quality_verdict: VerdictSummary {
                coverage_ratio: 1.0,
                hallucinated_count: 0,
                spine_valid: true,
            },
            truncated: false,
            gate_decision: None,
        };

        let json = serde_json::to_value(&response).unwrap();
        assert!(json.get("gateDecision").is_none());
        assert_eq!(json["backendUsed"], "local");
        assert_eq!(json["qualityVerdict"]["hallucinatedCount"], 0);
    }
}
