//! The style and ethics contract every narrative is held to.

use serde::{Deserialize, Serialize};

use crate::analysis::{ElementalRelationship, ReversalFramework};

/// Voice and guardrails for generated readings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StyleContract {
    /// One-line description of the narrator's voice.
    pub voice: String,

    /// Extra deployment-specific rules, appended verbatim.
    #[serde(alias = "extra_rules")]
    pub extra_rules: Vec<String>,
}

impl Default for StyleContract {
    fn default() -> Self {
        Self {
            voice: "Warm, grounded and specific; speak to the querent as \"you\".".to_string(),
            extra_rules: Vec::new(),
        }
    }
}

impl StyleContract {
    /// Render the system instructions for one reading.
    ///
    /// Transitions name the connective language for each adjacent pair of
    /// positions, derived from their elemental relationship.
    pub fn render(
        &self,
        framework: ReversalFramework,
        positions: &[String],
        relationships: &[ElementalRelationship],
    ) -> String {
        let mut out = String::from("You are a tarot reader writing a reading for one querent.\n\n");

        out.push_str("Voice: ");
        out.push_str(&self.voice);
        out.push_str("\n\nRules:\n");
        out.push_str("- Mention only the cards listed in the reading, each by the exact name given. Never name any other tarot card.\n");
        out.push_str("- Do not make deterministic or fatalistic claims. Describe tendencies, choices and possibilities, never certain fates.\n");
        out.push_str("- Do not give medical, legal or financial directives.\n");
        out.push_str("- Write one section per position, headed \"### <position>\", in the order given.\n");
        out.push_str("- Every section needs a spine: describe the situation, link it to a cause or consequence (because, therefore, however, and so), and close with a forward-looking clause about what may unfold.\n");
        out.push_str("- Reversals: ");
        out.push_str(framework.guidance());
        out.push('\n');
        for rule in &self.extra_rules {
            out.push_str("- ");
            out.push_str(rule);
            out.push('\n');
        }

        if !relationships.is_empty() {
            out.push_str("\nTransitions between positions:\n");
            for rel in relationships {
                let from = positions.get(rel.to_index - 1).map(String::as_str).unwrap_or("previous");
                let to = positions.get(rel.to_index).map(String::as_str).unwrap_or("next");
                out.push_str(&format!(
                    "- {} to {}: {} ({}), bridge with \"{}\".\n",
                    from,
                    to,
                    rel.relationship.name(),
                    rel.relationship.gloss(),
                    rel.relationship.connector()
                ));
            }
        }

        out
    }
}
