//! Safe fallback narrative built from fixed per-card templates.

use tarot_rules::{suit_domain, CardLexicon, DrawnCard};

/// A narrative that names only the drawn cards and always has a spine.
///
/// Request-supplied meanings are left out so nothing outside the templates
/// reaches the text.
pub fn safe_fallback_narrative(cards: &[DrawnCard], lexicon: &CardLexicon) -> String {
    let mut out = String::new();

    for drawn in cards {
        let themes = match drawn.card(lexicon) {
            Some(card) => {
                let keywords = card.keywords(drawn.is_reversed());
                match keywords {
                    [] => "its own lesson".to_string(),
                    [only] => only.to_string(),
                    [first, second, ..] => format!("{} and {}", first, second),
                }
            }
            None => "its own lesson".to_string(),
        };

        let area = match (drawn.is_major(lexicon), drawn.suit(lexicon)) {
            (true, _) => "the larger turning points in your life",
            (false, Some(suit)) => suit_domain(suit),
            (false, None) => "this part of your life",
        };

        out.push_str(&format!("### {}\n", drawn.position));
        out.push_str(&format!(
            "{} appears {} in the {} position and speaks of {}. ",
            drawn.name,
            drawn.orientation.label().to_lowercase(),
            drawn.position,
            themes
        ));
        out.push_str(&format!(
            "Because of this, the reading asks you to give attention to {}. ",
            area
        ));
        out.push_str("How you respond may shape what comes next.\n\n");
    }

    out.trim_end().to_string()
}
