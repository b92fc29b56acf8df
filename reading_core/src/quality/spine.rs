//! Narrative spine: situation, causal link, forward trajectory.

use serde::{Deserialize, Serialize};

/// Words needed before a section counts as describing a situation.
const SITUATION_MIN_WORDS: usize = 4;

const CAUSAL_WORDS: &[&str] = &[
    "because", "therefore", "however", "so", "since", "thus", "hence", "consequently", "although",
    "yet",
];

const FORWARD_WORDS: &[&str] = &[
    "will", "may", "might", "could", "soon", "ahead", "next", "future", "become", "becomes",
    "becoming", "eventually", "unfold", "unfolds", "tomorrow", "going",
];

/// Spine elements found in one section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpineSection {
    pub heading: Option<String>,
    pub situation: bool,
    pub causal: bool,
    pub forward: bool,
}

impl SpineSection {
    fn from_body(heading: Option<String>, body: &str) -> Self {
        let words: Vec<String> = body
            .split(|c: char| !(c.is_alphanumeric() || c == '\''))
            .filter(|w| !w.is_empty())
            .map(str::to_lowercase)
            .collect();

        Self {
            heading,
            situation: words.len() >= SITUATION_MIN_WORDS,
            causal: words.iter().any(|w| CAUSAL_WORDS.contains(&w.as_str())),
            forward: words.iter().any(|w| FORWARD_WORDS.contains(&w.as_str())),
        }
    }

    pub fn elements(&self) -> usize {
        [self.situation, self.causal, self.forward]
            .iter()
            .filter(|present| **present)
            .count()
    }
}

/// Split text into sections at `#` heading lines.
///
/// Text before the first heading is its own section when it is not blank.
/// Text without headings is a single section.
pub fn split_sections(text: &str) -> Vec<SpineSection> {
    let mut sections = Vec::new();
    let mut heading: Option<String> = None;
    let mut body = String::new();

    for line in text.lines() {
        let trimmed = line.trim_start();
        if trimmed.starts_with('#') {
            if heading.is_some() || !body.trim().is_empty() {
                sections.push(SpineSection::from_body(heading.take(), &body));
            }
            heading = Some(trimmed.trim_start_matches('#').trim().to_string());
            body.clear();
        } else {
            body.push_str(line);
            body.push('\n');
        }
    }

    if heading.is_some() || !body.trim().is_empty() {
        sections.push(SpineSection::from_body(heading, &body));
    }

    sections
}

/// Number of sections with fewer than `min_elements` spine elements.
pub fn incomplete_sections(sections: &[SpineSection], min_elements: usize) -> usize {
    sections.iter().filter(|s| s.elements() < min_elements).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_on_headings() {
        let text = "Opening words for the reading here.\n### Past\nOld story.\n## Present\nNow things are moving, so they may settle soon.\n";
        let sections = split_sections(text);

        assert_eq!(sections.len(), 3);
        assert_eq!(sections[0].heading, None);
        assert_eq!(sections[1].heading.as_deref(), Some("Past"));
        assert_eq!(sections[2].heading.as_deref(), Some("Present"));
        assert_eq!(sections[2].elements(), 3);
    }

    #[test]
    fn test_blank_preamble_skipped() {
        let sections = split_sections("\n\n# Only\nA single section that will go on.");
        assert_eq!(sections.len(), 1);
        assert!(sections[0].forward);
    }

    #[test]
    fn test_no_headings_is_one_section() {
        let sections = split_sections("Just a paragraph of text with no headings at all.");
        assert_eq!(sections.len(), 1);
        assert!(sections[0].situation);
        assert!(!sections[0].causal);
    }

    #[test]
    fn test_empty_heading_is_incomplete() {
        let sections = split_sections("### Past\n### Present\nThis part is fine because it will grow.");
        assert_eq!(incomplete_sections(&sections, 1), 1);
        assert_eq!(sections[0].elements(), 0);
    }

    #[test]
    fn test_threshold_counts_elements() {
        let sections = split_sections("### Past\nA long description of things that happened.");
        assert_eq!(incomplete_sections(&sections, 1), 0);
        assert_eq!(incomplete_sections(&sections, 2), 1);
    }
}
