//! The built-in reference corpus, derived from the card catalog and the
//! pattern catalog and loaded once per process.

use std::sync::{Arc, OnceLock};

use tarot_rules::{
    catalog, suit_domain, suit_progression_name, Element, Suit, JOURNEY_STAGES, PATTERN_CATALOG,
};

use super::{AssociationType, KnowledgeGraph, Passage, PassageKind, Tag};
use crate::analysis::{RelationshipKind, ReversalFramework};

/// Theme tag for spreads heavy in major arcana.
pub const THEME_MAJORS: &str = "major arcana";

/// Theme tag for spreads with several court cards.
pub const THEME_COURTS: &str = "court cards";

/// Theme tag for an element absent from the spread.
pub fn missing_element_theme(element: Element) -> String {
    format!("missing {}", element.name())
}

/// The shared built-in corpus.
pub fn builtin_corpus() -> Arc<KnowledgeGraph> {
    static CORPUS: OnceLock<Arc<KnowledgeGraph>> = OnceLock::new();
    CORPUS.get_or_init(|| Arc::new(build_corpus())).clone()
}

fn build_corpus() -> KnowledgeGraph {
    let mut graph = KnowledgeGraph::new();

    add_card_passages(&mut graph);
    add_element_passages(&mut graph);
    add_dignity_passages(&mut graph);
    add_pattern_passages(&mut graph);
    add_reversal_passages(&mut graph);
    add_theme_passages(&mut graph);

    for suit in Suit::ALL {
        graph.add_bidirectional_association(
            Tag::suit(suit),
            Tag::element(suit.element()),
            0.8,
            AssociationType::Direct,
        );
    }

    graph.build_co_occurrence_associations();

    tracing::debug!(
        passages = graph.passage_count(),
        tags = graph.tag_count(),
        "built-in corpus loaded"
    );

    graph
}

fn add_card_passages(graph: &mut KnowledgeGraph) {
    for card in catalog() {
        let mut text = format!(
            "{}: upright it speaks of {}; reversed, of {}.",
            card.name,
            card.upright_keywords.join(", "),
            card.reversed_keywords.join(", ")
        );
        if let Some(correspondence) = card.correspondence {
            text.push_str(&format!(" Attribution: {}.", correspondence));
        }

        let mut passage = Passage::new(text, format!("card:{}", card.name))
            .with_kind(PassageKind::CardMeaning)
            .with_tag(Tag::card(card.id))
            .with_tag(Tag::element(card.element))
            .with_importance(if card.is_major() { 0.6 } else { 0.5 });

        if card.is_major() {
            passage = passage.with_tag(Tag::theme(THEME_MAJORS));
        }
        if card.is_court() {
            passage = passage.with_tag(Tag::theme(THEME_COURTS));
        }

        graph.add_passage(passage);

        graph.add_association(Tag::card(card.id), Tag::element(card.element), 0.6, AssociationType::Direct);
        if let Some(suit) = card.suit {
            graph.add_association(Tag::card(card.id), Tag::suit(suit), 0.6, AssociationType::Direct);
        }
    }
}

fn add_element_passages(graph: &mut KnowledgeGraph) {
    let element_texts = [
        (Element::Fire, "Fire is will, appetite and momentum. It starts things and burns through hesitation, but it can scorch what it means to warm."),
        (Element::Water, "Water is feeling, memory and intuition. It connects and soothes, and it can also flood judgement or stagnate into mood."),
        (Element::Air, "Air is thought, speech and decision. It clarifies and names things, and it can cut or overthink when it runs without ground."),
        (Element::Earth, "Earth is body, work and resources. It steadies and builds slowly, and it can harden into stubbornness or inertia."),
    ];
    for (element, text) in element_texts {
        graph.add_passage(
            Passage::new(text, format!("element:{}", element.name()))
                .with_kind(PassageKind::Element)
                .with_tag(Tag::element(element))
                .with_importance(0.5),
        );
    }

    for suit in Suit::ALL {
        let text = format!(
            "The suit of {} belongs to {} and speaks to {}; a run of this suit keeps the reading's attention on that part of life.",
            suit.name(),
            suit.element().name(),
            suit_domain(suit)
        );
        graph.add_passage(
            Passage::new(text, format!("suit:{}", suit.name().to_lowercase()))
                .with_kind(PassageKind::Suit)
                .with_tags([Tag::suit(suit), Tag::element(suit.element())])
                .with_importance(0.45),
        );
    }
}

fn add_dignity_passages(graph: &mut KnowledgeGraph) {
    for kind in [
        RelationshipKind::Supportive,
        RelationshipKind::Tension,
        RelationshipKind::Amplified,
    ] {
        let text = format!(
            "When neighbouring cards are {} by element, {}. Bridge the two positions with language such as \"{}\".",
            kind.name(),
            kind.gloss(),
            kind.connector()
        );
        graph.add_passage(
            Passage::new(text, format!("dignity:{}", kind.name()))
                .with_kind(PassageKind::Dignity)
                .with_tag(Tag::relationship(kind.name()))
                .with_importance(0.7),
        );
    }

    let pairs = [
        (Element::Fire, Element::Air, "Air feeds fire: ideas give drive somewhere to go, and drive gives ideas a body."),
        (Element::Water, Element::Earth, "Water and earth make fertile ground: feeling is held by something steady and grows."),
        (Element::Fire, Element::Water, "Fire and water contend: passion and feeling can steam, quench or boil each other."),
        (Element::Air, Element::Earth, "Air and earth resist each other: plans meet the weight of what is practical."),
    ];
    for (a, b, text) in pairs {
        let kind = RelationshipKind::between(Some(a), Some(b));
        graph.add_passage(
            Passage::new(text, format!("dignity:{}-{}", a.name(), b.name()))
                .with_kind(PassageKind::Dignity)
                .with_tags([Tag::relationship(kind.name()), Tag::element(a), Tag::element(b)])
                .with_importance(0.6),
        );
    }
}

fn add_pattern_passages(graph: &mut KnowledgeGraph) {
    for def in PATTERN_CATALOG {
        let text = format!(
            "The {} {} is present: {}. Treat these cards as one movement rather than separate events.",
            def.name,
            def.kind.name(),
            def.theme
        );
        let members = def
            .members
            .iter()
            .filter_map(|n| tarot_rules::major(*n))
            .map(|card| Tag::card(card.id));

        graph.add_passage(
            Passage::new(text, format!("pattern:{}", def.name))
                .with_kind(PassageKind::Pattern)
                .with_tag(Tag::pattern(def.name))
                .with_tags(members)
                .with_importance(0.8),
        );
    }

    for stage in JOURNEY_STAGES.iter() {
        let text = format!(
            "Several majors from the {} stage of the journey appear together, {}.",
            stage.name.to_lowercase(),
            stage.theme
        );
        graph.add_passage(
            Passage::new(text, format!("journey:{}", stage.name))
                .with_kind(PassageKind::Journey)
                .with_tags([Tag::pattern(stage.name), Tag::theme(THEME_MAJORS)])
                .with_importance(0.65),
        );
    }

    for suit in Suit::ALL {
        let text = format!(
            "Consecutive ranks of {} show a situation unfolding step by step in the realm of {}; read them as stages of one story.",
            suit.name(),
            suit_domain(suit)
        );
        graph.add_passage(
            Passage::new(text, format!("pattern:{}", suit_progression_name(suit)))
                .with_kind(PassageKind::Pattern)
                .with_tags([Tag::pattern(suit_progression_name(suit)), Tag::suit(suit)])
                .with_importance(0.7),
        );
    }
}

fn add_reversal_passages(graph: &mut KnowledgeGraph) {
    for framework in [
        ReversalFramework::Blocked,
        ReversalFramework::Delayed,
        ReversalFramework::Internalized,
        ReversalFramework::Contextual,
    ] {
        graph.add_passage(
            Passage::new(framework.guidance(), format!("reversal:{}", framework.name()))
                .with_kind(PassageKind::Reversal)
                .with_tag(Tag::framework(framework.name()))
                .with_importance(0.75),
        );
    }
}

fn add_theme_passages(graph: &mut KnowledgeGraph) {
    graph.add_passage(
        Passage::new(
            "A spread weighted toward the major arcana points to forces larger than daily choices: turning points and lessons rather than logistics.",
            "theme:majors",
        )
        .with_kind(PassageKind::Commentary)
        .with_tag(Tag::theme(THEME_MAJORS))
        .with_importance(0.6),
    );

    graph.add_passage(
        Passage::new(
            "Several court cards suggest other people, or roles the querent is being asked to play, are central to the question.",
            "theme:courts",
        )
        .with_kind(PassageKind::Commentary)
        .with_tag(Tag::theme(THEME_COURTS))
        .with_importance(0.6),
    );

    for element in Element::ALL {
        let text = format!(
            "No card of {} appears. What {} usually supplies may be what the situation lacks, or what the querent is not yet drawing on.",
            element.name(),
            element.name()
        );
        graph.add_passage(
            Passage::new(text, format!("theme:{}", missing_element_theme(element)))
                .with_kind(PassageKind::Commentary)
                .with_tag(Tag::theme(missing_element_theme(element)))
                .with_importance(0.55),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tarot_rules::CardId;

    #[test]
    fn test_corpus_is_built_once() {
        assert!(Arc::ptr_eq(&builtin_corpus(), &builtin_corpus()));
    }

    #[test]
    fn test_every_card_has_a_passage() {
        let corpus = builtin_corpus();
        for card in catalog() {
            let meanings = corpus
                .passages_by_tag(&Tag::card(card.id))
                .into_iter()
                .filter(|p| p.kind == PassageKind::CardMeaning)
                .count();
            assert_eq!(meanings, 1, "{}", card.name);
        }
    }

    #[test]
    fn test_pattern_passages_tag_members() {
        let corpus = builtin_corpus();
        let arc = corpus.passages_by_tag(&Tag::pattern("Healing Arc"));
        assert_eq!(arc.len(), 1);
        let members: Vec<_> = arc[0].card_tags().collect();
        assert_eq!(members, vec![CardId(13), CardId(14), CardId(17)]);
    }

    #[test]
    fn test_suits_link_to_elements() {
        let corpus = builtin_corpus();
        let assocs = corpus.get_associations(&Tag::suit(Suit::Cups));
        assert!(assocs.iter().any(|a| a.target == Tag::element(Element::Water)));
    }

    #[test]
    fn test_reversal_frameworks_covered() {
        let corpus = builtin_corpus();
        for name in ["blocked", "delayed", "internalized", "contextual"] {
            assert!(corpus.has_tag(&Tag::framework(name)));
        }
    }
}
