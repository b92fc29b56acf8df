use proptest::prelude::*;

use reading_core::{
    analyze, builtin_corpus, PromptAssembler, PromptConfig, PromptInputs, RetrievalConfig, Retriever,
    ReversalFramework, StyleContract, TokenCounter,
};
use tarot_rules::{catalog, CardLexicon, DrawnCard, Orientation, Spread};

/// Distinct catalog cards with random orientations, placed in positions P1..Pn.
fn drawn_cards(max: usize) -> impl Strategy<Value = Vec<DrawnCard>> {
    let indices: Vec<usize> = (0..catalog().len()).collect();
    proptest::sample::subsequence(indices, 1..=max)
        .prop_shuffle()
        .prop_flat_map(|picked| {
            let n = picked.len();
            (Just(picked), proptest::collection::vec(any::<bool>(), n))
        })
        .prop_map(|(picked, reversed)| {
            picked
                .into_iter()
                .zip(reversed)
                .enumerate()
                .map(|(i, (idx, rev))| {
                    let orientation = if rev { Orientation::Reversed } else { Orientation::Upright };
                    DrawnCard::new(catalog()[idx].name.clone(), orientation, format!("P{}", i + 1))
                })
                .collect()
        })
}

fn spread_for(cards: &[DrawnCard]) -> Spread {
    Spread::new("Generated", cards.iter().map(|c| c.position.0.clone()))
}

proptest! {
    #[test]
    fn analysis_is_deterministic(cards in drawn_cards(10)) {
        let lexicon = CardLexicon::default();
        prop_assert_eq!(analyze(&cards, &lexicon), analyze(&cards, &lexicon));
    }

    #[test]
    fn framework_follows_reversal_ratio(cards in drawn_cards(10)) {
        let lexicon = CardLexicon::default();
        let analysis = analyze(&cards, &lexicon);

        let reversed = cards.iter().filter(|c| c.orientation == Orientation::Reversed).count();
        let ratio = reversed as f64 / cards.len() as f64;

        prop_assert_eq!(analysis.theme.reversal_count, reversed);
        prop_assert_eq!(analysis.theme.reversal_framework, ReversalFramework::from_ratio(ratio));
        prop_assert_eq!(reversed == 0, analysis.theme.reversal_framework == ReversalFramework::None);
    }

    #[test]
    fn relationships_link_adjacent_cards(cards in drawn_cards(10)) {
        let lexicon = CardLexicon::default();
        let analysis = analyze(&cards, &lexicon);

        prop_assert_eq!(analysis.relationships.len(), cards.len() - 1);
        for pattern in &analysis.patterns {
            for member in &pattern.member_card_names {
                prop_assert!(cards.iter().any(|c| &c.name == member));
            }
        }
    }

    #[test]
    fn raising_threshold_keeps_a_prefix(
        cards in drawn_cards(6),
        low in 0.0f32..0.5,
        delta in 0.0f32..0.5,
    ) {
        let lexicon = CardLexicon::default();
        let analysis = analyze(&cards, &lexicon);
        let retriever = Retriever::new(builtin_corpus(), &RetrievalConfig::default())
            .with_token_counter(TokenCounter::estimating());

        let loose = retriever.clone().with_threshold(low).retrieve(&analysis, &cards, &lexicon, "");
        let strict = retriever.with_threshold(low + delta).retrieve(&analysis, &cards, &lexicon, "");

        prop_assert!(strict.len() <= loose.len());
        prop_assert_eq!(&loose[..strict.len()], &strict[..]);
        for passage in &strict {
            prop_assert!(passage.relevance_score >= low + delta);
            prop_assert!((0.0..=1.0).contains(&passage.relevance_score));
        }
    }

    #[test]
    fn truncation_never_drops_cards(cards in drawn_cards(10), budget in 0usize..2000) {
        let lexicon = CardLexicon::default();
        let spread = spread_for(&cards);
        let analysis = analyze(&cards, &lexicon);
        let passages = Retriever::new(builtin_corpus(), &RetrievalConfig::default())
            .with_threshold(0.0)
            .with_token_counter(TokenCounter::estimating())
            .retrieve(&analysis, &cards, &lexicon, "");

        let inputs = PromptInputs {
            spread: &spread,
            cards: &cards,
            analysis: &analysis,
            passages: &passages,
            question: Some("What should I focus on?"),
            reflections: Some("Work has been heavy lately."),
            lexicon: &lexicon,
        };
        let assembler = PromptAssembler::new(StyleContract::default(), &PromptConfig::default())
            .with_token_counter(TokenCounter::estimating());
        let full = assembler.clone().with_token_budget(usize::MAX).assemble(&inputs);
        let assembler = assembler.with_token_budget(budget);
        let payload = assembler.assemble(&inputs);

        prop_assert_eq!(&payload.system_instructions, &full.system_instructions);
        for card in &cards {
            prop_assert!(payload.user_content.contains(&card.name));
        }
        prop_assert!(payload.included_passage_count <= passages.len());
        prop_assert_eq!(payload.truncated, !payload.dropped_sections.is_empty());
        if budget >= assembler.minimum_tokens(&inputs) {
            prop_assert!(payload.token_count <= budget);
        }
    }
}
