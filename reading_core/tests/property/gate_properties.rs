use proptest::prelude::*;

use reading_core::{
    analyze, safe_fallback_narrative, LocalComposer, PromptAssembler, PromptConfig, PromptInputs, QualityConfig,
    StructuralGate, StyleContract, TokenCounter,
};
use tarot_rules::{catalog, CardId, CardLexicon, DrawnCard, Orientation, Spread};

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

/// Drawn cards moved into positions named after other catalog cards.
fn cards_in_card_named_positions(max: usize) -> impl Strategy<Value = Vec<DrawnCard>> {
    drawn_cards(max)
        .prop_flat_map(|cards| {
            let indices: Vec<usize> = (0..catalog().len()).collect();
            let n = cards.len();
            (Just(cards), proptest::sample::subsequence(indices, n).prop_shuffle())
        })
        .prop_map(|(cards, labels)| {
            cards
                .into_iter()
                .zip(labels)
                .map(|(card, idx)| DrawnCard::new(card.name, card.orientation, catalog()[idx].name.clone()))
                .collect()
        })
}

fn gate(lexicon: &CardLexicon) -> StructuralGate {
    StructuralGate::for_lexicon(lexicon, QualityConfig::default()).unwrap()
}

fn composed(cards: &[DrawnCard], lexicon: &CardLexicon) -> String {
    let spread = Spread::new("Generated", cards.iter().map(|c| c.position.0.clone()));
    let analysis = analyze(cards, lexicon);
    let payload = PromptAssembler::new(StyleContract::default(), &PromptConfig::default())
        .with_token_counter(TokenCounter::estimating())
        .assemble(&PromptInputs {
            spread: &spread,
            cards,
            analysis: &analysis,
            passages: &[],
            question: None,
            reflections: None,
            lexicon,
        });
    LocalComposer::default().compose(&payload.composition)
}

proptest! {
    #[test]
    fn coverage_stays_in_unit_range(cards in drawn_cards(10), text in ".{0,300}") {
        let lexicon = CardLexicon::default();
        let verdict = gate(&lexicon).evaluate(&text, &cards);

        prop_assert!((0.0..=1.0).contains(&verdict.card_coverage_ratio));
        prop_assert!(verdict.missing_cards.len() <= cards.len());
        prop_assert_eq!(verdict.accepted, verdict.block_reason.is_none());
    }

    #[test]
    fn local_composer_passes_the_gate(cards in drawn_cards(10)) {
        let lexicon = CardLexicon::default();
        let text = composed(&cards, &lexicon);
        let verdict = gate(&lexicon).evaluate(&text, &cards);

        prop_assert!(verdict.accepted, "blocked: {:?}\n{}", verdict.block_reason, text);
        prop_assert!(verdict.hallucinated_card_names.is_empty());
    }

    #[test]
    fn fallback_passes_the_gate(cards in drawn_cards(10)) {
        let lexicon = CardLexicon::default();
        let text = safe_fallback_narrative(&cards, &lexicon);
        let verdict = gate(&lexicon).evaluate(&text, &cards);

        prop_assert!(verdict.accepted, "blocked: {:?}\n{}", verdict.block_reason, text);
        prop_assert!((verdict.card_coverage_ratio - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn card_named_positions_are_not_hallucinations(cards in cards_in_card_named_positions(10)) {
        let lexicon = CardLexicon::default();

        for text in [composed(&cards, &lexicon), safe_fallback_narrative(&cards, &lexicon)] {
            let verdict = gate(&lexicon).evaluate(&text, &cards);
            prop_assert!(verdict.hallucinated_card_names.is_empty(), "{:?}\n{}", verdict.hallucinated_card_names, text);
            prop_assert!(verdict.accepted, "blocked: {:?}\n{}", verdict.block_reason, text);
        }
    }

    #[test]
    fn undrawn_name_blocks_small_spreads(cards in drawn_cards(9), pick in any::<prop::sample::Index>()) {
        let lexicon = CardLexicon::default();
        let drawn: Vec<CardId> = cards
            .iter()
            .filter_map(|c| lexicon.resolve(&c.name))
            .map(|card| card.id)
            .collect();
        let candidates: Vec<&str> = lexicon
            .entries()
            .iter()
            .filter(|e| !e.ambiguous && !e.cards.iter().any(|id| drawn.contains(id)))
            .map(|e| e.name.as_str())
            .collect();
        let intruder = candidates[pick.index(candidates.len())];

        let text = format!("{}\nThe reading also recalls {}.", safe_fallback_narrative(&cards, &lexicon), intruder);
        let verdict = gate(&lexicon).evaluate(&text, &cards);

        prop_assert!(!verdict.accepted);
        prop_assert!(verdict.hallucinated_count() >= 1);
    }
}
