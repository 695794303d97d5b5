/// Property-based tests for the match predicate and engine invariants
///
/// These tests check the match rules against a direct attribute-by-attribute
/// definition, and drive the engine with random intent sequences to check
/// that board and claim invariants always hold.
use proptest::prelude::*;
use std::{
    io,
    time::{Duration, Instant},
};

use set_game::{
    Claim, Engine, GameEvent, GameSettings, Session,
    constants::MAX_CARDS,
    entities::{Attribute, Card, Color, Coord, Deck, Number, PeerId, Shading, Shape},
    functional::{find_match, is_match},
};

// Strategy to generate any of the 81 cards
fn card_strategy() -> impl Strategy<Value = Card> {
    (0usize..3, 0usize..3, 0usize..3, 0usize..3).prop_map(|(c, s, h, n)| {
        Card(Color::ALL[c], Shape::ALL[s], Shading::ALL[h], Number::ALL[n])
    })
}

fn all_same_or_all_different<T: Attribute>(a: T, b: T, c: T) -> bool {
    (a == b && b == c) || (a != b && b != c && a != c)
}

fn is_match_by_definition(a: &Card, b: &Card, c: &Card) -> bool {
    all_same_or_all_different(a.0, b.0, c.0)
        && all_same_or_all_different(a.1, b.1, c.1)
        && all_same_or_all_different(a.2, b.2, c.2)
        && all_same_or_all_different(a.3, b.3, c.3)
}

/// Session that discards everything.
struct Quiet;

impl Session for Quiet {
    fn peers(&self) -> Vec<PeerId> {
        vec![1, 2]
    }

    fn unicast(&mut self, _: PeerId, _: &GameEvent) -> io::Result<()> {
        Ok(())
    }
}

#[derive(Clone, Debug)]
enum Intent {
    Yell(PeerId, u64),
    Select(PeerId, usize),
    Deselect(PeerId, usize),
    Check(PeerId),
    CheckMatch(PeerId),
    More(PeerId),
}

fn intent_strategy() -> impl Strategy<Value = Intent> {
    let peer = 1u32..=2;
    prop_oneof![
        (peer.clone(), 0u64..10).prop_map(|(p, s)| Intent::Yell(p, s)),
        (peer.clone(), 0usize..MAX_CARDS).prop_map(|(p, i)| Intent::Select(p, i)),
        (peer.clone(), 0usize..MAX_CARDS).prop_map(|(p, i)| Intent::Deselect(p, i)),
        peer.clone().prop_map(Intent::Check),
        peer.clone().prop_map(Intent::CheckMatch),
        peer.prop_map(Intent::More),
    ]
}

fn nth_card(engine: &Engine<Quiet>, index: usize) -> Option<(Coord, Card)> {
    engine.board().cards().nth(index)
}

proptest! {
    #[test]
    fn test_third_card_completes_a_match(a in card_strategy(), b in card_strategy()) {
        let c = a.third(&b);
        prop_assert!(is_match(&a, &b, &c));
        prop_assert_eq!(b.third(&a), c);
        // The completing card is unique.
        let mut deck = Deck::default();
        while let Some(other) = deck.draw() {
            if other != c {
                prop_assert!(!is_match(&a, &b, &other));
            }
        }
    }

    #[test]
    fn test_is_match_agrees_with_definition(
        a in card_strategy(),
        b in card_strategy(),
        c in card_strategy(),
    ) {
        let expected = is_match_by_definition(&a, &b, &c);
        for (x, y, z) in [(a, b, c), (a, c, b), (b, a, c), (b, c, a), (c, a, b), (c, b, a)] {
            prop_assert_eq!(is_match(&x, &y, &z), expected);
        }
    }

    #[test]
    fn test_find_match_is_sound(cards in prop::collection::btree_set(card_strategy(), 0..18)) {
        let placed: Vec<(Coord, Card)> = cards
            .iter()
            .enumerate()
            .map(|(i, card)| (Coord::new(i as u8, 0), *card))
            .collect();
        match find_match(&placed) {
            Some(coords) => {
                let lookup = |coord: Coord| placed.iter().find(|(k, _)| *k == coord).unwrap().1;
                let [a, b, c] = coords.map(lookup);
                prop_assert!(is_match(&a, &b, &c));
            }
            None => {
                for (i, a) in cards.iter().enumerate() {
                    for (j, b) in cards.iter().enumerate().skip(i + 1) {
                        for c in cards.iter().skip(j + 1) {
                            prop_assert!(!is_match(a, b, c));
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn test_engine_invariants_hold(intents in prop::collection::vec(intent_strategy(), 1..80)) {
        let settings = GameSettings::new(Duration::from_secs(5), 2);
        let mut engine = Engine::new(settings, Quiet);
        engine.start(1).unwrap();
        let origin = Instant::now();
        let mut total_score = 0;

        for intent in intents {
            match intent {
                Intent::Yell(peer, seconds) => {
                    engine.yell_set(peer, origin + Duration::from_secs(seconds)).unwrap();
                }
                Intent::Select(peer, index) => {
                    if let Some((coord, card)) = nth_card(&engine, index) {
                        engine.select_card(peer, card, coord).unwrap();
                    }
                }
                Intent::Deselect(peer, index) => {
                    if let Some((coord, card)) = nth_card(&engine, index) {
                        engine.deselect_card(peer, card, coord).unwrap();
                    }
                }
                Intent::Check(peer) => {
                    let resolving = !engine.is_over()
                        && matches!(engine.claim(), Claim::Held { peer: holder, .. } if holder == peer);
                    engine.check_set(peer).unwrap();
                    if resolving {
                        prop_assert!(engine.selected().is_empty());
                        prop_assert_eq!(engine.claim(), Claim::Idle);
                    }
                }
                Intent::CheckMatch(peer) => {
                    let cards: Vec<(Coord, Card)> = engine.board().cards().collect();
                    if let Some(coords) = find_match(&cards) {
                        for coord in coords {
                            if let Some(card) = engine.board().get(coord) {
                                engine.select_card(peer, card, coord).unwrap();
                            }
                        }
                    }
                    engine.check_set(peer).unwrap();
                }
                Intent::More(peer) => engine.request_more(peer).unwrap(),
            }

            let board = engine.board();
            prop_assert!(board.len() <= MAX_CARDS);
            prop_assert!(board.is_compact());
            prop_assert!(engine.selected().len() <= 3);
            prop_assert!(engine.more_requested() < 2);
            let score: i32 = engine.scores().values().sum();
            prop_assert!((score - total_score).abs() <= 1);
            total_score = score;
        }
    }
}
