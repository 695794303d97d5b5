use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::{
    io,
    time::{Duration, Instant},
};

use set_game::{
    Engine, GameEvent, GameSettings, Session,
    codec::{Decoder, encode},
    entities::{Board, Card, Color, Coord, Deck, Number, PeerId, Shading, Shape},
    functional::{find_match, is_match},
    messages::ServerMessage,
};

/// Session that discards everything.
struct Discard;

impl Session for Discard {
    fn peers(&self) -> Vec<PeerId> {
        vec![1, 2]
    }

    fn unicast(&mut self, _: PeerId, _: &GameEvent) -> io::Result<()> {
        Ok(())
    }
}

/// `n` cards from a shuffled deck, as placed on a board.
fn placed(n: usize) -> Vec<(Coord, Card)> {
    let mut deck = Deck::shuffled();
    let mut board = Board::new();
    for _ in 0..n {
        if let Some(card) = deck.draw() {
            board.place(card);
        }
    }
    board.cards().collect()
}

/// Benchmark the closed-form match predicate
fn bench_is_match(c: &mut Criterion) {
    let a = Card(Color::Red, Shape::Oval, Shading::Filled, Number::One);
    let b = Card(Color::Blue, Shape::Diamond, Shading::Empty, Number::Two);
    let third = a.third(&b);

    c.bench_function("is_match", |bench| {
        bench.iter(|| is_match(&a, &b, &third));
    });
}

/// Benchmark exhaustive match search at each board size
fn bench_find_match(c: &mut Criterion) {
    let mut group = c.benchmark_group("find_match");

    for n_cards in [12, 15, 18].iter() {
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{n_cards}_cards")),
            n_cards,
            |b, &n| {
                let cards = placed(n);
                b.iter(|| find_match(&cards));
            },
        );
    }

    group.finish();
}

/// Benchmark encoding and decoding a typical notification
fn bench_codec(c: &mut Criterion) {
    let record = ServerMessage::from(GameEvent::Place {
        card: Card(Color::Green, Shape::Squiggle, Shading::Striped, Number::Three),
        coord: Coord::new(2, 3),
    })
    .to_record();
    let encoded = encode(&record).unwrap();

    c.bench_function("encode_place", |b| {
        b.iter(|| encode(&record));
    });

    c.bench_function("decode_place", |b| {
        b.iter(|| {
            let mut decoder = Decoder::new();
            decoder.feed(&encoded);
            decoder.next_record()
        });
    });
}

/// Benchmark a full claim: yell, select three cards, resolve
fn bench_claim(c: &mut Criterion) {
    c.bench_function("failed_claim", |b| {
        b.iter_batched(
            || {
                let settings = GameSettings::new(Duration::from_secs(5), 2);
                let mut engine = Engine::new(settings, Discard);
                engine.start(1).unwrap();
                engine
            },
            |mut engine| {
                engine.yell_set(1, Instant::now()).unwrap();
                let cards: Vec<_> = engine.board().cards().take(3).collect();
                for (coord, card) in cards {
                    engine.select_card(1, card, coord).unwrap();
                }
                engine.check_set(1).unwrap();
                engine
            },
            criterion::BatchSize::SmallInput,
        );
    });
}

criterion_group!(matching, bench_is_match, bench_find_match);

criterion_group!(protocol, bench_codec, bench_claim);

criterion_main!(matching, protocol);
