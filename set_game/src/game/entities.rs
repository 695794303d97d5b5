use rand::seq::SliceRandom;
use serde::{Deserialize, Deserializer, Serialize, Serializer, de};
use std::{collections::BTreeMap, fmt};

use super::constants::{
    BOARD_COLS, BOARD_ROWS, DECK_SIZE, MAX_CARDS, MAX_NORMAL, OVERFLOW_DEPTH, OVERFLOW_LANES,
};

/// Identity assigned to a peer when it connects. Identities start at 1.
pub type PeerId = u32;

/// Mapping of peer to score. Scores go negative on failed claims.
pub type Scores = BTreeMap<PeerId, i32>;

/// One of a card's four independent attributes. Every attribute has exactly
/// three values.
pub trait Attribute: Copy + Eq {
    const ALL: [Self; 3];

    fn index(self) -> usize;

    /// The value that completes a match with `self` and `other`: the same
    /// value when the two agree, otherwise the one value neither has.
    fn third(self, other: Self) -> Self {
        Self::ALL[(6 - self.index() - other.index()) % 3]
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum Color {
    #[serde(rename = "r")]
    Red,
    #[serde(rename = "b")]
    Blue,
    #[serde(rename = "g")]
    Green,
}

impl Attribute for Color {
    const ALL: [Self; 3] = [Self::Red, Self::Blue, Self::Green];

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let repr = match self {
            Self::Red => "red",
            Self::Blue => "blue",
            Self::Green => "green",
        };
        write!(f, "{repr}")
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum Shape {
    #[serde(rename = "s")]
    Squiggle,
    #[serde(rename = "d")]
    Diamond,
    #[serde(rename = "o")]
    Oval,
}

impl Attribute for Shape {
    const ALL: [Self; 3] = [Self::Squiggle, Self::Diamond, Self::Oval];

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let repr = match self {
            Self::Squiggle => "squiggle",
            Self::Diamond => "diamond",
            Self::Oval => "oval",
        };
        write!(f, "{repr}")
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum Shading {
    #[serde(rename = "e")]
    Empty,
    #[serde(rename = "f")]
    Filled,
    #[serde(rename = "s")]
    Striped,
}

impl Attribute for Shading {
    const ALL: [Self; 3] = [Self::Empty, Self::Filled, Self::Striped];

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Shading {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let repr = match self {
            Self::Empty => "empty",
            Self::Filled => "filled",
            Self::Striped => "striped",
        };
        write!(f, "{repr}")
    }
}

/// Count of shapes printed on a card. Serialized as a bare integer.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Number {
    One,
    Two,
    Three,
}

impl Number {
    pub fn value(self) -> u8 {
        self as u8 + 1
    }
}

impl Attribute for Number {
    const ALL: [Self; 3] = [Self::One, Self::Two, Self::Three];

    fn index(self) -> usize {
        self as usize
    }
}

impl TryFrom<u8> for Number {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::One),
            2 => Ok(Self::Two),
            3 => Ok(Self::Three),
            other => Err(other),
        }
    }
}

impl Serialize for Number {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u8(self.value())
    }
}

impl<'de> Deserialize<'de> for Number {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = u8::deserialize(deserializer)?;
        Self::try_from(value)
            .map_err(|value| de::Error::custom(format!("card number {value} is not 1, 2, or 3")))
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.value())
    }
}

/// A card is an immutable tuple of its four attributes. It crosses the wire
/// as `[color, shape, shading, number]`, e.g. `["r", "s", "e", 1]`.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct Card(pub Color, pub Shape, pub Shading, pub Number);

impl Card {
    /// The unique card that forms a match with `self` and `other`.
    #[must_use]
    pub fn third(&self, other: &Card) -> Card {
        Card(
            self.0.third(other.0),
            self.1.third(other.1),
            self.2.third(other.2),
            self.3.third(other.3),
        )
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let Card(color, shape, shading, number) = self;
        let plural = if *number == Number::One { "" } else { "s" };
        write!(f, "{number} {color} {shading} {shape}{plural}")
    }
}

/// The draw pile. Created full, only ever shrinks.
#[derive(Clone, Debug)]
pub struct Deck {
    /// Remaining cards. The top of the deck is the end of the vector.
    cards: Vec<Card>,
}

impl Deck {
    /// A complete deck in random order.
    #[must_use]
    pub fn shuffled() -> Self {
        let mut deck = Self::default();
        deck.shuffle();
        deck
    }

    pub fn shuffle(&mut self) {
        self.cards.shuffle(&mut rand::rng());
    }

    pub fn draw(&mut self) -> Option<Card> {
        self.cards.pop()
    }

    #[must_use]
    pub fn remaining(&self) -> usize {
        self.cards.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }
}

impl Default for Deck {
    /// All 81 distinct cards in attribute order.
    fn default() -> Self {
        let mut cards = Vec::with_capacity(DECK_SIZE);
        for color in Color::ALL {
            for shape in Shape::ALL {
                for shading in Shading::ALL {
                    for number in Number::ALL {
                        cards.push(Card(color, shape, shading, number));
                    }
                }
            }
        }
        Self { cards }
    }
}

/// A pre-arranged deck. The last card is drawn first.
impl From<Vec<Card>> for Deck {
    fn from(cards: Vec<Card>) -> Self {
        Self { cards }
    }
}

/// A grid coordinate on the board.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct Coord {
    pub x: u8,
    pub y: u8,
}

impl Coord {
    #[must_use]
    pub const fn new(x: u8, y: u8) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Cards in play, one per coordinate.
///
/// Coordinates are addressed through a fixed slot order: the normal region
/// row by row, then each overflow lane top to bottom. New cards always take
/// the first free slot, so the normal region fills before the overflow lanes.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Board {
    slots: [Option<Card>; MAX_CARDS],
}

impl Board {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Coordinate of a slot, if the slot exists.
    #[must_use]
    pub fn slot_coord(slot: usize) -> Option<Coord> {
        if slot < MAX_NORMAL {
            let cols = usize::from(BOARD_COLS);
            Some(Coord::new((slot % cols) as u8, (slot / cols) as u8))
        } else if slot < MAX_CARDS {
            let lane_slot = slot - MAX_NORMAL;
            let depth = usize::from(OVERFLOW_DEPTH);
            Some(Coord::new(
                BOARD_COLS + (lane_slot / depth) as u8,
                (lane_slot % depth) as u8,
            ))
        } else {
            None
        }
    }

    /// Slot of a coordinate, if the coordinate is on the board.
    #[must_use]
    pub fn slot_index(coord: Coord) -> Option<usize> {
        let Coord { x, y } = coord;
        if x < BOARD_COLS && y < BOARD_ROWS {
            Some(usize::from(y) * usize::from(BOARD_COLS) + usize::from(x))
        } else if (BOARD_COLS..BOARD_COLS + OVERFLOW_LANES).contains(&x) && y < OVERFLOW_DEPTH {
            Some(
                MAX_NORMAL
                    + usize::from(x - BOARD_COLS) * usize::from(OVERFLOW_DEPTH)
                    + usize::from(y),
            )
        } else {
            None
        }
    }

    /// Every coordinate in slot order.
    pub fn coords() -> impl Iterator<Item = Coord> {
        (0..MAX_CARDS).filter_map(Self::slot_coord)
    }

    #[must_use]
    pub fn get(&self, coord: Coord) -> Option<Card> {
        Self::slot_index(coord).and_then(|slot| self.slots[slot])
    }

    /// Placed cards in slot order.
    pub fn cards(&self) -> impl Iterator<Item = (Coord, Card)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(slot, card)| Some((Self::slot_coord(slot)?, (*card)?)))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.iter().flatten().count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn is_full(&self) -> bool {
        self.len() == MAX_CARDS
    }

    #[must_use]
    pub fn normal_len(&self) -> usize {
        self.slots[..MAX_NORMAL].iter().flatten().count()
    }

    #[must_use]
    pub fn overflow_len(&self) -> usize {
        self.slots[MAX_NORMAL..].iter().flatten().count()
    }

    /// Put a card in the first free slot, returning where it went.
    pub fn place(&mut self, card: Card) -> Option<Coord> {
        let slot = self.slots.iter().position(Option::is_none)?;
        self.slots[slot] = Some(card);
        Self::slot_coord(slot)
    }

    pub fn remove(&mut self, coord: Coord) -> Option<Card> {
        Self::slot_index(coord).and_then(|slot| self.slots[slot].take())
    }

    /// The overflow card that should move into the normal region next, if
    /// the normal region has a hole. Overflow is drained from its highest
    /// slot down.
    #[must_use]
    pub fn next_compaction(&self) -> Option<Coord> {
        if self.normal_len() == MAX_NORMAL {
            return None;
        }
        (MAX_NORMAL..MAX_CARDS)
            .rev()
            .find(|&slot| self.slots[slot].is_some())
            .and_then(Self::slot_coord)
    }

    /// Whether no overflow card sits beside a hole in the normal region.
    #[must_use]
    pub fn is_compact(&self) -> bool {
        self.normal_len() == MAX_NORMAL || self.overflow_len() == 0
    }
}
