//! Pure functions over cards: the match predicate and match search.

use super::entities::{Card, Coord};

/// Whether three cards form a match: for each attribute the three values
/// are either all the same or all different.
#[must_use]
pub fn is_match(a: &Card, b: &Card, c: &Card) -> bool {
    a.third(b) == *c
}

/// Whether a selection is a match. Anything other than exactly three cards
/// is not.
#[must_use]
pub fn is_match_selection(cards: &[Card]) -> bool {
    match cards {
        [a, b, c] => is_match(a, b, c),
        _ => false,
    }
}

/// First match among the given placed cards, by exhaustive enumeration of
/// triples. Quadratic in practice since the third card is derived, but
/// bounded by the 18-card ceiling either way.
#[must_use]
pub fn find_match(cards: &[(Coord, Card)]) -> Option<[Coord; 3]> {
    for (i, (coord_a, a)) in cards.iter().enumerate() {
        for (j, (coord_b, b)) in cards.iter().enumerate().skip(i + 1) {
            let needed = a.third(b);
            if let Some((coord_c, _)) = cards
                .iter()
                .skip(j + 1)
                .find(|(_, candidate)| *candidate == needed)
            {
                return Some([*coord_a, *coord_b, *coord_c]);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::entities::{Color, Deck, Number, Shading, Shape};

    fn red_ovals(number: Number) -> Card {
        Card(Color::Red, Shape::Oval, Shading::Filled, number)
    }

    #[test]
    fn test_is_match_all_same_but_one() {
        let a = red_ovals(Number::One);
        let b = red_ovals(Number::Two);
        let c = red_ovals(Number::Three);
        assert!(is_match(&a, &b, &c));
    }

    #[test]
    fn test_is_match_all_different() {
        let a = Card(Color::Red, Shape::Oval, Shading::Filled, Number::One);
        let b = Card(Color::Blue, Shape::Diamond, Shading::Empty, Number::Two);
        let c = Card(Color::Green, Shape::Squiggle, Shading::Striped, Number::Three);
        assert!(is_match(&a, &b, &c));
    }

    #[test]
    fn test_is_not_match_two_and_one() {
        let a = red_ovals(Number::One);
        let b = red_ovals(Number::One);
        let c = red_ovals(Number::Two);
        assert!(!is_match(&a, &b, &c));
    }

    #[test]
    fn test_is_match_symmetric() {
        let a = Card(Color::Red, Shape::Oval, Shading::Filled, Number::One);
        let b = Card(Color::Blue, Shape::Oval, Shading::Empty, Number::Two);
        let c = a.third(&b);
        let perms = [
            (a, b, c),
            (a, c, b),
            (b, a, c),
            (b, c, a),
            (c, a, b),
            (c, b, a),
        ];
        for (x, y, z) in perms {
            assert!(is_match(&x, &y, &z));
        }
    }

    #[test]
    fn test_is_match_selection_requires_three() {
        let a = red_ovals(Number::One);
        let b = red_ovals(Number::Two);
        let c = red_ovals(Number::Three);
        assert!(is_match_selection(&[a, b, c]));
        assert!(!is_match_selection(&[a, b]));
        assert!(!is_match_selection(&[]));
        assert!(!is_match_selection(&[a, b, c, a]));
    }

    #[test]
    fn test_find_match_present() {
        let cards = vec![
            (Coord::new(0, 0), red_ovals(Number::One)),
            (Coord::new(1, 0), Card(Color::Blue, Shape::Diamond, Shading::Empty, Number::One)),
            (Coord::new(2, 0), red_ovals(Number::Two)),
            (Coord::new(0, 1), red_ovals(Number::Three)),
        ];
        assert_eq!(
            find_match(&cards),
            Some([Coord::new(0, 0), Coord::new(2, 0), Coord::new(0, 1)])
        );
    }

    #[test]
    fn test_find_match_absent() {
        // Four cards that agree on three attributes and take only two numbers
        // can never contain a match.
        let cards = vec![
            (Coord::new(0, 0), red_ovals(Number::One)),
            (Coord::new(1, 0), red_ovals(Number::Two)),
            (Coord::new(2, 0), Card(Color::Blue, Shape::Oval, Shading::Filled, Number::One)),
            (Coord::new(0, 1), Card(Color::Blue, Shape::Oval, Shading::Filled, Number::Two)),
        ];
        assert_eq!(find_match(&cards), None);
        assert_eq!(find_match(&[]), None);
    }

    #[test]
    fn test_find_match_full_deck() {
        let mut deck = Deck::default();
        let mut cards = Vec::new();
        let mut i = 0;
        while let Some(card) = deck.draw() {
            cards.push((Coord::new(i, 0), card));
            i = i.wrapping_add(1);
        }
        let [a, b, c] = find_match(&cards).unwrap();
        let lookup = |coord: Coord| cards.iter().find(|(k, _)| *k == coord).unwrap().1;
        assert!(is_match(&lookup(a), &lookup(b), &lookup(c)));
    }
}
