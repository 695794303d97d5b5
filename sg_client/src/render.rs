//! Plain-text rendition of a [`TableView`].

use set_game::{
    TableView,
    constants::{BOARD_COLS, BOARD_ROWS, OVERFLOW_DEPTH, OVERFLOW_LANES},
    entities::{Card, Color, Coord, Number, Shading, Shape},
};
use std::fmt::Write;

const CELL_WIDTH: usize = 7;

/// Four-character code for a card: number, colour, shading, shape.
#[must_use]
pub fn card_code(card: &Card) -> String {
    let Card(color, shape, shading, number) = card;
    let number = match number {
        Number::One => '1',
        Number::Two => '2',
        Number::Three => '3',
    };
    let color = match color {
        Color::Red => 'R',
        Color::Blue => 'B',
        Color::Green => 'G',
    };
    let shading = match shading {
        Shading::Empty => 'e',
        Shading::Filled => 'f',
        Shading::Striped => 's',
    };
    let shape = match shape {
        Shape::Squiggle => '~',
        Shape::Diamond => '<',
        Shape::Oval => 'o',
    };
    [number, color, shading, shape].iter().collect()
}

fn cell(view: &TableView, coord: Coord) -> String {
    let overflow = coord.x >= BOARD_COLS;
    if overflow && coord.y >= OVERFLOW_DEPTH {
        return String::new();
    }
    let text = match view.card_at(coord) {
        Some(card) if view.selected.contains(&coord) => format!("[{}]", card_code(&card)),
        Some(card) => format!(" {} ", card_code(&card)),
        None if overflow => String::new(),
        None => "  ..  ".to_string(),
    };
    format!("{text:<CELL_WIDTH$}")
}

/// The layout, columns left to right and rows top to bottom, with marked
/// cards in brackets. Holes in the normal region show as `..`; unused
/// overflow slots stay blank.
#[must_use]
pub fn render_board(view: &TableView) -> String {
    let cols = BOARD_COLS + OVERFLOW_LANES;
    let mut out = String::from("    ");
    for x in 0..cols {
        let _ = write!(out, "{:<CELL_WIDTH$}", format!("  {x}"));
    }
    out.push('\n');
    for y in 0..BOARD_ROWS {
        let _ = write!(out, "{y:>2}  ");
        for x in 0..cols {
            out.push_str(&cell(view, Coord::new(x, y)));
        }
        out.truncate(out.trim_end().len());
        out.push('\n');
    }
    out
}

/// Scores, claim state and the request-more tally on one line each.
#[must_use]
pub fn render_status(view: &TableView) -> String {
    let mut out = String::new();
    let scores: Vec<String> = view
        .scores
        .iter()
        .map(|(&peer, score)| format!("{} {score}", view.name(peer)))
        .collect();
    if !scores.is_empty() {
        let _ = writeln!(out, "scores: {}", scores.join(" | "));
    }
    match view.holder {
        Some(_) if view.holds_claim() => {
            let _ = writeln!(out, "claim: yours, select three cards then `check`");
        }
        Some(peer) => {
            let _ = writeln!(out, "claim: {}", view.name(peer));
        }
        None => {}
    }
    if let Some((count, total)) = view.more {
        let _ = writeln!(out, "more cards: {count}/{total} asked");
    }
    if view.is_over() {
        let _ = writeln!(out, "the game is over");
    }
    out
}

/// Everything: board, status and recent messages.
#[must_use]
pub fn render(view: &TableView) -> String {
    let mut out = render_board(view);
    out.push_str(&render_status(view));
    for line in &view.log {
        let _ = writeln!(out, "> {line}");
    }
    out
}
