use set_game::entities::Coord;
use std::fmt;

/// Something the user typed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClientCommand {
    Start,
    YellSet,
    Select(Coord),
    Deselect(Coord),
    CheckSet,
    RequestMore,
    Board,
    Help,
    Quit,
}

/// Errors that can occur during command parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Coordinate missing or not a number.
    InvalidCoord(String),
    /// Unrecognized command.
    UnrecognizedCommand(String),
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidCoord(input) => write!(
                f,
                "Invalid coordinate in '{input}'. Give a column and a row (e.g., 'select 2 0')"
            ),
            Self::UnrecognizedCommand(cmd) => write!(
                f,
                "Unrecognized command '{cmd}'. Type 'help' to see available commands"
            ),
        }
    }
}

impl std::error::Error for ParseError {}

pub const HELP: &str = "\
commands:
  start            deal the opening layout
  yell | set       claim a match
  select X Y       mark the card at column X, row Y
  deselect X Y     unmark the card at column X, row Y
  check            resolve your claim
  more             ask for three more cards
  board            show the table again
  help             show this message
  quit             leave the game";

/// Parse a command string into a [`ClientCommand`].
///
/// # Examples
///
/// ```
/// use sg_client::commands::{ClientCommand, parse_command};
/// use set_game::entities::Coord;
///
/// assert_eq!(parse_command("yell"), Ok(ClientCommand::YellSet));
/// assert_eq!(parse_command("select 2 0"), Ok(ClientCommand::Select(Coord::new(2, 0))));
/// ```
pub fn parse_command(input: &str) -> Result<ClientCommand, ParseError> {
    let trimmed = input.trim();

    match trimmed {
        "start" => return Ok(ClientCommand::Start),
        "yell" | "set" => return Ok(ClientCommand::YellSet),
        "check" => return Ok(ClientCommand::CheckSet),
        "more" => return Ok(ClientCommand::RequestMore),
        "board" => return Ok(ClientCommand::Board),
        "help" => return Ok(ClientCommand::Help),
        "quit" | "exit" => return Ok(ClientCommand::Quit),
        _ => {}
    }

    let parts: Vec<&str> = trimmed.split_ascii_whitespace().collect();
    match parts.first() {
        Some(&"select") => parse_coord(trimmed, &parts).map(ClientCommand::Select),
        Some(&"deselect") => parse_coord(trimmed, &parts).map(ClientCommand::Deselect),
        _ => Err(ParseError::UnrecognizedCommand(trimmed.to_string())),
    }
}

/// Parse "<verb> X Y".
fn parse_coord(input: &str, parts: &[&str]) -> Result<Coord, ParseError> {
    let invalid = || ParseError::InvalidCoord(input.to_string());
    match parts {
        [_, x, y] => {
            let x = x.parse().map_err(|_| invalid())?;
            let y = y.parse().map_err(|_| invalid())?;
            Ok(Coord::new(x, y))
        }
        _ => Err(invalid()),
    }
}
