//! Operation names and record layouts for both directions of the protocol.

use serde_json::json;
use std::{fmt, time::Duration};

use super::{
    super::game::{
        GameEvent,
        entities::{Card, Coord, PeerId, Scores},
    },
    codec::Record,
    errors::ParamError,
};

/// Gameplay intents a peer sends to the host.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum CommandKind {
    Start,
    SelectCard,
    DeselectCard,
    CheckSet,
    YellSet,
    RequestMore,
    Disconnect,
}

impl CommandKind {
    pub const ALL: [Self; 7] = [
        Self::Start,
        Self::SelectCard,
        Self::DeselectCard,
        Self::CheckSet,
        Self::YellSet,
        Self::RequestMore,
        Self::Disconnect,
    ];

    /// Operation name on the wire.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::SelectCard => "select_card",
            Self::DeselectCard => "deselect_card",
            Self::CheckSet => "check_set",
            Self::YellSet => "yell_set",
            Self::RequestMore => "request_more",
            Self::Disconnect => "disconnect",
        }
    }
}

/// Notifications the host sends to peers, plus the synthetic record a
/// client proxy queues when its stream ends.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum EventKind {
    ClientId,
    Place,
    Remove,
    Select,
    Deselect,
    SetYelled,
    SetStolen,
    TooLate,
    ScoreUpdate,
    MoreRequested,
    Resume,
    EndGame,
    SessionEnded,
}

impl EventKind {
    pub const ALL: [Self; 13] = [
        Self::ClientId,
        Self::Place,
        Self::Remove,
        Self::Select,
        Self::Deselect,
        Self::SetYelled,
        Self::SetStolen,
        Self::TooLate,
        Self::ScoreUpdate,
        Self::MoreRequested,
        Self::Resume,
        Self::EndGame,
        Self::SessionEnded,
    ];

    /// Operation name on the wire.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::ClientId => "client_id",
            Self::Place => "place",
            Self::Remove => "remove",
            Self::Select => "select",
            Self::Deselect => "deselect",
            Self::SetYelled => "set_yelled",
            Self::SetStolen => "set_stolen",
            Self::TooLate => "too_late",
            Self::ScoreUpdate => "score_update",
            Self::MoreRequested => "more_requested",
            Self::Resume => "resume",
            Self::EndGame => "end_game",
            Self::SessionEnded => "session_ended",
        }
    }
}

/// A gameplay intent with its parameters.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum UserCommand {
    /// Deal the opening layout. Every client sends this after connecting.
    Start,
    /// Mark a card while holding the claim.
    SelectCard { card: Card, coord: Coord },
    /// Unmark a card while holding the claim.
    DeselectCard { card: Card, coord: Coord },
    /// Resolve the claim against the marked cards.
    CheckSet,
    /// Claim the right to resolve a match.
    YellSet,
    /// Ask for three more cards.
    RequestMore,
    /// Leave, ending the session for everyone.
    Disconnect,
}

impl UserCommand {
    #[must_use]
    pub fn kind(&self) -> CommandKind {
        match self {
            Self::Start => CommandKind::Start,
            Self::SelectCard { .. } => CommandKind::SelectCard,
            Self::DeselectCard { .. } => CommandKind::DeselectCard,
            Self::CheckSet => CommandKind::CheckSet,
            Self::YellSet => CommandKind::YellSet,
            Self::RequestMore => CommandKind::RequestMore,
            Self::Disconnect => CommandKind::Disconnect,
        }
    }

    #[must_use]
    pub fn to_record(&self) -> Record {
        let record = Record::new(self.kind().name());
        match self {
            Self::SelectCard { card, coord } | Self::DeselectCard { card, coord } => {
                with_card(record, *card, *coord)
            }
            _ => record,
        }
    }
}

impl fmt::Display for UserCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Start => write!(f, "started the game"),
            Self::SelectCard { card, coord } => write!(f, "selected {card} at {coord}"),
            Self::DeselectCard { card, coord } => write!(f, "deselected {card} at {coord}"),
            Self::CheckSet => write!(f, "checked their set"),
            Self::YellSet => write!(f, "yelled set"),
            Self::RequestMore => write!(f, "asked for more cards"),
            Self::Disconnect => write!(f, "disconnected"),
        }
    }
}

/// A message from the host to one peer.
#[derive(Clone, Debug, PartialEq)]
pub enum ServerMessage {
    /// Handshake carrying the peer's assigned identity. Always first.
    ClientId(PeerId),
    /// A game state change.
    GameEvent(GameEvent),
}

impl ServerMessage {
    #[must_use]
    pub fn kind(&self) -> EventKind {
        match self {
            Self::ClientId(_) => EventKind::ClientId,
            Self::GameEvent(event) => match event {
                GameEvent::Place { .. } => EventKind::Place,
                GameEvent::Remove { .. } => EventKind::Remove,
                GameEvent::Select { .. } => EventKind::Select,
                GameEvent::Deselect { .. } => EventKind::Deselect,
                GameEvent::SetYelled(_) => EventKind::SetYelled,
                GameEvent::SetStolen(_) => EventKind::SetStolen,
                GameEvent::TooLate { .. } => EventKind::TooLate,
                GameEvent::ScoreUpdate(_) => EventKind::ScoreUpdate,
                GameEvent::MoreRequested { .. } => EventKind::MoreRequested,
                GameEvent::Resume => EventKind::Resume,
                GameEvent::EndGame { .. } => EventKind::EndGame,
            },
        }
    }

    #[must_use]
    pub fn to_record(&self) -> Record {
        let record = Record::new(self.kind().name());
        match self {
            Self::ClientId(id) => record.with_kwarg("id", json!(id)),
            Self::GameEvent(event) => match event {
                GameEvent::Place { card, coord }
                | GameEvent::Remove { card, coord }
                | GameEvent::Select { card, coord }
                | GameEvent::Deselect { card, coord } => with_card(record, *card, *coord),
                GameEvent::SetYelled(id) | GameEvent::SetStolen(id) => {
                    record.with_kwarg("id", json!(id))
                }
                GameEvent::TooLate { peer, remaining } => record
                    .with_kwarg("id", json!(peer))
                    .with_kwarg("remaining_seconds", json!(remaining.as_secs_f64())),
                GameEvent::ScoreUpdate(scores) => record.with_kwarg("scores", json!(scores)),
                GameEvent::MoreRequested { peer, count, total } => record
                    .with_kwarg("id", json!(peer))
                    .with_kwarg("count", json!(count))
                    .with_kwarg("total", json!(total)),
                GameEvent::Resume => record,
                GameEvent::EndGame { scores, reason } => record
                    .with_kwarg("scores", json!(scores))
                    .with_kwarg("reason", json!(reason)),
            },
        }
    }
}

impl From<GameEvent> for ServerMessage {
    fn from(event: GameEvent) -> Self {
        Self::GameEvent(event)
    }
}

impl fmt::Display for ServerMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ClientId(id) => write!(f, "assigned id {id}"),
            Self::GameEvent(event) => write!(f, "{event}"),
        }
    }
}

fn with_card(record: Record, card: Card, coord: Coord) -> Record {
    record
        .with_kwarg("card", json!(card))
        .with_kwarg("x", json!(coord.x))
        .with_kwarg("y", json!(coord.y))
}

/// Bind the `(card, x, y)` parameters shared by card-level operations.
pub fn card_params(record: &Record) -> Result<(Card, Coord), ParamError> {
    let card = record.param(0, "card")?;
    let x = record.param(1, "x")?;
    let y = record.param(2, "y")?;
    Ok((card, Coord::new(x, y)))
}

/// Bind the `id` parameter naming a peer.
pub fn id_param(record: &Record) -> Result<PeerId, ParamError> {
    record.param(0, "id")
}

/// Bind the `scores` parameter.
pub fn scores_param(record: &Record) -> Result<Scores, ParamError> {
    record.param(0, "scores")
}

/// Bind the `remaining_seconds` parameter of a `too_late` notification.
pub fn remaining_param(record: &Record) -> Result<Duration, ParamError> {
    let seconds: f64 = record.param(1, "remaining_seconds")?;
    Ok(Duration::try_from_secs_f64(seconds).unwrap_or_default())
}
