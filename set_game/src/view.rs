//! Client-side mirror of the host's game state.
//!
//! The mirror is only ever changed by applying host records, in the order
//! they arrive, on the presentation thread.

use log::debug;
use std::{
    collections::{BTreeMap, BTreeSet},
    sync::LazyLock,
};

use super::{
    game::entities::{Card, Coord, PeerId, Scores},
    net::{
        codec::Record,
        errors::DispatchError,
        messages::{EventKind, card_params, id_param, remaining_param, scores_param},
        rpc::{Dispatcher, Handler},
    },
};

/// Most recent log lines kept for display.
pub const LOG_CAPACITY: usize = 8;

/// How the session ended.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Outcome {
    pub scores: Scores,
    pub reason: Option<String>,
}

/// Everything a participant knows about the game.
#[derive(Clone, Debug, Default)]
pub struct TableView {
    /// Own identity, once the handshake arrives.
    pub me: Option<PeerId>,
    pub board: BTreeMap<Coord, Card>,
    /// Coordinates the claim holder has marked.
    pub selected: BTreeSet<Coord>,
    pub scores: Scores,
    /// Current claim holder, if any.
    pub holder: Option<PeerId>,
    /// Latest `(count, total)` request-more tally.
    pub more: Option<(usize, usize)>,
    pub log: Vec<String>,
    pub outcome: Option<Outcome>,
    /// Whether the host's stream is still open.
    pub disconnected: bool,
}

static DISPATCHER: LazyLock<Dispatcher<TableView, ()>> = LazyLock::new(|| {
    let mut dispatcher = Dispatcher::new();
    for kind in EventKind::ALL {
        dispatcher.register(kind.name(), event_handler(kind));
    }
    dispatcher
});

impl TableView {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one host record.
    ///
    /// # Errors
    ///
    /// Returns an error if a handler fails for a reason other than a
    /// malformed record.
    pub fn apply(&mut self, record: &Record) -> Result<(), DispatchError> {
        DISPATCHER.handle(self, (), record)
    }

    /// Whether a handler exists for an operation name.
    #[must_use]
    pub fn handles(name: &str) -> bool {
        DISPATCHER.handles(name)
    }

    /// How to refer to a peer: "you" for the local participant.
    #[must_use]
    pub fn name(&self, peer: PeerId) -> String {
        if self.me == Some(peer) {
            "you".to_string()
        } else {
            format!("player {peer}")
        }
    }

    #[must_use]
    pub fn is_over(&self) -> bool {
        self.outcome.is_some() || self.disconnected
    }

    /// Whether the local participant holds the claim.
    #[must_use]
    pub fn holds_claim(&self) -> bool {
        self.holder.is_some() && self.holder == self.me
    }

    #[must_use]
    pub fn card_at(&self, coord: Coord) -> Option<Card> {
        self.board.get(&coord).copied()
    }

    fn push_log(&mut self, line: String) {
        debug!("{line}");
        self.log.push(line);
        if self.log.len() > LOG_CAPACITY {
            self.log.remove(0);
        }
    }

    fn describe_scores(&self, scores: &Scores) -> String {
        scores
            .iter()
            .map(|(&peer, score)| format!("{} {score}", self.name(peer)))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

fn client_id(view: &mut TableView, _: (), record: &Record) -> anyhow::Result<()> {
    let id = id_param(record)?;
    view.me = Some(id);
    view.push_log(format!("you are player {id}"));
    Ok(())
}

fn place(view: &mut TableView, _: (), record: &Record) -> anyhow::Result<()> {
    let (card, coord) = card_params(record)?;
    view.board.insert(coord, card);
    Ok(())
}

fn remove(view: &mut TableView, _: (), record: &Record) -> anyhow::Result<()> {
    let (_, coord) = card_params(record)?;
    view.board.remove(&coord);
    view.selected.remove(&coord);
    Ok(())
}

fn select(view: &mut TableView, _: (), record: &Record) -> anyhow::Result<()> {
    let (_, coord) = card_params(record)?;
    view.selected.insert(coord);
    Ok(())
}

fn deselect(view: &mut TableView, _: (), record: &Record) -> anyhow::Result<()> {
    let (_, coord) = card_params(record)?;
    view.selected.remove(&coord);
    Ok(())
}

fn set_yelled(view: &mut TableView, _: (), record: &Record) -> anyhow::Result<()> {
    let id = id_param(record)?;
    view.holder = Some(id);
    let line = format!("{} yelled set!", view.name(id));
    view.push_log(line);
    Ok(())
}

fn set_stolen(view: &mut TableView, _: (), record: &Record) -> anyhow::Result<()> {
    let id = id_param(record)?;
    view.holder = Some(id);
    view.selected.clear();
    let line = format!("{} stole the claim!", view.name(id));
    view.push_log(line);
    Ok(())
}

fn too_late(view: &mut TableView, _: (), record: &Record) -> anyhow::Result<()> {
    let id = id_param(record)?;
    let remaining = remaining_param(record)?;
    let line = format!(
        "{} too late, wait {:.1}s",
        view.name(id),
        remaining.as_secs_f64()
    );
    view.push_log(line);
    Ok(())
}

fn score_update(view: &mut TableView, _: (), record: &Record) -> anyhow::Result<()> {
    view.scores = scores_param(record)?;
    Ok(())
}

fn more_requested(view: &mut TableView, _: (), record: &Record) -> anyhow::Result<()> {
    let id = id_param(record)?;
    let count = record.param(1, "count")?;
    let total = record.param(2, "total")?;
    view.more = if count == total { None } else { Some((count, total)) };
    let line = format!("{} asked for more cards ({count}/{total})", view.name(id));
    view.push_log(line);
    Ok(())
}

fn resume(view: &mut TableView, _: (), _: &Record) -> anyhow::Result<()> {
    view.holder = None;
    view.selected.clear();
    Ok(())
}

fn end_game(view: &mut TableView, _: (), record: &Record) -> anyhow::Result<()> {
    let scores = scores_param(record)?;
    let reason: Option<String> = record.optional_param(1, "reason")?;
    let line = match &reason {
        Some(reason) => format!("game over: {reason} ({})", view.describe_scores(&scores)),
        None => format!("game over ({})", view.describe_scores(&scores)),
    };
    view.push_log(line);
    view.holder = None;
    view.selected.clear();
    view.scores = scores.clone();
    view.outcome = Some(Outcome { scores, reason });
    Ok(())
}

fn session_ended(view: &mut TableView, _: (), _: &Record) -> anyhow::Result<()> {
    view.disconnected = true;
    if view.outcome.is_none() {
        view.push_log("lost the connection to the host".to_string());
    }
    Ok(())
}

fn event_handler(kind: EventKind) -> Handler<TableView, ()> {
    match kind {
        EventKind::ClientId => client_id,
        EventKind::Place => place,
        EventKind::Remove => remove,
        EventKind::Select => select,
        EventKind::Deselect => deselect,
        EventKind::SetYelled => set_yelled,
        EventKind::SetStolen => set_stolen,
        EventKind::TooLate => too_late,
        EventKind::ScoreUpdate => score_update,
        EventKind::MoreRequested => more_requested,
        EventKind::Resume => resume,
        EventKind::EndGame => end_game,
        EventKind::SessionEnded => session_ended,
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::{
        game::{
            GameEvent,
            entities::{Color, Number, Shading, Shape},
        },
        net::{client, messages::ServerMessage},
    };

    fn card() -> Card {
        Card(Color::Blue, Shape::Oval, Shading::Filled, Number::Three)
    }

    fn apply(view: &mut TableView, message: impl Into<ServerMessage>) {
        view.apply(&message.into().to_record()).unwrap();
    }

    fn joined_as(id: PeerId) -> TableView {
        let mut view = TableView::new();
        apply(&mut view, ServerMessage::ClientId(id));
        view
    }

    #[test]
    fn test_every_notification_is_handled() {
        for kind in EventKind::ALL {
            assert!(TableView::handles(kind.name()), "{}", kind.name());
        }
    }

    #[test]
    fn test_handshake_sets_identity() {
        let view = joined_as(2);
        assert_eq!(view.me, Some(2));
        assert_eq!(view.name(2), "you");
        assert_eq!(view.name(1), "player 1");
    }

    #[test]
    fn test_place_select_remove() {
        let mut view = joined_as(1);
        let coord = Coord::new(2, 3);
        apply(&mut view, GameEvent::Place { card: card(), coord });
        assert_eq!(view.card_at(coord), Some(card()));

        apply(&mut view, GameEvent::Select { card: card(), coord });
        assert!(view.selected.contains(&coord));

        apply(&mut view, GameEvent::Remove { card: card(), coord });
        assert_eq!(view.card_at(coord), None);
        assert!(view.selected.is_empty());
    }

    #[test]
    fn test_claim_lifecycle() {
        let mut view = joined_as(1);
        apply(&mut view, GameEvent::SetYelled(1));
        assert!(view.holds_claim());
        assert_eq!(view.log.last().unwrap(), "you yelled set!");

        apply(&mut view, GameEvent::SetStolen(2));
        assert_eq!(view.holder, Some(2));
        assert!(!view.holds_claim());

        apply(&mut view, GameEvent::Resume);
        assert_eq!(view.holder, None);
    }

    #[test]
    fn test_too_late_message() {
        let mut view = joined_as(2);
        apply(
            &mut view,
            GameEvent::TooLate {
                peer: 2,
                remaining: Duration::from_millis(4000),
            },
        );
        assert_eq!(view.log.last().unwrap(), "you too late, wait 4.0s");
    }

    #[test]
    fn test_more_requested_tally() {
        let mut view = joined_as(1);
        apply(
            &mut view,
            GameEvent::MoreRequested {
                peer: 2,
                count: 1,
                total: 2,
            },
        );
        assert_eq!(view.more, Some((1, 2)));
        apply(
            &mut view,
            GameEvent::MoreRequested {
                peer: 1,
                count: 2,
                total: 2,
            },
        );
        assert_eq!(view.more, None);
    }

    #[test]
    fn test_end_game_then_session_ended() {
        let mut view = joined_as(1);
        apply(
            &mut view,
            GameEvent::EndGame {
                scores: Scores::from([(1, 2), (2, -1)]),
                reason: Some("player 2 disconnected".to_string()),
            },
        );
        assert!(view.is_over());
        assert_eq!(
            view.log.last().unwrap(),
            "game over: player 2 disconnected (you 2, player 2 -1)"
        );
        view.apply(&client::session_ended()).unwrap();
        assert!(view.disconnected);
        assert_eq!(view.log.len(), 2);
    }

    #[test]
    fn test_session_ended_without_end_game() {
        let mut view = joined_as(1);
        view.apply(&client::session_ended()).unwrap();
        assert!(view.is_over());
        assert_eq!(view.log.last().unwrap(), "lost the connection to the host");
    }

    #[test]
    fn test_log_is_bounded() {
        let mut view = joined_as(1);
        for _ in 0..(LOG_CAPACITY * 2) {
            apply(&mut view, GameEvent::SetYelled(2));
        }
        assert_eq!(view.log.len(), LOG_CAPACITY);
    }

    #[test]
    fn test_unknown_and_malformed_records_are_ignored() {
        let mut view = joined_as(1);
        view.apply(&Record::new("confetti")).unwrap();
        view.apply(&Record::new("place")).unwrap();
        assert!(view.board.is_empty());
    }
}
