//! Host-authoritative game engine.
//!
//! The engine owns the deck, the board, the scores and claim arbitration.
//! It is the only thing that mutates shared game state, and it tells peers
//! about every mutation through a [`Session`].
//!
//! ## Claim arbitration
//!
//! ```text
//! Idle --yell_set(P)--> Held(P, now + window)
//! Held(P, d) --check_set(P)--> Idle
//! Held(P, d) --yell_set(Q), now >= d--> Held(Q, now + window)   (P penalized)
//! Held(P, d) --yell_set(Q), now <  d--> Held(P, d)              (Q told to wait)
//! ```
//!
//! Expiry is only evaluated when a competing claim arrives. An uncontested
//! holder keeps the claim for as long as they like. A competing claim that
//! lands exactly on the deadline steals, so a claimant told to wait always
//! hears a remaining time above zero.

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    fmt, io,
    time::{Duration, Instant},
};
use thiserror::Error;

use super::{
    constants::{DEAL_SIZE, DEFAULT_CLAIM_WINDOW, DEFAULT_NUM_PLAYERS, MAX_NORMAL},
    entities::{Board, Card, Coord, Deck, PeerId, Scores},
    functional::{find_match, is_match_selection},
};

/// Domain errors. These are the peer's fault, never the engine's, so they
/// are logged and otherwise ignored.
#[derive(Debug, Eq, Error, PartialEq)]
pub enum UserError {
    #[error("already holds the claim")]
    AlreadyClaimed,
    #[error("already asked for more cards")]
    AlreadyRequested,
    #[error("card at {coord} is not {card}")]
    CardMismatch { card: Card, coord: Coord },
    #[error("game is over")]
    GameOver,
    #[error("doesn't hold the claim")]
    NotClaimHolder,
    #[error("card at {0} isn't selected")]
    NotSelected(Coord),
    #[error("already selected three cards")]
    SelectionFull,
    #[error("unknown peer")]
    UnknownPeer,
}

/// Failures that leave the engine unable to trust its own state.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to notify peers: {0}")]
    Notify(#[from] io::Error),
    #[error("invalid game state: {0}")]
    InternalState(&'static str),
}

/// State changes the engine announces to peers.
#[derive(Clone, Debug, PartialEq)]
pub enum GameEvent {
    Place { card: Card, coord: Coord },
    Remove { card: Card, coord: Coord },
    Select { card: Card, coord: Coord },
    Deselect { card: Card, coord: Coord },
    SetYelled(PeerId),
    SetStolen(PeerId),
    TooLate { peer: PeerId, remaining: Duration },
    ScoreUpdate(Scores),
    MoreRequested { peer: PeerId, count: usize, total: usize },
    Resume,
    EndGame { scores: Scores, reason: Option<String> },
}

impl fmt::Display for GameEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Place { card, coord } => write!(f, "placed {card} at {coord}"),
            Self::Remove { card, coord } => write!(f, "removed {card} from {coord}"),
            Self::Select { card, coord } => write!(f, "selected {card} at {coord}"),
            Self::Deselect { card, coord } => write!(f, "deselected {card} at {coord}"),
            Self::SetYelled(peer) => write!(f, "player {peer} yelled set"),
            Self::SetStolen(peer) => write!(f, "player {peer} stole the claim"),
            Self::TooLate { peer, remaining } => write!(
                f,
                "player {peer} is too late, {:.1}s left on the claim",
                remaining.as_secs_f64()
            ),
            Self::ScoreUpdate(scores) => write!(f, "scores {scores:?}"),
            Self::MoreRequested { peer, count, total } => {
                write!(f, "player {peer} wants more cards ({count}/{total})")
            }
            Self::Resume => write!(f, "play resumes"),
            Self::EndGame { scores, reason } => match reason {
                Some(reason) => write!(f, "game over ({reason}), scores {scores:?}"),
                None => write!(f, "game over, scores {scores:?}"),
            },
        }
    }
}

/// Whoever tells peers what happened. The host uses sockets; the offline
/// variant uses an in-process queue.
pub trait Session {
    /// Identities of every peer in the session.
    fn peers(&self) -> Vec<PeerId>;

    /// Send an event to one peer.
    fn unicast(&mut self, peer: PeerId, event: &GameEvent) -> io::Result<()>;

    /// Send an event to every peer.
    fn broadcast(&mut self, event: &GameEvent) -> io::Result<()> {
        for peer in self.peers() {
            self.unicast(peer, event)?;
        }
        Ok(())
    }

    /// Send an event to every peer except one.
    fn narrowcast(&mut self, except: PeerId, event: &GameEvent) -> io::Result<()> {
        for peer in self.peers().into_iter().filter(|&peer| peer != except) {
            self.unicast(peer, event)?;
        }
        Ok(())
    }
}

/// Game configuration settings.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct GameSettings {
    /// How long a claim is protected from competing claims.
    pub claim_window: Duration,
    /// Peers that must join before play begins.
    pub num_players: usize,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self::new(DEFAULT_CLAIM_WINDOW, DEFAULT_NUM_PLAYERS)
    }
}

impl GameSettings {
    #[must_use]
    pub const fn new(claim_window: Duration, num_players: usize) -> Self {
        Self {
            claim_window,
            num_players,
        }
    }
}

/// Claim arbitration state.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Claim {
    Idle,
    Held { peer: PeerId, deadline: Instant },
}

/// The game engine. One per session; nothing here is process-wide.
#[derive(Debug)]
pub struct Engine<S> {
    settings: GameSettings,
    deck: Deck,
    board: Board,
    /// Cards marked by the claim holder. Never more than three.
    selected: BTreeMap<Coord, Card>,
    claim: Claim,
    scores: Scores,
    /// Which peers have asked for more cards since the board last changed.
    more_requests: BTreeMap<PeerId, bool>,
    session: S,
    over: bool,
}

impl<S: Session> Engine<S> {
    /// A new engine with a freshly shuffled deck.
    pub fn new(settings: GameSettings, session: S) -> Self {
        Self::with_deck(settings, session, Deck::shuffled())
    }

    /// A new engine drawing from a pre-arranged deck.
    pub fn with_deck(settings: GameSettings, session: S, deck: Deck) -> Self {
        let peers = session.peers();
        Self {
            settings,
            deck,
            board: Board::new(),
            selected: BTreeMap::new(),
            claim: Claim::Idle,
            scores: peers.iter().map(|&peer| (peer, 0)).collect(),
            more_requests: peers.iter().map(|&peer| (peer, false)).collect(),
            session,
            over: false,
        }
    }

    #[must_use]
    pub fn board(&self) -> &Board {
        &self.board
    }

    #[must_use]
    pub fn claim(&self) -> Claim {
        self.claim
    }

    #[must_use]
    pub fn deck_remaining(&self) -> usize {
        self.deck.remaining()
    }

    #[must_use]
    pub fn is_over(&self) -> bool {
        self.over
    }

    #[must_use]
    pub fn scores(&self) -> &Scores {
        &self.scores
    }

    #[must_use]
    pub fn selected(&self) -> &BTreeMap<Coord, Card> {
        &self.selected
    }

    #[must_use]
    pub fn session(&self) -> &S {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut S {
        &mut self.session
    }

    #[must_use]
    pub fn settings(&self) -> &GameSettings {
        &self.settings
    }

    /// Count of peers currently asking for more cards.
    #[must_use]
    pub fn more_requested(&self) -> usize {
        self.more_requests.values().filter(|&&wants| wants).count()
    }

    /// Deal the opening layout. Safe to call repeatedly.
    pub fn start(&mut self, peer: PeerId) -> Result<(), EngineError> {
        if let Err(error) = self.check_active(peer) {
            warn!("player {peer} can't start: {error}");
            return Ok(());
        }
        debug!("player {peer} started the game");
        self.fill_board()
    }

    /// Claim the right to resolve a match.
    pub fn yell_set(&mut self, peer: PeerId, now: Instant) -> Result<(), EngineError> {
        if let Err(error) = self.check_active(peer) {
            warn!("player {peer} can't claim: {error}");
            return Ok(());
        }
        match self.claim {
            Claim::Idle => {
                self.claim = Claim::Held {
                    peer,
                    deadline: now + self.settings.claim_window,
                };
                info!("player {peer} claimed a set");
                self.session.broadcast(&GameEvent::SetYelled(peer))?;
            }
            Claim::Held { peer: holder, .. } if holder == peer => {
                warn!("player {peer} can't claim: {}", UserError::AlreadyClaimed);
            }
            Claim::Held {
                peer: holder,
                deadline,
            } => {
                if now >= deadline {
                    self.steal_claim(holder, peer, now)?;
                } else {
                    let remaining = deadline - now;
                    debug!(
                        "player {peer} is too late, player {holder} holds the claim for {remaining:?}"
                    );
                    self.session
                        .unicast(peer, &GameEvent::TooLate { peer, remaining })?;
                }
            }
        }
        Ok(())
    }

    /// Mark a card as part of the holder's claim.
    pub fn select_card(&mut self, peer: PeerId, card: Card, coord: Coord) -> Result<(), EngineError> {
        if let Err(error) = self.check_can_select(peer, card, coord) {
            warn!("player {peer} can't select {card} at {coord}: {error}");
            return Ok(());
        }
        self.selected.insert(coord, card);
        self.session.broadcast(&GameEvent::Select { card, coord })?;
        Ok(())
    }

    /// Unmark a card from the holder's claim.
    pub fn deselect_card(
        &mut self,
        peer: PeerId,
        card: Card,
        coord: Coord,
    ) -> Result<(), EngineError> {
        let checked = self
            .check_active(peer)
            .and_then(|()| self.check_holder(peer))
            .and_then(|()| self.check_card(card, coord))
            .and_then(|()| {
                self.selected
                    .contains_key(&coord)
                    .then_some(())
                    .ok_or(UserError::NotSelected(coord))
            });
        if let Err(error) = checked {
            warn!("player {peer} can't deselect {card} at {coord}: {error}");
            return Ok(());
        }
        self.selected.remove(&coord);
        self.session.broadcast(&GameEvent::Deselect { card, coord })?;
        Ok(())
    }

    /// Resolve the holder's claim against the current selection.
    pub fn check_set(&mut self, peer: PeerId) -> Result<(), EngineError> {
        if let Err(error) = self.check_active(peer).and_then(|()| self.check_holder(peer)) {
            warn!("player {peer} can't resolve a claim: {error}");
            return Ok(());
        }

        let selection: Vec<(Coord, Card)> = std::mem::take(&mut self.selected).into_iter().collect();
        let cards: Vec<Card> = selection.iter().map(|(_, card)| *card).collect();
        let found = is_match_selection(&cards);

        if found {
            info!("player {peer} found a set");
            self.adjust_score(peer, 1)?;
            for (coord, card) in selection {
                self.remove_card(card, coord)?;
            }
            self.reset_more_requests();
            self.fill_board()?;
            self.compact()?;
        } else {
            info!("player {peer} claimed {} cards that aren't a set", cards.len());
            self.adjust_score(peer, -1)?;
        }

        self.claim = Claim::Idle;
        self.session.broadcast(&GameEvent::Resume)?;

        if found && self.deck.is_empty() && !self.has_match() {
            self.end_game(Some("no matches remain".to_string()))?;
        }
        Ok(())
    }

    /// Record that a peer wants more cards. Deals once everyone agrees.
    pub fn request_more(&mut self, peer: PeerId) -> Result<(), EngineError> {
        if let Err(error) = self.check_active(peer) {
            warn!("player {peer} can't ask for more cards: {error}");
            return Ok(());
        }
        let Some(wants) = self.more_requests.get_mut(&peer) else {
            warn!("player {peer} can't ask for more cards: {}", UserError::UnknownPeer);
            return Ok(());
        };
        if *wants {
            warn!("player {peer} can't ask for more cards: {}", UserError::AlreadyRequested);
            return Ok(());
        }
        *wants = true;

        let count = self.more_requested();
        let total = self.more_requests.len();
        self.session
            .broadcast(&GameEvent::MoreRequested { peer, count, total })?;

        if count == total {
            self.reset_more_requests();
            if self.deck.is_empty() && !self.has_match() {
                return self.end_game(Some("no matches remain".to_string()));
            }
            info!("everyone asked for more cards, dealing {DEAL_SIZE}");
            for _ in 0..DEAL_SIZE {
                self.place_next()?;
            }
        }
        Ok(())
    }

    /// A peer left. There's no recovering from this; the session ends for
    /// everyone that's still connected.
    pub fn disconnect(&mut self, peer: PeerId) -> Result<(), EngineError> {
        if self.over {
            debug!("player {peer} disconnected after the game ended");
            return Ok(());
        }
        info!("player {peer} disconnected, ending the game");
        self.over = true;
        self.claim = Claim::Idle;
        self.selected.clear();
        let event = GameEvent::EndGame {
            scores: self.scores.clone(),
            reason: Some(format!("player {peer} disconnected")),
        };
        self.session.narrowcast(peer, &event)?;
        Ok(())
    }

    /// End the session after an unrecoverable failure. Delivery is best
    /// effort since the failure may have been a delivery failure.
    pub fn abort(&mut self, reason: &str) {
        if self.over {
            return;
        }
        self.over = true;
        let event = GameEvent::EndGame {
            scores: self.scores.clone(),
            reason: Some(reason.to_string()),
        };
        if let Err(error) = self.session.broadcast(&event) {
            warn!("couldn't tell everyone the game was aborted: {error}");
        }
    }

    fn check_active(&self, peer: PeerId) -> Result<(), UserError> {
        if self.over {
            return Err(UserError::GameOver);
        }
        if !self.scores.contains_key(&peer) {
            return Err(UserError::UnknownPeer);
        }
        Ok(())
    }

    fn check_holder(&self, peer: PeerId) -> Result<(), UserError> {
        match self.claim {
            Claim::Held { peer: holder, .. } if holder == peer => Ok(()),
            _ => Err(UserError::NotClaimHolder),
        }
    }

    fn check_card(&self, card: Card, coord: Coord) -> Result<(), UserError> {
        if self.board.get(coord) == Some(card) {
            Ok(())
        } else {
            Err(UserError::CardMismatch { card, coord })
        }
    }

    fn check_can_select(&self, peer: PeerId, card: Card, coord: Coord) -> Result<(), UserError> {
        self.check_active(peer)?;
        self.check_holder(peer)?;
        self.check_card(card, coord)?;
        if self.selected.contains_key(&coord) {
            return Ok(());
        }
        if self.selected.len() >= 3 {
            return Err(UserError::SelectionFull);
        }
        Ok(())
    }

    fn has_match(&self) -> bool {
        let cards: Vec<(Coord, Card)> = self.board.cards().collect();
        find_match(&cards).is_some()
    }

    fn adjust_score(&mut self, peer: PeerId, delta: i32) -> Result<(), EngineError> {
        let score = self
            .scores
            .get_mut(&peer)
            .ok_or(EngineError::InternalState("score missing for a known peer"))?;
        *score += delta;
        self.session
            .broadcast(&GameEvent::ScoreUpdate(self.scores.clone()))?;
        Ok(())
    }

    /// Hand the claim from an expired holder to a new claimant.
    fn steal_claim(&mut self, holder: PeerId, thief: PeerId, now: Instant) -> Result<(), EngineError> {
        info!("player {thief} stole the claim from player {holder}");
        for (coord, card) in std::mem::take(&mut self.selected) {
            self.session.broadcast(&GameEvent::Deselect { card, coord })?;
        }
        self.adjust_score(holder, -1)?;
        self.claim = Claim::Held {
            peer: thief,
            deadline: now + self.settings.claim_window,
        };
        self.session.broadcast(&GameEvent::SetStolen(thief))?;
        Ok(())
    }

    fn reset_more_requests(&mut self) {
        self.more_requests.values_mut().for_each(|wants| *wants = false);
    }

    fn remove_card(&mut self, card: Card, coord: Coord) -> Result<(), EngineError> {
        if self.board.remove(coord).is_none() {
            return Err(EngineError::InternalState("selected card missing from the board"));
        }
        self.session.broadcast(&GameEvent::Remove { card, coord })?;
        Ok(())
    }

    fn place_card(&mut self, card: Card) -> Result<(), EngineError> {
        let coord = self
            .board
            .place(card)
            .ok_or(EngineError::InternalState("no free slot below the card ceiling"))?;
        self.session.broadcast(&GameEvent::Place { card, coord })?;
        Ok(())
    }

    fn place_next(&mut self) -> Result<(), EngineError> {
        if self.board.is_full() {
            warn!("board is full, not dealing");
            return Ok(());
        }
        match self.deck.draw() {
            Some(card) => self.place_card(card),
            None => {
                debug!("deck is empty, not dealing");
                Ok(())
            }
        }
    }

    fn fill_board(&mut self) -> Result<(), EngineError> {
        while !self.deck.is_empty() && self.board.len() < MAX_NORMAL {
            self.place_next()?;
        }
        Ok(())
    }

    /// Pull overflow cards into holes in the normal region.
    fn compact(&mut self) -> Result<(), EngineError> {
        while let Some(coord) = self.board.next_compaction() {
            let card = self
                .board
                .get(coord)
                .ok_or(EngineError::InternalState("compaction source is empty"))?;
            debug!("moving {card} out of overflow at {coord}");
            self.remove_card(card, coord)?;
            self.place_card(card)?;
        }
        Ok(())
    }

    fn end_game(&mut self, reason: Option<String>) -> Result<(), EngineError> {
        info!("game over, final scores {:?}", self.scores);
        self.over = true;
        self.claim = Claim::Idle;
        self.selected.clear();
        let event = GameEvent::EndGame {
            scores: self.scores.clone(),
            reason,
        };
        self.session.broadcast(&event)?;
        Ok(())
    }
}
